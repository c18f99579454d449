mod command;
mod error;

pub use command::{CommandDefaults, SearchCommand};
pub use error::{Error, Result};
