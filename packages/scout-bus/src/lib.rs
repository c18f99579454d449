//! Command-bus consumer supervision.

pub mod policy;
pub mod supervisor;

mod error;
pub use error::{Error, Result};

pub use policy::ProcessingOutcome;
pub use supervisor::{Supervisor, SupervisorState};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Processes one raw command payload. The supervisor stays agnostic of the
/// command format; it only maps the outcome to an acknowledgment.
pub trait CommandHandler: Send + Sync {
	fn handle<'a>(&'a self, payload: &'a [u8]) -> BoxFuture<'a, ProcessingOutcome>;
}
