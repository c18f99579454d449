pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Input errors are terminal for the message that carried them; redelivery
/// cannot repair a payload, so the consumer drops such messages after logging.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Command payload is not valid JSON: {message}")]
	MalformedCommand { message: String },
	#[error("Command is missing the required field {field:?}.")]
	MissingField { field: &'static str },
	#[error("Command field {field:?} holds an unparsable timestamp {value:?}.")]
	InvalidTimestamp { field: &'static str, value: String },
	#[error("Command field {field:?} holds {value:?} where {expected} was expected.")]
	InvalidField { field: &'static str, value: String, expected: &'static str },
}
