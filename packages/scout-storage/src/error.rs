#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid stored vector: {0}")]
	InvalidVector(String),
	#[error("Store unavailable: {0}")]
	Unavailable(String),
}

impl Error {
	/// Whether the failure is worth redelivering the command for. Connectivity
	/// and pool exhaustion are; malformed stored data and SQL mistakes are not.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Unavailable(_) => true,
			Self::InvalidVector(_) => false,
			Self::Sqlx(err) => match err {
				sqlx::Error::Io(_)
				| sqlx::Error::Tls(_)
				| sqlx::Error::PoolTimedOut
				| sqlx::Error::PoolClosed
				| sqlx::Error::WorkerCrashed => true,
				sqlx::Error::Database(db) => db
					.code()
					// Class 08 is "connection exception"; 57P01 is
					// admin_shutdown during a failover.
					.map(|code| code.starts_with("08") || code == "57P01")
					.unwrap_or(false),
				_ => false,
			},
		}
	}
}
