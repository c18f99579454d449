pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Embedding provider unavailable: {message}")]
	Encoding { message: String },
	#[error("Transient store failure: {message}")]
	TransientStore { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error(
		"Vector dimension mismatch: query has {query_dim} dimensions, candidate {notice_id} has {candidate_dim}."
	)]
	DimensionMismatch { query_dim: usize, candidate_dim: usize, notice_id: uuid::Uuid },
}

impl Error {
	/// Retryable failures are dependency outages: redelivering the command may
	/// succeed once the store or the provider recovers. Everything else is
	/// terminal for the command.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Encoding { .. } | Self::TransientStore { .. })
	}

	pub(crate) fn from_store(err: scout_storage::Error) -> Self {
		if err.is_transient() {
			Self::TransientStore { message: err.to_string() }
		} else {
			Self::Storage { message: err.to_string() }
		}
	}
}
