use std::sync::Arc;

use scout_providers::EmbeddingClient;
use scout_service::EmbeddingProvider;

/// Shared across all requests. The provider instance is the same one the
/// search worker uses; it carries no per-call state.
#[derive(Clone)]
pub struct AppState {
	pub embedding: Arc<dyn EmbeddingProvider>,
}

impl AppState {
	pub async fn new(config: &scout_config::Config) -> color_eyre::Result<Self> {
		let embedding = EmbeddingClient::new(config.providers.embedding.clone())?;

		embedding.probe().await?;

		Ok(Self { embedding: Arc::new(embedding) })
	}
}
