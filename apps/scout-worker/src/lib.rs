pub mod handler;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use scout_bus::Supervisor;
use scout_service::FavoriteSearchService;
use scout_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = scout_cli::VERSION,
	rename_all = "kebab",
	styles = scout_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = scout_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let embedding = scout_providers::EmbeddingClient::new(config.providers.embedding.clone())?;

	// A worker that cannot encode is a worker that can only dead-letter, so
	// refuse to start until the provider answers.
	embedding.probe().await?;

	let service = FavoriteSearchService::new(
		config.providers.embedding.model.clone(),
		Arc::new(db),
		Arc::new(embedding),
	);
	let handler = Arc::new(handler::SearchCommandHandler::new(
		service,
		scout_domain::CommandDefaults {
			top: config.search.default_top,
			limit: config.search.default_limit,
		},
	));
	let supervisor = Supervisor::new(config.bus.clone(), handler);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);

	tokio::spawn(async move {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for the interrupt signal.");
		}

		let _ = shutdown_tx.send(true);
	});

	tracing::info!(version = scout_cli::VERSION, "Favorite-search worker started.");

	supervisor.run(shutdown_rx).await?;

	tracing::info!("Favorite-search worker stopped.");

	Ok(())
}
