use time::OffsetDateTime;

use scout_bus::{BoxFuture, CommandHandler, ProcessingOutcome};
use scout_domain::{CommandDefaults, SearchCommand};
use scout_service::FavoriteSearchService;
use scout_storage::models::FavoriteOutcome;

/// Bridges raw bus payloads to the search orchestrator: decode, execute, map
/// the result onto an acknowledgment outcome.
pub struct SearchCommandHandler {
	service: FavoriteSearchService,
	defaults: CommandDefaults,
}

impl SearchCommandHandler {
	pub fn new(service: FavoriteSearchService, defaults: CommandDefaults) -> Self {
		Self { service, defaults }
	}

	async fn process(&self, payload: &[u8]) -> ProcessingOutcome {
		let command =
			match SearchCommand::decode(payload, self.defaults, OffsetDateTime::now_utc()) {
				Ok(command) => command,
				Err(err) => {
					tracing::warn!(error = %err, "Discarding undecodable command.");

					return ProcessingOutcome::Rejected { reason: err.to_string() };
				},
			};

		tracing::info!(
			user_id = %command.user_id,
			top = command.top,
			limit = command.limit,
			expired_only = command.expired_only,
			"Processing favorite-search command."
		);

		match self.service.execute(&command).await {
			Ok(outcome) => {
				for result in &outcome.results {
					tracing::info!(
						notice_id = %result.notice_id,
						purchase_number = %result.purchase_number,
						entry_name = result.entry_name.as_deref().unwrap_or(""),
						score = result.score,
						rank = result.rank,
						status = favorite_status(result.outcome),
						"Ranked favorite."
					);
				}

				tracing::info!(
					user_id = %command.user_id,
					added = outcome.added,
					ranked = outcome.results.len(),
					"Favorite-search command completed."
				);

				ProcessingOutcome::Completed
			},
			Err(err) if err.is_retryable() => {
				tracing::warn!(error = %err, "Command failed on a dependency.");

				ProcessingOutcome::Failed { reason: err.to_string() }
			},
			Err(err) => {
				tracing::error!(error = %err, "Command failed terminally.");

				ProcessingOutcome::Poisoned { reason: err.to_string() }
			},
		}
	}
}

impl CommandHandler for SearchCommandHandler {
	fn handle<'a>(&'a self, payload: &'a [u8]) -> BoxFuture<'a, ProcessingOutcome> {
		Box::pin(self.process(payload))
	}
}

fn favorite_status(outcome: FavoriteOutcome) -> &'static str {
	match outcome {
		FavoriteOutcome::Inserted => "inserted",
		FavoriteOutcome::AlreadyExists => "already-exists",
		FavoriteOutcome::UnknownUser => "unknown-user",
	}
}
