pub mod ranking;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use scout_domain::SearchCommand;
use scout_providers::EmbeddingClient;
use scout_storage::{
	db::Db,
	favorites,
	models::{FavoriteOutcome, NoticeCandidate},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text-to-vector capability. Shared read-only across all commands; must be
/// stateless between calls so a single instance can serve the consumer and the
/// encode endpoint concurrently.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, scout_providers::Result<Vec<Vec<f32>>>>;
}

impl EmbeddingProvider for EmbeddingClient {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, scout_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(EmbeddingClient::embed(self, texts))
	}
}

/// Candidate Store Gateway contract: the candidate read path and the
/// idempotent favorite write path. Pooling (or the lack of it) is an
/// implementation detail behind this seam.
pub trait CandidateGateway
where
	Self: Send + Sync,
{
	fn fetch_candidates<'a>(
		&'a self,
		model: &'a str,
		cutoff: OffsetDateTime,
		expired_only: bool,
		limit: u32,
	) -> BoxFuture<'a, scout_storage::Result<Vec<NoticeCandidate>>>;

	fn upsert_favorite<'a>(
		&'a self,
		user_id: &'a str,
		notice_id: Uuid,
	) -> BoxFuture<'a, scout_storage::Result<FavoriteOutcome>>;
}

impl CandidateGateway for Db {
	fn fetch_candidates<'a>(
		&'a self,
		model: &'a str,
		cutoff: OffsetDateTime,
		expired_only: bool,
		limit: u32,
	) -> BoxFuture<'a, scout_storage::Result<Vec<NoticeCandidate>>> {
		Box::pin(favorites::fetch_candidates(self, model, cutoff, expired_only, limit))
	}

	fn upsert_favorite<'a>(
		&'a self,
		user_id: &'a str,
		notice_id: Uuid,
	) -> BoxFuture<'a, scout_storage::Result<FavoriteOutcome>> {
		Box::pin(favorites::upsert_favorite(self, user_id, notice_id))
	}
}

/// One persisted (or skipped) favorite from a processed command, with the
/// display metadata carried through for audit logging.
#[derive(Debug, Clone)]
pub struct RankedFavorite {
	pub notice_id: Uuid,
	pub purchase_number: String,
	pub entry_name: Option<String>,
	pub purchase_object_info: Option<String>,
	pub score: f32,
	pub rank: u32,
	pub outcome: FavoriteOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
	pub added: u32,
	pub results: Vec<RankedFavorite>,
}

impl SearchOutcome {
	pub fn notice_ids(&self) -> Vec<Uuid> {
		self.results.iter().map(|result| result.notice_id).collect()
	}
}

/// Search Orchestrator: encode the query, fetch candidates, rank, persist the
/// winners as favorites.
pub struct FavoriteSearchService {
	model: String,
	gateway: Arc<dyn CandidateGateway>,
	embedding: Arc<dyn EmbeddingProvider>,
}

impl FavoriteSearchService {
	pub fn new(
		model: impl Into<String>,
		gateway: Arc<dyn CandidateGateway>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { model: model.into(), gateway, embedding }
	}

	/// Runs one command end to end. An empty candidate pool is a normal
	/// outcome (`added == 0`), not an error. An unknown user id on a single
	/// insert skips that entity and keeps going.
	pub async fn execute(&self, command: &SearchCommand) -> Result<SearchOutcome> {
		let query = [command.query.clone()];
		let mut vectors = self
			.embedding
			.embed(&query)
			.await
			.map_err(|err| Error::Encoding { message: err.to_string() })?;
		let Some(query_vector) = vectors.pop() else {
			return Err(Error::Encoding {
				message: "Provider returned no vector for the query.".to_string(),
			});
		};

		let candidates = self
			.gateway
			.fetch_candidates(
				&self.model,
				command.collecting_end_limit,
				command.expired_only,
				command.limit,
			)
			.await
			.map_err(Error::from_store)?;

		tracing::debug!(
			candidates = candidates.len(),
			expired_only = command.expired_only,
			"Fetched candidate pool."
		);

		let ranked = ranking::rank(&query_vector, &candidates, command.top)?;
		let mut outcome = SearchOutcome::default();

		for entry in ranked {
			let favorite = self
				.gateway
				.upsert_favorite(&command.user_id, entry.candidate.notice_id)
				.await
				.map_err(Error::from_store)?;

			match favorite {
				FavoriteOutcome::Inserted => outcome.added += 1,
				FavoriteOutcome::AlreadyExists => {},
				FavoriteOutcome::UnknownUser => {
					tracing::warn!(
						user_id = %command.user_id,
						notice_id = %entry.candidate.notice_id,
						"Favorite insert skipped: user unknown to the identity store."
					);
				},
			}

			outcome.results.push(RankedFavorite {
				notice_id: entry.candidate.notice_id,
				purchase_number: entry.candidate.purchase_number.clone(),
				entry_name: entry.candidate.entry_name.clone(),
				purchase_object_info: entry.candidate.purchase_object_info.clone(),
				score: entry.score,
				rank: entry.rank,
				outcome: favorite,
			});
		}

		Ok(outcome)
	}
}
