use std::{
	collections::HashSet,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use scout_domain::{CommandDefaults, SearchCommand};
use scout_service::{
	BoxFuture, CandidateGateway, EmbeddingProvider, Error, FavoriteSearchService,
};
use scout_storage::models::{FavoriteOutcome, NoticeCandidate};

struct StubEmbedding {
	vector: Vec<f32>,
	calls: Arc<AtomicUsize>,
}

impl StubEmbedding {
	fn new(vector: Vec<f32>) -> Self {
		Self { vector, calls: Arc::new(AtomicUsize::new(0)) }
	}
}

impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, scout_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = texts.iter().map(|_| self.vector.clone()).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

struct FailingEmbedding;

impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_texts: &'a [String],
	) -> BoxFuture<'a, scout_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Err(scout_providers::Error::InvalidResponse {
				message: "model endpoint is down".to_string(),
			})
		})
	}
}

/// In-memory gateway honoring the store's expiry-filter and conditional-insert
/// contracts.
struct FakeGateway {
	notices: Vec<NoticeCandidate>,
	known_users: HashSet<String>,
	favorites: Mutex<HashSet<(String, Uuid)>>,
	fail_transient: bool,
}

impl FakeGateway {
	fn new(notices: Vec<NoticeCandidate>, known_users: &[&str]) -> Self {
		Self {
			notices,
			known_users: known_users.iter().map(|user| user.to_string()).collect(),
			favorites: Mutex::new(HashSet::new()),
			fail_transient: false,
		}
	}

	fn favorite_count(&self) -> usize {
		self.favorites.lock().expect("lock").len()
	}
}

impl CandidateGateway for FakeGateway {
	fn fetch_candidates<'a>(
		&'a self,
		_model: &'a str,
		cutoff: OffsetDateTime,
		expired_only: bool,
		limit: u32,
	) -> BoxFuture<'a, scout_storage::Result<Vec<NoticeCandidate>>> {
		Box::pin(async move {
			if self.fail_transient {
				return Err(scout_storage::Error::Unavailable(
					"connection refused".to_string(),
				));
			}

			let mut rows: Vec<NoticeCandidate> = self
				.notices
				.iter()
				.filter(|notice| {
					if expired_only {
						notice.collecting_end.map(|end| end < cutoff).unwrap_or(false)
					} else {
						notice.collecting_end.map(|end| end >= cutoff).unwrap_or(true)
					}
				})
				.cloned()
				.collect();

			rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
			rows.truncate(limit as usize);

			Ok(rows)
		})
	}

	fn upsert_favorite<'a>(
		&'a self,
		user_id: &'a str,
		notice_id: Uuid,
	) -> BoxFuture<'a, scout_storage::Result<FavoriteOutcome>> {
		Box::pin(async move {
			if !self.known_users.contains(user_id) {
				return Ok(FavoriteOutcome::UnknownUser);
			}

			let mut favorites = self.favorites.lock().expect("lock");

			if favorites.insert((user_id.to_string(), notice_id)) {
				Ok(FavoriteOutcome::Inserted)
			} else {
				Ok(FavoriteOutcome::AlreadyExists)
			}
		})
	}
}

fn notice(vector: Vec<f32>, collecting_end: Option<OffsetDateTime>) -> NoticeCandidate {
	NoticeCandidate {
		notice_id: Uuid::new_v4(),
		purchase_number: format!("PN-{}", Uuid::new_v4().simple()),
		entry_name: Some("entry".to_string()),
		purchase_object_info: None,
		collecting_end,
		updated_at: OffsetDateTime::now_utc(),
		vector,
	}
}

fn command(user_id: &str, top: u32, limit: u32) -> SearchCommand {
	let payload = format!(
		r#"{{"userId": "{user_id}", "query": "school supplies", "top": {top}, "limit": {limit}}}"#
	);

	SearchCommand::decode(
		payload.as_bytes(),
		CommandDefaults { top: 20, limit: 500 },
		OffsetDateTime::now_utc(),
	)
	.expect("command should decode")
}

fn service(gateway: Arc<FakeGateway>, embedding: Arc<dyn EmbeddingProvider>) -> FavoriteSearchService {
	FavoriteSearchService::new("test-model", gateway, embedding)
}

#[tokio::test]
async fn persists_the_most_similar_candidates() {
	// Candidate #2 points along the query axis; #1 and #3 do not.
	let best = notice(vec![1.0, 0.05], None);
	let pool = vec![notice(vec![0.0, 1.0], None), best.clone(), notice(vec![-1.0, 0.0], None)];
	let gateway = Arc::new(FakeGateway::new(pool, &["u1"]));
	let embedding = Arc::new(StubEmbedding::new(vec![1.0, 0.0]));
	let calls = embedding.calls.clone();
	let service = service(gateway.clone(), embedding);

	let outcome = service.execute(&command("u1", 2, 10)).await.expect("execute");

	assert_eq!(outcome.results.len(), 2);
	assert_eq!(outcome.results[0].notice_id, best.notice_id);
	assert_eq!(outcome.added, 2);
	assert_eq!(gateway.favorite_count(), 2);
	// The query is encoded exactly once per command.
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replayed_command_adds_nothing_but_returns_the_same_ids() {
	let pool = vec![notice(vec![1.0, 0.0], None), notice(vec![0.9, 0.1], None)];
	let gateway = Arc::new(FakeGateway::new(pool, &["u1"]));
	let service = service(gateway.clone(), Arc::new(StubEmbedding::new(vec![1.0, 0.0])));
	let command = command("u1", 2, 10);

	let first = service.execute(&command).await.expect("first run");
	let second = service.execute(&command).await.expect("replay");

	assert_eq!(first.added, 2);
	assert_eq!(second.added, 0);
	assert_eq!(first.notice_ids(), second.notice_ids());
	assert_eq!(gateway.favorite_count(), 2);
}

#[tokio::test]
async fn expired_only_excludes_open_ended_and_future_candidates() {
	let now = OffsetDateTime::now_utc();
	let expired = notice(vec![1.0, 0.0], Some(now - Duration::days(30)));
	let pool = vec![
		notice(vec![1.0, 0.0], None),
		notice(vec![1.0, 0.0], Some(now + Duration::days(30))),
		expired.clone(),
	];
	let gateway = Arc::new(FakeGateway::new(pool, &["u1"]));
	let service = service(gateway.clone(), Arc::new(StubEmbedding::new(vec![1.0, 0.0])));

	// No cutoff in the payload, so "now" applies. Only the notice whose
	// collecting end already passed survives; open-ended candidates never
	// count as expired.
	let payload = br#"{"userId": "u1", "query": "q", "expiredOnly": true}"#;
	let command =
		SearchCommand::decode(payload, CommandDefaults { top: 20, limit: 500 }, now)
			.expect("decode");

	let outcome = service.execute(&command).await.expect("execute");

	assert_eq!(outcome.notice_ids(), vec![expired.notice_id]);
}

#[tokio::test]
async fn empty_candidate_pool_is_a_normal_outcome() {
	let gateway = Arc::new(FakeGateway::new(Vec::new(), &["u1"]));
	let service = service(gateway.clone(), Arc::new(StubEmbedding::new(vec![1.0, 0.0])));

	let outcome = service.execute(&command("u1", 5, 50)).await.expect("execute");

	assert_eq!(outcome.added, 0);
	assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn unknown_user_skips_inserts_without_failing_the_command() {
	let pool = vec![notice(vec![1.0, 0.0], None)];
	let gateway = Arc::new(FakeGateway::new(pool, &[]));
	let service = service(gateway.clone(), Arc::new(StubEmbedding::new(vec![1.0, 0.0])));

	let outcome = service.execute(&command("ghost", 1, 10)).await.expect("execute");

	assert_eq!(outcome.added, 0);
	assert_eq!(outcome.results.len(), 1);
	assert_eq!(outcome.results[0].outcome, FavoriteOutcome::UnknownUser);
	assert_eq!(gateway.favorite_count(), 0);
}

#[tokio::test]
async fn transient_store_failures_surface_as_retryable() {
	let mut gateway = FakeGateway::new(Vec::new(), &["u1"]);

	gateway.fail_transient = true;

	let service = service(Arc::new(gateway), Arc::new(StubEmbedding::new(vec![1.0, 0.0])));
	let err = service.execute(&command("u1", 1, 10)).await.expect_err("must fail");

	assert!(matches!(err, Error::TransientStore { .. }));
	assert!(err.is_retryable());
}

#[tokio::test]
async fn embedding_outage_surfaces_as_retryable_encoding_error() {
	let gateway = Arc::new(FakeGateway::new(Vec::new(), &["u1"]));
	let service = service(gateway, Arc::new(FailingEmbedding));

	let err = service.execute(&command("u1", 1, 10)).await.expect_err("must fail");

	assert!(matches!(err, Error::Encoding { .. }));
	assert!(err.is_retryable());
}

#[tokio::test]
async fn dimension_mismatch_is_terminal_not_retryable() {
	let pool = vec![notice(vec![1.0, 0.0, 0.0], None)];
	let gateway = Arc::new(FakeGateway::new(pool, &["u1"]));
	let service = service(gateway, Arc::new(StubEmbedding::new(vec![1.0, 0.0])));

	let err = service.execute(&command("u1", 1, 10)).await.expect_err("must fail");

	assert!(matches!(err, Error::DimensionMismatch { .. }));
	assert!(!err.is_retryable());
}
