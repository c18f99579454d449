use time::OffsetDateTime;
use uuid::Uuid;

/// A stored notice eligible for similarity comparison. Read fresh per command;
/// never cached across commands. The display columns ride along for logging
/// and play no part in ranking.
#[derive(Debug, Clone)]
pub struct NoticeCandidate {
	pub notice_id: Uuid,
	pub purchase_number: String,
	pub entry_name: Option<String>,
	pub purchase_object_info: Option<String>,
	pub collecting_end: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
	pub vector: Vec<f32>,
}

/// Result of one favorite insert attempt. `UnknownUser` is an expected
/// condition (the user id is owned by an external identity system), not a
/// defect; callers skip the entity and keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
	Inserted,
	AlreadyExists,
	UnknownUser,
}
