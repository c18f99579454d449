//! Candidate Store Gateway: the candidate read path and the idempotent
//! favorite write path.

use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{FavoriteOutcome, NoticeCandidate},
	vector,
};

const CANDIDATES_VALID: &str = "\
SELECT
	n.notice_id,
	n.purchase_number,
	n.entry_name,
	n.purchase_object_info,
	n.collecting_end,
	n.updated_at,
	e.vector
FROM notice_embeddings AS e
INNER JOIN notices AS n ON n.notice_id = e.notice_id
WHERE e.model = $1
	AND (n.collecting_end IS NULL OR n.collecting_end >= $2)
ORDER BY n.updated_at DESC
LIMIT $3";

const CANDIDATES_EXPIRED: &str = "\
SELECT
	n.notice_id,
	n.purchase_number,
	n.entry_name,
	n.purchase_object_info,
	n.collecting_end,
	n.updated_at,
	e.vector
FROM notice_embeddings AS e
INNER JOIN notices AS n ON n.notice_id = e.notice_id
WHERE e.model = $1
	AND n.collecting_end IS NOT NULL
	AND n.collecting_end < $2
ORDER BY n.updated_at DESC
LIMIT $3";

/// Selects the fetch statement for the requested expiry mode. Valid mode keeps
/// open-ended candidates (`collecting_end IS NULL`); expired mode requires a
/// collecting end strictly before the cutoff.
pub fn candidate_query(expired_only: bool) -> &'static str {
	if expired_only { CANDIDATES_EXPIRED } else { CANDIDATES_VALID }
}

/// Fetches up to `limit` candidate rows for `model`, newest first. Ranking is
/// done in-process by the caller, never pushed into SQL, so the semantics stay
/// the same regardless of the backing store's vector support.
pub async fn fetch_candidates(
	db: &Db,
	model: &str,
	cutoff: OffsetDateTime,
	expired_only: bool,
	limit: u32,
) -> Result<Vec<NoticeCandidate>> {
	let rows = sqlx::query(candidate_query(expired_only))
		.bind(model)
		.bind(cutoff)
		.bind(i64::from(limit))
		.fetch_all(&db.pool)
		.await?;
	let mut candidates = Vec::with_capacity(rows.len());

	for row in rows {
		let raw: String = row.try_get("vector")?;

		candidates.push(NoticeCandidate {
			notice_id: row.try_get("notice_id")?,
			purchase_number: row.try_get("purchase_number")?,
			entry_name: row.try_get("entry_name")?,
			purchase_object_info: row.try_get("purchase_object_info")?,
			collecting_end: row.try_get("collecting_end")?,
			updated_at: row.try_get("updated_at")?,
			vector: vector::parse_vector(&raw)?,
		});
	}

	Ok(candidates)
}

/// Idempotent favorite insert: check-then-insert inside one transaction. There
/// is no unique index on `(user_id, notice_id)`, so the transaction is what
/// keeps retries from creating duplicates.
pub async fn upsert_favorite(
	db: &Db,
	user_id: &str,
	notice_id: Uuid,
) -> Result<FavoriteOutcome> {
	let mut tx = db.pool.begin().await?;
	let existing = sqlx::query(
		"SELECT 1 FROM favorite_notices WHERE user_id = $1 AND notice_id = $2 LIMIT 1",
	)
	.bind(user_id)
	.bind(notice_id)
	.fetch_optional(&mut *tx)
	.await?;

	if existing.is_some() {
		tx.commit().await?;

		return Ok(FavoriteOutcome::AlreadyExists);
	}

	let insert = sqlx::query(
		"\
INSERT INTO favorite_notices (favorite_id, user_id, notice_id, created_at)
VALUES ($1, $2, $3, $4)",
	)
	.bind(Uuid::new_v4())
	.bind(user_id)
	.bind(notice_id)
	.bind(OffsetDateTime::now_utc())
	.execute(&mut *tx)
	.await;

	match insert {
		Ok(_) => {
			tx.commit().await?;

			Ok(FavoriteOutcome::Inserted)
		},
		Err(err) if is_foreign_key_violation(&err) => {
			tx.rollback().await?;

			Ok(FavoriteOutcome::UnknownUser)
		},
		Err(err) => Err(err.into()),
	}
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
	matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn valid_mode_keeps_open_ended_candidates() {
		let sql = candidate_query(false);

		assert!(sql.contains("collecting_end IS NULL OR n.collecting_end >= $2"));
	}

	#[test]
	fn expired_mode_requires_a_past_collecting_end() {
		let sql = candidate_query(true);

		assert!(sql.contains("collecting_end IS NOT NULL"));
		assert!(sql.contains("n.collecting_end < $2"));
	}

	#[test]
	fn both_modes_order_by_recency_and_bound_the_pool() {
		for expired_only in [false, true] {
			let sql = candidate_query(expired_only);

			assert!(sql.contains("ORDER BY n.updated_at DESC"));
			assert!(sql.contains("LIMIT $3"));
		}
	}
}
