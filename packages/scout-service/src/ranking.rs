//! Pure similarity ranking over a fetched candidate pool. No I/O here so the
//! ordering and tie-breaking rules are testable in isolation.

use scout_storage::models::NoticeCandidate;

use crate::{Error, Result};

/// Norms are floored here so degenerate zero vectors score 0 instead of
/// dividing by zero.
const NORM_EPSILON: f32 = 1e-12;

/// One ranked candidate. `rank` is 1-based and stable for a given pool.
#[derive(Debug, Clone)]
pub struct Scored<'a> {
	pub candidate: &'a NoticeCandidate,
	pub score: f32,
	pub rank: u32,
}

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
	let mut dot = 0.0_f32;
	let mut query_norm = 0.0_f32;
	let mut candidate_norm = 0.0_f32;

	for (q, c) in query.iter().zip(candidate.iter()) {
		dot += q * c;
		query_norm += q * q;
		candidate_norm += c * c;
	}

	let denominator =
		query_norm.sqrt().max(NORM_EPSILON) * candidate_norm.sqrt().max(NORM_EPSILON);

	(dot / denominator).clamp(-1.0, 1.0)
}

/// Scores every candidate against the query and keeps the best `top`, ordered
/// by score descending with ties broken by candidate recency descending. An
/// empty pool yields an empty ranking, not an error; a dimension mismatch is a
/// contract violation and fails loudly.
pub fn rank<'a>(
	query: &[f32],
	candidates: &'a [NoticeCandidate],
	top: u32,
) -> Result<Vec<Scored<'a>>> {
	for candidate in candidates {
		if candidate.vector.len() != query.len() {
			return Err(Error::DimensionMismatch {
				query_dim: query.len(),
				candidate_dim: candidate.vector.len(),
				notice_id: candidate.notice_id,
			});
		}
	}

	let mut scored: Vec<Scored<'a>> = candidates
		.iter()
		.map(|candidate| Scored {
			candidate,
			score: cosine_similarity(query, &candidate.vector),
			rank: 0,
		})
		.collect();

	scored.sort_by(|a, b| {
		b.score
			.total_cmp(&a.score)
			.then_with(|| b.candidate.updated_at.cmp(&a.candidate.updated_at))
	});
	scored.truncate(top as usize);

	for (idx, entry) in scored.iter_mut().enumerate() {
		entry.rank = idx as u32 + 1;
	}

	Ok(scored)
}
