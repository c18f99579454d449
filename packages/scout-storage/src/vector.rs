//! Storage wire-format for embedding vectors: a JSON array of floats kept in
//! a text column, the same shape the indexing pipeline writes.

use crate::{Error, Result};

pub fn parse_vector(raw: &str) -> Result<Vec<f32>> {
	serde_json::from_str::<Vec<f32>>(raw).map_err(|err| Error::InvalidVector(err.to_string()))
}

pub fn format_vector(vec: &[f32]) -> String {
	let mut out = String::from("[");

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}
