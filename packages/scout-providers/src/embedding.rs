use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use scout_config::EmbeddingProviderConfig;

use crate::{Error, Result, auth_headers};

/// Long-lived embedding client. Built once at startup and shared read-only by
/// every command and by the encode endpoint; the underlying `reqwest::Client`
/// is already an `Arc` over its connection pool.
pub struct EmbeddingClient {
	cfg: EmbeddingProviderConfig,
	client: Client,
	url: String,
}

impl EmbeddingClient {
	pub fn new(cfg: EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let url = format!("{}{}", cfg.api_base, cfg.path);

		Ok(Self { cfg, client, url })
	}

	pub fn dimensions(&self) -> u32 {
		self.cfg.dimensions
	}

	pub fn model(&self) -> &str {
		&self.cfg.model
	}

	/// Embeds a batch of texts, preserving input order.
	pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": texts,
			"dimensions": self.cfg.dimensions,
		});
		let res = self
			.client
			.post(&self.url)
			.headers(auth_headers(&self.cfg.api_key, &self.cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		let vectors = parse_embedding_response(json)?;

		if vectors.len() != texts.len() {
			return Err(Error::InvalidResponse {
				message: format!(
					"Provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		for vector in &vectors {
			if vector.len() != self.cfg.dimensions as usize {
				return Err(Error::InvalidResponse {
					message: format!(
						"Provider returned a {}-dimensional vector where {} was configured.",
						vector.len(),
						self.cfg.dimensions
					),
				});
			}
		}

		Ok(vectors)
	}

	pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embed(&[text.to_string()]).await?;

		vectors.pop().ok_or_else(|| Error::InvalidResponse {
			message: "Provider returned an empty batch for a single input.".to_string(),
		})
	}

	/// Startup readiness check. Failure here means the process must refuse to
	/// start rather than discover a dead provider on the first command.
	pub async fn probe(&self) -> Result<()> {
		self.embed_one("readiness probe").await.map(|_| ())
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn missing_data_array_is_rejected() {
		let json = serde_json::json!({ "error": "boom" });
		let err = parse_embedding_response(json).expect_err("must reject");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn non_numeric_values_are_rejected() {
		let json = serde_json::json!({
			"data": [{ "index": 0, "embedding": [1.0, "x"] }]
		});
		let err = parse_embedding_response(json).expect_err("must reject");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}
}
