use axum::{
	Json, Router,
	extract::{Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/encode", post(encode_batch).get(encode_single))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Serialize)]
struct EncodeResponse {
	#[serde(rename = "serviceId", skip_serializing_if = "Option::is_none")]
	service_id: Option<String>,
	items: Vec<EncodedItem>,
	errors: Vec<ItemError>,
}

#[derive(Debug, Serialize)]
struct EncodedItem {
	id: String,
	string: String,
	vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ItemError {
	index: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	id: Option<String>,
	message: String,
}

/// Encodes every well-formed item of the batch in one provider call. Items
/// missing an id or a text are reported in `errors` and the rest of the batch
/// still succeeds; ordering and id association of the valid items are
/// preserved.
async fn encode_batch(
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Result<Json<EncodeResponse>, ApiError> {
	let Value::Object(fields) = payload else {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Request body must be a JSON object.",
		));
	};
	let service_id = string_field(&fields, &["serviceid"]);
	let Some(Value::Array(raw_items)) = lookup(&fields, &["items"]) else {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Request must carry an `items` array.",
		));
	};

	let mut valid = Vec::new();
	let mut errors = Vec::new();

	for (index, raw) in raw_items.iter().enumerate() {
		let Value::Object(item) = raw else {
			errors.push(ItemError {
				index,
				id: None,
				message: "Item must be a JSON object.".to_string(),
			});

			continue;
		};
		let id = string_field(item, &["id"]);
		let text = string_field(item, &["string", "query", "text"]);

		match (id, text) {
			(Some(id), Some(text)) => valid.push((index, id, text)),
			(None, _) => errors.push(ItemError {
				index,
				id: None,
				message: "Item is missing a non-empty `id`.".to_string(),
			}),
			(id, None) => errors.push(ItemError {
				index,
				id,
				message: "Item is missing a non-empty `string`.".to_string(),
			}),
		}
	}

	let mut items = Vec::with_capacity(valid.len());

	if !valid.is_empty() {
		let texts = valid.iter().map(|(_, _, text)| text.clone()).collect::<Vec<_>>();
		let vectors = state.embedding.embed(&texts).await.map_err(|err| {
			tracing::error!(error = %err, "Batch encode failed at the provider.");

			ApiError::new(StatusCode::BAD_GATEWAY, "encoding_failed", err.to_string())
		})?;

		for ((_, id, text), vector) in valid.into_iter().zip(vectors) {
			items.push(EncodedItem { id, string: text, vector });
		}
	}

	tracing::info!(
		encoded = items.len(),
		rejected = errors.len(),
		"Processed encode batch."
	);

	Ok(Json(EncodeResponse { service_id, items, errors }))
}

#[derive(Debug, Deserialize)]
struct SingleQuery {
	query: Option<String>,
}

#[derive(Debug, Serialize)]
struct SingleResponse {
	vector: Vec<f32>,
}

/// Single-string convenience route: `GET /v1/encode?query=...`.
async fn encode_single(
	State(state): State<AppState>,
	Query(params): Query<SingleQuery>,
) -> Result<Json<SingleResponse>, ApiError> {
	let query = params.query.as_deref().map(str::trim).unwrap_or_default();

	if query.is_empty() {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"The `query` parameter is required.",
		));
	}

	let texts = [query.to_string()];
	let mut vectors = state.embedding.embed(&texts).await.map_err(|err| {
		tracing::error!(error = %err, "Encode failed at the provider.");

		ApiError::new(StatusCode::BAD_GATEWAY, "encoding_failed", err.to_string())
	})?;
	let Some(vector) = vectors.pop() else {
		return Err(ApiError::new(
			StatusCode::BAD_GATEWAY,
			"encoding_failed",
			"Provider returned no vector.",
		));
	};

	Ok(Json(SingleResponse { vector }))
}

/// Case-insensitive key lookup, so `Id`, `ID` and `id` all resolve.
fn lookup<'a>(fields: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
	fields.iter().find_map(|(key, value)| {
		let key = key.to_ascii_lowercase();

		aliases.contains(&key.as_str()).then_some(value)
	})
}

fn string_field(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
	let value = lookup(fields, aliases)?.as_str()?.trim();

	(!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
