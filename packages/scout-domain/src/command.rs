use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, Result};

/// Every accepted spelling per field, as data. Producers vary between camel
/// case, Pascal case, and snake case, so lookup compares case-insensitively
/// with underscores stripped.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
	("userId", &["userId", "UserId", "user_id", "userid"]),
	("query", &["query", "Query"]),
	("collectingEndLimit", &["collectingEndLimit", "CollectingEndLimit", "collecting_end_limit"]),
	("expiredOnly", &["expiredOnly", "ExpiredOnly", "expired_only"]),
	("top", &["top", "Top"]),
	("limit", &["limit", "Limit"]),
];

/// A validated favorite-search command. Built once per inbound message and
/// discarded after processing; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCommand {
	pub user_id: String,
	pub query: String,
	pub collecting_end_limit: OffsetDateTime,
	pub expired_only: bool,
	pub top: u32,
	pub limit: u32,
}

impl SearchCommand {
	/// Decodes a raw message payload. `now` is the fallback cutoff when the
	/// payload carries none, passed in so decoding stays deterministic.
	///
	/// `top` below 1 is clamped to 1 and `limit` is clamped up to `top`,
	/// matching the defaults applied by the command producers.
	pub fn decode(
		payload: &[u8],
		defaults: CommandDefaults,
		now: OffsetDateTime,
	) -> Result<Self> {
		let value: Value = serde_json::from_slice(payload)
			.map_err(|err| Error::MalformedCommand { message: err.to_string() })?;
		let Value::Object(fields) = value else {
			return Err(Error::MalformedCommand {
				message: "top-level payload must be a JSON object".to_string(),
			});
		};

		let user_id = required_string(&fields, "userId")?;
		let query = required_string(&fields, "query")?;
		let collecting_end_limit = match lookup(&fields, "collectingEndLimit") {
			None | Some(Value::Null) => now,
			Some(value) => parse_timestamp("collectingEndLimit", value)?,
		};
		let expired_only = match lookup(&fields, "expiredOnly") {
			None | Some(Value::Null) => false,
			Some(value) => parse_bool("expiredOnly", value)?,
		};
		let top = parse_count("top", lookup(&fields, "top"), defaults.top)?.max(1);
		let limit = parse_count("limit", lookup(&fields, "limit"), defaults.limit)?.max(top);

		Ok(Self { user_id, query, collecting_end_limit, expired_only, top, limit })
	}
}

/// Fallbacks for the optional bounds, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct CommandDefaults {
	pub top: u32,
	pub limit: u32,
}

fn lookup<'a>(fields: &'a Map<String, Value>, canonical: &str) -> Option<&'a Value> {
	let aliases = FIELD_ALIASES
		.iter()
		.find(|(name, _)| *name == canonical)
		.map(|(_, aliases)| *aliases)
		.unwrap_or(&[]);

	fields.iter().find_map(|(key, value)| {
		let normalized = normalize_key(key);

		aliases.iter().any(|alias| normalize_key(alias) == normalized).then_some(value)
	})
}

fn normalize_key(key: &str) -> String {
	key.chars().filter(|c| *c != '_').flat_map(char::to_lowercase).collect()
}

fn required_string(
	fields: &Map<String, Value>,
	field: &'static str,
) -> Result<String> {
	let value = match lookup(fields, field) {
		None | Some(Value::Null) => return Err(Error::MissingField { field }),
		Some(value) => value,
	};
	let Value::String(raw) = value else {
		return Err(Error::InvalidField {
			field,
			value: value.to_string(),
			expected: "a string",
		});
	};
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Err(Error::MissingField { field });
	}

	Ok(trimmed.to_string())
}

fn parse_timestamp(field: &'static str, value: &Value) -> Result<OffsetDateTime> {
	let Value::String(raw) = value else {
		return Err(Error::InvalidTimestamp { field, value: value.to_string() });
	};

	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|_| Error::InvalidTimestamp { field, value: raw.clone() })
}

fn parse_bool(field: &'static str, value: &Value) -> Result<bool> {
	match value {
		Value::Bool(flag) => Ok(*flag),
		Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
			"true" => Ok(true),
			"false" => Ok(false),
			_ => Err(Error::InvalidField {
				field,
				value: raw.clone(),
				expected: "a boolean",
			}),
		},
		other => Err(Error::InvalidField {
			field,
			value: other.to_string(),
			expected: "a boolean",
		}),
	}
}

fn parse_count(field: &'static str, value: Option<&Value>, default: u32) -> Result<u32> {
	let value = match value {
		None | Some(Value::Null) => return Ok(default),
		Some(value) => value,
	};

	let parsed = match value {
		Value::Number(number) => number.as_i64(),
		Value::String(raw) => raw.trim().parse::<i64>().ok(),
		_ => None,
	};
	let Some(parsed) = parsed else {
		return Err(Error::InvalidField {
			field,
			value: value.to_string(),
			expected: "an integer",
		});
	};

	// Negative bounds are clamped rather than rejected; the consumer treats
	// them like "smallest sensible request".
	Ok(parsed.max(0).min(i64::from(u32::MAX)) as u32)
}
