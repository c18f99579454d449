use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub bus: Bus,
	pub search: Search,
	pub encoder: Option<Encoder>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// AMQP topology and redelivery policy for the command consumer.
#[derive(Debug, Clone, Deserialize)]
pub struct Bus {
	pub url: String,
	pub exchange: String,
	#[serde(default = "default_exchange_type")]
	pub exchange_type: String,
	pub command_queue: String,
	pub dead_letter_queue: String,
	#[serde(default = "default_prefetch")]
	pub prefetch: u16,
	#[serde(default = "default_reconnect_delay_ms")]
	pub reconnect_delay_ms: u64,
	#[serde(default = "default_max_delivery_attempts")]
	pub max_delivery_attempts: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Search {
	#[serde(default = "default_top")]
	pub default_top: u32,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct Encoder {
	pub http_bind: String,
}

fn default_exchange_type() -> String {
	"direct".to_string()
}

fn default_prefetch() -> u16 {
	1
}

fn default_reconnect_delay_ms() -> u64 {
	5_000
}

fn default_max_delivery_attempts() -> u32 {
	5
}

fn default_top() -> u32 {
	20
}

fn default_limit() -> u32 {
	500
}
