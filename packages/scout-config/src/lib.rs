mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Bus, Config, EmbeddingProviderConfig, Encoder, Postgres, Providers, Search, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.model must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.bus.url.trim().is_empty() {
		return Err(Error::Validation { message: "bus.url must be non-empty.".to_string() });
	}
	if !matches!(cfg.bus.exchange_type.as_str(), "direct" | "fanout" | "topic") {
		return Err(Error::Validation {
			message: "bus.exchange_type must be one of direct, fanout, or topic.".to_string(),
		});
	}

	for (label, value) in [
		("bus.exchange", &cfg.bus.exchange),
		("bus.command_queue", &cfg.bus.command_queue),
		("bus.dead_letter_queue", &cfg.bus.dead_letter_queue),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.bus.command_queue == cfg.bus.dead_letter_queue {
		return Err(Error::Validation {
			message: "bus.dead_letter_queue must differ from bus.command_queue.".to_string(),
		});
	}
	if cfg.bus.prefetch == 0 {
		return Err(Error::Validation {
			message: "bus.prefetch must be greater than zero.".to_string(),
		});
	}
	if cfg.bus.max_delivery_attempts == 0 {
		return Err(Error::Validation {
			message: "bus.max_delivery_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_top == 0 {
		return Err(Error::Validation {
			message: "search.default_top must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit < cfg.search.default_top {
		return Err(Error::Validation {
			message: "search.default_limit must be at least search.default_top.".to_string(),
		});
	}
	if let Some(encoder) = cfg.encoder.as_ref()
		&& encoder.http_bind.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "encoder.http_bind must be non-empty when the encoder section is present."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let path = cfg.providers.embedding.path.trim().to_string();

	if !path.is_empty() && !path.starts_with('/') {
		cfg.providers.embedding.path = format!("/{path}");
	}
}
