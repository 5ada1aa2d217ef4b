//! Sync tuning loaded from TOML.
//!
//! ```toml
//! ack-timeout-ms = 2000
//! backoff-factor = 2
//! max-backoff-ms = 30000
//! max-retries = 5
//! tie-break = "replica-id"
//! cursor-throttle-ms = 60
//! ```
//!
//! Every key is optional; missing keys fall back to [`SyncConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or fields.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid sync config: {0}")]
	Invalid(String),
}

/// How same-position insertions from two replicas are ordered.
///
/// The local operation takes [`Priority::Left`](quill_primitives::Priority)
/// only when this says so. Under the plain "local wins" rule both replicas
/// put their own insert first, so `X` and `Y` typed at the same spot of
/// `"ab"` end as `"aXYb"` on one side and `"aYXb"` on the other. The default
/// orders by replica id instead, which every replica evaluates the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
	/// The replica with the smaller id goes first, on every replica.
	#[default]
	ReplicaId,
	/// The receiving replica's own insertion always goes first.
	///
	/// Each replica prefers itself, so concurrent same-position inserts can
	/// land in different orders; the full-text fallback repairs them later.
	LocalFirst,
}

/// Tuning knobs for document bindings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SyncConfig {
	/// Time to wait for the echo of a send before retransmitting.
	pub ack_timeout_ms: u64,
	/// Multiplier applied to the wait after each retransmission.
	pub backoff_factor: u32,
	/// Upper bound on the wait between retransmissions.
	pub max_backoff_ms: u64,
	/// Retransmissions before a binding reports itself stalled.
	pub max_retries: u32,
	/// Ordering of concurrent same-position insertions.
	pub tie_break: TieBreak,
	/// Minimum interval between local cursor broadcasts.
	pub cursor_throttle_ms: u64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			ack_timeout_ms: 2_000,
			backoff_factor: 2,
			max_backoff_ms: 30_000,
			max_retries: 5,
			tie_break: TieBreak::ReplicaId,
			cursor_throttle_ms: 60,
		}
	}
}

impl SyncConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.ack_timeout_ms == 0 {
			return Err(ConfigError::Invalid("ack-timeout-ms must be positive".into()));
		}
		if self.backoff_factor == 0 {
			return Err(ConfigError::Invalid("backoff-factor must be at least 1".into()));
		}
		if self.max_backoff_ms < self.ack_timeout_ms {
			return Err(ConfigError::Invalid(
				"max-backoff-ms must not be below ack-timeout-ms".into(),
			));
		}
		Ok(())
	}

	/// Wait before the retransmission following `attempts` earlier ones.
	pub fn retry_delay(&self, attempts: u32) -> Duration {
		let factor = u64::from(self.backoff_factor).saturating_pow(attempts);
		Duration::from_millis(
			self.ack_timeout_ms
				.saturating_mul(factor)
				.min(self.max_backoff_ms),
		)
	}

	/// Minimum interval between local cursor broadcasts.
	pub fn cursor_throttle(&self) -> Duration {
		Duration::from_millis(self.cursor_throttle_ms)
	}
}
