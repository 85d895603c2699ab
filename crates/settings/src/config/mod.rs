//! TOML configuration for a settings registry.
//!
//! A config file declares resolver options and a list of schema stores, each
//! optionally seeded with values:
//!
//! ```toml
//! [resolver]
//! query_timeout_ms = 2000
//!
//! [[store]]
//! name = "global"
//! keys = [
//!     { name = "forum_can_view", default = true },
//!     { name = "forum_can_reply", default = false },
//! ]
//!
//! [[store]]
//! name = "usergroup"
//! scope = "usergroup_ids"
//! keys = [{ name = "forum_can_reply" }]
//!
//! [[store.value]]
//! scope_id = "members"
//! key = "forum_can_reply"
//! value = true
//! ```
//!
//! Stores are registered in file order, which is also the order they are
//! reported in by [`SettingsRegistry::iter`](crate::SettingsRegistry::iter).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::error::SettingsError;
use crate::memory::{KeySchema, StoreSchema};
use crate::merge::{Contribution, MergeValue};
use crate::params::Params;
use crate::resolver::Settings;
use crate::store::StoreError;


/// Errors that can occur when loading a settings configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A seeded value was rejected by its store.
	#[error("store `{store}`: {source}")]
	Seed {
		store: String,
		#[source]
		source: StoreError,
	},

	/// A store could not be registered.
	#[error(transparent)]
	Settings(#[from] SettingsError),
}

/// Parsed settings configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "V: Deserialize<'de>"))]
pub struct SettingsConfig<V = bool> {
	#[serde(default)]
	pub resolver: ResolverConfig,
	#[serde(default, rename = "store")]
	pub stores: Vec<StoreConfig<V>>,
}

/// Resolver tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
	/// Per-store query time limit in milliseconds; unlimited when absent.
	#[serde(default)]
	pub query_timeout_ms: Option<u64>,
}

/// One schema store.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "V: Deserialize<'de>"))]
pub struct StoreConfig<V = bool> {
	pub name: String,
	#[serde(default)]
	pub scope: Option<String>,
	pub keys: Vec<KeySchema<V>>,
	#[serde(default, rename = "value")]
	pub values: Vec<SeedValue<V>>,
}

/// A value stored at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedValue<V = bool> {
	#[serde(default)]
	pub scope_id: Option<String>,
	pub key: String,
	pub value: V,
	#[serde(default)]
	pub forced: bool,
}

impl<V: Clone> StoreConfig<V> {
	pub fn schema(&self) -> StoreSchema<V> {
		StoreSchema {
			scope: self.scope.clone(),
			keys: self.keys.clone(),
		}
	}
}

impl<V> SettingsConfig<V>
where
	V: for<'de> Deserialize<'de>,
{
	/// Parses a TOML string.
	pub fn parse(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&input)
	}
}

impl<V: MergeValue> SettingsConfig<V> {
	pub fn query_timeout(&self) -> Option<Duration> {
		self.resolver.query_timeout_ms.map(Duration::from_millis)
	}
}

impl<V: MergeValue> Settings<Params, V> {
	/// Builds and registers every store declared in `config`.
	pub fn from_config(config: &SettingsConfig<V>) -> Result<Self, ConfigError> {
		let mut settings = Self::new();
		if let Some(timeout) = config.query_timeout() {
			settings = settings.with_query_timeout(timeout);
		}

		for store_config in &config.stores {
			let store = settings.create_store(store_config.schema());
			for seed in &store_config.values {
				let contribution = Contribution {
					value: seed.value.clone(),
					forced: seed.forced,
				};
				store
					.insert(seed.scope_id.as_deref(), &seed.key, contribution)
					.map_err(|source| ConfigError::Seed {
						store: store_config.name.clone(),
						source,
					})?;
			}
			settings.add_store(store_config.name.as_str(), Arc::new(store))?;
		}

		tracing::debug!(stores = settings.registry().len(), "settings.config.loaded");
		Ok(settings)
	}
}
