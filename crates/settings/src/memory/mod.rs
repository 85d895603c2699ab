//! Schema-driven in-memory store.
//!
//! A [`MemoryStore`] declares its keys (with optional defaults) through a
//! [`StoreSchema`]. Unscoped stores hold a single value set, which suits
//! global defaults. Scoped stores hold one value set per scope id, read from
//! the params under the schema's scope name (`forum_id`, `usergroup_ids`).
//!
//! When params carry several ids for the scope (a user in several groups),
//! the per-id values are reduced with [`merge_values`] before the store
//! answers, so the store still reports one contribution per key.

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;

use crate::merge::{Contribution, MergeValue, merge_values};
use crate::params::ScopeLookup;
use crate::store::{GetOptions, SettingsStore, StoreError, StoreUpdate, StoreValues};


/// Row id used by unscoped stores.
const UNSCOPED: &str = "";

/// Declaration of one key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "V: Deserialize<'de>"))]
pub struct KeySchema<V = bool> {
	pub name: String,
	/// Regular contribution used when nothing is stored for the key.
	#[serde(default)]
	pub default: Option<V>,
}

/// Shape of a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema<V = bool> {
	/// Params scope this store is keyed by; `None` for a global store.
	pub scope: Option<String>,
	pub keys: Vec<KeySchema<V>>,
}

impl<V> StoreSchema<V> {
	pub fn unscoped() -> Self {
		Self { scope: None, keys: Vec::new() }
	}

	pub fn scoped(scope: impl Into<String>) -> Self {
		Self {
			scope: Some(scope.into()),
			keys: Vec::new(),
		}
	}

	pub fn key(mut self, name: impl Into<String>) -> Self {
		self.keys.push(KeySchema {
			name: name.into(),
			default: None,
		});
		self
	}

	pub fn key_with_default(mut self, name: impl Into<String>, default: V) -> Self {
		self.keys.push(KeySchema {
			name: name.into(),
			default: Some(default),
		});
		self
	}
}

/// Settings store kept in process memory.
pub struct MemoryStore<V = bool> {
	scope: Option<String>,
	keys: Vec<String>,
	defaults: HashMap<String, Option<V>>,
	/// Scope id -> key -> stored contribution.
	rows: RwLock<HashMap<String, HashMap<String, Contribution<V>>>>,
}

impl<V: MergeValue> MemoryStore<V> {
	pub fn new(schema: StoreSchema<V>) -> Self {
		let keys = schema.keys.iter().map(|k| k.name.clone()).collect();
		let defaults = schema.keys.into_iter().map(|k| (k.name, k.default)).collect();
		Self {
			scope: schema.scope,
			keys,
			defaults,
			rows: RwLock::new(HashMap::default()),
		}
	}

	pub fn scope(&self) -> Option<&str> {
		self.scope.as_deref()
	}

	/// Stores one contribution directly, for seeding at startup.
	///
	/// Scoped stores need a `scope_id`; unscoped stores reject one.
	pub fn insert(&self, scope_id: Option<&str>, key: &str, contribution: Contribution<V>) -> Result<(), StoreError> {
		self.check_key(key)?;
		let row = match (&self.scope, scope_id) {
			(Some(_), Some(id)) => id,
			(None, None) => UNSCOPED,
			(Some(scope), None) => return Err(StoreError::MissingScope { scope: scope.clone() }),
			(None, Some(id)) => return Err(StoreError::UnexpectedScope(id.to_string())),
		};
		self.rows.write().entry(row.to_string()).or_default().insert(key.to_string(), contribution);
		Ok(())
	}

	fn check_key(&self, key: &str) -> Result<(), StoreError> {
		if self.defaults.contains_key(key) {
			Ok(())
		} else {
			Err(StoreError::UnknownKey(key.to_string()))
		}
	}

	/// Row ids that apply to `params`.
	fn rows_for<'p, P: ScopeLookup>(&self, params: &'p P) -> Vec<&'p str> {
		match &self.scope {
			Some(scope) => params.scope_ids(scope).iter().map(String::as_str).collect(),
			None => vec![UNSCOPED],
		}
	}

	fn lookup<P: ScopeLookup>(&self, keys: &[String], params: &P) -> Result<StoreValues<V>, StoreError> {
		let row_ids = self.rows_for(params);
		let rows = self.rows.read();
		let mut values = StoreValues::with_capacity_and_hasher(keys.len(), Default::default());

		for key in keys {
			let default = self.defaults.get(key.as_str()).ok_or_else(|| StoreError::UnknownKey(key.clone()))?;
			let answer = if row_ids.is_empty() {
				None
			} else {
				let stored = row_ids.iter().map(|id| rows.get(*id).and_then(|row| row.get(key.as_str())).cloned());
				merge_values(stored).or_else(|| default.clone().map(Contribution::regular))
			};
			values.insert(key.clone(), answer);
		}
		Ok(values)
	}

	fn write<P: ScopeLookup>(&self, values: &StoreUpdate<V>, params: &P) -> Result<(), StoreError> {
		for key in values.keys() {
			self.check_key(key)?;
		}
		let row_ids = self.rows_for(params);
		if let Some(scope) = &self.scope
			&& row_ids.is_empty()
		{
			return Err(StoreError::MissingScope { scope: scope.clone() });
		}

		let mut rows = self.rows.write();
		for id in row_ids {
			let row = rows.entry(id.to_string()).or_default();
			for (key, contribution) in values {
				row.insert(key.clone(), contribution.clone());
			}
		}
		Ok(())
	}
}

#[async_trait]
impl<P, V> SettingsStore<P, V> for MemoryStore<V>
where
	P: ScopeLookup + Send + Sync,
	V: MergeValue,
{
	fn keys(&self) -> &[String] {
		&self.keys
	}

	async fn get(&self, keys: &[String], params: &P, options: &GetOptions) -> Result<StoreValues<V>, StoreError> {
		if options.skip_cache || options.cache.is_some() {
			tracing::trace!(skip_cache = options.skip_cache, "settings.memory.cache_ignored");
		}
		self.lookup(keys, params)
	}

	async fn set(&self, values: &StoreUpdate<V>, params: &P) -> Result<(), StoreError> {
		self.write(values, params)?;
		tracing::debug!(keys = values.len(), scope = ?self.scope, "settings.memory.set");
		Ok(())
	}
}
