//! Batched resolution across stores.
//!
//! [`Settings`] owns the registry and answers lookups by querying every store
//! that owns a requested key, concurrently, then merging the answers per key.
//!
//! # Resolution Order
//!
//! 1. Every requested key is looked up in the registry. Unknown keys fail the
//!    whole batch before any store is queried; all of them are reported.
//! 2. One query per distinct store is spawned, carrying only the keys that
//!    store owns.
//! 3. Queries are joined. The first failure aborts the rest and fails the
//!    batch.
//! 4. The answers for each key are reduced with [`merge_values`]; keys nobody
//!    answered fail the batch.

use std::sync::Arc;
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use palaver_worker::{TaskId, WorkerJoinSet, join_error_panic_message};
use rustc_hash::FxHashMap as HashMap;

use crate::error::{Result, SettingsError};
use crate::memory::{MemoryStore, StoreSchema};
use crate::merge::{Contribution, MergeValue, merge_values};
use crate::params::{Params, ScopeLookup};
use crate::registry::{SettingsRegistry, StoreRef};
use crate::store::{GetOptions, SettingsStore, StoreError, StoreUpdate, StoreValues};


/// Keys to fetch, grouped by the store that answers them.
type QueryPlan<P, V> = IndexMap<Arc<str>, (StoreRef<P, V>, Vec<String>)>;

/// Settings manager: the store registry plus batched resolution on top of it.
///
/// Registration takes `&mut self` and happens at startup; lookups take
/// `&self` and may run concurrently.
pub struct Settings<P = Params, V = bool> {
	registry: SettingsRegistry<P, V>,
	query_timeout: Option<Duration>,
}

impl<P, V> Default for Settings<P, V> {
	fn default() -> Self {
		Self {
			registry: SettingsRegistry::default(),
			query_timeout: None,
		}
	}
}

impl<P, V> Settings<P, V>
where
	P: Send + Sync + 'static,
	V: MergeValue,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Fails any store query that takes longer than `timeout`.
	pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
		self.query_timeout = Some(timeout);
		self
	}

	pub fn query_timeout(&self) -> Option<Duration> {
		self.query_timeout
	}

	pub fn registry(&self) -> &SettingsRegistry<P, V> {
		&self.registry
	}

	/// Registers `store` under `name`. See [`SettingsRegistry::add_store`].
	pub fn add_store<S>(&mut self, name: impl Into<Arc<str>>, store: Arc<S>) -> Result<()>
	where
		S: SettingsStore<P, V> + 'static,
	{
		self.registry.add_store(name, store)
	}

	/// Registers an already type-erased store.
	pub fn add_shared_store(&mut self, name: impl Into<Arc<str>>, store: Arc<dyn SettingsStore<P, V>>) -> Result<()> {
		self.registry.add_shared_store(name, store)
	}

	pub fn get_store(&self, name: &str) -> Option<StoreRef<P, V>> {
		self.registry.get_store(name)
	}

	/// Owned copy of the stores declaring `key`.
	pub fn stores_for_key(&self, key: &str) -> Vec<StoreRef<P, V>> {
		self.registry.stores_for_key(key)
	}

	/// See [`merge_values`].
	pub fn merge_values<I>(records: I) -> Option<Contribution<V>>
	where
		I: IntoIterator<Item = Option<Contribution<V>>>,
	{
		merge_values(records)
	}

	/// Resolves a single key.
	pub async fn get(&self, key: &str, params: impl Into<Arc<P>>, options: &GetOptions) -> Result<V> {
		let resolved = self.get_many_detailed(&[key], params, options).await?;
		resolved
			.into_values()
			.next()
			.map(|contribution| contribution.value)
			.ok_or_else(|| SettingsError::UnresolvedValue { keys: vec![key.to_string()] })
	}

	/// Resolves a batch of keys, all or nothing.
	///
	/// The result follows request order; repeated keys appear once.
	pub async fn get_many<K>(&self, keys: &[K], params: impl Into<Arc<P>>, options: &GetOptions) -> Result<IndexMap<String, V>>
	where
		K: AsRef<str>,
	{
		let resolved = self.get_many_detailed(keys, params, options).await?;
		Ok(resolved.into_iter().map(|(key, contribution)| (key, contribution.value)).collect())
	}

	/// Like [`get_many`](Self::get_many), but keeps whether each value was forced.
	pub async fn get_many_detailed<K>(
		&self,
		keys: &[K],
		params: impl Into<Arc<P>>,
		options: &GetOptions,
	) -> Result<IndexMap<String, Contribution<V>>>
	where
		K: AsRef<str>,
	{
		let requested: IndexSet<&str> = keys.iter().map(AsRef::as_ref).collect();
		let plan = self.plan(&requested)?;
		let responses = self.query(plan, params.into(), options).await?;

		let mut collected: IndexMap<&str, Vec<Option<Contribution<V>>>> =
			requested.iter().map(|&key| (key, Vec::new())).collect();
		for (store, asked, mut values) in responses {
			for key in asked {
				let record = values.remove(&key);
				if record.is_none() {
					tracing::trace!(store = %store, key = %key, "settings.get.missing_answer");
				}
				if let Some(records) = collected.get_mut(key.as_str()) {
					records.push(record.flatten());
				}
			}
		}

		let mut resolved = IndexMap::with_capacity(collected.len());
		let mut unresolved = Vec::new();
		for (key, records) in collected {
			match merge_values(records) {
				Some(contribution) => {
					resolved.insert(key.to_string(), contribution);
				}
				None => unresolved.push(key.to_string()),
			}
		}

		if !unresolved.is_empty() {
			tracing::warn!(keys = ?unresolved, "settings.get.unresolved");
			return Err(SettingsError::UnresolvedValue { keys: unresolved });
		}
		Ok(resolved)
	}

	/// Persists `values` through the store registered as `store_name`.
	///
	/// No atomicity is offered across stores: values owned by several stores
	/// need one call per store.
	pub async fn set(&self, store_name: &str, values: &StoreUpdate<V>, params: &P) -> Result<()> {
		let store = self
			.registry
			.get_store(store_name)
			.ok_or_else(|| SettingsError::UnknownStore(store_name.to_string()))?;

		store.store().set(values, params).await.map_err(|source| {
			tracing::warn!(store = %store_name, error = %source, "settings.set.failed");
			SettingsError::StoreQueryFailure {
				store: store_name.to_string(),
				source,
			}
		})
	}

	/// Groups the requested keys per owning store.
	fn plan(&self, requested: &IndexSet<&str>) -> Result<QueryPlan<P, V>> {
		let mut plan = QueryPlan::new();
		let mut unknown = Vec::new();

		for &key in requested {
			let owners = self.registry.owners(key);
			if owners.is_empty() {
				unknown.push(key.to_string());
				continue;
			}
			for store in owners {
				plan.entry(store.shared_name())
					.or_insert_with(|| (store.clone(), Vec::new()))
					.1
					.push(key.to_string());
			}
		}

		if !unknown.is_empty() {
			tracing::warn!(keys = ?unknown, "settings.get.unknown_keys");
			return Err(SettingsError::UnknownKey { keys: unknown });
		}
		Ok(plan)
	}

	/// Runs one query per planned store and joins them, failing fast.
	async fn query(
		&self,
		plan: QueryPlan<P, V>,
		params: Arc<P>,
		options: &GetOptions,
	) -> Result<Vec<(Arc<str>, Vec<String>, StoreValues<V>)>> {
		let mut queries = WorkerJoinSet::new("settings.get");
		let mut names: HashMap<TaskId, Arc<str>> = HashMap::default();

		for (name, (store, keys)) in plan {
			tracing::trace!(store = %name, keys = ?keys, "settings.get.query");
			let params = Arc::clone(&params);
			let options = options.clone();
			let timeout = self.query_timeout;
			let id = queries.spawn(async move {
				let query = store.store().get(&keys, &params, &options);
				let answer = match timeout {
					Some(limit) => tokio::time::timeout(limit, query)
						.await
						.unwrap_or(Err(StoreError::TimedOut(limit))),
					None => query.await,
				};
				match answer {
					Ok(values) => Ok((store.shared_name(), keys, values)),
					Err(source) => Err(SettingsError::StoreQueryFailure {
						store: store.name().to_string(),
						source,
					}),
				}
			});
			names.insert(id, name);
		}

		queries
			.try_join_all(|err| {
				let store = names.get(&err.id()).map(|name| name.to_string()).unwrap_or_default();
				let reason = join_error_panic_message(err).unwrap_or_else(|| "cancelled".to_string());
				SettingsError::StoreQueryFailure {
					store,
					source: StoreError::Aborted(reason),
				}
			})
			.await
			.inspect_err(|err| tracing::warn!(error = %err, "settings.get.failed"))
	}
}

impl<P, V> Settings<P, V>
where
	P: ScopeLookup + Send + Sync + 'static,
	V: MergeValue,
{
	/// Builds a schema-driven in-memory store; register it with
	/// [`add_store`](Self::add_store).
	pub fn create_store(&self, schema: StoreSchema<V>) -> MemoryStore<V> {
		MemoryStore::new(schema)
	}
}
