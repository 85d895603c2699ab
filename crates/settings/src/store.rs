//! Store contract consumed by the resolver.
//!
//! A store owns a fixed set of keys and knows how to answer them for a given
//! context and how to persist new values. Stores know nothing about each
//! other; the resolver is what combines their answers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use crate::merge::Contribution;

/// Raw per-key answers of one store. `None` means "no opinion".
pub type StoreValues<V = bool> = HashMap<String, Option<Contribution<V>>>;

/// Values handed to [`SettingsStore::set`].
pub type StoreUpdate<V = bool> = HashMap<String, Contribution<V>>;

/// Pre-fetched data a store may consult instead of its backing storage.
///
/// Opaque to the resolver; stores downcast it to whatever they expect.
#[derive(Clone)]
pub struct StoreCache(Arc<dyn Any + Send + Sync>);

impl StoreCache {
	pub fn new<T: Any + Send + Sync>(data: T) -> Self {
		Self(Arc::new(data))
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref()
	}
}

impl fmt::Debug for StoreCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("StoreCache(..)")
	}
}

/// Fine tuning for a lookup, passed through untouched to every store.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
	/// Bypass any store-internal cache.
	pub skip_cache: bool,
	/// Pre-fetched data; ignored when `skip_cache` is set.
	pub cache: Option<StoreCache>,
}

impl GetOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn skip_cache(mut self) -> Self {
		self.skip_cache = true;
		self
	}

	pub fn with_cache(mut self, cache: StoreCache) -> Self {
		self.cache = Some(cache);
		self
	}

	/// Returns the cache a store should use, honoring `skip_cache`.
	pub fn effective_cache(&self) -> Option<&StoreCache> {
		if self.skip_cache { None } else { self.cache.as_ref() }
	}
}

/// Failures reported by a store.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The store was asked about a key it does not declare.
	#[error("key `{0}` is not declared by this store")]
	UnknownKey(String),

	/// A scoped store was used without any id for its scope.
	#[error("no `{scope}` ids given")]
	MissingScope { scope: String },

	/// An unscoped store was given a scope id.
	#[error("store is not scoped, got scope id `{0}`")]
	UnexpectedScope(String),

	/// The store's backing storage failed.
	#[error(transparent)]
	Backend(#[from] Box<dyn std::error::Error + Send + Sync>),

	/// The query exceeded the resolver's time limit.
	#[error("query timed out after {0:?}")]
	TimedOut(Duration),

	/// The query task panicked or was cancelled.
	#[error("query aborted: {0}")]
	Aborted(String),
}

impl StoreError {
	/// Wraps an arbitrary backend error.
	pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
		Self::Backend(err.into())
	}
}

/// A pluggable unit answering a fixed set of setting keys.
///
/// `P` is the resolution context (which forum, which user, which groups); it
/// is opaque to the resolver and handed to every store unchanged.
#[async_trait]
pub trait SettingsStore<P, V = bool>: Send + Sync {
	/// Every key this store can answer, fixed at construction.
	fn keys(&self) -> &[String];

	/// Answers `keys` for `params`.
	///
	/// Should return an entry for every requested key; a missing entry is
	/// treated as "no opinion".
	async fn get(&self, keys: &[String], params: &P, options: &GetOptions) -> Result<StoreValues<V>, StoreError>;

	/// Persists `values` for `params`.
	async fn set(&self, values: &StoreUpdate<V>, params: &P) -> Result<(), StoreError>;
}
