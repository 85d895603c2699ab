//! Store registry: name to store, and key to owning stores.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::error::{RegistrationFault, Result, SettingsError};
use crate::merge::MergeValue;
use crate::store::SettingsStore;


/// A registered store together with the name it was registered under.
pub struct StoreRef<P, V = bool> {
	name: Arc<str>,
	store: Arc<dyn SettingsStore<P, V>>,
}

impl<P, V> Clone for StoreRef<P, V> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			store: self.store.clone(),
		}
	}
}

impl<P, V> StoreRef<P, V> {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn keys(&self) -> &[String] {
		self.store.keys()
	}

	pub fn store(&self) -> &Arc<dyn SettingsStore<P, V>> {
		&self.store
	}

	/// Returns `true` when both handles point at the same registration.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.name, &other.name)
	}

	pub(crate) fn shared_name(&self) -> Arc<str> {
		self.name.clone()
	}
}

impl<P, V> fmt::Debug for StoreRef<P, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoreRef").field("name", &self.name).field("keys", &self.keys()).finish()
	}
}

/// Registered stores and the derived key index.
///
/// Built once during startup through `&mut self` registration, then only read.
pub struct SettingsRegistry<P, V = bool> {
	stores: IndexMap<Arc<str>, StoreRef<P, V>>,
	/// Owning stores per key, in registration order.
	by_key: HashMap<Box<str>, Vec<StoreRef<P, V>>>,
}

impl<P, V> Default for SettingsRegistry<P, V> {
	fn default() -> Self {
		Self {
			stores: IndexMap::new(),
			by_key: HashMap::default(),
		}
	}
}

impl<P, V> SettingsRegistry<P, V>
where
	P: Send + Sync + 'static,
	V: MergeValue,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `store` under `name` and indexes every key it declares.
	///
	/// Fails without touching the registry when the name is empty or taken,
	/// or when the store's key list is empty, contains an empty key, or
	/// repeats a key.
	pub fn add_store<S>(&mut self, name: impl Into<Arc<str>>, store: Arc<S>) -> Result<()>
	where
		S: SettingsStore<P, V> + 'static,
	{
		self.add_shared_store(name, store)
	}

	/// Like [`add_store`](Self::add_store), for stores that are already type
	/// erased, such as the handle returned by [`StoreRef::store`].
	pub fn add_shared_store(&mut self, name: impl Into<Arc<str>>, store: Arc<dyn SettingsStore<P, V>>) -> Result<()> {
		let name = name.into();
		let reject = |reason| SettingsError::InvalidStoreRegistration {
			name: name.to_string(),
			reason,
		};

		if name.is_empty() {
			return Err(reject(RegistrationFault::EmptyName));
		}
		if self.stores.contains_key(&name) {
			return Err(reject(RegistrationFault::DuplicateName));
		}
		check_keys(store.keys()).map_err(reject)?;

		let entry = StoreRef {
			name: name.clone(),
			store,
		};
		for key in entry.keys() {
			self.by_key.entry(Box::from(key.as_str())).or_default().push(entry.clone());
		}
		tracing::debug!(store = %name, keys = entry.keys().len(), "settings.store.registered");
		self.stores.insert(name, entry);
		Ok(())
	}

	pub fn get_store(&self, name: &str) -> Option<StoreRef<P, V>> {
		self.stores.get(name).cloned()
	}

	/// Returns an owned copy of the stores declaring `key`.
	///
	/// Empty for unknown keys. The copy is detached from the registry.
	pub fn stores_for_key(&self, key: &str) -> Vec<StoreRef<P, V>> {
		self.owners(key).to_vec()
	}

	pub(crate) fn owners(&self, key: &str) -> &[StoreRef<P, V>] {
		self.by_key.get(key).map(Vec::as_slice).unwrap_or_default()
	}

	/// Registered stores in registration order.
	pub fn iter(&self) -> impl Iterator<Item = &StoreRef<P, V>> {
		self.stores.values()
	}

	pub fn store_names(&self) -> impl Iterator<Item = &str> {
		self.stores.keys().map(|name| &**name)
	}

	/// Every key answered by at least one store.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.by_key.keys().map(|key| &**key)
	}

	pub fn len(&self) -> usize {
		self.stores.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stores.is_empty()
	}
}

fn check_keys(keys: &[String]) -> std::result::Result<(), RegistrationFault> {
	if keys.is_empty() {
		return Err(RegistrationFault::NoKeys);
	}
	let mut seen = HashSet::default();
	for key in keys {
		if key.is_empty() {
			return Err(RegistrationFault::EmptyKey);
		}
		if !seen.insert(key.as_str()) {
			return Err(RegistrationFault::DuplicateKey(key.clone()));
		}
	}
	Ok(())
}
