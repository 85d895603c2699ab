//! Error types for settings resolution.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by [`Settings`](crate::Settings).
///
/// The key space is defined by application code, so every variant points at
/// a configuration fault rather than bad user input.
#[derive(Debug, Error)]
pub enum SettingsError {
	/// A store was rejected at registration time.
	#[error("invalid store registration `{name}`: {reason}")]
	InvalidStoreRegistration {
		/// Name the store was registered under.
		name: String,
		/// Why it was rejected.
		reason: RegistrationFault,
	},

	/// Requested keys that no registered store declares.
	#[error("unknown settings key(s): {}", keys.join(", "))]
	UnknownKey {
		/// Every unknown key of the batch, in request order.
		keys: Vec<String>,
	},

	/// `set` targeted a store name that was never registered.
	#[error("unknown store: {0}")]
	UnknownStore(String),

	/// A store reported a failure while answering or persisting values.
	#[error("store `{store}` failed: {source}")]
	StoreQueryFailure {
		/// Name of the failing store.
		store: String,
		/// The store's own error.
		#[source]
		source: StoreError,
	},

	/// No store contributed a value for these keys.
	#[error("failed to get values for settings: {}", keys.join(", "))]
	UnresolvedValue {
		/// Every unresolved key of the batch, in request order.
		keys: Vec<String>,
	},
}

/// Reasons a store registration is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationFault {
	/// The store name is the empty string.
	#[error("store name is empty")]
	EmptyName,
	/// Another store already holds this name; the first one is kept.
	#[error("a store is already registered under this name")]
	DuplicateName,
	/// The store's key list is empty.
	#[error("store declares no keys")]
	NoKeys,
	/// One of the store's keys is the empty string.
	#[error("store declares an empty key")]
	EmptyKey,
	/// The store lists the given key more than once.
	#[error("store declares key `{0}` more than once")]
	DuplicateKey(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
