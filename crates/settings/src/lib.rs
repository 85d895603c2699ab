//! Multi-store settings and permission resolution.
//!
//! Setting keys (`forum_can_view`, `can_edit_posts`, ...) are answered by one
//! or more independently owned stores: global defaults, per-forum overrides,
//! per-usergroup overrides. [`Settings`] keeps the registry of stores, fans a
//! batched lookup out to every store that owns a requested key, and folds the
//! answers with [`merge_values`].
//!
//! # Merge rules
//!
//! Each store answers a key with either nothing or a [`Contribution`]:
//!
//! - Forced contributions beat regular ones, whatever their number.
//! - Forced contributions combine with AND: one revoking store wins.
//! - Regular contributions combine with OR: one granting store wins.
//! - No contribution at all leaves the key unresolved, which is an error.
//!
//! # Failure semantics
//!
//! A batch either resolves every key or fails as a whole. Unknown keys are
//! rejected before any store is queried; a single failing store fails the
//! batch and aborts the queries still in flight.
//!
//! # Example
//!
//! ```ignore
//! let mut settings = Settings::<Params>::new();
//! let global = settings.create_store(StoreSchema::unscoped().key_with_default("forum_can_view", true));
//! settings.add_store("global", Arc::new(global))?;
//!
//! let params = Params::new().with("forum_id", "42");
//! assert!(settings.get("forum_can_view", params, &GetOptions::default()).await?);
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod merge;
pub mod params;
pub mod registry;
mod resolver;
pub mod store;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, SettingsConfig};
pub use error::{RegistrationFault, Result, SettingsError};
pub use memory::{KeySchema, MemoryStore, StoreSchema};
pub use merge::{Contribution, MergeValue, merge_values};
pub use params::{Params, ParamsError, ScopeLookup};
pub use registry::{SettingsRegistry, StoreRef};
pub use resolver::Settings;
pub use store::{GetOptions, SettingsStore, StoreCache, StoreError, StoreUpdate, StoreValues};
