//! End-to-end resolution through the public API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use palaver_settings::{
	Contribution, GetOptions, Params, ScopeLookup, Settings, SettingsError, SettingsStore, StoreCache, StoreError,
	StoreSchema, StoreUpdate, StoreValues,
};
use pretty_assertions::assert_eq;
use {
	palaver_worker as _, parking_lot as _, proptest as _, rstest as _, rustc_hash as _, serde as _, tempfile as _,
	thiserror as _, toml as _, tracing as _,
};

/// Per-forum moderator overrides keyed by `forum_id`, answering after a delay
/// so that queries overlap.
struct ModeratorStore {
	keys: Vec<String>,
}

#[async_trait]
impl SettingsStore<Params> for ModeratorStore {
	fn keys(&self) -> &[String] {
		&self.keys
	}

	async fn get(&self, keys: &[String], params: &Params, options: &GetOptions) -> Result<StoreValues, StoreError> {
		tokio::time::sleep(Duration::from_millis(10)).await;

		// A pre-seeded cache short-circuits the lookup.
		if let Some(cached) = options.effective_cache().and_then(|cache| cache.downcast_ref::<bool>()) {
			return Ok(keys.iter().map(|k| (k.clone(), Some(Contribution::forced(*cached)))).collect());
		}

		let is_mod_forum = params.scope_ids("forum_id").iter().any(|id| id == "staff");
		Ok(keys
			.iter()
			.map(|k| (k.clone(), is_mod_forum.then_some(Contribution::regular(true))))
			.collect())
	}

	async fn set(&self, _values: &StoreUpdate, _params: &Params) -> Result<(), StoreError> {
		Err(StoreError::backend("moderator store is read only"))
	}
}

fn forum_settings() -> Settings {
	let mut settings = Settings::new();

	let global = settings.create_store(
		StoreSchema::unscoped()
			.key_with_default("forum_can_view", true)
			.key_with_default("forum_can_reply", false)
			.key_with_default("forum_can_close", false),
	);
	let usergroup = settings.create_store(
		StoreSchema::scoped("usergroup_ids")
			.key("forum_can_view")
			.key("forum_can_reply"),
	);
	usergroup.insert(Some("members"), "forum_can_reply", Contribution::regular(true)).unwrap();
	usergroup.insert(Some("banned"), "forum_can_view", Contribution::forced(false)).unwrap();
	usergroup.insert(Some("banned"), "forum_can_reply", Contribution::forced(false)).unwrap();

	settings.add_store("global", Arc::new(global)).unwrap();
	settings.add_store("usergroup", Arc::new(usergroup)).unwrap();
	settings
		.add_store(
			"moderator",
			Arc::new(ModeratorStore {
				keys: vec!["forum_can_close".to_string()],
			}),
		)
		.unwrap();
	settings
}

const ALL: [&str; 3] = ["forum_can_view", "forum_can_reply", "forum_can_close"];

fn expect(values: [bool; 3]) -> IndexMap<String, bool> {
	ALL.iter().map(|k| k.to_string()).zip(values).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolves_forum_permissions_per_context() {
	let settings = forum_settings();
	let opts = GetOptions::default();

	let guest = Params::new().with("forum_id", "general");
	assert_eq!(settings.get_many(&ALL, guest, &opts).await.unwrap(), expect([true, false, false]));

	let member = Params::new().with("forum_id", "general").with("usergroup_ids", "members");
	assert_eq!(settings.get_many(&ALL, member, &opts).await.unwrap(), expect([true, true, false]));

	let banned_member = Params::new()
		.with("forum_id", "general")
		.with("usergroup_ids", "members")
		.with("usergroup_ids", "banned");
	assert_eq!(settings.get_many(&ALL, banned_member, &opts).await.unwrap(), expect([false, false, false]));

	let staff_member = Params::new().with("forum_id", "staff").with("usergroup_ids", "members");
	assert_eq!(settings.get_many(&ALL, staff_member, &opts).await.unwrap(), expect([true, true, true]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_one_registry() {
	let settings = Arc::new(forum_settings());

	let mut handles = Vec::new();
	for n in 0..16 {
		let settings = Arc::clone(&settings);
		handles.push(tokio::spawn(async move {
			let group = if n % 2 == 0 { "members" } else { "guests" };
			let params = Params::new().with("usergroup_ids", group).with("forum_id", "general");
			let reply = settings.get("forum_can_reply", params, &GetOptions::default()).await.unwrap();
			(group, reply)
		}));
	}

	for handle in handles {
		let (group, reply) = handle.await.unwrap();
		assert_eq!(reply, group == "members", "group {group}");
	}
}

#[tokio::test]
async fn options_reach_stores_untouched() {
	let settings = forum_settings();
	let params = Params::new().with("forum_id", "general");

	let cached = GetOptions::new().with_cache(StoreCache::new(true));
	assert!(settings.get("forum_can_close", params.clone(), &cached).await.unwrap());

	let bypass = cached.skip_cache();
	assert!(!settings.get("forum_can_close", params, &bypass).await.unwrap());
}

#[tokio::test]
async fn writes_go_through_the_named_store_only() {
	let settings = forum_settings();
	let mods = Params::new().with("usergroup_ids", "moderators");
	assert!(!settings.get("forum_can_reply", mods.clone(), &GetOptions::default()).await.unwrap());

	let update: StoreUpdate = [("forum_can_reply".to_string(), Contribution::regular(true))].into_iter().collect();
	settings.set("usergroup", &update, &mods).await.unwrap();
	assert!(settings.get("forum_can_reply", mods.clone(), &GetOptions::default()).await.unwrap());

	let err = settings.set("moderator", &update, &mods).await.unwrap_err();
	assert!(matches!(err, SettingsError::StoreQueryFailure { ref store, .. } if store == "moderator"));

	let err = settings.set("forum", &update, &mods).await.unwrap_err();
	assert!(matches!(err, SettingsError::UnknownStore(_)));
}

#[tokio::test]
async fn unknown_key_spoils_the_batch() {
	let settings = forum_settings();
	let err = settings
		.get_many(&["forum_can_view", "forum_can_fly"], Params::new(), &GetOptions::default())
		.await
		.unwrap_err();
	assert_eq!(err.to_string(), "unknown settings key(s): forum_can_fly");
}
