//! Scriptable store used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::merge::Contribution;
use crate::store::{GetOptions, SettingsStore, StoreError, StoreUpdate, StoreValues};

/// Answers from a fixed table keyed by `(context, key)`; params are plain strings.
#[derive(Default)]
pub(crate) struct StaticStore {
	keys: Vec<String>,
	answers: HashMap<(String, String), Option<Contribution>>,
	failure: Option<String>,
	delay: Option<Duration>,
	panics: bool,
	queries: AtomicUsize,
	asked: Mutex<Vec<Vec<String>>>,
	seen: Mutex<Vec<(String, bool)>>,
	writes: Mutex<Vec<(StoreUpdate, String)>>,
}

impl StaticStore {
	pub fn new(keys: &[&str]) -> Self {
		Self {
			keys: keys.iter().map(|k| k.to_string()).collect(),
			..Self::default()
		}
	}

	pub fn answer(mut self, ctx: &str, key: &str, value: Contribution) -> Self {
		self.answers.insert((ctx.into(), key.into()), Some(value));
		self
	}

	pub fn absent(mut self, ctx: &str, key: &str) -> Self {
		self.answers.insert((ctx.into(), key.into()), None);
		self
	}

	pub fn failing(mut self, msg: &str) -> Self {
		self.failure = Some(msg.into());
		self
	}

	pub fn delayed(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn panicking(mut self) -> Self {
		self.panics = true;
		self
	}

	pub fn queries(&self) -> usize {
		self.queries.load(Ordering::SeqCst)
	}

	pub fn asked(&self) -> Vec<Vec<String>> {
		self.asked.lock().clone()
	}

	/// `(params, skip_cache)` of every query.
	pub fn seen(&self) -> Vec<(String, bool)> {
		self.seen.lock().clone()
	}

	pub fn writes(&self) -> Vec<(StoreUpdate, String)> {
		self.writes.lock().clone()
	}
}

#[async_trait]
impl SettingsStore<String> for StaticStore {
	fn keys(&self) -> &[String] {
		&self.keys
	}

	async fn get(&self, keys: &[String], params: &String, options: &GetOptions) -> Result<StoreValues, StoreError> {
		self.queries.fetch_add(1, Ordering::SeqCst);
		self.asked.lock().push(keys.to_vec());
		self.seen.lock().push((params.clone(), options.skip_cache));

		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
		if self.panics {
			panic!("store exploded");
		}
		if let Some(msg) = &self.failure {
			return Err(StoreError::backend(msg.clone()));
		}

		let mut values = StoreValues::default();
		for key in keys {
			if let Some(answer) = self.answers.get(&(params.clone(), key.clone())) {
				values.insert(key.clone(), *answer);
			}
		}
		Ok(values)
	}

	async fn set(&self, values: &StoreUpdate, params: &String) -> Result<(), StoreError> {
		if let Some(msg) = &self.failure {
			return Err(StoreError::backend(msg.clone()));
		}
		self.writes.lock().push((values.clone(), params.clone()));
		Ok(())
	}
}
