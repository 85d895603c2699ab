//! Resolution context handed to stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read access to scope ids inside a params value.
///
/// Schema-driven stores use this to find which scope rows apply
/// (`forum_id = 42`, `usergroup_ids = [1, 3]`).
pub trait ScopeLookup {
	/// Ids given for `scope`, empty when the scope is absent.
	fn scope_ids(&self, scope: &str) -> &[String];
}

impl ScopeLookup for () {
	fn scope_ids(&self, _scope: &str) -> &[String] {
		&[]
	}
}

/// Scope name to ids mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
	scopes: BTreeMap<String, Vec<String>>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one id to `scope`.
	pub fn with(mut self, scope: impl Into<String>, id: impl Into<String>) -> Self {
		self.insert(scope, id);
		self
	}

	pub fn insert(&mut self, scope: impl Into<String>, id: impl Into<String>) {
		self.scopes.entry(scope.into()).or_default().push(id.into());
	}

	pub fn extend<I, S>(&mut self, scope: impl Into<String>, ids: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.entry(scope.into()).or_default().extend(ids.into_iter().map(Into::into));
	}

	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.scopes.iter().map(|(scope, ids)| (scope.as_str(), ids.as_slice()))
	}
}

impl ScopeLookup for Params {
	fn scope_ids(&self, scope: &str) -> &[String] {
		self.scopes.get(scope).map(Vec::as_slice).unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
	#[error("expected SCOPE=ID[,ID...], got `{0}`")]
	Malformed(String),
	#[error("scope `{0}` has no ids")]
	NoIds(String),
}

/// Parses a `scope=id[,id...]` pair.
pub fn parse_scope(input: &str) -> Result<(String, Vec<String>), ParamsError> {
	let (scope, ids) = input.split_once('=').ok_or_else(|| ParamsError::Malformed(input.to_string()))?;
	let scope = scope.trim();
	if scope.is_empty() {
		return Err(ParamsError::Malformed(input.to_string()));
	}

	let ids: Vec<String> = ids
		.split(',')
		.map(str::trim)
		.filter(|id| !id.is_empty())
		.map(str::to_string)
		.collect();
	if ids.is_empty() {
		return Err(ParamsError::NoIds(scope.to_string()));
	}
	Ok((scope.to_string(), ids))
}
