//! Merging of raw store contributions into one resolved value.

use serde::{Deserialize, Serialize};


/// Value types that can be merged across stores.
///
/// Both combinators must be commutative and associative; that is what makes
/// [`merge_values`] independent of the order stores answered in.
pub trait MergeValue: Clone + Send + Sync + 'static {
	/// Combines two regular contributions (the more permissive one wins).
	fn join(self, other: Self) -> Self;

	/// Combines two forced contributions (the more restrictive one wins).
	fn meet(self, other: Self) -> Self;
}

impl MergeValue for bool {
	fn join(self, other: Self) -> Self {
		self || other
	}

	fn meet(self, other: Self) -> Self {
		self && other
	}
}

macro_rules! impl_merge_value_ord {
	($($ty:ty),* $(,)?) => {
		$(
			impl MergeValue for $ty {
				fn join(self, other: Self) -> Self {
					self.max(other)
				}

				fn meet(self, other: Self) -> Self {
					self.min(other)
				}
			}
		)*
	};
}

impl_merge_value_ord!(i32, i64, u32, u64, usize);

/// One store's answer for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contribution<V = bool> {
	/// The contributed value.
	pub value: V,
	/// Forced contributions override every regular one.
	#[serde(default)]
	pub forced: bool,
}

impl<V> Contribution<V> {
	/// A regular (overridable) contribution.
	pub const fn regular(value: V) -> Self {
		Self { value, forced: false }
	}

	/// A forced contribution.
	pub const fn forced(value: V) -> Self {
		Self { value, forced: true }
	}
}

/// Reduces the raw contributions for a single key.
///
/// Absent entries (`None`) are skipped. If any forced contribution is present
/// the result is the [`MergeValue::meet`] of all forced values, flagged as
/// forced, and regular contributions are ignored. Otherwise the result is the
/// [`MergeValue::join`] of the regular values. Returns `None` when nothing
/// was contributed at all.
pub fn merge_values<V, I>(records: I) -> Option<Contribution<V>>
where
	V: MergeValue,
	I: IntoIterator<Item = Option<Contribution<V>>>,
{
	let mut regular: Option<V> = None;
	let mut forced: Option<V> = None;

	for record in records.into_iter().flatten() {
		if record.forced {
			forced = Some(match forced {
				Some(acc) => acc.meet(record.value),
				None => record.value,
			});
		} else {
			regular = Some(match regular {
				Some(acc) => acc.join(record.value),
				None => record.value,
			});
		}
	}

	match (forced, regular) {
		(Some(value), _) => Some(Contribution::forced(value)),
		(None, Some(value)) => Some(Contribution::regular(value)),
		(None, None) => None,
	}
}
