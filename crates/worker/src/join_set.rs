use std::future::Future;

use tokio::task::{Id, JoinError, JoinSet};

/// Labelled wrapper for a Tokio [`JoinSet`].
///
/// Task spawning is routed through the crate's runtime entry so tasks land on
/// the active runtime, or on the fallback runtime outside of one. The label
/// only shows up in traces.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	label: &'static str,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty join set.
	pub fn new(label: &'static str) -> Self {
		Self { label, inner: JoinSet::new() }
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set and returns its task id.
	pub fn spawn<F>(&mut self, fut: F) -> Id
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker = self.label, pending = self.inner.len(), "worker.join_set.spawn");
		let handle = crate::spawn::current_handle();
		self.inner.spawn_on(fut, &handle).id()
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.join_next().await
	}

	/// Aborts every task still in the set.
	pub fn abort_all(&mut self) {
		if !self.inner.is_empty() {
			tracing::trace!(worker = self.label, pending = self.inner.len(), "worker.join_set.abort_all");
		}
		self.inner.abort_all();
	}
}

impl<O, E> WorkerJoinSet<Result<O, E>>
where
	O: Send + 'static,
	E: Send + 'static,
{
	/// Waits for every task, stopping at the first failure.
	///
	/// Outputs come back in completion order. A task that panicked or was
	/// cancelled is turned into an error through `on_join_error`. On the first
	/// error the remaining tasks are aborted and never awaited.
	pub async fn try_join_all<F>(mut self, mut on_join_error: F) -> Result<Vec<O>, E>
	where
		F: FnMut(JoinError) -> E,
	{
		let mut outputs = Vec::with_capacity(self.inner.len());
		while let Some(joined) = self.inner.join_next().await {
			match joined.unwrap_or_else(|err| Err(on_join_error(err))) {
				Ok(output) => outputs.push(output),
				Err(err) => {
					self.abort_all();
					return Err(err);
				}
			}
		}
		tracing::trace!(worker = self.label, joined = outputs.len(), "worker.join_set.joined");
		Ok(outputs)
	}
}

#[cfg(test)]
mod tests;
