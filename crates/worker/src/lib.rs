//! Task fan-out primitives.
//!
//! Store queries are spawned into a [`WorkerJoinSet`] and joined with
//! [`WorkerJoinSet::try_join_all`], which stops at the first failure and
//! aborts whatever is still running.

mod join_set;
mod panic;
mod spawn;

pub use join_set::WorkerJoinSet;
pub use panic::join_error_panic_message;
pub use tokio::task::{Id as TaskId, JoinError};
