use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::WorkerJoinSet;

#[tokio::test]
async fn try_join_all_collects_every_output() {
	let mut set = WorkerJoinSet::<Result<u32, String>>::new("test");
	for n in 0..5 {
		set.spawn(async move { Ok(n) });
	}
	assert_eq!(set.len(), 5);

	let mut outputs = set.try_join_all(|err| err.to_string()).await.unwrap();
	outputs.sort_unstable();
	assert_eq!(outputs, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn try_join_all_on_empty_set() {
	let set = WorkerJoinSet::<Result<u32, String>>::new("test");
	assert!(set.is_empty());
	assert_eq!(set.try_join_all(|err| err.to_string()).await, Ok(Vec::new()));
}

#[tokio::test]
async fn first_failure_aborts_stragglers() {
	let finished = Arc::new(AtomicBool::new(false));
	let mut set = WorkerJoinSet::<Result<(), String>>::new("test");

	let flag = Arc::clone(&finished);
	set.spawn(async move {
		tokio::time::sleep(Duration::from_secs(30)).await;
		flag.store(true, Ordering::SeqCst);
		Ok(())
	});
	set.spawn(async { Err("store offline".to_string()) });

	let err = tokio::time::timeout(Duration::from_secs(5), set.try_join_all(|err| err.to_string()))
		.await
		.expect("join must not wait for the sleeping task")
		.unwrap_err();
	assert_eq!(err, "store offline");
	assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn panicking_task_is_mapped_through_callback() {
	let mut set = WorkerJoinSet::<Result<(), String>>::new("test");
	let id = set.spawn(async { panic!("query exploded") });

	let err = set
		.try_join_all(|err| {
			assert_eq!(err.id(), id);
			crate::join_error_panic_message(err).unwrap_or_default()
		})
		.await
		.unwrap_err();
	assert!(err.contains("query exploded"), "got: {err}");
}

#[test]
fn spawns_outside_a_runtime() {
	let mut set = WorkerJoinSet::<u32>::new("test");
	set.spawn(async { 7 });
	assert_eq!(set.len(), 1);
	set.abort_all();
}
