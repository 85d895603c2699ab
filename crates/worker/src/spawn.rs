use std::sync::OnceLock;

/// Returns the current runtime handle, falling back to a small shared runtime
/// when called from outside of one.
pub(crate) fn current_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("palaver-worker-global")
			.build()
			.expect("failed to build palaver-worker global tokio runtime")
	});
	runtime.handle().clone()
}
