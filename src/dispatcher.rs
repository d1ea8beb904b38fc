use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::runtime::{Builder, Runtime};

use crate::DispatchError;

const THREAD_NAME: &str = "twitter-oauth1-worker";

enum PoolState {
    /// Not started yet; clients that never go async never spawn threads.
    Idle,
    Running(Runtime),
    ShutDown,
}

/// Count of accepted jobs that have not finished or been dropped.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn enter(self: &Arc<Self>) -> PendingGuard {
        *self.count.lock() += 1;
        PendingGuard(Arc::clone(self))
    }

    fn count(&self) -> usize {
        *self.count.lock()
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

/// Released when its job returns, panics, or is dropped unrun.
struct PendingGuard(Arc<Pending>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Runs asynchronous calls on the blocking pool of a private tokio runtime.
///
/// The pool lives as long as its client. `shutdown` waits for every
/// submitted job, so each accepted callback runs exactly once.
pub(crate) struct WorkerPool {
    threads: usize,
    state: PoolState,
    pending: Arc<Pending>,
}

impl WorkerPool {
    pub(crate) fn new(threads: usize) -> Self {
        WorkerPool {
            threads,
            state: PoolState::Idle,
            pending: Arc::default(),
        }
    }

    pub(crate) fn submit<F>(&mut self, job: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        if let PoolState::Idle = self.state {
            let runtime = Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(self.threads)
                .thread_name(THREAD_NAME)
                .build()?;
            tracing::debug!(threads = self.threads, "worker pool started");
            self.state = PoolState::Running(runtime);
        }
        match &self.state {
            PoolState::Running(runtime) => {
                let guard = self.pending.enter();
                runtime.spawn_blocking(move || {
                    let _guard = guard;
                    // a panicking callback only takes its own job down
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::warn!("asynchronous job panicked");
                    }
                });
                Ok(())
            }
            _ => Err(DispatchError::ShutDown),
        }
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        matches!(self.state, PoolState::ShutDown)
    }

    /// Waits for outstanding jobs, then stops the pool. Idempotent.
    ///
    /// Safe to call, or to drop the pool, from inside another tokio runtime:
    /// draining never enters the pool's runtime and the runtime is released
    /// with `shutdown_background`.
    pub(crate) fn shutdown(&mut self) {
        let state = std::mem::replace(&mut self.state, PoolState::ShutDown);
        if let PoolState::Running(runtime) = state {
            let pending = self.pending.count();
            self.pending.wait_idle();
            runtime.shutdown_background();
            tracing::debug!(pending, "worker pool shut down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
