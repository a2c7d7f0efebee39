use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::logging;

use super::state::{WorkerInit, WorkerState};

/// Process-unique worker identifier.
pub(crate) type WorkerId = u64;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

fn next_worker_id() -> WorkerId {
    NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed)
}

static GLOBAL: OnceLock<Arc<WorkerRegistry>> = OnceLock::new();

/// All worker states guarded by the registry monitor.
#[derive(Debug, Default)]
pub(crate) struct Workers {
    states: HashMap<WorkerId, WorkerState>,
}

impl Workers {
    pub fn get(&self, id: WorkerId) -> Option<&WorkerState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: WorkerId) -> Option<&mut WorkerState> {
        self.states.get_mut(&id)
    }
}

/// Monitor shared by a set of render workers and their control threads.
///
/// One mutex guards the state of every registered worker and one condition
/// variable is used for every wake-up; each wake is a broadcast and each
/// waiter re-checks its own predicate.
///
/// A poisoned lock is taken over as is. The flags are plain booleans written
/// in single statements, so a panicking holder cannot leave them half updated.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Mutex<Workers>,
    changed: Condvar,
}

impl WorkerRegistry {
    /// Creates a private registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide registry views use unless given their own.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(WorkerRegistry::new).clone()
    }

    /// Number of workers whose handles are still alive.
    pub fn worker_count(&self) -> usize {
        self.lock().states.len()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Workers> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self) {
        self.changed.notify_all();
    }

    /// Blocks while `pending` holds for worker `id`.
    ///
    /// Also returns once the worker has exited or its entry is gone, so callers
    /// never wait on a thread that can no longer make progress.
    pub(crate) fn wait_for<'a>(
        &self,
        guard: MutexGuard<'a, Workers>,
        id: WorkerId,
        mut pending: impl FnMut(&WorkerState) -> bool,
    ) -> MutexGuard<'a, Workers> {
        self.changed
            .wait_while(guard, |workers| match workers.get(id) {
                Some(st) => !st.has_exited && pending(st),
                None => false,
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for any notification or until `timeout` elapses.
    pub(crate) fn wait_idle<'a>(
        &self,
        guard: MutexGuard<'a, Workers>,
        timeout: Duration,
    ) -> MutexGuard<'a, Workers> {
        match self.changed.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    pub(crate) fn register(&self, init: WorkerInit) -> WorkerId {
        let id = next_worker_id();
        self.lock().states.insert(id, WorkerState::new(init));
        log::debug!(target: logging::THREADS, "registered worker {id}");
        id
    }

    /// Drops the state of worker `id`. A thread still running for it treats
    /// this as an exit request.
    pub(crate) fn deregister(&self, id: WorkerId) {
        let removed = self.lock().states.remove(&id).is_some();
        if removed {
            log::debug!(target: logging::THREADS, "deregistered worker {id}");
            self.notify();
        }
    }

    /// Final bookkeeping of a worker thread, after its GPU objects are gone.
    pub(crate) fn thread_is_exiting(&self, id: WorkerId) {
        let mut workers = self.lock();
        if let Some(st) = workers.get_mut(id) {
            st.has_exited = true;
            st.has_gpu_context = false;
            st.has_gpu_surface = false;
            st.frame_in_flight = false;
            st.worker_thread = None;
        }
        drop(workers);
        log::info!(target: logging::THREADS, "worker {id} exited");
        self.notify();
    }
}
