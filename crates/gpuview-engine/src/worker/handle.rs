use std::fmt;
use std::sync::Arc;

use crate::logging;

use super::registry::{WorkerId, WorkerRegistry};
use super::state::{RenderMode, WorkerInit, WorkerState, WorkerStatus};

/// Control handle for one render worker.
///
/// Every operation locks the registry monitor, updates the worker state and
/// wakes all waiters. The blocking ones then wait until the worker has
/// observed the change, or has exited. Called from the worker thread itself
/// (inside a renderer callback or a queued event) they apply the change and
/// return at once, since the worker cannot make progress while its own thread
/// is parked here.
///
/// Clones share the worker. Dropping the last clone removes its state from the
/// registry, which a still-running worker thread reads as an exit request.
#[derive(Clone)]
pub struct RenderWorker {
    link: Arc<WorkerLink>,
}

struct WorkerLink {
    id: WorkerId,
    registry: Arc<WorkerRegistry>,
}

impl Drop for WorkerLink {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

impl fmt::Debug for RenderWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderWorker").field("id", &self.link.id).finish()
    }
}

impl RenderWorker {
    pub(crate) fn register(registry: Arc<WorkerRegistry>, init: WorkerInit) -> Self {
        let id = registry.register(init);
        Self {
            link: Arc::new(WorkerLink { id, registry }),
        }
    }

    /// Process-unique id of this worker.
    pub fn id(&self) -> u64 {
        self.link.id
    }

    pub(crate) fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.link.registry
    }

    /// Applies `update`, wakes everyone, then waits while `pending` holds.
    ///
    /// Returns without waiting when the worker is gone or the caller is the
    /// worker thread.
    fn transition(
        &self,
        update: impl FnOnce(&mut WorkerState),
        pending: impl FnMut(&WorkerState) -> bool,
    ) {
        let registry = &self.link.registry;
        let id = self.link.id;

        let mut workers = registry.lock();
        let Some(st) = workers.get_mut(id) else {
            return;
        };
        update(st);
        let reentrant = st.is_worker_thread();
        registry.notify();

        if reentrant {
            log::trace!(target: logging::THREADS, "worker {id}: reentrant call, not waiting");
            return;
        }
        let _workers = registry.wait_for(workers, id, pending);
    }

    /// Applies `update` and wakes everyone without waiting.
    fn post(&self, update: impl FnOnce(&mut WorkerState)) {
        let mut workers = self.link.registry.lock();
        if let Some(st) = workers.get_mut(self.link.id) {
            update(st);
            self.link.registry.notify();
        }
    }

    /// The host created its drawable.
    ///
    /// Blocks until the worker has acquired its surface, or acquisition cannot
    /// happen right now (paused, surface bad, exited).
    pub fn surface_created(&self) {
        log::debug!(target: logging::SURFACE, "worker {}: host surface created", self.id());
        self.transition(
            |st| {
                st.has_host_surface = true;
                st.surface_creation_finished = false;
            },
            |st| {
                st.waiting_for_surface
                    && !st.surface_creation_finished
                    && !st.is_paused
                    && !st.surface_is_bad
            },
        );
    }

    /// The host is destroying its drawable.
    ///
    /// Blocks until the worker has released the window surface, so the host
    /// may free the native window once this returns. A bad surface is cleared
    /// here too, so the next `surface_created` starts a fresh attempt.
    pub fn surface_destroyed(&self) {
        log::debug!(target: logging::SURFACE, "worker {}: host surface destroyed", self.id());
        self.transition(
            |st| st.has_host_surface = false,
            |st| !st.waiting_for_surface || st.surface_is_bad,
        );
    }

    /// Records a new drawable size and asks for a frame at that size.
    pub fn surface_resized(&self, width: u32, height: u32) {
        log::debug!(target: logging::SURFACE, "worker {}: resized to {width}x{height}", self.id());
        self.post(|st| Self::apply_resize(st, width, height));
    }

    /// Like [`surface_resized`](Self::surface_resized), then waits for the
    /// frame at the new size as [`request_render_and_wait`](Self::request_render_and_wait) does.
    pub fn surface_resized_and_wait(&self, width: u32, height: u32) {
        log::debug!(target: logging::SURFACE, "worker {}: resized to {width}x{height}, waiting", self.id());
        self.transition(
            |st| {
                Self::apply_resize(st, width, height);
                st.resize_frame_pending = false;
                st.want_render_notification = true;
            },
            Self::frame_pending,
        );
    }

    fn apply_resize(st: &mut WorkerState, width: u32, height: u32) {
        st.surface_width = width;
        st.surface_height = height;
        st.size_changed = true;
        st.request_render = true;
        st.render_complete = false;
        st.resize_frame_pending = true;
    }

    fn frame_pending(st: &WorkerState) -> bool {
        !st.render_complete && !st.is_paused && (st.frame_in_flight || st.is_able_to_draw())
    }

    /// Asks for one frame. Only matters in [`RenderMode::WhenDirty`].
    pub fn request_render(&self) {
        self.post(|st| {
            st.request_render = true;
            st.render_complete = false;
            st.resize_frame_pending = false;
        });
    }

    /// Asks for one frame and waits until it has been presented.
    ///
    /// Right after a resize the frame the resize asked for is the one waited
    /// on, whether it is still queued, being drawn or already presented, so a
    /// resize followed by this call draws exactly once.
    ///
    /// Returns early when the worker is paused, has exited, or has no way to
    /// draw (no surface, zero size). A no-op on the worker thread.
    pub fn request_render_and_wait(&self) {
        {
            let workers = self.link.registry.lock();
            if workers.get(self.link.id).is_some_and(WorkerState::is_worker_thread) {
                return;
            }
        }
        self.transition(
            |st| {
                st.want_render_notification = true;
                if st.resize_frame_pending {
                    st.resize_frame_pending = false;
                } else {
                    st.request_render = true;
                    st.render_complete = false;
                }
            },
            Self::frame_pending,
        );
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        log::debug!(target: logging::DRAW, "worker {}: render mode {mode:?}", self.id());
        self.post(|st| st.render_mode = mode);
    }

    /// Current render mode, or the default once the worker state is gone.
    pub fn render_mode(&self) -> RenderMode {
        self.link
            .registry
            .lock()
            .get(self.link.id)
            .map(|st| st.render_mode)
            .unwrap_or_default()
    }

    /// Queues `event` to run once on the worker thread, ahead of the next
    /// frame. Events run in submission order.
    pub fn queue_event(&self, event: impl FnOnce() + Send + 'static) {
        self.post(|st| st.events.push_back(Box::new(event)));
    }

    /// Blocks until the worker has released its surface (and its context,
    /// unless it preserves contexts across pauses).
    pub fn on_pause(&self) {
        log::debug!(target: logging::PAUSE_RESUME, "worker {}: pause requested", self.id());
        self.transition(|st| st.pause_requested = true, |st| !st.is_paused);
    }

    /// Blocks until the worker has left the paused state or drawn a frame.
    pub fn on_resume(&self) {
        log::debug!(target: logging::PAUSE_RESUME, "worker {}: resume requested", self.id());
        self.transition(
            |st| {
                st.pause_requested = false;
                st.request_render = true;
                st.render_complete = false;
                st.resize_frame_pending = false;
            },
            |st| st.is_paused && !st.render_complete,
        );
    }

    /// Asks the worker to drop its context and surface. They are acquired
    /// again on the next pass that can draw.
    pub fn request_context_release(&self) {
        log::debug!(target: logging::SURFACE, "worker {}: context release requested", self.id());
        self.post(|st| st.should_release_context = true);
    }

    /// Asks the worker to exit and blocks until it has released everything.
    ///
    /// Safe to call from several threads at once and more than once.
    pub fn request_exit_and_wait(&self) {
        log::debug!(target: logging::THREADS, "worker {}: exit requested", self.id());
        self.transition(|st| st.exit_requested = true, |_| true);
    }

    /// Snapshot of the worker flags, `None` once the state is gone.
    pub fn status(&self) -> Option<WorkerStatus> {
        self.link
            .registry
            .lock()
            .get(self.link.id)
            .map(WorkerState::status)
    }
}
