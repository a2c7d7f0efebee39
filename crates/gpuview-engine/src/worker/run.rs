use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capability::{
    ConfigurationChooser, ContextFactory, GpuApi, Renderer, SurfaceCtx, WindowSurfaceFactory,
};
use crate::logging;
use crate::view::{DebugFlags, ViewHost};

use super::handle::RenderWorker;
use super::registry::{WorkerId, WorkerRegistry};
use super::state::{Step, Work, WorkerState};

/// Everything a worker thread owns besides its GPU objects.
///
/// Handed back through the thread's `JoinHandle` so a detached view can start
/// a new worker with the same providers and renderer.
pub(crate) struct WorkerParts<A: GpuApi> {
    pub api: A,
    pub context_factory: Box<dyn ContextFactory<A>>,
    pub surface_factory: Box<dyn WindowSurfaceFactory<A>>,
    pub chooser: Box<dyn ConfigurationChooser<A>>,
    pub renderer: Box<dyn Renderer<A>>,
}

/// A worker thread that could not be started, with the parts it would have
/// owned.
pub(crate) struct SpawnFailed<A: GpuApi> {
    pub error: io::Error,
    pub parts: Option<WorkerParts<A>>,
}

/// Starts the thread driving `worker`.
///
/// The thread returns its parts when it ends. `None` only if the thread
/// started without them, which cannot happen once `spawn` returned `Ok`.
pub(crate) fn spawn<A: GpuApi>(
    worker: &RenderWorker,
    host: Weak<ViewHost<A::NativeWindow>>,
    idle_timeout: Duration,
    stack_size: Option<usize>,
    parts: WorkerParts<A>,
) -> Result<JoinHandle<Option<WorkerParts<A>>>, SpawnFailed<A>> {
    let id = worker.id();
    let registry = Arc::clone(worker.registry());

    // Parts go through a slot so a failed spawn can hand them back.
    let slot = Arc::new(Mutex::new(Some(parts)));
    let handoff = Arc::clone(&slot);

    let mut builder = thread::Builder::new().name(format!("gpu-worker-{id}"));
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }
    let spawned = builder.spawn(move || {
        let parts = handoff.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        let worker_thread = WorkerThread {
            id,
            registry,
            host,
            idle_timeout,
            parts,
            config: None,
            context: None,
            surface: None,
            announce_context: false,
        };
        Some(worker_thread.run())
    });

    spawned.map_err(|error| {
        log::error!(target: logging::THREADS, "worker {id}: thread spawn failed: {error}");
        let parts = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        SpawnFailed { error, parts }
    })
}

struct WorkerThread<A: GpuApi> {
    id: WorkerId,
    registry: Arc<WorkerRegistry>,
    host: Weak<ViewHost<A::NativeWindow>>,
    idle_timeout: Duration,
    parts: WorkerParts<A>,

    config: Option<A::Configuration>,
    context: Option<A::Context>,
    surface: Option<A::Surface>,
    /// The held context has not been announced to the renderer yet.
    announce_context: bool,
}

impl<A: GpuApi> WorkerThread<A> {
    fn run(mut self) -> WorkerParts<A> {
        let id = self.id;
        {
            let mut workers = self.registry.lock();
            if let Some(st) = workers.get_mut(id) {
                st.worker_thread = Some(thread::current().id());
            }
        }
        log::info!(target: logging::THREADS, "worker {id} started");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.guarded_run())) {
            log::error!(
                target: logging::THREADS,
                "worker {id} panicked: {}",
                panic_message(payload.as_ref())
            );
        }

        self.release_surface();
        self.release_context();
        self.registry.thread_is_exiting(id);
        self.parts
    }

    fn guarded_run(&mut self) {
        while let Some(work) = self.next_work() {
            self.perform(work);
        }
    }

    /// Waits for the next piece of work. `None` means exit.
    fn next_work(&self) -> Option<Work> {
        let mut workers = self.registry.lock();
        loop {
            let Some(st) = workers.get_mut(self.id) else {
                log::debug!(target: logging::THREADS, "worker {}: state gone, exiting", self.id);
                return None;
            };
            let step = st.next_step();
            match st.claim(step) {
                Some(Work::Exit) => return None,
                Some(work) => return Some(work),
                None if step == Step::Resuming => {
                    log::debug!(target: logging::PAUSE_RESUME, "worker {}: resumed", self.id);
                    self.registry.notify();
                }
                None => {
                    workers = self.registry.wait_idle(workers, self.idle_timeout);
                }
            }
        }
    }

    fn perform(&mut self, work: Work) {
        match work {
            Work::Exit => {}
            Work::Pause { release_context } => {
                self.release_surface();
                if release_context {
                    self.release_context();
                }
                self.commit(|st| st.is_paused = true);
                log::debug!(target: logging::PAUSE_RESUME, "worker {}: paused", self.id);
            }
            Work::ReleaseContext => {
                self.release_surface();
                self.release_context();
                self.commit(|st| st.should_release_context = false);
            }
            Work::SurfaceLost { release_context } => {
                self.release_surface();
                if release_context {
                    self.release_context();
                }
                self.commit(|st| {
                    st.waiting_for_surface = true;
                    st.surface_is_bad = false;
                });
            }
            Work::AcquireContext => self.acquire_context(),
            Work::AcquireSurface => self.acquire_surface(),
            Work::Resize { width, height } => self.resize(width, height),
            Work::RunEvent(event) => event(),
            Work::Draw => self.draw(),
        }
    }

    /// Publishes what this thread holds, applies `update`, wakes all waiters.
    fn commit(&self, update: impl FnOnce(&mut WorkerState)) {
        let mut workers = self.registry.lock();
        if let Some(st) = workers.get_mut(self.id) {
            st.has_gpu_context = self.context.is_some();
            st.has_gpu_surface = self.surface.is_some();
            update(st);
        }
        self.registry.notify();
    }

    fn debug_flags(&self) -> DebugFlags {
        self.host
            .upgrade()
            .map(|host| host.debug_flags())
            .unwrap_or_default()
    }

    fn trace_api(&self, call: &str) {
        if self.debug_flags().contains(DebugFlags::LOG_API_CALLS) {
            log::debug!(target: logging::API, "worker {}: {call}", self.id);
        }
    }

    fn mark_bad(&self, what: &str, err: &anyhow::Error) {
        log::warn!(target: logging::SURFACE, "worker {}: {what} failed: {err:#}", self.id);
        self.commit(|st| st.surface_is_bad = true);
    }

    fn acquire_context(&mut self) {
        self.trace_api("choose_configuration + create_context");
        let parts = &mut self.parts;
        let display = parts.api.display();
        let acquired = parts
            .chooser
            .choose_configuration(&parts.api, display)
            .and_then(|config| {
                let context = parts.context_factory.create_context(&parts.api, display, &config)?;
                Ok((config, context))
            });

        match acquired {
            Ok((config, context)) => {
                self.config = Some(config);
                self.context = Some(context);
                self.announce_context = true;
                log::info!(target: logging::SURFACE, "worker {}: context acquired", self.id);
                self.commit(|_| {});
            }
            Err(err) => self.mark_bad("context creation", &err),
        }
    }

    fn acquire_surface(&mut self) {
        let Some(window) = self.host.upgrade().and_then(|host| host.native_window()) else {
            self.mark_bad(
                "window surface creation",
                &anyhow::anyhow!("host has no native window"),
            );
            return;
        };

        self.trace_api("create_window_surface");
        let created = match (self.config.as_ref(), self.context.as_ref()) {
            (Some(config), Some(context)) => {
                let parts = &mut self.parts;
                parts.surface_factory.create_window_surface(
                    &parts.api,
                    parts.api.display(),
                    config,
                    context,
                    &window,
                )
            }
            _ => Err(anyhow::anyhow!("no context to create the surface with")),
        };

        match created {
            Ok(surface) => {
                self.surface = Some(surface);
                log::info!(target: logging::SURFACE, "worker {}: window surface acquired", self.id);
                if self.announce_context {
                    self.announce_context = false;
                    log::debug!(target: logging::RENDERER, "worker {}: on_surface_created", self.id);
                    self.with_renderer(|renderer, ctx, config| {
                        renderer.on_surface_created(ctx, config)
                    });
                }
                self.commit(|st| {
                    st.surface_creation_finished = true;
                    st.waiting_for_surface = false;
                    st.size_changed = true;
                });
            }
            Err(err) => self.mark_bad("window surface creation", &err),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let (Some(context), Some(surface)) = (self.context.as_ref(), self.surface.as_mut()) {
            self.parts.api.surface_resized(context, surface, width, height);
        }
        log::debug!(
            target: logging::RENDERER,
            "worker {}: on_surface_changed({width}, {height})",
            self.id
        );
        self.with_renderer(|renderer, ctx, _| renderer.on_surface_changed(ctx, width, height));
    }

    fn draw(&mut self) {
        log::trace!(target: logging::DRAW, "worker {}: on_draw_frame", self.id);
        let drawn = self.with_renderer(|renderer, ctx, _| renderer.on_draw_frame(ctx));

        let mut presented = Ok(());
        if drawn {
            self.trace_api("swap_buffers");
            if let (Some(context), Some(surface)) = (self.context.as_ref(), self.surface.as_mut()) {
                let api = &self.parts.api;
                presented = api.swap_buffers(api.display(), context, surface);
            }
        }

        if self.debug_flags().contains(DebugFlags::CHECK_ERRORS)
            && let Some(context) = self.context.as_ref()
            && let Some(report) = self.parts.api.check_errors(context)
        {
            log::warn!(target: logging::API, "worker {}: backend error: {report}", self.id);
        }

        if let Err(err) = &presented {
            log::warn!(target: logging::SURFACE, "worker {}: present failed: {err:#}", self.id);
        }
        let bad = presented.is_err();
        self.commit(|st| {
            if bad {
                st.surface_is_bad = true;
            }
            // A request that arrived mid-frame is served by the next one.
            st.render_complete = !st.request_render;
            if st.render_complete {
                st.want_render_notification = false;
            }
            st.frame_in_flight = false;
        });
    }

    /// Runs `call` with the renderer and the held GPU objects.
    ///
    /// Returns `false` without calling it when context or surface is missing.
    fn with_renderer(
        &mut self,
        call: impl FnOnce(&mut dyn Renderer<A>, &mut SurfaceCtx<'_, A>, &A::Configuration),
    ) -> bool {
        let (Some(config), Some(context), Some(surface)) =
            (self.config.as_ref(), self.context.as_ref(), self.surface.as_mut())
        else {
            return false;
        };
        let parts = &mut self.parts;
        let mut ctx = SurfaceCtx {
            api: &parts.api,
            display: parts.api.display(),
            context,
            surface,
        };
        call(parts.renderer.as_mut(), &mut ctx, config);
        true
    }

    fn release_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.trace_api("destroy_window_surface");
            let parts = &mut self.parts;
            parts
                .surface_factory
                .destroy_window_surface(&parts.api, parts.api.display(), surface);
            log::debug!(target: logging::SURFACE, "worker {}: window surface released", self.id);
        }
    }

    fn release_context(&mut self) {
        if let Some(context) = self.context.take() {
            self.trace_api("destroy_context");
            let parts = &mut self.parts;
            parts
                .context_factory
                .destroy_context(&parts.api, parts.api.display(), context);
            self.config = None;
            self.announce_context = false;
            log::info!(target: logging::SURFACE, "worker {}: context released", self.id);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
