use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::capability::{
    ComponentSizes, ConfigurationChooser, ContextFactory, GpuApi, Renderer, WindowSurfaceFactory,
};
use crate::logging;
use crate::worker::{
    self, RenderMode, RenderWorker, SpawnFailed, WorkerInit, WorkerParts, WorkerRegistry,
    WorkerStatus,
};

use super::binding::SurfaceBinding;
use super::config::{DebugFlags, ViewConfig};
use super::error::ViewError;
use super::host::ViewHost;

/// A drawing surface backed by a dedicated render worker.
///
/// Configure it (providers, client version, context preservation), then call
/// [`register_renderer`](Self::register_renderer) to start the worker. Host
/// drawable notifications go through [`binding`](Self::binding); application
/// lifecycle goes through [`on_pause`](Self::on_pause),
/// [`on_resume`](Self::on_resume) and attach/detach.
///
/// Dropping the view stops the worker and waits for it to release its GPU
/// objects.
pub struct SurfaceView<A: GpuApi> {
    registry: Arc<WorkerRegistry>,
    host: Arc<ViewHost<A::NativeWindow>>,
    config: ViewConfig,

    // Providers collected before the first start.
    api: Option<A>,
    context_factory: Option<Box<dyn ContextFactory<A>>>,
    surface_factory: Option<Box<dyn WindowSurfaceFactory<A>>>,
    chooser: Option<Box<dyn ConfigurationChooser<A>>>,
    api_wrapper: Option<ApiWrapper<A>>,

    /// Providers and renderer of a detached worker (or of a worker whose
    /// thread failed to start), reused by the next start.
    retained: Option<WorkerParts<A>>,
    running: Option<Running<A>>,
    renderer_registered: bool,
    detached: bool,
}

type ApiWrapper<A> = Box<dyn FnOnce(A) -> A + Send>;

struct Running<A: GpuApi> {
    worker: RenderWorker,
    thread: JoinHandle<Option<WorkerParts<A>>>,
}

impl<A: GpuApi> fmt::Debug for SurfaceView<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceView")
            .field("config", &self.config)
            .field("worker", &self.worker())
            .field("renderer_registered", &self.renderer_registered)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

impl<A: GpuApi> SurfaceView<A> {
    /// Creates a view whose worker lives on the process-wide registry.
    pub fn new(api: A) -> Self {
        Self::with_registry(api, WorkerRegistry::global())
    }

    pub fn with_registry(api: A, registry: Arc<WorkerRegistry>) -> Self {
        Self {
            registry,
            host: Arc::new(ViewHost::new()),
            config: ViewConfig::default(),
            api: Some(api),
            context_factory: None,
            surface_factory: None,
            chooser: None,
            api_wrapper: None,
            retained: None,
            running: None,
            renderer_registered: false,
            detached: false,
        }
    }

    fn ensure_not_started(&self) -> Result<(), ViewError> {
        if self.renderer_registered {
            Err(ViewError::AlreadyStarted)
        } else {
            Ok(())
        }
    }

    fn pending_api(&self) -> Result<&A, ViewError> {
        self.ensure_not_started()?;
        self.api.as_ref().ok_or(ViewError::AlreadyStarted)
    }

    fn running_worker(&self) -> Result<&RenderWorker, ViewError> {
        self.worker().ok_or(ViewError::NotStarted)
    }

    pub fn set_context_factory(
        &mut self,
        factory: impl ContextFactory<A> + 'static,
    ) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.context_factory = Some(Box::new(factory));
        Ok(())
    }

    pub fn set_window_surface_factory(
        &mut self,
        factory: impl WindowSurfaceFactory<A> + 'static,
    ) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.surface_factory = Some(Box::new(factory));
        Ok(())
    }

    pub fn set_configuration_chooser(
        &mut self,
        chooser: impl ConfigurationChooser<A> + 'static,
    ) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.chooser = Some(Box::new(chooser));
        Ok(())
    }

    /// Wraps the backend before the worker starts, e.g. to log, trace or
    /// count its calls.
    ///
    /// Applied once in [`register_renderer`](Self::register_renderer), before
    /// the default providers are built, so they and the worker only see the
    /// wrapped backend. Choosers already built by
    /// [`set_component_sizes`](Self::set_component_sizes) come from the
    /// unwrapped one.
    pub fn set_api_wrapper(
        &mut self,
        wrapper: impl FnOnce(A) -> A + Send + 'static,
    ) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.api_wrapper = Some(Box::new(wrapper));
        Ok(())
    }

    /// Chooses an RGB888 configuration, with a 16-bit depth buffer if
    /// `required`.
    pub fn set_depth_buffer_required(&mut self, required: bool) -> Result<(), ViewError> {
        self.set_component_sizes(ComponentSizes::rgb888(required))
    }

    /// Chooses a configuration with at least the given component sizes.
    pub fn set_component_sizes(&mut self, sizes: ComponentSizes) -> Result<(), ViewError> {
        let chooser = self.pending_api()?.component_size_chooser(sizes);
        self.chooser = Some(chooser);
        Ok(())
    }

    /// Client version handed to the default context factory.
    pub fn set_context_client_version(&mut self, version: u32) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.config.context_client_version = version;
        Ok(())
    }

    pub fn set_preserve_context_on_pause(&mut self, preserve: bool) -> Result<(), ViewError> {
        self.ensure_not_started()?;
        self.config.preserve_context_on_pause = preserve;
        Ok(())
    }

    pub fn preserve_context_on_pause(&self) -> bool {
        self.config.preserve_context_on_pause
    }

    /// Idle wait bound of workers started after this call.
    pub fn set_idle_timeout(&mut self, timeout: Duration) {
        self.config.idle_timeout = timeout;
    }

    /// Stack size of worker threads started after this call; `None` keeps
    /// the platform default.
    pub fn set_worker_stack_size(&mut self, size: Option<usize>) {
        self.config.worker_stack_size = size;
    }

    pub fn set_debug_flags(&self, flags: DebugFlags) {
        self.host.set_debug_flags(flags);
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.host.debug_flags()
    }

    /// Registers the renderer and starts the worker.
    ///
    /// Providers that were not set are taken from the backend defaults. Can be
    /// called once per view; if the worker thread could not be started the
    /// view stays unstarted and a later call retries with the same providers.
    pub fn register_renderer(
        &mut self,
        renderer: impl Renderer<A> + 'static,
    ) -> Result<RenderWorker, ViewError> {
        self.ensure_not_started()?;
        let renderer: Box<dyn Renderer<A>> = Box::new(renderer);

        let parts = match self.retained.take() {
            Some(parts) => WorkerParts { renderer, ..parts },
            None => self.build_parts(renderer)?,
        };

        let worker = self.start(parts)?;
        self.renderer_registered = true;
        Ok(worker)
    }

    fn build_parts(&mut self, renderer: Box<dyn Renderer<A>>) -> Result<WorkerParts<A>, ViewError> {
        let mut api = self.api.take().ok_or(ViewError::AlreadyStarted)?;
        if let Some(wrap) = self.api_wrapper.take() {
            api = wrap(api);
            log::debug!(target: logging::ATTACH, "backend wrapped");
        }

        let chooser = self
            .chooser
            .take()
            .unwrap_or_else(|| api.default_configuration_chooser());
        let context_factory = self
            .context_factory
            .take()
            .unwrap_or_else(|| api.default_context_factory(self.config.context_client_version));
        let surface_factory = self
            .surface_factory
            .take()
            .unwrap_or_else(|| api.default_window_surface_factory());

        Ok(WorkerParts {
            api,
            context_factory,
            surface_factory,
            chooser,
            renderer,
        })
    }

    /// Registers a worker and spawns its thread. On failure the parts are
    /// kept in `retained` for the next attempt.
    fn start(&mut self, parts: WorkerParts<A>) -> Result<RenderWorker, ViewError> {
        let (has_host_surface, surface_width, surface_height) = self.host.snapshot();
        let worker = RenderWorker::register(
            Arc::clone(&self.registry),
            WorkerInit {
                render_mode: self.config.render_mode,
                preserve_context_on_pause: self.config.preserve_context_on_pause,
                has_host_surface,
                surface_width,
                surface_height,
            },
        );
        let spawned = worker::spawn(
            &worker,
            Arc::downgrade(&self.host),
            self.config.idle_timeout,
            self.config.worker_stack_size,
            parts,
        );
        let thread = match spawned {
            Ok(thread) => thread,
            Err(SpawnFailed { error, parts }) => {
                self.retained = parts;
                return Err(ViewError::Spawn(error));
            }
        };

        log::info!(target: logging::ATTACH, "started worker {}", worker.id());
        self.running = Some(Running {
            worker: worker.clone(),
            thread,
        });
        self.detached = false;
        Ok(worker)
    }

    /// Handle of the running worker, if any.
    pub fn worker(&self) -> Option<&RenderWorker> {
        self.running.as_ref().map(|running| &running.worker)
    }

    pub fn status(&self) -> Option<WorkerStatus> {
        self.worker().and_then(RenderWorker::status)
    }

    pub fn binding(&self) -> SurfaceBinding<'_, A> {
        SurfaceBinding::new(self)
    }

    pub(crate) fn host(&self) -> &ViewHost<A::NativeWindow> {
        &self.host
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.config.render_mode = mode;
        if let Some(worker) = self.worker() {
            worker.set_render_mode(mode);
        }
    }

    /// Sets the render mode from its raw value (`0` when dirty, `1`
    /// continuously). Other values are rejected and the mode is unchanged.
    pub fn set_render_mode_raw(&mut self, raw: u32) -> Result<(), ViewError> {
        let mode = RenderMode::try_from(raw)?;
        self.set_render_mode(mode);
        Ok(())
    }

    pub fn render_mode(&self) -> RenderMode {
        self.worker()
            .map(RenderWorker::render_mode)
            .unwrap_or(self.config.render_mode)
    }

    pub fn request_render(&self) -> Result<(), ViewError> {
        self.running_worker()?.request_render();
        Ok(())
    }

    pub fn request_render_and_wait(&self) -> Result<(), ViewError> {
        self.running_worker()?.request_render_and_wait();
        Ok(())
    }

    pub fn queue_event(&self, event: impl FnOnce() + Send + 'static) -> Result<(), ViewError> {
        self.running_worker()?.queue_event(event);
        Ok(())
    }

    pub fn request_context_release(&self) -> Result<(), ViewError> {
        self.running_worker()?.request_context_release();
        Ok(())
    }

    /// The application went to the background. Returns once the worker has
    /// released its surface.
    pub fn on_pause(&self) -> Result<(), ViewError> {
        self.running_worker()?.on_pause();
        Ok(())
    }

    pub fn on_resume(&self) -> Result<(), ViewError> {
        self.running_worker()?.on_resume();
        Ok(())
    }

    /// Restarts the worker stopped by [`on_detached`](Self::on_detached).
    ///
    /// Does nothing unless a renderer was registered and the view is detached.
    pub fn on_attached(&mut self) -> Result<(), ViewError> {
        log::debug!(target: logging::ATTACH, "attached (detached: {})", self.detached);
        if !self.detached || self.running.is_some() {
            return Ok(());
        }
        match self.retained.take() {
            Some(parts) => self.start(parts).map(drop),
            None => Ok(()),
        }
    }

    /// Stops the worker and waits for it. Providers, renderer and render mode
    /// are kept for [`on_attached`](Self::on_attached).
    pub fn on_detached(&mut self) {
        log::debug!(target: logging::ATTACH, "detached");
        if let Some(running) = self.running.take() {
            self.config.render_mode = running.worker.render_mode();
            self.retained = Self::stop(running);
        }
        self.detached = true;
    }

    fn stop(running: Running<A>) -> Option<WorkerParts<A>> {
        let Running { worker, thread } = running;
        let id = worker.id();
        worker.request_exit_and_wait();
        drop(worker);
        match thread.join() {
            Ok(parts) => parts,
            Err(_) => {
                log::error!(target: logging::ATTACH, "worker {id} thread could not be joined");
                None
            }
        }
    }
}

impl<A: GpuApi> Drop for SurfaceView<A> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            log::debug!(target: logging::ATTACH, "view dropped, stopping worker {}", running.worker.id());
            drop(Self::stop(running));
        }
    }
}
