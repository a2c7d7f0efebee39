//! In-memory GPU backend for exercising the worker without a device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::capability::{
    ComponentSizes, ConfigurationChooser, ContextFactory, GpuApi, Renderer, SurfaceCtx,
    WindowSurfaceFactory,
};
use crate::view::SurfaceView;
use crate::worker::{WorkerRegistry, WorkerStatus};

/// Native window stand-in.
pub(crate) type FakeWindow = u32;

/// Counters and failure switches shared by every fake provider of one view.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    pub contexts_created: AtomicUsize,
    pub contexts_destroyed: AtomicUsize,
    pub surfaces_created: AtomicUsize,
    pub surfaces_destroyed: AtomicUsize,
    pub presents: AtomicUsize,
    pub backend_resizes: AtomicUsize,
    pub error_checks: AtomicUsize,

    pub fail_context: AtomicBool,
    pub fail_swap: AtomicBool,

    pub last_client_version: Mutex<Option<u32>>,
    pub last_sizes: Mutex<Option<ComponentSizes>>,
    /// Window and size of the surface last presented.
    pub last_present: Mutex<Option<(FakeWindow, u32, u32)>>,
}

impl Probe {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    pub fn last_present(&self) -> Option<(FakeWindow, u32, u32)> {
        *self.last_present.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeConfig {
    pub sizes: ComponentSizes,
}

#[derive(Debug)]
pub(crate) struct FakeContext {
    pub serial: usize,
}

#[derive(Debug)]
pub(crate) struct FakeSurface {
    pub window: FakeWindow,
    pub width: u32,
    pub height: u32,
}

pub(crate) struct FakeApi {
    probe: Arc<Probe>,
    traced: Option<Arc<AtomicUsize>>,
}

impl FakeApi {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let api = Self {
            probe: Arc::clone(&probe),
            traced: None,
        };
        (api, probe)
    }

    /// Same backend, also counting `swap_buffers` calls into `calls`.
    pub fn traced(self, calls: Arc<AtomicUsize>) -> Self {
        Self {
            traced: Some(calls),
            ..self
        }
    }
}

impl GpuApi for FakeApi {
    type Display = ();
    type Configuration = FakeConfig;
    type Context = FakeContext;
    type Surface = FakeSurface;
    type NativeWindow = FakeWindow;

    fn display(&self) -> &() {
        &()
    }

    fn swap_buffers(&self, _: &(), _: &FakeContext, surface: &mut FakeSurface) -> anyhow::Result<()> {
        if let Some(calls) = &self.traced {
            calls.fetch_add(1, Ordering::SeqCst);
        }
        anyhow::ensure!(!self.probe.fail_swap.load(Ordering::SeqCst), "swap failed");
        *self.probe.last_present.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((surface.window, surface.width, surface.height));
        self.probe.presents.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn surface_resized(&self, _: &FakeContext, surface: &mut FakeSurface, width: u32, height: u32) {
        surface.width = width;
        surface.height = height;
        self.probe.backend_resizes.fetch_add(1, Ordering::SeqCst);
    }

    fn check_errors(&self, _: &FakeContext) -> Option<String> {
        self.probe.error_checks.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn default_context_factory(&self, client_version: u32) -> Box<dyn ContextFactory<Self>> {
        *self
            .probe
            .last_client_version
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(client_version);
        Box::new(FakeProviders(Arc::clone(&self.probe)))
    }

    fn default_window_surface_factory(&self) -> Box<dyn WindowSurfaceFactory<Self>> {
        Box::new(FakeProviders(Arc::clone(&self.probe)))
    }

    fn default_configuration_chooser(&self) -> Box<dyn ConfigurationChooser<Self>> {
        self.component_size_chooser(ComponentSizes::default())
    }

    fn component_size_chooser(&self, sizes: ComponentSizes) -> Box<dyn ConfigurationChooser<Self>> {
        *self.probe.last_sizes.lock().unwrap_or_else(|e| e.into_inner()) = Some(sizes);
        Box::new(FakeChooser(sizes))
    }
}

struct FakeProviders(Arc<Probe>);

impl ContextFactory<FakeApi> for FakeProviders {
    fn create_context(&mut self, _: &FakeApi, _: &(), _: &FakeConfig) -> anyhow::Result<FakeContext> {
        anyhow::ensure!(!self.0.fail_context.load(Ordering::SeqCst), "no context for you");
        let serial = self.0.contexts_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeContext { serial })
    }

    fn destroy_context(&mut self, _: &FakeApi, _: &(), _: FakeContext) {
        self.0.contexts_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

impl WindowSurfaceFactory<FakeApi> for FakeProviders {
    fn create_window_surface(
        &mut self,
        _: &FakeApi,
        _: &(),
        _: &FakeConfig,
        _: &FakeContext,
        native_window: &FakeWindow,
    ) -> anyhow::Result<FakeSurface> {
        self.0.surfaces_created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSurface {
            window: *native_window,
            width: 0,
            height: 0,
        })
    }

    fn destroy_window_surface(&mut self, _: &FakeApi, _: &(), _: FakeSurface) {
        self.0.surfaces_destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeChooser(ComponentSizes);

impl ConfigurationChooser<FakeApi> for FakeChooser {
    fn choose_configuration(&mut self, _: &FakeApi, _: &()) -> anyhow::Result<FakeConfig> {
        Ok(FakeConfig { sizes: self.0 })
    }
}

/// Renderer callback as observed by the test thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderEvent {
    Created { context: usize, thread: ThreadId },
    Changed { width: u32, height: u32 },
    Draw { thread: ThreadId },
}

type DrawHook = Box<dyn FnMut() + Send>;

/// Renderer that reports every callback over a channel.
pub(crate) struct RecordingRenderer {
    tx: Sender<RenderEvent>,
    draw_delay: Duration,
    on_draw: Option<DrawHook>,
}

impl RecordingRenderer {
    pub fn new() -> (Self, Receiver<RenderEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let renderer = Self {
            tx,
            draw_delay: Duration::ZERO,
            on_draw: None,
        };
        (renderer, rx)
    }

    pub fn with_draw_delay(mut self, delay: Duration) -> Self {
        self.draw_delay = delay;
        self
    }

    /// Runs `hook` inside every `on_draw_frame`, after the event is sent.
    pub fn with_draw_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_draw = Some(Box::new(hook));
        self
    }
}

impl Renderer<FakeApi> for RecordingRenderer {
    fn on_surface_created(&mut self, ctx: &mut SurfaceCtx<'_, FakeApi>, _: &FakeConfig) {
        let _ = self.tx.send(RenderEvent::Created {
            context: ctx.context.serial,
            thread: thread::current().id(),
        });
    }

    fn on_surface_changed(&mut self, _: &mut SurfaceCtx<'_, FakeApi>, width: u32, height: u32) {
        let _ = self.tx.send(RenderEvent::Changed { width, height });
    }

    fn on_draw_frame(&mut self, _: &mut SurfaceCtx<'_, FakeApi>) {
        let _ = self.tx.send(RenderEvent::Draw {
            thread: thread::current().id(),
        });
        if let Some(hook) = self.on_draw.as_mut() {
            hook();
        }
        if !self.draw_delay.is_zero() {
            thread::sleep(self.draw_delay);
        }
    }
}

pub(crate) const WAIT: Duration = Duration::from_secs(5);
pub(crate) const QUIET: Duration = Duration::from_millis(300);

/// A view on its own registry, with its probe.
pub(crate) fn fake_view() -> (SurfaceView<FakeApi>, Arc<Probe>) {
    let (api, probe) = FakeApi::new();
    (SurfaceView::with_registry(api, WorkerRegistry::new()), probe)
}

/// Polls the worker status until `pred` holds.
pub(crate) fn eventually(view: &SurfaceView<FakeApi>, pred: impl Fn(&WorkerStatus) -> bool) {
    let deadline = Instant::now() + WAIT;
    loop {
        if view.status().as_ref().is_some_and(&pred) {
            return;
        }
        assert!(Instant::now() < deadline, "condition not reached: {:?}", view.status());
        thread::sleep(Duration::from_millis(5));
    }
}

/// Receives the next event, failing the test after [`WAIT`].
pub(crate) fn next_event(rx: &Receiver<RenderEvent>) -> RenderEvent {
    match rx.recv_timeout(WAIT) {
        Ok(event) => event,
        Err(e) => panic!("no renderer event: {e}"),
    }
}

/// Asserts no draw is reported for [`QUIET`].
pub(crate) fn assert_no_draw(rx: &Receiver<RenderEvent>) {
    let deadline = Instant::now() + QUIET;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(left) {
            Ok(RenderEvent::Draw { .. }) => panic!("unexpected draw"),
            Ok(_) => {}
            Err(_) => return,
        }
    }
}
