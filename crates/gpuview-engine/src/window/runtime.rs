use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::capability::GpuApi;
use crate::logging;
use crate::view::{SurfaceCallbacks, SurfaceView, ViewError};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "gpuview".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
///
/// Runs the event loop on the calling thread, which becomes the view's control
/// thread. Rendering happens on the view's worker.
pub struct HostRuntime;

impl HostRuntime {
    pub fn run<A>(config: RuntimeConfig, view: SurfaceView<A>) -> Result<()>
    where
        A: GpuApi<NativeWindow = Arc<Window>>,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = HostState {
            config,
            view,
            window: None,
            suspended: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

struct HostState<A: GpuApi<NativeWindow = Arc<Window>>> {
    config: RuntimeConfig,
    view: SurfaceView<A>,
    window: Option<Arc<Window>>,
    suspended: bool,
}

impl<A> HostState<A>
where
    A: GpuApi<NativeWindow = Arc<Window>>,
{
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        Ok(Arc::new(window))
    }

    fn resized(&self, size: PhysicalSize<u32>) {
        self.view.binding().surface_changed(0, size.width, size.height);
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        self.view.binding().surface_destroyed();
        self.view.on_detached();
        self.window = None;
        event_loop.exit();
    }
}

/// Lifecycle calls before a renderer is registered are expected; anything
/// else is worth a warning.
fn report(what: &str, result: Result<(), ViewError>) {
    match result {
        Ok(()) => {}
        Err(ViewError::NotStarted) => {
            log::debug!(target: logging::ATTACH, "{what} ignored: no renderer yet");
        }
        Err(e) => log::warn!(target: logging::ATTACH, "{what} failed: {e}"),
    }
}

impl<A> ApplicationHandler for HostState<A>
where
    A: GpuApi<NativeWindow = Arc<Window>>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        let window = match self.window.clone() {
            Some(window) => window,
            None => match self.create_window(event_loop) {
                Ok(window) => {
                    self.window = Some(Arc::clone(&window));
                    window
                }
                Err(e) => {
                    log::error!("failed to create window: {e:#}");
                    event_loop.exit();
                    return;
                }
            },
        };

        if self.suspended {
            self.suspended = false;
            report("resume", self.view.on_resume());
        }

        let size = window.inner_size();
        let binding = self.view.binding();
        binding.surface_created(Arc::clone(&window));
        binding.surface_changed(0, size.width, size.height);
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.view.binding().surface_destroyed();
        report("pause", self.view.on_pause());
        self.suspended = true;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.close(event_loop),

            WindowEvent::Resized(new_size) => self.resized(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.resized(window.inner_size());
                }
            }

            WindowEvent::RedrawRequested => self.view.binding().surface_redraw_needed(),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.view.worker().is_some() {
            self.view.binding().surface_destroyed();
            self.view.on_detached();
        }
    }
}
