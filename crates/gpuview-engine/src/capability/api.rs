use super::factory::{ComponentSizes, ConfigurationChooser, ContextFactory, WindowSurfaceFactory};

/// A GPU backend as seen by the render worker.
///
/// The associated types are opaque to the worker; it only moves them between
/// the factories, the renderer and [`GpuApi::swap_buffers`]. The backend value
/// is moved onto the worker thread when the worker starts and is only touched
/// from there afterwards.
pub trait GpuApi: Send + Sized + 'static {
    /// Connection to the presentation system (EGL display, wgpu instance, ...).
    type Display;

    /// Pixel/depth/stencil format selection produced by a [`ConfigurationChooser`].
    type Configuration: Clone + Send + 'static;

    /// Rendering context (device + queue for wgpu).
    type Context: Send + 'static;

    /// Presentable window surface.
    type Surface: Send + 'static;

    /// Handle to the host's drawable, as delivered by the host widget.
    type NativeWindow: Clone + Send + Sync + 'static;

    /// Returns the display every capability call is made against.
    fn display(&self) -> &Self::Display;

    /// Presents the frame rendered into `surface`.
    ///
    /// An error marks the surface bad; the worker stops drawing until the host
    /// destroys and recreates it.
    fn swap_buffers(
        &self,
        display: &Self::Display,
        context: &Self::Context,
        surface: &mut Self::Surface,
    ) -> anyhow::Result<()>;

    /// Called on the worker thread before `Renderer::on_surface_changed`.
    ///
    /// Backends whose surfaces track the window size implicitly can ignore it.
    fn surface_resized(
        &self,
        context: &Self::Context,
        surface: &mut Self::Surface,
        width: u32,
        height: u32,
    ) {
        let _ = (context, surface, width, height);
    }

    /// Reports a pending backend error, if any.
    ///
    /// Polled after every frame while `DebugFlags::CHECK_ERRORS` is set.
    fn check_errors(&self, context: &Self::Context) -> Option<String> {
        let _ = context;
        None
    }

    /// Context factory used when the view was not given one.
    ///
    /// `client_version` is the value set through
    /// `SurfaceView::set_context_client_version`; `0` means "backend default".
    fn default_context_factory(&self, client_version: u32) -> Box<dyn ContextFactory<Self>>;

    /// Window surface factory used when the view was not given one.
    fn default_window_surface_factory(&self) -> Box<dyn WindowSurfaceFactory<Self>>;

    /// Configuration chooser used when the view was not given one.
    fn default_configuration_chooser(&self) -> Box<dyn ConfigurationChooser<Self>>;

    /// Builds a chooser that asks for the given component sizes.
    fn component_size_chooser(&self, sizes: ComponentSizes) -> Box<dyn ConfigurationChooser<Self>>;
}

/// GPU objects handed to renderer callbacks.
///
/// Only exists on the worker thread, for the duration of one callback.
pub struct SurfaceCtx<'a, A: GpuApi> {
    pub api: &'a A,
    pub display: &'a A::Display,
    pub context: &'a A::Context,
    pub surface: &'a mut A::Surface,
}
