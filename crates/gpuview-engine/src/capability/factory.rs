use super::api::GpuApi;

/// Creates and destroys rendering contexts.
///
/// Called only from the worker thread, never while the worker monitor is held.
/// A failed `create_context` marks the surface bad instead of propagating.
pub trait ContextFactory<A: GpuApi>: Send {
    fn create_context(
        &mut self,
        api: &A,
        display: &A::Display,
        config: &A::Configuration,
    ) -> anyhow::Result<A::Context>;

    fn destroy_context(&mut self, api: &A, display: &A::Display, context: A::Context);
}

/// Creates and destroys presentable surfaces for the host's native window.
///
/// `context` is the live context the surface will be presented with; backends
/// that configure surfaces against a device (wgpu) need it.
pub trait WindowSurfaceFactory<A: GpuApi>: Send {
    fn create_window_surface(
        &mut self,
        api: &A,
        display: &A::Display,
        config: &A::Configuration,
        context: &A::Context,
        native_window: &A::NativeWindow,
    ) -> anyhow::Result<A::Surface>;

    fn destroy_window_surface(&mut self, api: &A, display: &A::Display, surface: A::Surface);
}

/// Selects the surface configuration (color/depth/stencil format).
///
/// Invoked once per context acquisition.
pub trait ConfigurationChooser<A: GpuApi>: Send {
    fn choose_configuration(&mut self, api: &A, display: &A::Display)
    -> anyhow::Result<A::Configuration>;
}

/// Requested bit sizes per surface component.
///
/// Backends treat these as minimums and round up to the nearest format they
/// support.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ComponentSizes {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    pub depth: u8,
    pub stencil: u8,
}

impl ComponentSizes {
    /// 8-bit RGB without alpha, with an optional 16-bit depth buffer.
    pub const fn rgb888(with_depth: bool) -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 0,
            depth: if with_depth { 16 } else { 0 },
            stencil: 0,
        }
    }

    pub const fn has_depth(&self) -> bool {
        self.depth > 0
    }

    pub const fn has_stencil(&self) -> bool {
        self.stencil > 0
    }

    pub const fn has_alpha(&self) -> bool {
        self.alpha > 0
    }
}

impl Default for ComponentSizes {
    fn default() -> Self {
        Self::rgb888(true)
    }
}
