use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::capability::{
    ComponentSizes, ConfigurationChooser, ContextFactory, GpuApi, WindowSurfaceFactory,
};

use super::{
    FixedConfigChooser, WgpuConfig, WgpuContext, WgpuContextFactory, WgpuSurface,
    WinitSurfaceFactory,
};

/// wgpu backend for the render worker.
///
/// Owns the `wgpu::Instance`; each worker context is its own adapter, device
/// and queue, and each window surface is created against that device.
pub struct WgpuApi {
    instance: wgpu::Instance,
    base_config: WgpuConfig,
}

impl WgpuApi {
    /// Uses all backends to allow wgpu to select the optimal platform backend.
    pub fn new() -> Self {
        Self::with_config(WgpuConfig::default())
    }

    /// `base_config` is what the default chooser returns.
    pub fn with_config(base_config: WgpuConfig) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        Self {
            instance,
            base_config,
        }
    }
}

impl Default for WgpuApi {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuApi for WgpuApi {
    type Display = wgpu::Instance;
    type Configuration = WgpuConfig;
    type Context = WgpuContext;
    type Surface = WgpuSurface;
    type NativeWindow = Arc<Window>;

    fn display(&self) -> &wgpu::Instance {
        &self.instance
    }

    fn swap_buffers(
        &self,
        _instance: &wgpu::Instance,
        context: &WgpuContext,
        surface: &mut WgpuSurface,
    ) -> anyhow::Result<()> {
        surface.present(context)
    }

    fn surface_resized(
        &self,
        context: &WgpuContext,
        surface: &mut WgpuSurface,
        width: u32,
        height: u32,
    ) {
        surface.resize(context, PhysicalSize::new(width, height));
    }

    fn check_errors(&self, context: &WgpuContext) -> Option<String> {
        context.take_error()
    }

    fn default_context_factory(&self, client_version: u32) -> Box<dyn ContextFactory<Self>> {
        Box::new(WgpuContextFactory::for_client_version(client_version))
    }

    fn default_window_surface_factory(&self) -> Box<dyn WindowSurfaceFactory<Self>> {
        Box::new(WinitSurfaceFactory)
    }

    fn default_configuration_chooser(&self) -> Box<dyn ConfigurationChooser<Self>> {
        Box::new(FixedConfigChooser(self.base_config.clone()))
    }

    fn component_size_chooser(&self, sizes: ComponentSizes) -> Box<dyn ConfigurationChooser<Self>> {
        let config = WgpuConfig {
            present_mode: self.base_config.present_mode,
            required_features: self.base_config.required_features,
            desired_maximum_frame_latency: self.base_config.desired_maximum_frame_latency,
            ..WgpuConfig::for_component_sizes(sizes)
        };
        Box::new(FixedConfigChooser(config))
    }
}
