use std::sync::Arc;

use anyhow::{Context as _, bail};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::capability::WindowSurfaceFactory;

use super::{WgpuApi, WgpuConfig, WgpuContext};

/// Swapchain texture and encoder of the frame being drawn.
///
/// Renderers record into `encoder` and target `view`; the worker submits and
/// presents after `on_draw_frame` returns.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What a failed texture acquisition means for the worker.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Miss {
    /// Nothing is drawn this pass; the next frame tries again.
    Skip,
    /// Present fails and the worker marks the surface bad.
    Lost,
}

/// Window surface owned by one worker, plus its depth target and the frame
/// being drawn.
pub struct WgpuSurface {
    // Declared first so a pending frame is dropped before its surface.
    frame: Option<GpuFrame>,
    depth_view: Option<wgpu::TextureView>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth_format: Option<wgpu::TextureFormat>,
    fatal: bool,
}

impl WgpuSurface {
    /// Returns the active surface format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Depth/stencil view matching the current size, if the configuration
    /// asked for one.
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth_view.as_ref()
    }

    /// The frame of the current draw, acquired on first use.
    ///
    /// `None` when no texture could be acquired this time; the draw should
    /// record nothing. The worker presents the frame after `on_draw_frame`.
    pub fn frame(&mut self, ctx: &WgpuContext) -> Option<&mut GpuFrame> {
        if self.frame.is_none() {
            self.frame = self.acquire(ctx);
        }
        self.frame.as_mut()
    }

    fn acquire(&mut self, ctx: &WgpuContext) -> Option<GpuFrame> {
        match self.surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let encoder = ctx
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("gpuview frame encoder"),
                    });
                Some(GpuFrame {
                    surface_texture,
                    view,
                    encoder,
                })
            }
            Err(err) => {
                let reason = err.to_string();
                let miss = self.recover(ctx, err);
                log::debug!("frame not acquired: {reason} ({miss:?})");
                self.fatal |= miss == Miss::Lost;
                None
            }
        }
    }

    /// Reconfigures after a lost or outdated swapchain.
    fn recover(&self, ctx: &WgpuContext, err: wgpu::SurfaceError) -> Miss {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.size.width > 0 && self.size.height > 0 {
                    self.surface.configure(&ctx.device, &self.config);
                }
                Miss::Skip
            }
            wgpu::SurfaceError::OutOfMemory => Miss::Lost,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Miss::Skip,
        }
    }

    /// Submits and presents the pending frame, if any.
    pub(crate) fn present(&mut self, ctx: &WgpuContext) -> anyhow::Result<()> {
        if self.fatal {
            bail!("surface lost beyond recovery");
        }
        if let Some(frame) = self.frame.take() {
            ctx.queue.submit(std::iter::once(frame.encoder.finish()));
            drop(frame.view);
            frame.surface_texture.present();
        }
        Ok(())
    }

    /// Reconfigures the surface and depth target after a resize.
    pub(crate) fn resize(&mut self, ctx: &WgpuContext, new_size: PhysicalSize<u32>) {
        // A frame acquired at the old size would be presented stale.
        self.frame = None;
        apply_resize(&self.surface, &ctx.device, &mut self.config, &mut self.size, new_size);
        self.depth_view = create_depth_view(&ctx.device, self.depth_format, self.size);
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// wgpu cannot configure a 0x0 surface; in that case only `size` is updated
/// and configuration waits for a usable size.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;
    surface.configure(device, config);
}

fn create_depth_view(
    device: &wgpu::Device,
    format: Option<wgpu::TextureFormat>,
    size: PhysicalSize<u32>,
) -> Option<wgpu::TextureView> {
    let format = format?;
    if size.width == 0 || size.height == 0 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gpuview depth"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

/// Creates surfaces for winit windows against the worker's device.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinitSurfaceFactory;

impl WindowSurfaceFactory<WgpuApi> for WinitSurfaceFactory {
    fn create_window_surface(
        &mut self,
        _api: &WgpuApi,
        instance: &wgpu::Instance,
        config: &WgpuConfig,
        context: &WgpuContext,
        window: &Arc<Window>,
    ) -> anyhow::Result<WgpuSurface> {
        let size = window.inner_size();

        // The surface keeps its own handle to the window, so it is 'static.
        let surface = instance
            .create_surface(Arc::clone(window))
            .context("failed to create wgpu surface")?;
        anyhow::ensure!(
            context.adapter.is_surface_supported(&surface),
            "adapter cannot present to this window"
        );

        let caps = surface.get_capabilities(&context.adapter);
        let format = choose_surface_format(&caps, config.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = choose_alpha_mode(&caps, config.alpha_mode);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: config.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: config.desired_maximum_frame_latency,
        };
        surface.configure(&context.device, &surface_config);

        Ok(WgpuSurface {
            depth_view: create_depth_view(&context.device, config.depth_format, size),
            surface,
            config: surface_config,
            size,
            depth_format: config.depth_format,
            frame: None,
            fatal: false,
        })
    }

    fn destroy_window_surface(
        &mut self,
        _api: &WgpuApi,
        _instance: &wgpu::Instance,
        surface: WgpuSurface,
    ) {
        drop(surface);
    }
}
