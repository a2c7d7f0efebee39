use std::time::Instant;

use anyhow::{Context, Result};
use gpuview_engine::device::{WgpuApi, WgpuConfig};
use gpuview_engine::logging::{LoggingConfig, init_logging};
use gpuview_engine::window::{HostRuntime, RuntimeConfig};
use gpuview_engine::{DebugFlags, RenderMode, Renderer, SurfaceCtx, SurfaceView};
use winit::dpi::LogicalSize;

/// Clears the window with a slowly cycling color.
struct PulseRenderer {
    started: Instant,
    frames: u64,
}

impl PulseRenderer {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
        }
    }

    fn clear_color(&self) -> wgpu::Color {
        let t = self.started.elapsed().as_secs_f64();
        let wave = |phase: f64| 0.5 + 0.5 * (t * 0.8 + phase).sin();
        wgpu::Color {
            r: 0.1 + 0.3 * wave(0.0),
            g: 0.1 + 0.3 * wave(2.1),
            b: 0.2 + 0.4 * wave(4.2),
            a: 1.0,
        }
    }
}

impl Renderer<WgpuApi> for PulseRenderer {
    fn on_surface_created(&mut self, ctx: &mut SurfaceCtx<'_, WgpuApi>, config: &WgpuConfig) {
        log::info!(
            "surface ready: {:?}, present mode {:?}",
            ctx.surface.format(),
            config.present_mode
        );
    }

    fn on_surface_changed(&mut self, _ctx: &mut SurfaceCtx<'_, WgpuApi>, width: u32, height: u32) {
        log::info!("surface resized to {width}x{height}");
    }

    fn on_draw_frame(&mut self, ctx: &mut SurfaceCtx<'_, WgpuApi>) {
        let color = self.clear_color();
        let Some(frame) = ctx.surface.frame(ctx.context) else {
            return;
        };

        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gpuview-studio clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        self.frames += 1;
        if self.frames % 600 == 0 {
            log::debug!("{} frames drawn", self.frames);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig {
        worker_diagnostics: cfg!(debug_assertions),
        ..LoggingConfig::default()
    });

    let mut view = SurfaceView::new(WgpuApi::new());
    view.set_depth_buffer_required(false)
        .context("configuring surface view")?;
    view.set_render_mode(RenderMode::Continuously);
    if cfg!(debug_assertions) {
        view.set_debug_flags(DebugFlags::CHECK_ERRORS);
    }
    view.register_renderer(PulseRenderer::new())
        .context("starting render worker")?;

    HostRuntime::run(
        RuntimeConfig {
            title: "gpuview studio".to_string(),
            initial_size: LogicalSize::new(960.0, 540.0),
        },
        view,
    )
}
