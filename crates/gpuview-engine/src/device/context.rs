use std::sync::{Arc, mpsc};

use anyhow::Context as _;

use crate::capability::ContextFactory;

use super::{WgpuApi, WgpuConfig};

/// Adapter, device and queue owned by one worker.
pub struct WgpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    errors: mpsc::Receiver<String>,
}

impl WgpuContext {
    /// Oldest uncaptured device error not reported yet.
    pub(crate) fn take_error(&self) -> Option<String> {
        self.errors.try_recv().ok()
    }
}

/// Device limits for a client version; `0` picks conservative defaults.
pub fn limits_for_client_version(version: u32) -> wgpu::Limits {
    match version {
        0 => wgpu::Limits::downlevel_defaults(),
        1 | 2 => wgpu::Limits::downlevel_webgl2_defaults(),
        _ => wgpu::Limits::default(),
    }
}

/// Requests an adapter and a device with fixed limits.
#[derive(Debug, Clone)]
pub struct WgpuContextFactory {
    pub power_preference: wgpu::PowerPreference,
    pub required_limits: wgpu::Limits,
}

impl WgpuContextFactory {
    pub fn for_client_version(version: u32) -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_limits: limits_for_client_version(version),
        }
    }

    async fn request(
        &self,
        instance: &wgpu::Instance,
        config: &WgpuConfig,
    ) -> anyhow::Result<WgpuContext> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gpuview worker device"),
                required_features: config.required_features,
                required_limits: self.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let (error_tx, errors) = mpsc::channel();
        device.on_uncaptured_error(Arc::new(move |error| {
            let _ = error_tx.send(error.to_string());
        }));

        Ok(WgpuContext {
            adapter,
            device,
            queue,
            errors,
        })
    }
}

impl ContextFactory<WgpuApi> for WgpuContextFactory {
    fn create_context(
        &mut self,
        _api: &WgpuApi,
        instance: &wgpu::Instance,
        config: &WgpuConfig,
    ) -> anyhow::Result<WgpuContext> {
        let context = pollster::block_on(self.request(instance, config))?;
        let info = context.adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);
        Ok(context)
    }

    fn destroy_context(&mut self, _api: &WgpuApi, _instance: &wgpu::Instance, context: WgpuContext) {
        context.device.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_versions_map_to_limits() {
        assert_eq!(limits_for_client_version(0), wgpu::Limits::downlevel_defaults());
        assert_eq!(limits_for_client_version(2), wgpu::Limits::downlevel_webgl2_defaults());
        assert_eq!(limits_for_client_version(3), wgpu::Limits::default());
        assert_eq!(limits_for_client_version(30), wgpu::Limits::default());
    }
}
