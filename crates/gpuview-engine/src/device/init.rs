use crate::capability::{ComponentSizes, ConfigurationChooser};

use super::WgpuApi;

/// Surface configuration chosen for a wgpu worker.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuConfig {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and generally appropriate for UI workloads.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Format of the depth/stencil texture created with each surface, if any.
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl WgpuConfig {
    /// Configuration satisfying at least `sizes`.
    pub fn for_component_sizes(sizes: ComponentSizes) -> Self {
        let alpha_mode = if sizes.has_alpha() {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            wgpu::CompositeAlphaMode::Opaque
        };
        Self {
            // sRGB targets only exist as 8-bit formats.
            prefer_srgb: sizes.red <= 8 && sizes.green <= 8 && sizes.blue <= 8,
            alpha_mode: Some(alpha_mode),
            depth_format: depth_format_for(sizes),
            ..Self::default()
        }
    }
}

impl Default for WgpuConfig {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            desired_maximum_frame_latency: 2,
            depth_format: None,
        }
    }
}

/// Smallest depth/stencil format with at least the requested bits.
pub(crate) fn depth_format_for(sizes: ComponentSizes) -> Option<wgpu::TextureFormat> {
    match (sizes.depth, sizes.has_stencil()) {
        (0, false) => None,
        (0, true) => Some(wgpu::TextureFormat::Stencil8),
        (_, true) => Some(wgpu::TextureFormat::Depth24PlusStencil8),
        (1..=16, false) => Some(wgpu::TextureFormat::Depth16Unorm),
        (17..=24, false) => Some(wgpu::TextureFormat::Depth24Plus),
        (_, false) => Some(wgpu::TextureFormat::Depth32Float),
    }
}

/// Always returns the same configuration.
#[derive(Debug, Clone)]
pub struct FixedConfigChooser(pub WgpuConfig);

impl ConfigurationChooser<WgpuApi> for FixedConfigChooser {
    fn choose_configuration(
        &mut self,
        _api: &WgpuApi,
        _instance: &wgpu::Instance,
    ) -> anyhow::Result<WgpuConfig> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_format_rounds_up() {
        let mut sizes = ComponentSizes::rgb888(false);
        assert_eq!(depth_format_for(sizes), None);

        sizes.depth = 16;
        assert_eq!(depth_format_for(sizes), Some(wgpu::TextureFormat::Depth16Unorm));
        sizes.depth = 24;
        assert_eq!(depth_format_for(sizes), Some(wgpu::TextureFormat::Depth24Plus));
        sizes.depth = 32;
        assert_eq!(depth_format_for(sizes), Some(wgpu::TextureFormat::Depth32Float));

        sizes.stencil = 8;
        assert_eq!(depth_format_for(sizes), Some(wgpu::TextureFormat::Depth24PlusStencil8));
        sizes.depth = 0;
        assert_eq!(depth_format_for(sizes), Some(wgpu::TextureFormat::Stencil8));
    }

    #[test]
    fn alpha_request_selects_premultiplied() {
        let mut sizes = ComponentSizes::default();
        assert_eq!(
            WgpuConfig::for_component_sizes(sizes).alpha_mode,
            Some(wgpu::CompositeAlphaMode::Opaque)
        );
        sizes.alpha = 8;
        let config = WgpuConfig::for_component_sizes(sizes);
        assert_eq!(config.alpha_mode, Some(wgpu::CompositeAlphaMode::PreMultiplied));
        assert!(config.prefer_srgb);
        assert_eq!(config.depth_format, Some(wgpu::TextureFormat::Depth16Unorm));
    }

    #[test]
    fn wide_color_does_not_prefer_srgb() {
        let sizes = ComponentSizes {
            red: 10,
            green: 10,
            blue: 10,
            alpha: 2,
            depth: 0,
            stencil: 0,
        };
        assert!(!WgpuConfig::for_component_sizes(sizes).prefer_srgb);
    }
}
