//! wgpu backend for the render worker.
//!
//! This module is responsible for:
//! - creating the per-worker Adapter/Device/Queue ([`WgpuContextFactory`])
//! - creating & configuring window surfaces ([`WinitSurfaceFactory`])
//! - acquiring frames for renderers and presenting them

mod context;
mod gpu;
mod init;
mod surface;

pub use context::{WgpuContext, WgpuContextFactory, limits_for_client_version};
pub use gpu::WgpuApi;
pub use init::{FixedConfigChooser, WgpuConfig};
pub use surface::{GpuFrame, WgpuSurface, WinitSurfaceFactory};
