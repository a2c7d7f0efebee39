//! gpuview engine crate.
//!
//! This crate owns the render-worker lifecycle: a background thread per drawing
//! surface that holds the GPU context and window surface, and the blocking
//! control protocol the owning thread uses to create, resize, pause, resume and
//! destroy them.

pub mod capability;
pub mod device;
pub mod logging;
pub mod view;
pub mod window;
pub mod worker;

#[cfg(test)]
mod testing;

pub use capability::{
    ComponentSizes, ConfigurationChooser, ContextFactory, GpuApi, Renderer, SurfaceCtx,
    WindowSurfaceFactory,
};
pub use view::{DebugFlags, SurfaceBinding, SurfaceCallbacks, SurfaceView, ViewConfig, ViewError};
pub use worker::{RenderMode, RenderWorker, WorkerRegistry, WorkerStatus};
