//! Capability provider contracts.
//!
//! The worker never names a concrete GPU backend. Everything it needs from one
//! goes through these traits:
//! - [`GpuApi`]: the backend itself (display, presentation, default providers)
//! - [`ContextFactory`], [`WindowSurfaceFactory`], [`ConfigurationChooser`]:
//!   pluggable acquisition strategies
//! - [`Renderer`]: application callbacks run on the worker thread

mod api;
mod factory;
mod renderer;

pub use api::{GpuApi, SurfaceCtx};
pub use factory::{ComponentSizes, ConfigurationChooser, ContextFactory, WindowSurfaceFactory};
pub use renderer::Renderer;
