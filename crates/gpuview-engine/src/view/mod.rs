//! Control facade and host binding.
//!
//! [`SurfaceView`] is what an application owns: it collects the capability
//! providers, starts the render worker when a renderer is registered and
//! forwards lifecycle calls to it. [`SurfaceBinding`] adapts host drawable
//! notifications onto the same worker.

mod binding;
mod config;
mod error;
mod facade;
mod host;

pub use binding::{SurfaceBinding, SurfaceCallbacks};
pub use config::{DebugFlags, ViewConfig};
pub use error::ViewError;
pub use facade::SurfaceView;

pub(crate) use host::ViewHost;
