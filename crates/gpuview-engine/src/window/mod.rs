//! Windowing/event loop integration.
//!
//! Drives a [`SurfaceView`](crate::SurfaceView) from a winit window: window
//! lifecycle events become host surface notifications and pause/resume calls.

mod runtime;

pub use runtime::{HostRuntime, RuntimeConfig};
