//! Render worker.
//!
//! One background thread per drawing surface. It owns the GPU context and the
//! window surface and is the only thread that calls the capability providers
//! and the renderer. Control threads talk to it through a [`RenderWorker`]
//! handle; both sides meet at the [`WorkerRegistry`] monitor.

mod handle;
mod registry;
mod run;
mod state;


pub use handle::RenderWorker;
pub use registry::WorkerRegistry;
pub use state::{RenderMode, WorkerStatus};

pub(crate) use run::{SpawnFailed, WorkerParts, spawn};
pub(crate) use state::WorkerInit;
