//! Logging utilities.
//!
//! Logger initialization plus the log targets used by the worker. Each target
//! covers one area of the lifecycle so it can be switched on independently,
//! e.g. `RUST_LOG=info,gpuview::pause_resume=debug`.

mod init;

pub use init::{LoggingConfig, init_logging};

/// Worker thread start/exit and registry bookkeeping.
pub const THREADS: &str = "gpuview::threads";

/// Pause/resume requests and transitions.
pub const PAUSE_RESUME: &str = "gpuview::pause_resume";

/// Host surface notifications, context/surface acquisition and release.
pub const SURFACE: &str = "gpuview::surface";

/// Renderer created/changed callbacks.
pub const RENDERER: &str = "gpuview::renderer";

/// Per-frame draw callbacks. Very chatty in continuous mode.
pub const DRAW: &str = "gpuview::draw";

/// Capability calls, emitted only with `DebugFlags::LOG_API_CALLS`.
pub const API: &str = "gpuview::api";

/// Facade attach/detach and teardown.
pub const ATTACH: &str = "gpuview::attach";
