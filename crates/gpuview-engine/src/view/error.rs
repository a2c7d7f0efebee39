use std::io;

use thiserror::Error;

/// Misuse of the view API.
///
/// Returned synchronously; the call that failed changed nothing.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("invalid render mode {0} (expected 0 = when dirty or 1 = continuously)")]
    InvalidRenderMode(u32),

    #[error("a renderer is already registered; this setting is fixed once the worker starts")]
    AlreadyStarted,

    #[error("no renderer registered yet")]
    NotStarted,

    #[error("failed to spawn the render worker thread: {0}")]
    Spawn(#[from] io::Error),
}
