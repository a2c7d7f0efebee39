use std::time::Duration;

use crate::worker::RenderMode;

bitflags::bitflags! {
    /// Diagnostics switched on for a view's worker.
    ///
    /// Can be changed while the worker runs; it reads them before each use.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct DebugFlags: u32 {
        /// Poll `GpuApi::check_errors` after every frame and log what it reports.
        const CHECK_ERRORS = 1;
        /// Log every capability call on the `gpuview::api` target.
        const LOG_API_CALLS = 1 << 1;
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Settings a view hands to each worker it starts.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Render mode of the next worker. Kept in sync with the running worker
    /// across detach/attach.
    pub render_mode: RenderMode,

    /// Keep the context (and the renderer's GPU resources) while paused.
    pub preserve_context_on_pause: bool,

    /// Passed to `GpuApi::default_context_factory`; `0` is the backend default.
    pub context_client_version: u32,

    /// Longest the worker sleeps between checks when it has nothing to do.
    pub idle_timeout: Duration,

    /// Worker thread stack size; `None` is the platform default.
    pub worker_stack_size: Option<usize>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::default(),
            preserve_context_on_pause: true,
            context_client_version: 0,
            idle_timeout: Duration::from_millis(250),
            worker_stack_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_contain() {
        let both = DebugFlags::CHECK_ERRORS | DebugFlags::LOG_API_CALLS;
        assert!(both.contains(DebugFlags::CHECK_ERRORS));
        assert!(both.contains(DebugFlags::LOG_API_CALLS));
        assert!(!DebugFlags::CHECK_ERRORS.contains(DebugFlags::LOG_API_CALLS));
        assert!(DebugFlags::default().is_empty());
    }

    #[test]
    fn truncation_drops_unknown_bits() {
        assert_eq!(DebugFlags::from_bits_truncate(0xff).bits(), 3);
        assert_eq!(DebugFlags::from_bits_truncate(2), DebugFlags::LOG_API_CALLS);
        assert_eq!(DebugFlags::from_bits(4), None);
    }

    #[test]
    fn defaults_preserve_context_and_render_continuously() {
        let config = ViewConfig::default();
        assert!(config.preserve_context_on_pause);
        assert_eq!(config.render_mode, RenderMode::Continuously);
        assert_eq!(config.context_client_version, 0);
        assert_eq!(config.idle_timeout, Duration::from_millis(250));
    }
}
