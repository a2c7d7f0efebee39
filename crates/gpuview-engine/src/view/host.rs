use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use super::config::DebugFlags;

/// What the view knows about its host drawable.
///
/// Shared between the view and its worker; the worker only holds a weak
/// reference and copes with the view being gone.
#[derive(Debug)]
pub(crate) struct ViewHost<W> {
    surface: Mutex<HostSurface<W>>,
    debug_flags: AtomicU32,
}

#[derive(Debug)]
struct HostSurface<W> {
    window: Option<W>,
    width: u32,
    height: u32,
}

impl<W: Clone> ViewHost<W> {
    pub fn new() -> Self {
        Self {
            surface: Mutex::new(HostSurface {
                window: None,
                width: 0,
                height: 0,
            }),
            debug_flags: AtomicU32::new(0),
        }
    }

    fn with_surface<R>(&self, f: impl FnOnce(&mut HostSurface<W>) -> R) -> R {
        f(&mut self.surface.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn native_window(&self) -> Option<W> {
        self.with_surface(|s| s.window.clone())
    }

    pub fn set_native_window(&self, window: Option<W>) {
        self.with_surface(|s| s.window = window);
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.with_surface(|s| {
            s.width = width;
            s.height = height;
        });
    }

    /// `(has_window, width, height)`.
    pub fn snapshot(&self) -> (bool, u32, u32) {
        self.with_surface(|s| (s.window.is_some(), s.width, s.height))
    }

    pub fn debug_flags(&self) -> DebugFlags {
        DebugFlags::from_bits_truncate(self.debug_flags.load(Ordering::Relaxed))
    }

    pub fn set_debug_flags(&self, flags: DebugFlags) {
        self.debug_flags.store(flags.bits(), Ordering::Relaxed);
    }
}
