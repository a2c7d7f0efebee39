use crate::capability::GpuApi;
use crate::logging;

use super::facade::SurfaceView;

/// Notifications a host widget sends about its drawable.
///
/// All of them are delivered on the host's control thread.
pub trait SurfaceCallbacks {
    type NativeWindow;

    /// The drawable exists. Returns once the worker has acquired its surface
    /// (or cannot right now).
    fn surface_created(&self, native_window: Self::NativeWindow);

    /// The drawable changed format or size.
    fn surface_changed(&self, format: u32, width: u32, height: u32);

    /// The drawable is about to go away. Returns once the worker no longer
    /// uses it.
    fn surface_destroyed(&self);

    /// The host needs the drawable repainted before it continues.
    fn surface_redraw_needed(&self);
}

/// Routes host drawable notifications to a view and its worker.
///
/// Stateless; it records the native window and size on the view so a worker
/// started later still picks them up.
pub struct SurfaceBinding<'v, A: GpuApi> {
    view: &'v SurfaceView<A>,
}

impl<'v, A: GpuApi> SurfaceBinding<'v, A> {
    pub(crate) fn new(view: &'v SurfaceView<A>) -> Self {
        Self { view }
    }
}

impl<A: GpuApi> SurfaceCallbacks for SurfaceBinding<'_, A> {
    type NativeWindow = A::NativeWindow;

    fn surface_created(&self, native_window: A::NativeWindow) {
        self.view.host().set_native_window(Some(native_window));
        if let Some(worker) = self.view.worker() {
            worker.surface_created();
        }
    }

    fn surface_changed(&self, format: u32, width: u32, height: u32) {
        log::trace!(target: logging::SURFACE, "host surface changed: format {format}, {width}x{height}");
        self.view.host().set_size(width, height);
        if let Some(worker) = self.view.worker() {
            worker.surface_resized(width, height);
        }
    }

    fn surface_destroyed(&self) {
        if let Some(worker) = self.view.worker() {
            worker.surface_destroyed();
        }
        self.view.host().set_native_window(None);
    }

    fn surface_redraw_needed(&self) {
        if let Some(worker) = self.view.worker() {
            worker.request_render_and_wait();
        }
    }
}
