use super::api::{GpuApi, SurfaceCtx};

/// Application rendering callbacks.
///
/// All three run on the worker thread with no lock held, so they may call back
/// into the view or its `RenderWorker` handle; blocking operations return
/// immediately when called from here.
///
/// Per context acquisition the order is: `on_surface_created` once, then
/// `on_surface_changed` for the first known size and every resize after it,
/// then `on_draw_frame` for every eligible frame.
pub trait Renderer<A: GpuApi>: Send {
    /// A new context and surface are ready. GPU resources owned by the
    /// previous context (if any) are gone.
    fn on_surface_created(&mut self, ctx: &mut SurfaceCtx<'_, A>, config: &A::Configuration);

    /// The drawable size changed. Both dimensions are non-zero.
    fn on_surface_changed(&mut self, ctx: &mut SurfaceCtx<'_, A>, width: u32, height: u32);

    /// Draws one frame. The worker presents it when this returns.
    fn on_draw_frame(&mut self, ctx: &mut SurfaceCtx<'_, A>);
}
