use std::collections::VecDeque;
use std::fmt;
use std::thread::{self, ThreadId};

use crate::view::ViewError;

/// One-off callback run on the worker thread between frames.
pub type QueuedEvent = Box<dyn FnOnce() + Send + 'static>;

/// When the worker draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum RenderMode {
    /// Draw only after an explicit render request (or a resize/resume).
    WhenDirty,
    /// Draw on every loop pass that is able to draw.
    #[default]
    Continuously,
}

impl TryFrom<u32> for RenderMode {
    type Error = ViewError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(RenderMode::WhenDirty),
            1 => Ok(RenderMode::Continuously),
            other => Err(ViewError::InvalidRenderMode(other)),
        }
    }
}

impl From<RenderMode> for u32 {
    fn from(mode: RenderMode) -> Self {
        match mode {
            RenderMode::WhenDirty => 0,
            RenderMode::Continuously => 1,
        }
    }
}

/// Parameters a worker starts with.
#[derive(Debug, Copy, Clone)]
pub(crate) struct WorkerInit {
    pub render_mode: RenderMode,
    pub preserve_context_on_pause: bool,
    pub has_host_surface: bool,
    pub surface_width: u32,
    pub surface_height: u32,
}

/// One evaluation of the draw loop, in precedence order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Step {
    Exiting,
    Pausing,
    Resuming,
    ReleasingContext,
    AwaitingSurface,
    AcquiringContext,
    AcquiringSurface,
    Resizing,
    DrainingEvents,
    Drawing,
    Idle,
}

/// Work claimed under the monitor and carried out without it.
pub(crate) enum Work {
    Exit,
    Pause { release_context: bool },
    ReleaseContext,
    SurfaceLost { release_context: bool },
    AcquireContext,
    AcquireSurface,
    Resize { width: u32, height: u32 },
    RunEvent(QueuedEvent),
    Draw,
}

/// Lifecycle state of one render worker.
///
/// Lives inside the registry and is only read or written with the registry
/// monitor held.
pub(crate) struct WorkerState {
    pub worker_thread: Option<ThreadId>,

    pub surface_width: u32,
    pub surface_height: u32,
    pub render_mode: RenderMode,
    pub size_changed: bool,

    pub request_render: bool,
    pub render_complete: bool,
    pub want_render_notification: bool,
    pub frame_in_flight: bool,
    /// The outstanding frame request came from a resize and no waiter has
    /// claimed it yet. `request_render_and_wait` waits on that frame instead
    /// of asking for another one.
    pub resize_frame_pending: bool,

    pub has_gpu_context: bool,
    pub has_gpu_surface: bool,
    pub has_host_surface: bool,
    pub surface_is_bad: bool,

    pub waiting_for_surface: bool,
    pub surface_creation_finished: bool,

    pub pause_requested: bool,
    pub is_paused: bool,

    pub exit_requested: bool,
    pub has_exited: bool,

    pub should_release_context: bool,
    pub preserve_context_on_pause: bool,

    pub events: VecDeque<QueuedEvent>,
}

impl WorkerState {
    pub fn new(init: WorkerInit) -> Self {
        Self {
            worker_thread: None,
            surface_width: init.surface_width,
            surface_height: init.surface_height,
            render_mode: init.render_mode,
            size_changed: false,
            request_render: true,
            render_complete: false,
            want_render_notification: false,
            frame_in_flight: false,
            resize_frame_pending: false,
            has_gpu_context: false,
            has_gpu_surface: false,
            has_host_surface: init.has_host_surface,
            surface_is_bad: false,
            // Nothing is acquired yet, so the first `surface_created` waits for
            // the worker to finish acquisition.
            waiting_for_surface: true,
            surface_creation_finished: false,
            pause_requested: false,
            is_paused: false,
            exit_requested: false,
            has_exited: false,
            should_release_context: false,
            preserve_context_on_pause: init.preserve_context_on_pause,
            events: VecDeque::new(),
        }
    }

    /// True when called from this worker's own thread.
    pub fn is_worker_thread(&self) -> bool {
        self.worker_thread == Some(thread::current().id())
    }

    pub fn is_ready_to_draw(&self) -> bool {
        !self.is_paused
            && self.has_host_surface
            && !self.surface_is_bad
            && self.surface_width > 0
            && self.surface_height > 0
            && (self.request_render || self.render_mode == RenderMode::Continuously)
    }

    pub fn is_able_to_draw(&self) -> bool {
        self.has_gpu_context && self.has_gpu_surface && self.is_ready_to_draw()
    }

    fn may_acquire(&self) -> bool {
        self.has_host_surface && !self.is_paused && !self.surface_is_bad
    }

    /// Selects the next loop step. Earlier checks win.
    pub fn next_step(&self) -> Step {
        if self.exit_requested {
            return Step::Exiting;
        }
        if self.pause_requested && !self.is_paused {
            return Step::Pausing;
        }
        if !self.pause_requested && self.is_paused {
            return Step::Resuming;
        }
        if self.should_release_context {
            return Step::ReleasingContext;
        }
        // A bad surface that never got as far as clearing `waiting_for_surface`
        // still needs the destroy half of the recovery cycle.
        if !self.has_host_surface && (!self.waiting_for_surface || self.surface_is_bad) {
            return Step::AwaitingSurface;
        }
        if self.may_acquire() && !self.has_gpu_context {
            return Step::AcquiringContext;
        }
        if self.may_acquire() && !self.has_gpu_surface {
            return Step::AcquiringSurface;
        }
        if self.size_changed
            && self.has_gpu_surface
            && !self.is_paused
            && self.surface_width > 0
            && self.surface_height > 0
        {
            return Step::Resizing;
        }
        if !self.events.is_empty() {
            return Step::DrainingEvents;
        }
        if self.is_able_to_draw() {
            return Step::Drawing;
        }
        Step::Idle
    }

    /// Applies the in-monitor half of `step`.
    ///
    /// Returns the work to perform outside the monitor, or `None` when the step
    /// completed entirely here (`Resuming`) or there is nothing to do (`Idle`).
    pub fn claim(&mut self, step: Step) -> Option<Work> {
        let preserve = self.preserve_context_on_pause;
        match step {
            Step::Exiting => Some(Work::Exit),
            Step::Pausing => Some(Work::Pause { release_context: !preserve }),
            Step::Resuming => {
                self.is_paused = false;
                None
            }
            Step::ReleasingContext => Some(Work::ReleaseContext),
            Step::AwaitingSurface => Some(Work::SurfaceLost { release_context: !preserve }),
            Step::AcquiringContext => Some(Work::AcquireContext),
            Step::AcquiringSurface => Some(Work::AcquireSurface),
            Step::Resizing => {
                self.size_changed = false;
                Some(Work::Resize {
                    width: self.surface_width,
                    height: self.surface_height,
                })
            }
            Step::DrainingEvents => self.events.pop_front().map(Work::RunEvent),
            Step::Drawing => {
                self.request_render = false;
                self.frame_in_flight = true;
                Some(Work::Draw)
            }
            Step::Idle => None,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            surface_width: self.surface_width,
            surface_height: self.surface_height,
            render_mode: self.render_mode,
            request_render: self.request_render,
            render_complete: self.render_complete,
            has_gpu_context: self.has_gpu_context,
            has_gpu_surface: self.has_gpu_surface,
            has_host_surface: self.has_host_surface,
            surface_is_bad: self.surface_is_bad,
            waiting_for_surface: self.waiting_for_surface,
            pause_requested: self.pause_requested,
            is_paused: self.is_paused,
            exit_requested: self.exit_requested,
            has_exited: self.has_exited,
            queued_events: self.events.len(),
        }
    }
}

impl fmt::Debug for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerState")
            .field("worker_thread", &self.worker_thread)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of a worker's lifecycle flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WorkerStatus {
    pub surface_width: u32,
    pub surface_height: u32,
    pub render_mode: RenderMode,
    pub request_render: bool,
    pub render_complete: bool,
    pub has_gpu_context: bool,
    pub has_gpu_surface: bool,
    pub has_host_surface: bool,
    pub surface_is_bad: bool,
    pub waiting_for_surface: bool,
    pub pause_requested: bool,
    pub is_paused: bool,
    pub exit_requested: bool,
    pub has_exited: bool,
    pub queued_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> WorkerInit {
        WorkerInit {
            render_mode: RenderMode::WhenDirty,
            preserve_context_on_pause: false,
            has_host_surface: false,
            surface_width: 0,
            surface_height: 0,
        }
    }

    /// A worker with context and surface held, sized, nothing pending.
    fn drawing_state() -> WorkerState {
        let mut s = WorkerState::new(WorkerInit {
            has_host_surface: true,
            surface_width: 640,
            surface_height: 480,
            ..init()
        });
        s.has_gpu_context = true;
        s.has_gpu_surface = true;
        s.waiting_for_surface = false;
        s.request_render = false;
        s
    }

    // ── render mode ───────────────────────────────────────────────────────

    #[test]
    fn render_mode_raw_values_round_trip() {
        for mode in [RenderMode::WhenDirty, RenderMode::Continuously] {
            assert_eq!(RenderMode::try_from(u32::from(mode)).unwrap(), mode);
        }
    }

    #[test]
    fn render_mode_rejects_out_of_range() {
        assert!(matches!(
            RenderMode::try_from(2),
            Err(ViewError::InvalidRenderMode(2))
        ));
        assert!(RenderMode::try_from(u32::MAX).is_err());
    }

    #[test]
    fn default_render_mode_is_continuous() {
        assert_eq!(RenderMode::default(), RenderMode::Continuously);
    }

    // ── is_ready_to_draw ──────────────────────────────────────────────────

    #[test]
    fn ready_to_draw_matches_definition_for_every_combination() {
        for bits in 0u32..128 {
            let paused = bits & 1 != 0;
            let host = bits & 2 != 0;
            let bad = bits & 4 != 0;
            let wide = bits & 8 != 0;
            let tall = bits & 16 != 0;
            let requested = bits & 32 != 0;
            let continuous = bits & 64 != 0;

            let mut s = WorkerState::new(init());
            s.is_paused = paused;
            s.has_host_surface = host;
            s.surface_is_bad = bad;
            s.surface_width = if wide { 800 } else { 0 };
            s.surface_height = if tall { 600 } else { 0 };
            s.request_render = requested;
            s.render_mode = if continuous {
                RenderMode::Continuously
            } else {
                RenderMode::WhenDirty
            };

            let expected = !paused && host && !bad && wide && tall && (requested || continuous);
            assert_eq!(s.is_ready_to_draw(), expected, "combination {bits:07b}");
        }
    }

    #[test]
    fn able_to_draw_requires_both_gpu_objects() {
        let mut s = drawing_state();
        s.request_render = true;
        assert!(s.is_able_to_draw());

        s.has_gpu_surface = false;
        assert!(!s.is_able_to_draw());

        s.has_gpu_surface = true;
        s.has_gpu_context = false;
        assert!(!s.is_able_to_draw());
    }

    // ── step precedence ───────────────────────────────────────────────────

    #[test]
    fn fresh_worker_without_surface_idles() {
        assert_eq!(WorkerState::new(init()).next_step(), Step::Idle);
    }

    #[test]
    fn exit_beats_everything() {
        let mut s = drawing_state();
        s.request_render = true;
        s.pause_requested = true;
        s.should_release_context = true;
        s.events.push_back(Box::new(|| {}));
        s.exit_requested = true;
        assert_eq!(s.next_step(), Step::Exiting);
    }

    #[test]
    fn pause_beats_surface_and_events() {
        let mut s = drawing_state();
        s.has_host_surface = false;
        s.events.push_back(Box::new(|| {}));
        s.pause_requested = true;
        assert_eq!(s.next_step(), Step::Pausing);

        s.is_paused = true;
        assert_eq!(s.next_step(), Step::AwaitingSurface);
    }

    #[test]
    fn resume_is_observed_before_acquisition() {
        let mut s = drawing_state();
        s.has_gpu_context = false;
        s.has_gpu_surface = false;
        s.is_paused = true;
        assert_eq!(s.next_step(), Step::Resuming);
        assert!(s.claim(Step::Resuming).is_none());
        assert!(!s.is_paused);
        assert_eq!(s.next_step(), Step::AcquiringContext);
    }

    #[test]
    fn paused_worker_does_not_acquire() {
        let mut s = drawing_state();
        s.has_gpu_context = false;
        s.has_gpu_surface = false;
        s.pause_requested = true;
        s.is_paused = true;
        assert_eq!(s.next_step(), Step::Idle);
    }

    #[test]
    fn context_then_surface_then_resize() {
        let mut s = drawing_state();
        s.has_gpu_context = false;
        s.has_gpu_surface = false;
        s.size_changed = true;
        assert_eq!(s.next_step(), Step::AcquiringContext);

        s.has_gpu_context = true;
        assert_eq!(s.next_step(), Step::AcquiringSurface);

        s.has_gpu_surface = true;
        assert_eq!(s.next_step(), Step::Resizing);
    }

    #[test]
    fn bad_surface_blocks_acquisition() {
        let mut s = drawing_state();
        s.has_gpu_context = false;
        s.has_gpu_surface = false;
        s.surface_is_bad = true;
        s.request_render = true;
        assert_eq!(s.next_step(), Step::Idle);
    }

    #[test]
    fn destroying_a_bad_surface_clears_it_even_before_first_acquisition() {
        let mut s = WorkerState::new(init());
        s.has_host_surface = true;
        s.surface_is_bad = true;
        assert!(s.waiting_for_surface);
        assert_eq!(s.next_step(), Step::Idle);

        s.has_host_surface = false;
        assert_eq!(s.next_step(), Step::AwaitingSurface);
    }

    #[test]
    fn resize_waits_for_a_usable_size() {
        let mut s = drawing_state();
        s.size_changed = true;
        s.surface_width = 0;
        assert_ne!(s.next_step(), Step::Resizing);
    }

    #[test]
    fn resize_precedes_events_and_events_precede_draw() {
        let mut s = drawing_state();
        s.request_render = true;
        s.size_changed = true;
        s.events.push_back(Box::new(|| {}));
        assert_eq!(s.next_step(), Step::Resizing);

        let Some(Work::Resize { width, height }) = s.claim(Step::Resizing) else {
            panic!("expected resize work");
        };
        assert_eq!((width, height), (640, 480));
        assert_eq!(s.next_step(), Step::DrainingEvents);

        assert!(matches!(s.claim(Step::DrainingEvents), Some(Work::RunEvent(_))));
        assert_eq!(s.next_step(), Step::Drawing);
    }

    #[test]
    fn explicit_release_precedes_surface_checks() {
        let mut s = drawing_state();
        s.should_release_context = true;
        s.has_host_surface = false;
        assert_eq!(s.next_step(), Step::ReleasingContext);
    }

    #[test]
    fn claiming_a_frame_consumes_the_request() {
        let mut s = drawing_state();
        s.request_render = true;
        assert_eq!(s.next_step(), Step::Drawing);
        assert!(matches!(s.claim(Step::Drawing), Some(Work::Draw)));
        assert!(!s.request_render);
        assert!(s.frame_in_flight);
        assert_eq!(s.next_step(), Step::Idle);
    }

    #[test]
    fn continuous_mode_keeps_drawing() {
        let mut s = drawing_state();
        s.render_mode = RenderMode::Continuously;
        assert_eq!(s.next_step(), Step::Drawing);
        s.claim(Step::Drawing);
        assert_eq!(s.next_step(), Step::Drawing);
    }

    #[test]
    fn pause_work_respects_preserve_flag() {
        let mut s = drawing_state();
        s.pause_requested = true;
        assert!(matches!(
            s.claim(Step::Pausing),
            Some(Work::Pause { release_context: true })
        ));

        s.preserve_context_on_pause = true;
        assert!(matches!(
            s.claim(Step::Pausing),
            Some(Work::Pause { release_context: false })
        ));
    }

    #[test]
    fn state_is_not_on_worker_thread_until_claimed() {
        let mut s = WorkerState::new(init());
        assert!(!s.is_worker_thread());
        s.worker_thread = Some(thread::current().id());
        assert!(s.is_worker_thread());
    }
}
