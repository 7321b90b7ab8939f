use std::time::{Duration, Instant};

/// Step the frame clock advances by per rendered frame.
pub const DEFAULT_FRAME_STEP: Duration = Duration::from_millis(16);

/// Where the animation time comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// Seconds since the loop started.
    Wall,
    /// A fixed step per rendered frame, independent of refresh rate drift.
    FrameStep { step: Duration },
}

impl Default for ClockMode {
    fn default() -> Self {
        Self::Wall
    }
}

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Redraw continuously, optionally capped to `target_fps`.
    Animate {
        target_fps: Option<f32>,
        clock: ClockMode,
    },
    /// Render a single frame at a fixed timestamp (seconds).
    Still { time: f32 },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate {
            target_fps: None,
            clock: ClockMode::default(),
        }
    }
}

/// Snapshot of the time state supplied to the program inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that advances by a fixed step on every sample.
///
/// The first sample reports zero.
#[derive(Debug, Clone, Copy)]
pub struct FrameStepTimeSource {
    step: Duration,
    frame: u64,
}

impl FrameStepTimeSource {
    pub fn new(step: Duration) -> Self {
        Self { step, frame: 0 }
    }
}

impl Default for FrameStepTimeSource {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_STEP)
    }
}

impl TimeSource for FrameStepTimeSource {
    fn sample(&mut self) -> TimeSample {
        // Multiply rather than accumulate so long sessions do not drift.
        let seconds = (self.step.as_secs_f64() * self.frame as f64) as f32;
        let sample = TimeSample::new(seconds, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate {
            clock: ClockMode::Wall,
            ..
        } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Animate {
            clock: ClockMode::FrameStep { step },
            ..
        } => Box::new(FrameStepTimeSource::new(*step)),
        RenderPolicy::Still { time } => Box::new(FixedTimeSource::new(*time)),
    }
}

/// Decides when the host loop should ask for the next redraw.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    policy: RenderPolicy,
    interval: Option<Duration>,
    last_frame: Option<Instant>,
    rendered_still: bool,
}

impl FrameScheduler {
    pub fn new(policy: RenderPolicy) -> Self {
        let interval = match &policy {
            RenderPolicy::Animate {
                target_fps: Some(fps),
                ..
            } if fps.is_finite() && *fps > 0.0 => {
                Some(Duration::from_secs_f64(1.0 / f64::from(*fps)))
            }
            _ => None,
        };
        Self {
            policy,
            interval,
            last_frame: None,
            rendered_still: false,
        }
    }

    /// True when a frame is due at `now`.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.policy {
            RenderPolicy::Still { .. } => !self.rendered_still,
            RenderPolicy::Animate { .. } => match (self.interval, self.last_frame) {
                (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
                _ => true,
            },
        }
    }

    /// When the next capped frame becomes due. `None` means either "now"
    /// (uncapped) or "never" (still frame already shown).
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.policy {
            RenderPolicy::Still { .. } => None,
            RenderPolicy::Animate { .. } => {
                let interval = self.interval?;
                self.last_frame.map(|last| last + interval)
            }
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
        if matches!(self.policy, RenderPolicy::Still { .. }) {
            self.rendered_still = true;
        }
    }

    /// Forces the next check to report a due frame. Used after a resize so a
    /// still frame is redrawn at the new size.
    pub fn invalidate(&mut self) {
        self.last_frame = None;
        self.rendered_still = false;
    }
}

/// Scheduler plus clock, owned by the host loop.
pub(crate) struct RenderPolicyDriver {
    scheduler: FrameScheduler,
    time_source: BoxedTimeSource,
}

impl RenderPolicyDriver {
    pub(crate) fn new(policy: RenderPolicy) -> Self {
        Self {
            time_source: time_source_for_policy(&policy),
            scheduler: FrameScheduler::new(policy),
        }
    }

    pub(crate) fn sample(&mut self) -> TimeSample {
        self.time_source.sample()
    }

    pub(crate) fn mark_rendered(&mut self, now: Instant) {
        self.scheduler.mark_rendered(now);
    }

    pub(crate) fn ready_for_frame(&self, now: Instant) -> bool {
        self.scheduler.ready_for_frame(now)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub(crate) fn invalidate(&mut self) {
        self.scheduler.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_step_clock_advances_sixteen_millis_per_frame() {
        let mut clock = FrameStepTimeSource::default();
        let samples: Vec<f32> = (0..4).map(|_| clock.sample().seconds).collect();
        assert_eq!(samples[0], 0.0);
        for (index, seconds) in samples.iter().enumerate() {
            assert!((seconds - 0.016 * index as f32).abs() < 1e-6);
        }
        assert_eq!(clock.sample().frame_index, 4);
    }

    #[test]
    fn still_policy_uses_fixed_time() {
        let mut source = time_source_for_policy(&RenderPolicy::Still { time: 2.5 });
        assert_eq!(source.sample().seconds, 2.5);
        assert_eq!(source.sample().seconds, 2.5);
    }

    #[test]
    fn wall_clock_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.seconds >= first.seconds);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    #[test]
    fn uncapped_animation_is_always_ready() {
        let mut scheduler = FrameScheduler::new(RenderPolicy::default());
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn capped_animation_waits_for_interval() {
        let mut scheduler = FrameScheduler::new(RenderPolicy::Animate {
            target_fps: Some(10.0),
            clock: ClockMode::Wall,
        });
        let start = Instant::now();
        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(100)));
        let deadline = scheduler.next_deadline().expect("capped deadline");
        assert_eq!(deadline.duration_since(start), Duration::from_millis(100));
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let mut scheduler = FrameScheduler::new(RenderPolicy::Animate {
            target_fps: Some(0.0),
            clock: ClockMode::Wall,
        });
        let now = Instant::now();
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn still_frame_renders_once_until_invalidated() {
        let mut scheduler = FrameScheduler::new(RenderPolicy::Still { time: 0.0 });
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(!scheduler.ready_for_frame(now + Duration::from_secs(1)));
        scheduler.invalidate();
        assert!(scheduler.ready_for_frame(now));
    }
}
