use std::time::{Duration, Instant};

/// Cadence of camera animation ticks while momentum decays.
pub const TICK: Duration = Duration::from_millis(16);

/// Frame delta for camera damping plus periodic loop statistics.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report_time: Instant,
    frame_count: u32,
    pass_count: u32,
    pub frame_dt: f32,
}

impl FrameTiming {
    pub fn new(now: Instant) -> Self {
        Self {
            last_frame_time: None,
            last_report_time: now,
            frame_count: 0,
            pass_count: 0,
            frame_dt: TICK.as_secs_f32(),
        }
    }

    /// Records one animation tick and returns the elapsed seconds.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt_duration = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => TICK,
        };
        self.last_frame_time = Some(now);
        // long idle gaps must not fling the camera
        self.frame_dt = dt_duration.min(TICK * 4).as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        self.maybe_report(now);
        self.frame_dt
    }

    /// Animation stopped; the next tick starts from a fresh delta.
    pub fn idle(&mut self) {
        self.last_frame_time = None;
    }

    pub fn record_pass(&mut self) {
        self.pass_count = self.pass_count.saturating_add(1);
    }

    fn maybe_report(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_report_time);
        if elapsed.as_secs_f32() >= 5.0 {
            log::debug!(
                "{} camera ticks, {} reconcile passes in {:.1}s (last dt {:.2} ms)",
                self.frame_count,
                self.pass_count,
                elapsed.as_secs_f32(),
                self.frame_dt * 1000.0
            );
            self.frame_count = 0;
            self.pass_count = 0;
            self.last_report_time = now;
        }
    }
}
