use web_time::{Duration, Instant};

/// Frame pacing with a smoothed FPS estimate.
pub struct FrameClock {
    /// Target FPS (0 = unlimited).
    target_fps: u32,
    min_frame_duration: Duration,
    last_frame: Instant,
    smoothed_fps: f32,
    /// Weight of the newest sample (0.0-1.0).
    smoothing: f32,
    frames: u64,
}

impl FrameClock {
    /// Clock pacing to `target_fps` (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };
        Self {
            target_fps,
            min_frame_duration,
            last_frame: Instant::now(),
            smoothed_fps: 60.0,
            smoothing: 0.05,
            frames: 0,
        }
    }

    /// Clock that never asks the caller to wait.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Whether enough time has passed since the last frame to draw again.
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.target_fps == 0 || self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Time left before the next frame is due.
    #[must_use]
    pub fn time_until_next_frame(&self) -> Duration {
        self.min_frame_duration
            .saturating_sub(self.last_frame.elapsed())
    }

    /// Record that a frame finished now.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frames += 1;
        if elapsed > 0.0 {
            self.smoothed_fps =
                self.smoothed_fps * (1.0 - self.smoothing) + self.smoothing / elapsed;
        }
    }

    /// Smoothed frames per second.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }

    /// Frames recorded so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_clock_always_renders() {
        let clock = FrameClock::unlimited();
        assert!(clock.should_render());
        assert_eq!(clock.time_until_next_frame(), Duration::ZERO);
    }

    #[test]
    fn limited_clock_waits_after_a_frame() {
        let mut clock = FrameClock::new(1);
        clock.end_frame();
        assert!(!clock.should_render());
        assert!(clock.time_until_next_frame() > Duration::ZERO);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn fps_stays_positive() {
        let mut clock = FrameClock::unlimited();
        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(2));
            clock.end_frame();
        }
        assert!(clock.fps() > 0.0);
        assert_eq!(clock.frame_count(), 3);
    }
}
