use crate::core::constants::{ZOOM_MAX_DURATION_MS, ZOOM_MIN_DURATION_MS, ZOOM_MS_PER_LOG_SCALE};
use std::time::Duration;

/// Timed transition between two camera positions, interpolated in log-scale
/// space so the apparent zoom speed stays constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomAnimation {
    start_center: (f64, f64),
    final_center: (f64, f64),
    start_scale: f64,
    final_scale: f64,
    duration: Duration,
    elapsed: Duration,
}

impl ZoomAnimation {
    /// Animation from `start` to `end` (center in grid metres, scale in
    /// metres per pixel) with a duration picked by [`ZoomAnimation::duration_for`].
    pub fn new(start_center: (f64, f64), start_scale: f64, final_center: (f64, f64), final_scale: f64) -> Self {
        let dx = final_center.0 - start_center.0;
        let dy = final_center.1 - start_center.1;
        let travel_px = dx.hypot(dy) / start_scale;
        Self::with_duration(
            start_center,
            start_scale,
            final_center,
            final_scale,
            Self::duration_for(start_scale, final_scale, travel_px),
        )
    }

    pub fn with_duration(
        start_center: (f64, f64),
        start_scale: f64,
        final_center: (f64, f64),
        final_scale: f64,
        duration: Duration,
    ) -> Self {
        Self {
            start_center,
            final_center,
            start_scale,
            final_scale,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// Longer zooms and longer moves take longer, within fixed bounds
    pub fn duration_for(start_scale: f64, final_scale: f64, travel_px: f64) -> Duration {
        let log_ratio = (final_scale / start_scale).ln().abs();
        let mut ms = ZOOM_MIN_DURATION_MS + ZOOM_MS_PER_LOG_SCALE * log_ratio + travel_px / 2.0;
        if !ms.is_finite() {
            ms = ZOOM_MAX_DURATION_MS;
        }
        Duration::from_secs_f64(ms.clamp(ZOOM_MIN_DURATION_MS, ZOOM_MAX_DURATION_MS) / 1000.0)
    }

    /// Move time forward
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = (self.elapsed + dt).min(self.duration);
    }

    /// Progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Scale at progress `p`. Exact at both ends.
    pub fn scale_at(&self, p: f64) -> f64 {
        if p <= 0.0 {
            return self.start_scale;
        }
        if p >= 1.0 {
            return self.final_scale;
        }
        let log_start = self.start_scale.ln();
        let log_final = self.final_scale.ln();
        (log_final + (1.0 - p) * (log_start - log_final)).exp()
    }

    /// Center at progress `p`.
    ///
    /// The center tracks the scale, so a zoom around a fixed screen point keeps
    /// that point still. A pure pan falls back to linear progress.
    pub fn center_at(&self, p: f64) -> (f64, f64) {
        if p <= 0.0 {
            return self.start_center;
        }
        if p >= 1.0 {
            return self.final_center;
        }
        let t = if self.start_scale == self.final_scale {
            p
        } else {
            (self.scale_at(p) - self.start_scale) / (self.final_scale - self.start_scale)
        };
        (
            self.start_center.0 + (self.final_center.0 - self.start_center.0) * t,
            self.start_center.1 + (self.final_center.1 - self.start_center.1) * t,
        )
    }

    /// Scale at the current time
    pub fn current_scale(&self) -> f64 {
        self.scale_at(self.progress())
    }

    /// Center at the current time
    pub fn current_center(&self) -> (f64, f64) {
        self.center_at(self.progress())
    }

    pub fn start_scale(&self) -> f64 {
        self.start_scale
    }

    pub fn final_scale(&self) -> f64 {
        self.final_scale
    }

    pub fn final_center(&self) -> (f64, f64) {
        self.final_center
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
