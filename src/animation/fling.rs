use crate::core::constants::{FLING_DECELERATION, FLING_MAX_SPEED, FLING_MIN_SPEED};
use std::time::Duration;

/// Ballistic scroll after a fast pan release.
///
/// Velocity is in screen pixels per second and decays at a constant rate
/// along its direction until the fling stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fling {
    vx: f64,
    vy: f64,
    deceleration: f64,
}

impl Fling {
    /// Start a fling, or `None` if the release was too slow to count
    pub fn start(vx: f64, vy: f64) -> Option<Self> {
        let speed = vx.hypot(vy);
        if !speed.is_finite() || speed < FLING_MIN_SPEED {
            return None;
        }
        let clamp = (FLING_MAX_SPEED / speed).min(1.0);
        Some(Self {
            vx: vx * clamp,
            vy: vy * clamp,
            deceleration: FLING_DECELERATION,
        })
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.vx, self.vy)
    }

    pub fn is_finished(&self) -> bool {
        self.speed() <= 0.0
    }

    /// Advance by `dt`, returning the distance travelled in pixels
    pub fn advance(&mut self, dt: Duration) -> (f64, f64) {
        let speed = self.speed();
        if speed <= 0.0 {
            return (0.0, 0.0);
        }
        let (ux, uy) = (self.vx / speed, self.vy / speed);
        let stop_time = speed / self.deceleration;
        let dt = dt.as_secs_f64();

        let distance = if dt >= stop_time {
            self.vx = 0.0;
            self.vy = 0.0;
            speed * stop_time / 2.0
        } else {
            let new_speed = speed - self.deceleration * dt;
            self.vx = ux * new_speed;
            self.vy = uy * new_speed;
            // average of the start and end speeds under constant deceleration
            (speed + new_speed) / 2.0 * dt
        };
        (ux * distance, uy * distance)
    }

    /// Total distance the fling will still cover, in pixels
    pub fn remaining_distance(&self) -> f64 {
        let speed = self.speed();
        speed * speed / (2.0 * self.deceleration)
    }
}
