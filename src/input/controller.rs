//! Scroll and zoom physics.
//!
//! Gesture callbacks and the frame loop run on different threads, so every
//! read and write of the camera goes through one mutex. The frame loop calls
//! [`ScrollController::tick`] once per frame to advance flings and zoom
//! animations and to take the position snapshot it renders from.

use crate::animation::fling::Fling;
use crate::animation::zoom::ZoomAnimation;
use crate::core::constants::{GRID_HEIGHT, GRID_WIDTH, MAX_OVERZOOM};
use crate::core::geo::Point;
use crate::core::viewport::{CameraPosition, ScrollPosition};
use crate::input::events::GestureEvent;
use crate::layers::catalog::{scale_ladder, Layer};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Relative tolerance when comparing a scale against a ladder rung
const SCALE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
enum Motion {
    Idle,
    Panning,
    Flinging(Fling),
    Pinching,
    Zooming(ZoomAnimation),
}

#[derive(Debug)]
struct ControllerState {
    x: f64,
    y: f64,
    metres_per_pixel: f64,
    width: f64,
    height: f64,
    scales: Vec<f64>,
    motion: Motion,
}

/// Turns gestures into a camera trajectory clamped to the grid extent
#[derive(Debug)]
pub struct ScrollController {
    state: Mutex<ControllerState>,
}

impl ScrollController {
    /// Controller zooming between the scales of `layers`
    pub fn new(layers: &[&Layer]) -> Self {
        Self::with_scales(scale_ladder(layers))
    }

    /// Controller over an explicit ascending scale ladder
    pub fn with_scales(mut scales: Vec<f64>) -> Self {
        scales.retain(|s| s.is_finite() && *s > 0.0);
        scales.sort_by(f64::total_cmp);
        scales.dedup();
        let metres_per_pixel = scales.last().copied().unwrap_or(1.0);
        Self {
            state: Mutex::new(ControllerState {
                x: GRID_WIDTH / 2.0,
                y: GRID_HEIGHT / 2.0,
                metres_per_pixel,
                width: 0.0,
                height: 0.0,
                scales,
                motion: Motion::Idle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Update the screen size in pixels. The camera is re-clamped to fit.
    pub fn set_viewport_size(&self, width: f64, height: f64) {
        let mut state = self.lock();
        state.width = width.max(0.0);
        state.height = height.max(0.0);
        state.metres_per_pixel = state.clamp_scale(state.metres_per_pixel);
        state.clamp_center();
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        let state = self.lock();
        (state.width, state.height)
    }

    /// Finest scale reachable, past the finest layer by a fixed overzoom
    pub fn min_scale(&self) -> f64 {
        self.lock().min_scale()
    }

    /// Coarsest scale: the whole grid fits on screen
    pub fn max_scale(&self) -> f64 {
        self.lock().max_scale()
    }

    /// Apply a gesture. Returns whether the camera or its motion changed.
    pub fn handle(&self, event: GestureEvent) -> bool {
        match event {
            GestureEvent::Down { .. } => {
                let mut state = self.lock();
                let was_moving = state.motion != Motion::Idle;
                state.motion = Motion::Idle;
                was_moving
            }
            GestureEvent::Pan { dx, dy } => {
                self.pan(dx, dy);
                true
            }
            GestureEvent::Release | GestureEvent::PinchEnd => {
                let mut state = self.lock();
                if matches!(state.motion, Motion::Panning | Motion::Pinching) {
                    state.motion = Motion::Idle;
                }
                false
            }
            GestureEvent::Fling { vx, vy } => self.fling(vx, vy),
            GestureEvent::Pinch {
                focus_x,
                focus_y,
                delta_focus_x,
                delta_focus_y,
                scale,
            } => {
                self.pinch((focus_x, focus_y), (delta_focus_x, delta_focus_y), scale);
                true
            }
            GestureEvent::DoubleTap { x, y } => self.zoom_in(Some((x, y))),
            GestureEvent::TwoFingerTap { .. } => self.zoom_out(None),
            GestureEvent::Tap { .. } | GestureEvent::LongPress { .. } => false,
        }
    }

    /// Move the content by a screen delta; the camera moves the other way
    pub fn pan(&self, dx: f64, dy: f64) {
        let mut state = self.lock();
        state.motion = Motion::Panning;
        state.scroll_by(dx, dy);
    }

    /// Start a fling with a release velocity in pixels per second
    pub fn fling(&self, vx: f64, vy: f64) -> bool {
        let mut state = self.lock();
        match Fling::start(vx, vy) {
            Some(fling) => {
                state.motion = Motion::Flinging(fling);
                true
            }
            None => {
                state.motion = Motion::Idle;
                false
            }
        }
    }

    /// Continuous pinch around a focus point, with the focus itself moving by
    /// `delta_focus`
    pub fn pinch(&self, focus: (f64, f64), delta_focus: (f64, f64), scale: f64) {
        let mut state = self.lock();
        state.motion = Motion::Pinching;
        state.scroll_by(delta_focus.0, delta_focus.1);
        if scale.is_finite() && scale > 0.0 {
            let target = state.clamp_scale(state.metres_per_pixel / scale);
            let (x, y) = state.center_for_focus(focus, target);
            state.x = x;
            state.y = y;
            state.metres_per_pixel = target;
        }
        state.clamp_center();
    }

    /// Animate one ladder step finer, keeping `focus` (or the center) in place
    pub fn zoom_in(&self, focus: Option<(f64, f64)>) -> bool {
        let mut state = self.lock();
        let target = state.finer_scale();
        state.animate_zoom(focus, target)
    }

    /// Animate one ladder step coarser
    pub fn zoom_out(&self, focus: Option<(f64, f64)>) -> bool {
        let mut state = self.lock();
        let target = state.coarser_scale();
        state.animate_zoom(focus, target)
    }

    /// Jump or animate to a camera position. The target is clamped to the grid.
    pub fn move_camera(&self, camera: CameraPosition, animate: bool) {
        let target = camera.target.to_grid();
        let mut state = self.lock();
        let zoom = state.clamp_scale(camera.zoom);
        let (x, y) = state.clamped_center(target.x(), target.y(), zoom);

        if animate {
            state.motion = Motion::Zooming(ZoomAnimation::new(
                (state.x, state.y),
                state.metres_per_pixel,
                (x, y),
                zoom,
            ));
        } else {
            state.motion = Motion::Idle;
            state.x = x;
            state.y = y;
            state.metres_per_pixel = zoom;
        }
    }

    /// Where the camera is now (or, mid-animation, where it currently is)
    pub fn camera_position(&self) -> CameraPosition {
        let state = self.lock();
        CameraPosition::new(Point::grid(state.x, state.y), state.metres_per_pixel)
    }

    /// Advance flings and animations by `dt` and snapshot the result
    pub fn tick(&self, dt: Duration) -> ScrollPosition {
        let mut guard = self.lock();
        let state = &mut *guard;

        match &mut state.motion {
            Motion::Flinging(fling) => {
                let (dx, dy) = fling.advance(dt);
                let finished = fling.is_finished();
                state.scroll_by(dx, dy);
                if finished {
                    state.motion = Motion::Idle;
                }
            }
            Motion::Zooming(animation) => {
                animation.advance(dt);
                let (x, y) = animation.current_center();
                let scale = animation.current_scale();
                let finished = animation.is_finished();
                state.x = x;
                state.y = y;
                state.metres_per_pixel = scale;
                state.clamp_center();
                if finished {
                    state.motion = Motion::Idle;
                }
            }
            Motion::Idle | Motion::Panning | Motion::Pinching => {}
        }

        state.snapshot()
    }

    /// The current position without advancing time
    pub fn position(&self) -> ScrollPosition {
        self.lock().snapshot()
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.lock().motion,
            Motion::Flinging(_) | Motion::Zooming(_)
        )
    }
}

impl ControllerState {
    fn min_scale(&self) -> f64 {
        self.scales.first().copied().unwrap_or(1.0) / MAX_OVERZOOM
    }

    fn max_scale(&self) -> f64 {
        let fit = if self.width > 0.0 && self.height > 0.0 {
            (GRID_WIDTH / self.width).max(GRID_HEIGHT / self.height)
        } else {
            self.scales.last().copied().unwrap_or(1.0)
        };
        fit.max(self.min_scale())
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.metres_per_pixel;
        }
        scale.clamp(self.min_scale(), self.max_scale())
    }

    /// Scale discrete zoom steps count from: the target of a running zoom
    /// animation, so repeated taps keep stepping along the ladder
    fn step_origin(&self) -> f64 {
        match &self.motion {
            Motion::Zooming(animation) => animation.final_scale(),
            _ => self.metres_per_pixel,
        }
    }

    /// Next ladder rung below the step origin, or half of it past the finest
    /// rung
    fn finer_scale(&self) -> f64 {
        let current = self.step_origin();
        let below = self
            .scales
            .partition_point(|&s| s < current * (1.0 - SCALE_EPSILON));
        let target = if below > 0 {
            self.scales[below - 1]
        } else {
            current / 2.0
        };
        self.clamp_scale(target)
    }

    /// Next ladder rung above the step origin, or double past the coarsest
    fn coarser_scale(&self) -> f64 {
        let current = self.step_origin();
        let above = self
            .scales
            .partition_point(|&s| s <= current * (1.0 + SCALE_EPSILON));
        let target = self.scales.get(above).copied().unwrap_or(current * 2.0);
        self.clamp_scale(target)
    }

    fn animate_zoom(&mut self, focus: Option<(f64, f64)>, target: f64) -> bool {
        if (target - self.metres_per_pixel).abs() <= self.metres_per_pixel * SCALE_EPSILON {
            return false;
        }
        let (x, y) = match focus {
            Some(focus) => self.center_for_focus(focus, target),
            None => (self.x, self.y),
        };
        let (x, y) = self.clamped_center(x, y, target);
        self.motion = Motion::Zooming(ZoomAnimation::new(
            (self.x, self.y),
            self.metres_per_pixel,
            (x, y),
            target,
        ));
        true
    }

    /// Center that keeps the grid point under screen `focus` fixed at `scale`
    fn center_for_focus(&self, focus: (f64, f64), scale: f64) -> (f64, f64) {
        let offset_x = focus.0 - self.width / 2.0;
        let offset_y = focus.1 - self.height / 2.0;
        let anchor_x = self.x + offset_x * self.metres_per_pixel;
        let anchor_y = self.y - offset_y * self.metres_per_pixel;
        (anchor_x - offset_x * scale, anchor_y + offset_y * scale)
    }

    fn scroll_by(&mut self, dx: f64, dy: f64) {
        // screen rows grow downwards, northings grow upwards
        self.x -= dx * self.metres_per_pixel;
        self.y += dy * self.metres_per_pixel;
        self.clamp_center();
    }

    fn clamp_center(&mut self) {
        let (x, y) = self.clamped_center(self.x, self.y, self.metres_per_pixel);
        self.x = x;
        self.y = y;
    }

    fn clamped_center(&self, x: f64, y: f64, scale: f64) -> (f64, f64) {
        (
            clamp_axis(x, self.width * scale, GRID_WIDTH),
            clamp_axis(y, self.height * scale, GRID_HEIGHT),
        )
    }

    fn snapshot(&self) -> ScrollPosition {
        let mut position = ScrollPosition::at_rest(self.x, self.y, self.metres_per_pixel);
        match &self.motion {
            Motion::Flinging(_) => position.animating_scroll = true,
            Motion::Zooming(animation) => {
                position.animating_scroll = true;
                position.animating_zoom = animation.start_scale() != animation.final_scale();
                position.zoom_start_metres_per_pixel = animation.start_scale();
                position.zoom_final_metres_per_pixel = animation.final_scale();
            }
            Motion::Idle | Motion::Panning | Motion::Pinching => {}
        }
        position
    }
}

/// Keep `[center - span/2, center + span/2]` inside `[0, extent]`, or pin the
/// center to the middle when the span does not fit
fn clamp_axis(center: f64, span: f64, extent: f64) -> f64 {
    let half = span / 2.0;
    if span >= extent {
        return extent / 2.0;
    }
    if center.is_nan() {
        return extent / 2.0;
    }
    center.clamp(half, extent - half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ScrollController {
        let controller = ScrollController::with_scales(vec![1.0, 2.0, 5.0, 25.0, 100.0]);
        controller.set_viewport_size(400.0, 400.0);
        controller.move_camera(CameraPosition::new(Point::grid(300_000.0, 500_000.0), 5.0), false);
        controller
    }

    fn run_to_rest(controller: &ScrollController) -> ScrollPosition {
        let mut position = controller.position();
        for _ in 0..1_000 {
            position = controller.tick(Duration::from_millis(16));
            if !position.is_animating() {
                break;
            }
        }
        position
    }

    #[test]
    fn test_initial_state_is_grid_center() {
        let controller = ScrollController::with_scales(vec![1.0, 2500.0]);
        let position = controller.position();
        assert_eq!((position.x, position.y), (GRID_WIDTH / 2.0, GRID_HEIGHT / 2.0));
        assert_eq!(position.metres_per_pixel, 2500.0);
    }

    #[test]
    fn test_pan_moves_against_finger() {
        let controller = controller();
        controller.handle(GestureEvent::Pan { dx: 10.0, dy: 20.0 });
        let position = controller.position();
        assert_eq!(position.x, 300_000.0 - 50.0);
        assert_eq!(position.y, 500_000.0 + 100.0);
        assert!(!position.is_animating());
    }

    #[test]
    fn test_center_clamped_to_grid() {
        let controller = controller();
        controller.move_camera(CameraPosition::new(Point::grid(-5_000.0, 2_000_000.0), 5.0), false);
        let position = controller.position();
        assert_eq!(position.x, 1_000.0);
        assert_eq!(position.y, GRID_HEIGHT - 1_000.0);
    }

    #[test]
    fn test_oversized_viewport_pins_center() {
        let controller = controller();
        assert_eq!(controller.max_scale(), GRID_HEIGHT / 400.0);
        controller.move_camera(CameraPosition::new(Point::grid(10.0, 10.0), 1e9), false);
        let position = controller.position();
        assert_eq!(position.metres_per_pixel, controller.max_scale());
        assert_eq!(position.y, GRID_HEIGHT / 2.0);
        assert_eq!(position.x, GRID_WIDTH / 2.0);
    }

    #[test]
    fn test_zoom_steps_follow_ladder() {
        let controller = controller();
        assert!(controller.zoom_in(None));
        let position = controller.tick(Duration::ZERO);
        assert!(position.animating_zoom);
        assert_eq!(position.zoom_start_metres_per_pixel, 5.0);
        assert_eq!(position.zoom_final_metres_per_pixel, 2.0);
        assert_eq!(run_to_rest(&controller).metres_per_pixel, 2.0);

        assert!(controller.zoom_out(None));
        assert_eq!(run_to_rest(&controller).metres_per_pixel, 5.0);
        assert!(controller.zoom_out(None));
        assert_eq!(run_to_rest(&controller).metres_per_pixel, 25.0);
    }

    #[test]
    fn test_second_tap_mid_animation_steps_further() {
        let controller = controller();
        assert!(controller.zoom_in(None));
        controller.tick(Duration::from_millis(50));
        assert!(controller.zoom_in(None));

        let position = controller.tick(Duration::ZERO);
        assert_eq!(position.zoom_final_metres_per_pixel, 1.0);
        assert!(position.zoom_start_metres_per_pixel < 5.0);
        assert!(position.zoom_start_metres_per_pixel > 2.0);
        assert_eq!(run_to_rest(&controller).metres_per_pixel, 1.0);

        assert!(controller.zoom_out(None));
        controller.tick(Duration::from_millis(50));
        assert!(controller.zoom_out(None));
        assert_eq!(controller.tick(Duration::ZERO).zoom_final_metres_per_pixel, 5.0);
    }

    #[test]
    fn test_zoom_in_stops_at_overzoom_limit() {
        let controller = controller();
        for _ in 0..10 {
            controller.zoom_in(None);
            run_to_rest(&controller);
        }
        assert_eq!(controller.position().metres_per_pixel, 0.25);
        assert!(!controller.zoom_in(None));
    }

    #[test]
    fn test_double_tap_keeps_focus_fixed() {
        let controller = controller();
        // grid point under the tap before zooming
        let before = (300_000.0 + 100.0 * 5.0, 500_000.0 - 100.0 * 5.0);
        controller.handle(GestureEvent::DoubleTap { x: 300.0, y: 300.0 });
        let position = run_to_rest(&controller);
        let under_tap = (
            position.x + 100.0 * position.metres_per_pixel,
            position.y - 100.0 * position.metres_per_pixel,
        );
        assert!((under_tap.0 - before.0).abs() < 1e-6);
        assert!((under_tap.1 - before.1).abs() < 1e-6);
    }

    #[test]
    fn test_pinch_scales_around_focus() {
        let controller = controller();
        controller.pinch((200.0, 200.0), (0.0, 0.0), 2.0);
        let position = controller.position();
        assert_eq!(position.metres_per_pixel, 2.5);
        assert_eq!((position.x, position.y), (300_000.0, 500_000.0));
    }

    #[test]
    fn test_fling_decays_to_rest() {
        let controller = controller();
        assert!(controller.handle(GestureEvent::Fling { vx: -3400.0, vy: 0.0 }));
        assert!(controller.tick(Duration::from_millis(16)).animating_scroll);
        let position = run_to_rest(&controller);
        assert!(!position.is_animating());
        // content flung left moves the camera east by v^2 / 2a pixels
        assert!((position.x - (300_000.0 + 1_700.0 * 5.0)).abs() < 1e-6);

        controller.handle(GestureEvent::Fling { vx: 1.0, vy: 1.0 });
        assert!(!controller.is_animating());
    }

    #[test]
    fn test_down_interrupts_animation() {
        let controller = controller();
        controller.zoom_out(None);
        controller.tick(Duration::from_millis(50));
        assert!(controller.handle(GestureEvent::Down { x: 0.0, y: 0.0 }));
        assert!(!controller.is_animating());
    }
}
