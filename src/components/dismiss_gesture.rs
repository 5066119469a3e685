//! Drag-to-dismiss for the expanded player modal.
//!
//! One controller lives for one presentation. It reads pointer deltas, asks the
//! scale coordinator for background scale changes, and navigates back at most
//! once.

use super::presentation_scale::{ScaleSender, SCALE_AT_REST};
use crate::config::GestureConfig;
use crate::utils::lerp;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[cfg(test)]
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DismissPhase {
    #[default]
    Idle,
    Dragging,
    SettlingBack,
    Dismissing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub initial_touch: Point,
    pub last_touch: Point,
    pub translation: Point,
    pub is_horizontal_locked: bool,
    /// Set once the pointer has moved far enough to pick an axis.
    pub is_direction_locked: bool,
    pub is_dragging: bool,
    /// Content is scrolled away from the top and owns the gesture.
    pub is_scroll_capturing: bool,
    /// An upward pull at the top, forwarded to the content as scrolling.
    pub is_scroll_driving: bool,
}

impl GestureState {
    fn anchored(point: Point) -> Self {
        Self {
            initial_touch: point,
            last_touch: point,
            ..Self::default()
        }
    }
}

pub trait Navigator {
    fn go_back(&self);
}

/// Best-effort tactile feedback.
pub trait Haptics {
    fn impact(&self) -> Result<(), String>;
}

/// How the view should move the modal itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModalMotion {
    Follow { translation: Point },
    SpringBack,
    TimedExit { translation: Point, duration_ms: u32 },
    /// Scroll the content by `delta_y`; positive moves further down.
    ScrollContent { delta_y: f32 },
    Still,
}

pub struct DismissGestureController<N: Navigator, H: Haptics> {
    config: GestureConfig,
    scale_factor: f32,
    scale: ScaleSender,
    navigator: N,
    haptics: H,
    viewport: Viewport,
    phase: DismissPhase,
    gesture: Option<GestureState>,
    scroll_offset: f32,
    requested_scale: f32,
    dismissed: bool,
    torn_down: bool,
}

impl<N: Navigator, H: Haptics> DismissGestureController<N, H> {
    /// Mounting shrinks the background to the open-modal scale.
    pub fn new(
        config: GestureConfig,
        scale_factor: f32,
        scale: ScaleSender,
        navigator: N,
        haptics: H,
        viewport: Viewport,
    ) -> Self {
        let mut controller = Self {
            config,
            scale_factor,
            scale,
            navigator,
            haptics,
            viewport,
            phase: DismissPhase::Idle,
            gesture: None,
            scroll_offset: 0.0,
            requested_scale: SCALE_AT_REST,
            dismissed: false,
            torn_down: false,
        };
        controller.request_scale(scale_factor);
        controller
    }

    #[allow(dead_code)]
    pub fn phase(&self) -> DismissPhase {
        self.phase
    }

    #[allow(dead_code)]
    pub fn gesture(&self) -> Option<&GestureState> {
        self.gesture.as_ref()
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn on_scroll(&mut self, offset: f32) {
        self.scroll_offset = offset;
    }

    fn at_top(&self) -> bool {
        self.scroll_offset <= 0.0
    }

    fn request_scale(&mut self, value: f32) {
        if (value - self.requested_scale).abs() > f32::EPSILON {
            self.requested_scale = value;
            self.scale.request(value);
        }
    }

    fn pulse(&self) {
        if let Err(err) = self.haptics.impact() {
            tracing::debug!(error = %err, "haptic impact failed");
        }
    }

    fn start_drag(&mut self, gesture: &mut GestureState) {
        gesture.is_dragging = true;
        self.phase = DismissPhase::Dragging;
        self.pulse();
        tracing::debug!(horizontal = gesture.is_horizontal_locked, "dismiss drag started");
    }

    /// A touch only becomes a drag once it passes the slop, so taps on the
    /// sheet's buttons never move it.
    pub fn begin(&mut self, point: Point) -> ModalMotion {
        if self.dismissed {
            return ModalMotion::Still;
        }
        let mut gesture = GestureState::anchored(point);
        gesture.is_scroll_capturing = !self.at_top();
        self.gesture = Some(gesture);
        ModalMotion::Still
    }

    pub fn update(&mut self, point: Point) -> ModalMotion {
        if self.dismissed {
            return ModalMotion::Still;
        }
        let Some(mut gesture) = self.gesture.take() else {
            return ModalMotion::Still;
        };
        let motion = self.track(&mut gesture, point);
        self.gesture = Some(gesture);
        motion
    }

    fn track(&mut self, gesture: &mut GestureState, point: Point) -> ModalMotion {
        let previous = std::mem::replace(&mut gesture.last_touch, point);

        if gesture.is_scroll_driving {
            let delta_y = previous.y - point.y;
            // Pulling down again at the top hands the gesture back.
            if delta_y < 0.0 && self.at_top() {
                *gesture = GestureState::anchored(point);
                return ModalMotion::Still;
            }
            return ModalMotion::ScrollContent { delta_y };
        }
        if gesture.is_scroll_capturing {
            // Content scrolled back to the top mid-gesture: measure from here.
            if self.at_top() {
                *gesture = GestureState::anchored(point);
            }
            return ModalMotion::Still;
        }

        let dx = point.x - gesture.initial_touch.x;
        let dy = point.y - gesture.initial_touch.y;
        if !gesture.is_direction_locked {
            if dx.hypot(dy) < self.config.direction_lock_slop {
                return ModalMotion::Still;
            }
            let angle = dy.abs().atan2(dx.abs()).to_degrees();
            gesture.is_horizontal_locked =
                self.config.horizontal_dismiss && angle < self.config.direction_lock_degrees;
            gesture.is_direction_locked = true;

            if !gesture.is_horizontal_locked && dy < 0.0 {
                gesture.is_scroll_driving = true;
                return ModalMotion::ScrollContent { delta_y: -dy };
            }
            self.start_drag(gesture);
        }

        gesture.translation = if gesture.is_horizontal_locked {
            Point::new(dx.max(0.0), 0.0)
        } else {
            Point::new(0.0, dy.max(0.0))
        };
        let distance = gesture.translation.x.max(gesture.translation.y);
        let progress = distance / self.config.interpolation_distance;
        self.request_scale(lerp(self.scale_factor, SCALE_AT_REST, progress));

        ModalMotion::Follow {
            translation: gesture.translation,
        }
    }

    pub fn end(&mut self, point: Point) -> ModalMotion {
        self.update(point);
        let Some(gesture) = self.gesture.take() else {
            return ModalMotion::Still;
        };
        if self.dismissed {
            return ModalMotion::Still;
        }
        if !gesture.is_dragging {
            self.phase = DismissPhase::Idle;
            return ModalMotion::Still;
        }

        let (distance, threshold) = if gesture.is_horizontal_locked {
            (
                gesture.translation.x,
                (self.config.horizontal_threshold_ratio * self.viewport.width)
                    .min(self.config.horizontal_threshold_cap),
            )
        } else {
            (
                gesture.translation.y,
                (self.config.vertical_threshold_ratio * self.viewport.height)
                    .min(self.config.vertical_threshold_cap),
            )
        };

        if distance > threshold {
            self.commit_dismiss(gesture.is_horizontal_locked)
        } else {
            self.settle_back()
        }
    }

    /// Pointer cancelled or lost without an end event.
    pub fn finalize(&mut self) -> ModalMotion {
        let Some(gesture) = self.gesture.take() else {
            return ModalMotion::Still;
        };
        if self.dismissed || !gesture.is_dragging {
            self.phase = if self.dismissed {
                DismissPhase::Dismissing
            } else {
                DismissPhase::Idle
            };
            return ModalMotion::Still;
        }
        tracing::debug!("gesture aborted, settling back");
        self.settle_back()
    }

    /// Close without a gesture, e.g. from the header's close button.
    pub fn dismiss(&mut self) -> ModalMotion {
        self.gesture = None;
        self.commit_dismiss(false)
    }

    fn settle_back(&mut self) -> ModalMotion {
        self.phase = DismissPhase::SettlingBack;
        self.request_scale(self.scale_factor);
        ModalMotion::SpringBack
    }

    fn commit_dismiss(&mut self, horizontal: bool) -> ModalMotion {
        if self.dismissed {
            return ModalMotion::Still;
        }
        self.dismissed = true;
        self.phase = DismissPhase::Dismissing;
        self.request_scale(SCALE_AT_REST);
        self.pulse();
        self.navigator.go_back();
        tracing::info!(horizontal, "player modal dismissed");

        let translation = if horizontal {
            Point::new(self.viewport.width, 0.0)
        } else {
            Point::new(0.0, self.viewport.height)
        };
        ModalMotion::TimedExit {
            translation,
            duration_ms: self.config.exit_duration_ms,
        }
    }

    /// Restores the background however the presentation ended.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.gesture = None;
        self.requested_scale = SCALE_AT_REST;
        self.scale.request(SCALE_AT_REST);
    }
}

impl<N: Navigator, H: Haptics> Drop for DismissGestureController<N, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
