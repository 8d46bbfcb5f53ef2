//! Zoom input channels: batched precise-zoom wheel, two-finger pinch, and platform
//! pinch gestures.
//!
//! Each channel reduces its raw input to either a `(factor, anchor)` pair or a full
//! transform that the dispatcher applies to the session's view.

use crate::geometry::{distance, Point};
use crate::view::{clamp_zoom, ViewTransform};
use std::collections::BTreeMap;

/// Sums precise-zoom wheel deltas so the zoom is recomputed once per frame.
#[derive(Debug, Default)]
pub struct WheelAccumulator {
    accumulated: f64,
    anchor: Option<Point>,
}

impl WheelAccumulator {
    /// Adds a vertical delta (positive zooms in). The latest anchor wins.
    pub fn add(&mut self, delta: f64, anchor: Point) {
        if delta.is_finite() {
            self.accumulated += delta;
            self.anchor = Some(anchor);
        }
    }

    /// Whether any delta is waiting to be applied.
    pub fn is_pending(&self) -> bool {
        self.anchor.is_some()
    }

    /// Converts the accumulated delta into `exp(accumulated * sensitivity)` and resets.
    pub fn take(&mut self, sensitivity: f64) -> Option<(f64, Point)> {
        let anchor = self.anchor.take()?;
        let delta = std::mem::take(&mut self.accumulated);
        if delta == 0.0 {
            return None;
        }
        Some(((delta * sensitivity).exp(), anchor))
    }

    /// Discards any pending delta.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.anchor = None;
    }
}

/// Lifecycle phase of a single touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    /// Contact placed
    Start,
    /// Contact moved
    Move,
    /// Contact lifted
    End,
    /// Contact cancelled by the platform
    Cancel,
}

/// Snapshot captured when the second contact lands.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PinchStart {
    /// The two contacts the gesture follows
    ids: (u64, u64),
    zoom: f64,
    /// World point under the contact midpoint at gesture start
    world_anchor: Point,
    /// Distance between the two contacts at gesture start
    distance: f64,
}

/// What a touch event meant for the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchOutcome {
    /// Nothing to do (single contact or untracked id)
    Idle,
    /// A two-contact gesture just began; drags must be abandoned
    PinchStarted,
    /// The gesture produced a new transform
    Transform(ViewTransform),
    /// Fewer than two contacts remain; gesture state was discarded
    PinchEnded,
}

/// Tracks active touch contacts and the pinch derived from two of them.
#[derive(Debug, Default)]
pub struct TouchTracker {
    contacts: BTreeMap<u64, Point>,
    pinch: Option<PinchStart>,
}

impl TouchTracker {
    /// Number of contacts currently down.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Whether a two-contact gesture owns the input.
    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    /// Starts following the two lowest contact ids from their current positions.
    fn capture(&mut self, view: &ViewTransform) -> bool {
        let mut it = self.contacts.iter();
        let (Some((&id_a, &a)), Some((&id_b, &b))) = (it.next(), it.next()) else {
            return false;
        };
        self.pinch = Some(PinchStart {
            ids: (id_a, id_b),
            zoom: view.zoom,
            world_anchor: view.screen_to_world(a.midpoint(b)),
            distance: distance(a, b),
        });
        true
    }

    /// Feeds one contact update.
    pub fn update(
        &mut self,
        id: u64,
        phase: TouchPhase,
        pos: Point,
        view: &ViewTransform,
    ) -> TouchOutcome {
        match phase {
            TouchPhase::Start => {
                self.contacts.insert(id, pos);
                if self.pinch.is_none() && self.capture(view) {
                    return TouchOutcome::PinchStarted;
                }
                TouchOutcome::Idle
            }
            TouchPhase::Move => {
                match self.contacts.get_mut(&id) {
                    Some(p) => *p = pos,
                    None => return TouchOutcome::Idle,
                }
                let Some(start) = self.pinch else {
                    return TouchOutcome::Idle;
                };
                match (self.contacts.get(&start.ids.0), self.contacts.get(&start.ids.1)) {
                    (Some(&a), Some(&b)) => TouchOutcome::Transform(start.apply(a, b)),
                    _ => TouchOutcome::Idle,
                }
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.contacts.remove(&id);
                let Some(start) = self.pinch else {
                    return TouchOutcome::Idle;
                };
                if id != start.ids.0 && id != start.ids.1 {
                    return TouchOutcome::Idle;
                }
                // One of the followed contacts lifted: restart from the remaining pair.
                self.pinch = None;
                if self.capture(view) {
                    TouchOutcome::PinchStarted
                } else {
                    TouchOutcome::PinchEnded
                }
            }
        }
    }

    /// Forgets all contacts and any gesture in progress.
    pub fn release(&mut self) {
        self.contacts.clear();
        self.pinch = None;
    }
}

impl PinchStart {
    /// Transform keeping the captured world point under the current midpoint.
    fn apply(&self, a: Point, b: Point) -> ViewTransform {
        let factor = if self.distance > f64::EPSILON {
            distance(a, b) / self.distance
        } else {
            1.0
        };
        let zoom = clamp_zoom(self.zoom * factor);
        let offset = a.midpoint(b) - self.world_anchor * zoom;
        ViewTransform { zoom, offset }
    }
}

/// Converts platform pinch events, which report a cumulative scale, into per-event
/// factors.
#[derive(Debug, Default)]
pub struct NativePinch {
    last_scale: Option<f64>,
}

impl NativePinch {
    /// A platform gesture started.
    pub fn start(&mut self) {
        self.last_scale = Some(1.0);
    }

    /// Returns `current / previous` for a reported cumulative scale.
    pub fn change(&mut self, scale: f64) -> Option<f64> {
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        let previous = self.last_scale.replace(scale).unwrap_or(1.0);
        Some(scale / previous)
    }

    /// The platform gesture ended.
    pub fn end(&mut self) {
        self.last_scale = None;
    }

    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        self.last_scale.is_some()
    }
}
