//! The view transform: zoom scalar plus 2D offset mapping world to screen.
//!
//! All mutation goes through [`ViewTransform`] methods, which clamp the zoom at every
//! site. The fit scheduler handles the "viewport not laid out yet" case by retrying on
//! later frames.

use crate::constants::{FIT_MARGIN, MAX_FIT_ATTEMPTS, MAX_ZOOM, MIN_FIT_VIEWPORT, MIN_ZOOM};
use crate::geometry::{clamp, screen_to_world, world_to_screen, Point};
use serde::{Deserialize, Serialize};

/// Zoom and offset of the canvas. `screen = world * zoom + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Current zoom level (1.0 = one image pixel per screen pixel)
    pub zoom: f64,
    /// Screen position of the world origin
    pub offset: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Point::ZERO,
        }
    }
}

/// Clamps a zoom value to the supported range.
pub fn clamp_zoom(zoom: f64) -> f64 {
    clamp(zoom, MIN_ZOOM, MAX_ZOOM)
}

/// Computes the transform after zooming by `factor` around `anchor` (screen space).
///
/// The world point under `anchor` before the zoom is under `anchor` afterwards.
pub fn zoom_around_point(
    zoom: f64,
    offset: Point,
    anchor: Point,
    factor: f64,
) -> (f64, Point) {
    let new_zoom = clamp_zoom(zoom * factor);
    let world = screen_to_world(anchor, zoom, offset);
    let new_offset = anchor - world * new_zoom;
    (new_zoom, new_offset)
}

impl ViewTransform {
    /// Creates a transform, clamping the zoom.
    pub fn new(zoom: f64, offset: Point) -> Self {
        Self {
            zoom: clamp_zoom(zoom),
            offset,
        }
    }

    /// Converts a screen position to world coordinates.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        screen_to_world(screen, self.zoom, self.offset)
    }

    /// Converts a world position to screen coordinates.
    pub fn world_to_screen(&self, world: Point) -> Point {
        world_to_screen(world, self.zoom, self.offset)
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed.
    pub fn zoom_around(&mut self, anchor: Point, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (zoom, offset) = zoom_around_point(self.zoom, self.offset, anchor, factor);
        self.zoom = zoom;
        self.offset = offset;
    }

    /// Moves the view by a screen-space delta. Panning is unconstrained.
    pub fn pan(&mut self, delta: Point) {
        self.offset += delta;
    }

    /// Whether the transform holds usable numbers (guards restored sessions).
    pub fn is_valid(&self) -> bool {
        self.zoom.is_finite()
            && self.zoom > 0.0
            && self.offset.x.is_finite()
            && self.offset.y.is_finite()
    }
}

/// Computes the transform that fits `content` into `viewport` with a small margin,
/// centered. Returns `None` for a degenerate viewport or empty content.
pub fn fit_to_content(content: Point, viewport: Point) -> Option<ViewTransform> {
    if viewport.x < MIN_FIT_VIEWPORT || viewport.y < MIN_FIT_VIEWPORT {
        return None;
    }
    if content.x <= 0.0 || content.y <= 0.0 {
        return None;
    }
    let zoom = clamp_zoom((viewport.x / content.x).min(viewport.y / content.y) * FIT_MARGIN);
    let offset = Point::new(
        (viewport.x - content.x * zoom) * 0.5,
        (viewport.y - content.y * zoom) * 0.5,
    );
    Some(ViewTransform { zoom, offset })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingFit {
    generation: u64,
    attempts: u32,
}

/// Retries a requested fit on each paint opportunity until the viewport has a size.
///
/// A request belongs to an image load generation; if a newer load has started by the
/// time the viewport is ready the request is dropped instead of applied.
#[derive(Debug, Default)]
pub struct FitScheduler {
    pending: Option<PendingFit>,
}

impl FitScheduler {
    /// Creates a scheduler with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a fit for the image loaded under `generation`.
    pub fn request(&mut self, generation: u64) {
        self.pending = Some(PendingFit {
            generation,
            attempts: 0,
        });
    }

    /// Whether a fit is waiting to be applied.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops any pending request.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Attempts the pending fit. Returns the new transform once it can be computed.
    pub fn poll(
        &mut self,
        current_generation: u64,
        content: Point,
        viewport: Point,
    ) -> Option<ViewTransform> {
        let mut pending = self.pending.take()?;
        if pending.generation != current_generation {
            log::debug!(
                "Dropping fit for superseded image load {} (current {})",
                pending.generation,
                current_generation
            );
            return None;
        }
        match fit_to_content(content, viewport) {
            Some(view) => Some(view),
            None => {
                pending.attempts += 1;
                if pending.attempts < MAX_FIT_ATTEMPTS {
                    self.pending = Some(pending);
                } else {
                    log::debug!("Giving up fit after {} attempts", pending.attempts);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;

    #[test]
    fn anchor_stays_fixed_across_zoom() {
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(400.0, 300.0),
            Point::new(-25.0, 1234.5),
        ];
        let factors = [0.1, 0.5, 0.9, 1.0, 1.15, 2.0, 10.0, 1e6, 1e-6];
        for zoom in [0.05, 1.0, 3.3, 20.0] {
            let offset = Point::new(17.0, -42.0);
            for anchor in anchors {
                for factor in factors {
                    let before = screen_to_world(anchor, zoom, offset);
                    let (z, o) = zoom_around_point(zoom, offset, anchor, factor);
                    let after = screen_to_world(anchor, z, o);
                    assert!(distance(before, after) < 1e-9, "zoom {zoom} f {factor}");
                    assert!((MIN_ZOOM..=MAX_ZOOM).contains(&z));
                }
            }
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewTransform::default();
        view.zoom_around(Point::ZERO, 1000.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_around(Point::ZERO, 1e-9);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn invalid_factor_is_ignored() {
        let mut view = ViewTransform::new(2.0, Point::new(5.0, 5.0));
        view.zoom_around(Point::new(10.0, 10.0), 0.0);
        view.zoom_around(Point::new(10.0, 10.0), f64::NAN);
        assert_eq!(view, ViewTransform::new(2.0, Point::new(5.0, 5.0)));
    }

    #[test]
    fn pan_adds_delta() {
        let mut view = ViewTransform::default();
        view.pan(Point::new(10.0, -4.0));
        view.pan(Point::new(1.0, 1.0));
        assert_eq!(view.offset, Point::new(11.0, -3.0));
        assert_eq!(view.zoom, 1.0);
    }

    #[test]
    fn fit_centers_content_with_margin() {
        let view = fit_to_content(Point::new(2000.0, 1000.0), Point::new(1000.0, 1000.0))
            .expect("fit");
        assert!((view.zoom - 0.5 * FIT_MARGIN).abs() < 1e-12);
        let center = view.world_to_screen(Point::new(1000.0, 500.0));
        assert!(distance(center, Point::new(500.0, 500.0)) < 1e-9);
    }

    #[test]
    fn fit_rejects_degenerate_viewport() {
        assert!(fit_to_content(Point::new(100.0, 100.0), Point::new(0.0, 600.0)).is_none());
        assert!(fit_to_content(Point::new(0.0, 100.0), Point::new(800.0, 600.0)).is_none());
    }

    #[test]
    fn scheduler_retries_until_viewport_ready() {
        let mut fit = FitScheduler::new();
        fit.request(3);
        let content = Point::new(100.0, 100.0);
        assert!(fit.poll(3, content, Point::ZERO).is_none());
        assert!(fit.is_pending());
        let view = fit.poll(3, content, Point::new(200.0, 200.0));
        assert!(view.is_some());
        assert!(!fit.is_pending());
    }

    #[test]
    fn scheduler_gives_up_silently() {
        let mut fit = FitScheduler::new();
        fit.request(1);
        for _ in 0..MAX_FIT_ATTEMPTS {
            assert!(fit.poll(1, Point::new(10.0, 10.0), Point::ZERO).is_none());
        }
        assert!(!fit.is_pending());
    }

    #[test]
    fn scheduler_drops_stale_generation() {
        let mut fit = FitScheduler::new();
        fit.request(1);
        assert!(fit
            .poll(2, Point::new(10.0, 10.0), Point::new(100.0, 100.0))
            .is_none());
        assert!(!fit.is_pending());
    }
}
