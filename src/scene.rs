//! Render pass: the ordered list of primitives to paint for the current state.
//!
//! Geometry is in world coordinates. Stroke widths, dash lengths and text sizes are
//! divided by the zoom so that, once the backend applies the view transform, they come
//! out at a constant size on screen. The same scene feeds the egui painter and the
//! PNG exporter.

use crate::constants::{
    CALIBRATION_COLOR, DASH_PX, ENDPOINT_RADIUS_PX, LABEL_FONT_PX, LINE_WIDTH_PX,
    MEASUREMENT_COLOR, PREVIEW_WIDTH_PX,
};
use crate::geometry::Point;
use crate::input::Preview;
use crate::measure::format_length;
use crate::types::{Mode, Session};
use eframe::egui::Color32;

/// Solid or dashed stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeStyle {
    /// Continuous stroke
    Solid,
    /// Dashes of the given world-space length, equal gaps
    Dashed {
        /// Dash (and gap) length in world units
        dash: f64,
    },
}

/// What a segment represents, for hit testing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    /// The committed calibration line
    Calibration,
    /// A committed measurement line
    Measurement,
    /// The line being drawn
    Preview,
}

/// One paint operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Fill the whole viewport
    Background(Color32),
    /// The floor plan, covering `[0, size]` in world space
    Image {
        /// Image extent in world units
        size: Point,
    },
    /// A straight line with round endpoint markers
    Segment {
        /// What the line is
        role: SegmentRole,
        /// Start point
        start: Point,
        /// End point
        end: Point,
        /// Stroke color
        color: Color32,
        /// Stroke width in world units
        width: f64,
        /// Solid or dashed
        style: StrokeStyle,
        /// Endpoint marker radius in world units
        marker_radius: f64,
    },
    /// A text label centered on `pos`
    Label {
        /// Center of the label
        pos: Point,
        /// Text to show
        text: String,
        /// Font size in world units
        size: f64,
        /// Accent color (used for the label outline)
        color: Color32,
    },
}

/// Builds the scene for `session`, with an optional in-progress line.
pub fn build(session: &Session, preview: Option<Preview>, background: Color32) -> Vec<Primitive> {
    let zoom = session.view.zoom;
    let px = |v: f64| v / zoom;
    let measure = &session.measure;
    let mut out = vec![Primitive::Background(background)];

    if let Some(image) = &session.image {
        out.push(Primitive::Image { size: image.size() });
    }

    if let Some(line) = &measure.calibration {
        out.push(Primitive::Segment {
            role: SegmentRole::Calibration,
            start: line.start,
            end: line.end,
            color: CALIBRATION_COLOR,
            width: px(LINE_WIDTH_PX),
            style: StrokeStyle::Solid,
            marker_radius: px(ENDPOINT_RADIUS_PX),
        });
        if measure.has_valid_reference() {
            out.push(label(line.midpoint(), measure.calibration_label(), CALIBRATION_COLOR, zoom));
        }
    }

    for line in &measure.lines {
        out.push(Primitive::Segment {
            role: SegmentRole::Measurement,
            start: line.start,
            end: line.end,
            color: MEASUREMENT_COLOR,
            width: px(LINE_WIDTH_PX),
            style: StrokeStyle::Solid,
            marker_radius: px(ENDPOINT_RADIUS_PX),
        });
        if let Some(meters) = measure.length_of(line) {
            out.push(label(line.midpoint(), format_length(meters, measure.unit), MEASUREMENT_COLOR, zoom));
        }
    }

    if let Some(preview) = preview {
        let color = match preview.mode {
            Mode::Calibrate => CALIBRATION_COLOR,
            Mode::Measure => MEASUREMENT_COLOR,
        };
        out.push(Primitive::Segment {
            role: SegmentRole::Preview,
            start: preview.start,
            end: preview.end,
            color,
            width: px(PREVIEW_WIDTH_PX),
            style: StrokeStyle::Dashed { dash: px(DASH_PX) },
            marker_radius: px(ENDPOINT_RADIUS_PX),
        });
        if preview.mode == Mode::Measure {
            if let Some(scale) = measure.scale() {
                let meters = crate::geometry::distance(preview.start, preview.end) / scale;
                let mid = preview.start.midpoint(preview.end);
                out.push(label(mid, format_length(meters, measure.unit), color, zoom));
            }
        }
    }

    out
}

fn label(pos: Point, text: String, color: Color32, zoom: f64) -> Primitive {
    Primitive::Label {
        pos,
        text,
        size: LABEL_FONT_PX / zoom,
        color,
    }
}
