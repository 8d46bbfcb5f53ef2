//! Shared application-wide constants.
//! Centralizes tweakable values used across the view engine, input handling and rendering.

use eframe::egui::Color32;

// View transform
/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.05;
/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 20.0;
/// Fraction of the viewport the content occupies after a fit.
pub const FIT_MARGIN: f64 = 0.95;
/// Viewport extents (in screen pixels) below which a fit is postponed.
pub const MIN_FIT_VIEWPORT: f64 = 1.0;
/// Number of paint opportunities a postponed fit is retried before giving up.
pub const MAX_FIT_ATTEMPTS: u32 = 20;

// Zoom inputs
/// Multiplier applied per pixel of accumulated precise-zoom wheel delta (`exp(delta * s)`).
pub const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0025;
/// Pixels assumed per wheel "line" when the platform reports line units.
pub const WHEEL_LINE_PX: f64 = 40.0;
/// Zoom factor for a double click (inverted when Alt is held).
pub const DOUBLE_CLICK_ZOOM: f64 = 1.5;
/// Zoom factor for toolbar and keyboard zoom buttons.
pub const BUTTON_ZOOM: f64 = 1.15;

// Drawing
/// Minimum on-screen drag length (pixels) for a drag to produce a line.
pub const MIN_DRAG_PX: f64 = 2.0;
/// Minimum line length in image pixels accepted as a calibration line.
pub const MIN_LINE_PX: f64 = 2.0;
/// Reference length (meters) a fresh session starts with.
pub const DEFAULT_REFERENCE_LENGTH: f64 = 4.0;

// Render pass (all sizes in screen pixels, divided by zoom for world space)
/// Stroke width of committed lines.
pub const LINE_WIDTH_PX: f64 = 2.0;
/// Stroke width of the in-progress line.
pub const PREVIEW_WIDTH_PX: f64 = 1.5;
/// Endpoint marker radius.
pub const ENDPOINT_RADIUS_PX: f64 = 3.0;
/// Label font size.
pub const LABEL_FONT_PX: f64 = 13.0;
/// Dash and gap length for dashed strokes.
pub const DASH_PX: f64 = 6.0;

/// Canvas background in dark mode.
pub const BACKGROUND_DARK: Color32 = Color32::from_rgb(32, 33, 36);
/// Canvas background in light mode.
pub const BACKGROUND_LIGHT: Color32 = Color32::from_rgb(236, 237, 240);
/// Calibration line color.
pub const CALIBRATION_COLOR: Color32 = Color32::from_rgb(255, 140, 0);
/// Measurement line color.
pub const MEASUREMENT_COLOR: Color32 = Color32::from_rgb(0, 170, 255);
/// Label text color.
pub const LABEL_TEXT_COLOR: Color32 = Color32::WHITE;
/// Label backdrop color.
pub const LABEL_BACKDROP_COLOR: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 170);

// Persistence
/// Storage key for the persisted session. Bump the suffix to invalidate old entries.
pub const SESSION_STORAGE_KEY: &str = "floorplan_measure.session.v1";
/// Storage key for UI preferences (theme, panels).
pub const UI_PREFS_STORAGE_KEY: &str = "floorplan_measure.ui";
/// Minimum time between two session writes, in seconds.
pub const PERSIST_INTERVAL_SECS: f64 = 1.0;
