//! Core data types for a measuring session.
//!
//! This module defines lines, display units, the loaded image reference and the
//! [`Session`] aggregate that is persisted between launches.

use crate::geometry::{distance, Point};
use crate::measure::Measurements;
use crate::view::ViewTransform;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for drawn lines.
pub type LineId = Uuid;

/// A straight segment in world (image pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Stable unique identifier
    pub id: LineId,
    /// First endpoint
    pub start: Point,
    /// Second endpoint
    pub end: Point,
}

impl Line {
    /// Creates a line with a fresh identifier.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
        }
    }

    /// Length in the coordinate space of the endpoints.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }
}

/// Interaction mode deciding what a completed drag produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// The next line defines the scale
    #[default]
    Calibrate,
    /// Lines are appended as measurements
    Measure,
}

impl Mode {
    /// Human-readable name for toolbars and status text.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Calibrate => "Calibrate",
            Mode::Measure => "Measure",
        }
    }
}

/// Unit used to present lengths. Stored lengths are always meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayUnit {
    /// Meters, two decimals
    #[default]
    Meters,
    /// Centimeters, no decimals
    Centimeters,
    /// Millimeters, no decimals
    Millimeters,
}

impl DisplayUnit {
    /// All units in menu order.
    pub const ALL: [DisplayUnit; 3] = [
        DisplayUnit::Meters,
        DisplayUnit::Centimeters,
        DisplayUnit::Millimeters,
    ];

    /// Multiplier from meters to this unit.
    pub fn factor(self) -> f64 {
        match self {
            DisplayUnit::Meters => 1.0,
            DisplayUnit::Centimeters => 100.0,
            DisplayUnit::Millimeters => 1000.0,
        }
    }

    /// Number of decimals shown.
    pub fn decimals(self) -> usize {
        match self {
            DisplayUnit::Meters => 2,
            DisplayUnit::Centimeters | DisplayUnit::Millimeters => 0,
        }
    }

    /// Suffix appended to formatted values.
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayUnit::Meters => "m",
            DisplayUnit::Centimeters => "cm",
            DisplayUnit::Millimeters => "mm",
        }
    }
}

/// The loaded floor plan image.
///
/// Only the encoded bytes are authoritative; `width`/`height` are re-derived whenever
/// the bytes are decoded.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Original file name, if known
    pub name: Option<String>,
    /// Decoded width in pixels
    pub width: u32,
    /// Decoded height in pixels
    pub height: u32,
    /// Encoded image file contents
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageRef {
    /// Pixel size as a world-space extent.
    pub fn size(&self) -> Point {
        Point::new(self.width as f64, self.height as f64)
    }
}

impl std::fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRef")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Everything the user has set up: image, view, calibration and measurements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// The floor plan being measured
    pub image: Option<ImageRef>,
    /// Current zoom and pan
    pub view: ViewTransform,
    /// Calibration, measurement lines and presentation unit
    pub measure: Measurements,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the session to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a session from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Replaces the image. Lines drawn on a previous image are meaningless on the new
    /// pixel grid, so calibration and measurements are cleared.
    pub fn replace_image(&mut self, image: ImageRef) {
        self.image = Some(image);
        self.measure.reset();
    }
}

/// Serde adapter storing byte buffers as base64 strings.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
