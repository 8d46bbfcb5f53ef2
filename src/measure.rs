//! Calibration and measurement state machine.
//!
//! The scale (image pixels per meter) is never stored. It is derived on demand from the
//! calibration line and the declared reference length, so changing either one
//! recalibrates immediately.

use crate::constants::{DEFAULT_REFERENCE_LENGTH, MIN_LINE_PX};
use crate::error::{MeasureError, MeasureResult};
use crate::geometry::Point;
use crate::types::{DisplayUnit, Line, Mode};
use serde::{Deserialize, Serialize};

/// Result of a successfully completed drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Committed {
    /// The calibration line was replaced; the new scale is attached
    Calibrated {
        /// The new calibration line
        line: Line,
        /// Pixels per meter derived from it
        scale: f64,
    },
    /// A measurement line was appended
    Measured(Line),
}

/// Calibration line, reference length, display unit and measurement lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Current interaction mode
    pub mode: Mode,
    /// Line of known physical length, if drawn
    pub calibration: Option<Line>,
    /// Declared physical length of the calibration line, in meters
    pub reference_length: f64,
    /// Unit used for presentation only
    pub unit: DisplayUnit,
    /// Measurement lines in the order they were drawn
    pub lines: Vec<Line>,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            mode: Mode::Calibrate,
            calibration: None,
            reference_length: DEFAULT_REFERENCE_LENGTH,
            unit: DisplayUnit::Meters,
            lines: Vec::new(),
        }
    }
}

fn is_valid_reference(length: f64) -> bool {
    length.is_finite() && length > 0.0
}

impl Measurements {
    /// Pixels per meter, defined only with a calibration line and a positive reference.
    pub fn scale(&self) -> Option<f64> {
        let line = self.calibration.as_ref()?;
        if !is_valid_reference(self.reference_length) {
            return None;
        }
        let pixels = line.length();
        (pixels > 0.0).then(|| pixels / self.reference_length)
    }

    /// Whether the reference length can be used for calibration.
    pub fn has_valid_reference(&self) -> bool {
        is_valid_reference(self.reference_length)
    }

    /// Switches mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Updates the declared reference length. The scale follows automatically.
    pub fn set_reference_length(&mut self, meters: f64) {
        self.reference_length = meters;
    }

    /// Hands a finished drag to the state machine according to the current mode.
    pub fn complete_line(&mut self, start: Point, end: Point) -> MeasureResult<Committed> {
        match self.mode {
            Mode::Calibrate => self.calibrate(start, end),
            Mode::Measure => self.measure(start, end),
        }
    }

    /// Replaces the calibration line and advances to Measure mode.
    pub fn calibrate(&mut self, start: Point, end: Point) -> MeasureResult<Committed> {
        if !self.has_valid_reference() {
            return Err(MeasureError::InvalidReferenceLength);
        }
        let line = Line::new(start, end);
        let pixels = line.length();
        if !(pixels > MIN_LINE_PX) {
            return Err(MeasureError::LineTooShort);
        }
        let scale = pixels / self.reference_length;
        self.calibration = Some(line);
        self.mode = Mode::Measure;
        log::info!("Calibrated: {:.3} px/m", scale);
        Ok(Committed::Calibrated { line, scale })
    }

    /// Appends a measurement line. Requires a scale.
    pub fn measure(&mut self, start: Point, end: Point) -> MeasureResult<Committed> {
        if self.scale().is_none() {
            return Err(MeasureError::NotCalibrated);
        }
        let line = Line::new(start, end);
        self.lines.push(line);
        Ok(Committed::Measured(line))
    }

    /// Removes and returns the most recent measurement line.
    pub fn undo(&mut self) -> Option<Line> {
        self.lines.pop()
    }

    /// Clears calibration and measurements and returns to Calibrate mode.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.calibration = None;
        self.mode = Mode::Calibrate;
    }

    /// Physical length of a line in meters, if a scale exists.
    pub fn length_of(&self, line: &Line) -> Option<f64> {
        self.scale().map(|scale| line.length() / scale)
    }

    /// Formatted physical length of a line, or an unknown marker.
    pub fn label_for(&self, line: &Line) -> String {
        match self.length_of(line) {
            Some(meters) => format_length(meters, self.unit),
            None => unknown_length(self.unit),
        }
    }

    /// Label of the calibration line: always the declared reference length.
    pub fn calibration_label(&self) -> String {
        if self.has_valid_reference() {
            format_length(self.reference_length, self.unit)
        } else {
            unknown_length(self.unit)
        }
    }

    /// Sum of all measurement lengths in meters.
    pub fn total_length(&self) -> Option<f64> {
        let scale = self.scale()?;
        Some(self.lines.iter().map(|l| l.length()).sum::<f64>() / scale)
    }
}

/// Renders a length given in meters in `unit`, with the unit's precision and suffix.
pub fn format_length(meters: f64, unit: DisplayUnit) -> String {
    format!(
        "{:.*} {}",
        unit.decimals(),
        meters * unit.factor(),
        unit.suffix()
    )
}

fn unknown_length(unit: DisplayUnit) -> String {
    format!("? {}", unit.suffix())
}
