//! # Floor Plan Measure
//!
//! Load a raster floor plan, calibrate it by drawing a line of known length, then draw
//! further lines and read off their real-world lengths.
//!
//! The interactive engine is independent of any window:
//! - [`geometry`] and [`view`]: the screen/world affine transform, anchored zoom, fit
//! - [`gestures`]: wheel batching, two-finger pinch and platform pinch tracking
//! - [`input`]: the dispatcher mapping input events to view and model changes
//! - [`measure`]: calibration and measurement state machine, length formatting
//! - [`types`] and [`persistence`]: the session model and its storage
//! - [`scene`]: the ordered list of things to paint
//!
//! The `ui` module wraps it all in an `eframe` application.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod error;
pub mod geometry;
pub mod gestures;
pub mod image_source;
pub mod input;
pub mod measure;
pub mod persistence;
pub mod scene;
pub mod types;
pub mod view;
mod ui;

pub use error::{ErrorKind, MeasureError, MeasureResult};
pub use geometry::Point;
pub use input::{Dispatcher, Effect, InputEnv, InputEvent};
pub use measure::{format_length, Committed, Measurements};
pub use types::*;
pub use ui::{build_svg, export_file_name, MeasureApp, UiPrefs};
pub use view::ViewTransform;

/// Runs the application with default window settings.
///
/// A previously saved session is restored on startup. Async work (file dialogs,
/// export) needs a Tokio runtime entered on the calling thread; without one those
/// features log a warning and do nothing.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), eframe::Error> {
///     floorplan_measure::run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Floor Plan Measure",
        options,
        Box::new(|cc| Ok(Box::new(MeasureApp::new(cc)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty_and_uncalibrated() {
        let session = Session::new();
        assert!(session.image.is_none());
        assert_eq!(session.measure.mode, Mode::Calibrate);
        assert_eq!(session.measure.reference_length, 4.0);
        assert!(session.measure.scale().is_none());
        assert_eq!(session.view, ViewTransform::default());
    }
}
