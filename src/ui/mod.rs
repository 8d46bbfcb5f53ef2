//! User interface for the floor plan measuring tool.
//!
//! # Module Organization
//!
//! - `state` - `MeasureApp` and its transient UI state
//! - `canvas` - egui input adapter feeding the dispatcher, and the canvas widget
//! - `rendering` - painting scene primitives
//! - `file_ops` - open dialog, drag-and-drop and background decode completion
//! - `export` - SVG/PNG export of the visible canvas

mod canvas;
mod export;
mod file_ops;
mod rendering;
mod state;

pub use export::{build_svg, export_file_name};
pub use state::{MeasureApp, UiPrefs};

use self::state::format_reference;
use crate::constants::PERSIST_INTERVAL_SECS;
use crate::error::MeasureError;
use crate::input::InputEvent;
use crate::types::{DisplayUnit, Mode};
use eframe::egui;
use std::time::Duration;

impl eframe::App for MeasureApp {
    /// Persists the session and display preferences.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Err(err) = self.store.write(&self.session, storage) {
            log::warn!("Failed to persist session: {err}");
        }
        self.prefs.save(storage);
    }

    /// Main update function called by egui for each frame.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let visuals = if self.prefs.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        self.poll_image_loads(ctx);
        self.handle_pending_operations(ctx);
        self.handle_dropped_files(ctx);
        self.handle_file_shortcuts(ctx);

        self.draw_ui(ctx);

        self.persist(ctx, frame.storage_mut());
        if self.fit.is_pending() || self.loader.is_busy() {
            ctx.request_repaint();
        }
    }
}

impl MeasureApp {
    /// Lays out all panels and the canvas. Separate from `update` so tests can drive
    /// it without an `eframe::Frame`.
    pub fn draw_ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        if self.prefs.show_side_panel {
            egui::SidePanel::right("measurements_panel")
                .resizable(true)
                .default_width(220.0)
                .show(ctx, |ui| {
                    self.draw_side_panel(ui);
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_canvas(ui);
            });

        self.draw_notice(ctx);
    }

    /// Writes the session once the current interaction has settled, at most once per
    /// [`PERSIST_INTERVAL_SECS`].
    pub fn persist(
        &mut self,
        ctx: &egui::Context,
        storage: Option<&mut (dyn eframe::Storage + 'static)>,
    ) {
        if self.dispatcher.is_interacting() {
            return;
        }
        let now = ctx.input(|i| i.time);
        if let Err(err) = self.store.flush(&self.session, storage, now) {
            log::warn!("Session not persisted: {err}");
        }
        if self.store.is_dirty() {
            ctx.request_repaint_after(Duration::from_secs_f64(PERSIST_INTERVAL_SECS));
        }
    }

    /// Cmd/Ctrl+O opens an image; Cmd/Ctrl+E exports.
    fn handle_file_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || self.notice.is_some() {
            return;
        }
        let (open, export) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::O) && i.modifiers.command,
                i.key_pressed(egui::Key::E) && i.modifiers.command,
            )
        });
        if open {
            self.open_image_dialog(ctx);
        }
        if export {
            self.export_png(ctx);
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                self.open_image_dialog(ui.ctx());
            }
            ui.add_enabled_ui(self.session.image.is_some(), |ui| {
                if ui.button("Export PNG").clicked() {
                    self.export_png(ui.ctx());
                }
            });

            ui.separator();

            let mut mode = self.session.measure.mode;
            ui.selectable_value(&mut mode, Mode::Calibrate, "Calibrate (1)");
            ui.selectable_value(&mut mode, Mode::Measure, "Measure (2)");
            if mode != self.session.measure.mode {
                self.session.measure.set_mode(mode);
                self.store.mark_dirty();
            }

            ui.separator();

            ui.label("Reference (m):");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.reference_text).desired_width(60.0),
            );
            if response.changed() {
                if let Some(meters) = parse_reference(&self.reference_text) {
                    self.session.measure.set_reference_length(meters);
                    self.store.mark_dirty();
                }
            }
            if response.lost_focus() {
                self.commit_reference_text();
            }

            let mut unit = self.session.measure.unit;
            egui::ComboBox::from_id_salt("display_unit")
                .width(50.0)
                .selected_text(unit.suffix())
                .show_ui(ui, |ui| {
                    for option in DisplayUnit::ALL {
                        ui.selectable_value(&mut unit, option, option.suffix());
                    }
                });
            if unit != self.session.measure.unit {
                self.session.measure.unit = unit;
                self.store.mark_dirty();
            }

            ui.separator();

            if ui.button("-").on_hover_text("Zoom out (-)").clicked() {
                self.dispatch(InputEvent::ZoomOut);
            }
            if ui.button("+").on_hover_text("Zoom in (+)").clicked() {
                self.dispatch(InputEvent::ZoomIn);
            }
            if ui.button("Fit").on_hover_text("Fit image to view (0)").clicked() {
                self.dispatch(InputEvent::FitToView);
            }

            ui.separator();

            ui.add_enabled_ui(!self.session.measure.lines.is_empty(), |ui| {
                if ui.button("⟲ Undo").on_hover_text("Remove the last measurement").clicked() {
                    self.dispatch(InputEvent::Undo);
                }
            });
            if ui.button("Reset").on_hover_text("Clear calibration and measurements").clicked() {
                self.dispatch(InputEvent::Cancel);
                self.session.measure.reset();
                self.store.mark_dirty();
                self.status = "Cleared calibration and measurements".into();
            }

            ui.separator();

            ui.checkbox(&mut self.prefs.dark_mode, "Dark Mode");
            ui.checkbox(&mut self.prefs.show_side_panel, "Panel");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Zoom: {:.0}%", self.session.view.zoom * 100.0));
            });
        });
    }

    /// Validates the reference field once editing ends; bad input is reported and the
    /// field reverts to the length in effect.
    fn commit_reference_text(&mut self) {
        if parse_reference(&self.reference_text).is_none() {
            self.show_notice(MeasureError::InvalidReferenceLength.to_string());
        }
        self.reference_text = format_reference(self.session.measure.reference_length);
    }

    fn draw_side_panel(&self, ui: &mut egui::Ui) {
        let measure = &self.session.measure;
        ui.heading("Measurements");
        ui.separator();

        egui::Grid::new("scale_grid").num_columns(2).show(ui, |ui| {
            ui.label("Scale:");
            match measure.scale() {
                Some(scale) => ui.label(format!("{scale:.2} px/m")),
                None => ui.weak("not calibrated"),
            };
            ui.end_row();
            ui.label("Reference:");
            ui.label(measure.calibration_label());
            ui.end_row();
            if let Some(image) = &self.session.image {
                ui.label("Image:");
                ui.label(format!(
                    "{} ({}×{})",
                    image.name.as_deref().unwrap_or("untitled"),
                    image.width,
                    image.height
                ));
                ui.end_row();
            }
        });

        ui.separator();

        if measure.lines.is_empty() {
            ui.weak("No measurements yet");
        } else {
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("lines_grid")
                    .num_columns(2)
                    .striped(true)
                    .show(ui, |ui| {
                        for (i, line) in measure.lines.iter().enumerate() {
                            ui.label(format!("#{}", i + 1));
                            ui.monospace(measure.label_for(line));
                            ui.end_row();
                        }
                    });
            });
            ui.separator();
            let total = match measure.total_length() {
                Some(meters) => crate::measure::format_length(meters, measure.unit),
                None => format!("? {}", measure.unit.suffix()),
            };
            ui.strong(format!("Total: {total}"));
        }
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(self.mode_hint());
            if !self.status.is_empty() {
                ui.separator();
                ui.weak(&self.status);
            }
        });
    }

    /// What the user can do next.
    pub fn mode_hint(&self) -> String {
        if self.session.image.is_none() {
            return "Open a floor plan image or drop one onto the window".into();
        }
        if !self.input_env().image_ready {
            return "Decoding image…".into();
        }
        match self.session.measure.mode {
            Mode::Calibrate => format!(
                "Calibrate: drag along a distance of {}. Space or middle-drag pans, Ctrl+wheel zooms",
                self.session.measure.calibration_label()
            ),
            Mode::Measure if self.session.measure.scale().is_none() => {
                "Measure: calibrate first (press 1)".into()
            }
            Mode::Measure => "Measure: drag to measure, Shift keeps the line straight".into(),
        }
    }

    fn draw_notice(&mut self, ctx: &egui::Context) {
        let Some(message) = self.notice.clone() else {
            return;
        };
        let modal = egui::Modal::new(egui::Id::new("notice_modal")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading("Floor Plan Measure");
            ui.label(message);
            ui.add_space(8.0);
            ui.button("OK").clicked()
        });
        if modal.inner || modal.should_close() {
            self.notice = None;
        }
    }
}

/// Parses a reference length, accepting only finite positive numbers.
fn parse_reference(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
