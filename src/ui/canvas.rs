//! The measuring canvas: translates egui's raw input into dispatcher events, applies
//! what they changed, and paints the scene.

use super::state::MeasureApp;
use crate::constants::{BACKGROUND_DARK, BACKGROUND_LIGHT, WHEEL_LINE_PX};
use crate::geometry::Point;
use crate::gestures::TouchPhase;
use crate::input::{Effect, InputEnv, InputEvent};
use crate::measure::Committed;
use crate::scene;
use eframe::egui;

impl MeasureApp {
    /// Facts about the canvas the dispatcher needs.
    pub fn input_env(&self) -> InputEnv {
        InputEnv {
            viewport: self.viewport,
            image_ready: self.image_ready && !self.loader.is_busy(),
        }
    }

    /// Sends one event through the dispatcher and applies its effects.
    pub fn dispatch(&mut self, event: InputEvent) {
        let env = self.input_env();
        let effects = self.dispatcher.handle(&mut self.session, &env, event);
        self.apply_effects(effects);
    }

    /// Reacts to what the dispatcher reported.
    pub fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ViewChanged | Effect::ModelChanged => self.store.mark_dirty(),
                Effect::Committed(Committed::Calibrated { scale, .. }) => {
                    self.status = format!("Calibrated at {scale:.1} px/m. Drag to measure.");
                }
                Effect::Committed(Committed::Measured(line)) => {
                    self.status = format!("Measured {}", self.session.measure.label_for(&line));
                }
                Effect::Undone(_) => self.status = "Removed the last measurement".into(),
                Effect::Rejected(err) => {
                    log::info!("Line rejected: {err}");
                    if err.is_user_visible() {
                        self.show_notice(err.to_string());
                    }
                }
                Effect::Cancelled => {}
            }
        }
    }

    /// Draws the canvas and handles all pointer, wheel, touch and key input on it.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.viewport = Point::from(rect.size());

        // A discarded pass is re-run with the same raw input; only consume it once.
        let mut events = if ui.ctx().current_pass_index() == 0 {
            self.collect_input(ui, rect, &response)
        } else {
            Vec::new()
        };
        if self.notice.is_some() {
            // While the modal is up only releases get through, so nothing stays stuck.
            events.retain(is_release);
        }
        for event in events {
            self.dispatch(event);
        }

        if let Some(image) = &self.session.image {
            let size = image.size();
            if let Some(view) = self.fit.poll(self.loader.generation(), size, self.viewport) {
                self.session.view = view;
                self.store.mark_dirty();
            }
        }
        self.dispatch(InputEvent::FrameEnd);

        if response.hovered() {
            let icon = if self.dispatcher.is_panning() {
                egui::CursorIcon::Grabbing
            } else if self.dispatcher.pan_key_held() {
                egui::CursorIcon::Grab
            } else if self.input_env().image_ready {
                egui::CursorIcon::Crosshair
            } else {
                egui::CursorIcon::Default
            };
            ui.ctx().set_cursor_icon(icon);
        }

        let background = if self.prefs.dark_mode {
            BACKGROUND_DARK
        } else {
            BACKGROUND_LIGHT
        };
        let scene = scene::build(&self.session, self.dispatcher.preview(), background);
        self.paint_scene(&painter, rect, &scene);
    }

    /// Converts this frame's raw egui events into canvas-relative input events.
    fn collect_input(
        &mut self,
        ui: &egui::Ui,
        rect: egui::Rect,
        response: &egui::Response,
    ) -> Vec<InputEvent> {
        let wants_keyboard = ui.ctx().wants_keyboard_input();
        let (raw_events, modifiers, hover) =
            ui.input(|i| (i.events.clone(), i.modifiers, i.pointer.hover_pos()));
        let local = |p: egui::Pos2| Point::from(p - rect.min);
        let over_canvas = hover.is_some_and(|p| rect.contains(p));

        let mut out = Vec::new();
        let mut zoomed = false;
        for event in &raw_events {
            match event {
                egui::Event::PointerMoved(pos) => out.push(InputEvent::PointerMove {
                    pos: local(*pos),
                    modifiers,
                }),
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    modifiers,
                } => {
                    if !*pressed {
                        out.push(InputEvent::PointerUp {
                            pos: local(*pos),
                            button: *button,
                            modifiers: *modifiers,
                        });
                    } else if rect.contains(*pos) {
                        out.push(InputEvent::PointerDown {
                            pos: local(*pos),
                            button: *button,
                            modifiers: *modifiers,
                        });
                    }
                }
                egui::Event::MouseWheel {
                    unit,
                    delta,
                    modifiers,
                    ..
                } => {
                    let Some(pos) = hover.filter(|_| over_canvas) else {
                        continue;
                    };
                    let scale = match unit {
                        egui::MouseWheelUnit::Point => 1.0,
                        egui::MouseWheelUnit::Line => WHEEL_LINE_PX,
                        egui::MouseWheelUnit::Page => rect.height() as f64,
                    };
                    out.push(InputEvent::Wheel {
                        delta: Point::from(*delta) * scale,
                        pos: local(pos),
                        modifiers: *modifiers,
                    });
                }
                egui::Event::Zoom(factor) => {
                    zoomed = true;
                    if self.gesture.cumulative.is_none() {
                        out.push(InputEvent::GestureStart);
                    }
                    let scale = self.gesture.cumulative.unwrap_or(1.0) * *factor as f64;
                    self.gesture.cumulative = Some(scale);
                    out.push(InputEvent::GestureChange { scale });
                }
                egui::Event::Touch { id, phase, pos, .. } => out.push(InputEvent::Touch {
                    id: id.0,
                    phase: touch_phase(*phase),
                    pos: local(*pos),
                }),
                egui::Event::Key {
                    key,
                    pressed,
                    modifiers,
                    ..
                } => {
                    if !wants_keyboard || !*pressed {
                        out.push(InputEvent::Key {
                            key: *key,
                            pressed: *pressed,
                            modifiers: *modifiers,
                        });
                    }
                }
                _ => {}
            }
        }

        if !zoomed && self.gesture.cumulative.take().is_some() {
            out.push(InputEvent::GestureEnd);
        }

        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos().or(hover) {
                out.push(InputEvent::DoubleClick {
                    pos: local(pos),
                    modifiers,
                });
            }
        }
        out
    }
}

fn touch_phase(phase: egui::TouchPhase) -> TouchPhase {
    match phase {
        egui::TouchPhase::Start => TouchPhase::Start,
        egui::TouchPhase::Move => TouchPhase::Move,
        egui::TouchPhase::End => TouchPhase::End,
        egui::TouchPhase::Cancel => TouchPhase::Cancel,
    }
}

fn is_release(event: &InputEvent) -> bool {
    matches!(
        event,
        InputEvent::PointerUp { .. }
            | InputEvent::Key { pressed: false, .. }
            | InputEvent::GestureEnd
            | InputEvent::Touch {
                phase: TouchPhase::End | TouchPhase::Cancel,
                ..
            }
    )
}
