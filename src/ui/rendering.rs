//! Paints scene primitives with the egui painter.
//!
//! Scene geometry is in world units; everything is mapped through the session's view
//! transform and offset by the canvas origin here.

use super::state::MeasureApp;
use crate::constants::{LABEL_BACKDROP_COLOR, LABEL_TEXT_COLOR};
use crate::geometry::Point;
use crate::scene::{Primitive, StrokeStyle};
use eframe::egui;
use eframe::epaint::StrokeKind;

const LABEL_PADDING: f32 = 3.0;

impl MeasureApp {
    /// Paints `scene` into `canvas_rect`.
    pub fn paint_scene(&self, painter: &egui::Painter, canvas_rect: egui::Rect, scene: &[Primitive]) {
        let view = self.session.view;
        let origin = Point::from(canvas_rect.min);
        let to_screen = |p: Point| (view.world_to_screen(p) + origin).to_pos2();
        let to_px = |v: f64| (v * view.zoom) as f32;

        for primitive in scene {
            match primitive {
                Primitive::Background(color) => {
                    painter.rect_filled(canvas_rect, 0.0, *color);
                }
                Primitive::Image { size } => {
                    let screen = egui::Rect::from_min_max(to_screen(Point::ZERO), to_screen(*size));
                    match &self.texture {
                        Some(texture) if self.image_ready => {
                            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                            painter.image(texture.id(), screen, uv, egui::Color32::WHITE);
                        }
                        _ => {
                            painter.text(
                                canvas_rect.center(),
                                egui::Align2::CENTER_CENTER,
                                "Decoding image…",
                                egui::FontId::proportional(16.0),
                                egui::Color32::GRAY,
                            );
                        }
                    }
                }
                Primitive::Segment {
                    start,
                    end,
                    color,
                    width,
                    style,
                    marker_radius,
                    ..
                } => {
                    let a = to_screen(*start);
                    let b = to_screen(*end);
                    let stroke = egui::Stroke::new(to_px(*width), *color);
                    match style {
                        StrokeStyle::Solid => {
                            painter.line_segment([a, b], stroke);
                        }
                        StrokeStyle::Dashed { dash } => {
                            let dash = to_px(*dash);
                            painter.extend(egui::Shape::dashed_line(&[a, b], stroke, dash, dash));
                        }
                    }
                    let r = to_px(*marker_radius);
                    painter.circle_filled(a, r, *color);
                    painter.circle_filled(b, r, *color);
                }
                Primitive::Label {
                    pos,
                    text,
                    size,
                    color,
                } => {
                    let galley = painter.layout_no_wrap(
                        text.clone(),
                        egui::FontId::proportional(to_px(*size)),
                        LABEL_TEXT_COLOR,
                    );
                    let text_rect = egui::Align2::CENTER_CENTER.anchor_size(to_screen(*pos), galley.size());
                    let backdrop = text_rect.expand(LABEL_PADDING);
                    painter.rect_filled(backdrop, LABEL_PADDING, LABEL_BACKDROP_COLOR);
                    painter.rect_stroke(
                        backdrop,
                        LABEL_PADDING,
                        egui::Stroke::new(1.0, *color),
                        StrokeKind::Inside,
                    );
                    painter.galley(text_rect.min, galley, LABEL_TEXT_COLOR);
                }
            }
        }

        if self.session.image.is_none() {
            painter.text(
                canvas_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open a floor plan image, or drop one here",
                egui::FontId::proportional(16.0),
                egui::Color32::GRAY,
            );
        }
    }
}
