//! Export: render the visible canvas to SVG and rasterize it to PNG.
//!
//! - SVG building works on all targets.
//! - PNG rasterization and the save dialog are native only.

use super::state::MeasureApp;
use crate::error::{MeasureError, MeasureResult};
use crate::geometry::Point;
use crate::scene::{self, Primitive, StrokeStyle};
use crate::types::Session;
use base64::Engine as _;
use eframe::egui::Color32;
use std::fmt::Write as _;

/// Default file name for an export taken at `now`.
pub fn export_file_name<Tz: chrono::TimeZone>(now: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("floorplan-{}.png", now.format("%Y%m%d-%H%M%S"))
}

/// Builds an SVG document of the scene as seen through the session's view, sized to
/// `viewport`.
pub fn build_svg(session: &Session, scene: &[Primitive], viewport: Point) -> MeasureResult<String> {
    let width = viewport.x.round().max(1.0);
    let height = viewport.y.round().max(1.0);
    let view = session.view;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );

    let mut group_open = false;
    for primitive in scene {
        if let Primitive::Background(color) = primitive {
            let (fill, opacity) = svg_color(*color);
            let _ = writeln!(
                out,
                "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{fill}\" fill-opacity=\"{opacity}\" />"
            );
            continue;
        }
        if !group_open {
            let _ = writeln!(
                out,
                "<g transform=\"matrix({z} 0 0 {z} {ox} {oy})\">",
                z = view.zoom,
                ox = view.offset.x,
                oy = view.offset.y
            );
            group_open = true;
        }
        match primitive {
            Primitive::Background(_) => {}
            Primitive::Image { size } => {
                let Some(image) = &session.image else {
                    continue;
                };
                let png = reencode_png(&image.bytes)?;
                let data = base64::engine::general_purpose::STANDARD.encode(png);
                let _ = writeln!(
                    out,
                    "  <image x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" xlink:href=\"data:image/png;base64,{data}\" />",
                    size.x, size.y
                );
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
                let (stroke, opacity) = svg_color(*color);
                let dash = match style {
                    StrokeStyle::Solid => String::new(),
                    StrokeStyle::Dashed { dash } => format!(" stroke-dasharray=\"{dash} {dash}\""),
                };
                let _ = writeln!(
                    out,
                    "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{stroke}\" stroke-opacity=\"{opacity}\" stroke-width=\"{width}\" stroke-linecap=\"round\"{dash} />",
                    start.x, start.y, end.x, end.y
                );
                for p in [start, end] {
                    let _ = writeln!(
                        out,
                        "  <circle cx=\"{}\" cy=\"{}\" r=\"{marker_radius}\" fill=\"{stroke}\" fill-opacity=\"{opacity}\" />",
                        p.x, p.y
                    );
                }
            }
            Primitive::Label {
                pos,
                text,
                size,
                color,
            } => {
                // No text shaping here; the backdrop width is estimated from the glyph count.
                let w = text.chars().count() as f64 * size * 0.6 + size * 0.5;
                let h = size * 1.4;
                let (stroke, _) = svg_color(*color);
                let (backdrop, backdrop_opacity) = svg_color(crate::constants::LABEL_BACKDROP_COLOR);
                let (fill, _) = svg_color(crate::constants::LABEL_TEXT_COLOR);
                let _ = writeln!(
                    out,
                    "  <rect x=\"{}\" y=\"{}\" width=\"{w}\" height=\"{h}\" rx=\"{r}\" fill=\"{backdrop}\" fill-opacity=\"{backdrop_opacity}\" stroke=\"{stroke}\" stroke-width=\"{sw}\" />",
                    pos.x - w / 2.0,
                    pos.y - h / 2.0,
                    r = size * 0.25,
                    sw = size / 13.0
                );
                let _ = writeln!(
                    out,
                    "  <text x=\"{}\" y=\"{}\" font-size=\"{size}\" font-family=\"sans-serif\" text-anchor=\"middle\" dominant-baseline=\"central\" fill=\"{fill}\">{}</text>",
                    pos.x,
                    pos.y,
                    escape_xml(text)
                );
            }
        }
    }
    if group_open {
        let _ = writeln!(out, "</g>");
    }
    let _ = writeln!(out, "</svg>");
    Ok(out)
}

/// Rasterizes an SVG document at its own size.
#[cfg(not(target_arch = "wasm32"))]
pub fn render_png(svg: &str) -> MeasureResult<tiny_skia::Pixmap> {
    use std::sync::Arc;

    let mut opt = usvg::Options::default();
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    opt.fontdb = Arc::new(db);

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opt)
        .map_err(|e| MeasureError::Export(format!("invalid SVG: {e}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        MeasureError::Export(format!("cannot allocate {}x{} image", size.width(), size.height()))
    })?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap)
}

impl MeasureApp {
    /// Renders the visible canvas to PNG and offers to save it (native builds only).
    pub fn export_png(&mut self, ctx: &eframe::egui::Context) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Err(err) = self.start_png_export(ctx) {
                log::warn!("{err}");
                self.show_notice(err.to_string());
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            let _ = ctx;
            self.status = "PNG export is only available in the desktop app".into();
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start_png_export(&mut self, ctx: &eframe::egui::Context) -> MeasureResult<()> {
        if self.session.image.is_none() {
            return Err(MeasureError::NoImage);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MeasureError::Export("no async runtime for the save dialog".into()));
        }
        let background = if self.prefs.dark_mode {
            crate::constants::BACKGROUND_DARK
        } else {
            crate::constants::BACKGROUND_LIGHT
        };
        let scene = scene::build(&self.session, None, background);
        let svg = build_svg(&self.session, &scene, self.viewport)?;
        let pixmap = render_png(&svg)?;
        let file_name = export_file_name(&chrono::Local::now());
        log::info!("Rendered {}x{} export", pixmap.width(), pixmap.height());

        let sender = self.file.sender.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("PNG", &["png"])
                .set_file_name(&file_name)
                .save_file()
                .await
            {
                let path = handle.path().to_path_buf();
                let result = match pixmap.save_png(&path) {
                    Ok(()) => super::state::FileOperationResult::Exported(path.display().to_string()),
                    Err(e) => super::state::FileOperationResult::Failed(MeasureError::Export(
                        format!("{}: {e}", path.display()),
                    )),
                };
                let _ = sender.send(result);
                ctx.request_repaint();
            }
        });
        Ok(())
    }
}

/// Converts any supported image to PNG, the one raster format every SVG renderer reads.
fn reencode_png(bytes: &[u8]) -> MeasureResult<Vec<u8>> {
    let img = image::load_from_memory(bytes).map_err(|e| MeasureError::Export(e.to_string()))?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| MeasureError::Export(e.to_string()))?;
    Ok(out.into_inner())
}

fn svg_color(color: Color32) -> (String, f32) {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    (format!("#{r:02x}{g:02x}{b:02x}"), a as f32 / 255.0)
}

fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::tests::png_bytes;
    use crate::types::ImageRef;
    use crate::view::ViewTransform;
    use chrono::TimeZone;

    fn session() -> Session {
        let mut s = Session::new();
        s.replace_image(ImageRef {
            name: Some("plan.png".into()),
            width: 40,
            height: 20,
            bytes: png_bytes(40, 20),
        });
        s.view = ViewTransform::new(2.0, Point::new(5.0, 6.0));
        s.measure
            .complete_line(Point::new(0.0, 0.0), Point::new(40.0, 0.0))
            .expect("calibrate");
        s.measure
            .complete_line(Point::new(0.0, 10.0), Point::new(20.0, 10.0))
            .expect("measure");
        s
    }

    #[test]
    fn file_name_uses_timestamp() {
        let t = chrono::Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .single()
            .expect("valid time");
        assert_eq!(export_file_name(&t), "floorplan-20240305-140709.png");
    }

    #[test]
    fn svg_contains_view_transform_and_labels() {
        let s = session();
        let scene = scene::build(&s, None, Color32::BLACK);
        let svg = build_svg(&s, &scene, Point::new(300.0, 200.0)).expect("svg");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"300\" height=\"200\""));
        assert!(svg.contains("matrix(2 0 0 2 5 6)"));
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.contains(">4.00 m</text>"));
        assert!(svg.contains(">2.00 m</text>"));
        assert_eq!(svg.matches("<line ").count(), 2);
    }

    #[test]
    fn escapes_label_text() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn png_has_viewport_size() {
        let s = session();
        let scene = scene::build(&s, None, Color32::BLACK);
        let svg = build_svg(&s, &scene, Point::new(120.0, 80.0)).expect("svg");
        let pixmap = render_png(&svg).expect("png");
        assert_eq!((pixmap.width(), pixmap.height()), (120, 80));
        // Background is opaque black outside the image.
        let px = pixmap.pixel(119, 79).expect("pixel");
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (0, 0, 0, 255));
    }
}
