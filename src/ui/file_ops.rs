//! Getting floor plan images into the app: the open dialog, drag-and-drop, and
//! completion of background decodes.

use super::state::{FileOperationResult, MeasureApp};
use crate::error::MeasureError;
use crate::image_source::{DecodedImage, ImageLoad, LoadPurpose};
use crate::types::ImageRef;
use eframe::egui;

/// Extensions offered by the open dialog.
#[cfg(not(target_arch = "wasm32"))]
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

impl MeasureApp {
    /// Shows the native open dialog on a background task (native only; on the web,
    /// images arrive by drag-and-drop).
    pub fn open_image_dialog(&mut self, ctx: &egui::Context) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if self.file.dialog_open {
                return;
            }
            if tokio::runtime::Handle::try_current().is_err() {
                log::warn!("No async runtime, cannot show the open dialog");
                return;
            }
            self.file.dialog_open = true;
            let sender = self.file.sender.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let result = match rfd::AsyncFileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file()
                    .await
                {
                    Some(handle) => FileOperationResult::Opened {
                        name: handle.file_name(),
                        bytes: handle.read().await,
                    },
                    None => FileOperationResult::DialogClosed,
                };
                let _ = sender.send(result);
                ctx.request_repaint();
            });
        }
        #[cfg(target_arch = "wasm32")]
        {
            let _ = ctx;
            self.status = "Drop an image file onto the window to open it".into();
        }
    }

    /// Drains finished dialogs and exports.
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.file.receiver.try_recv() {
            match result {
                FileOperationResult::Opened { name, bytes } => {
                    self.file.dialog_open = false;
                    self.load_image_bytes(Some(name), bytes, Some(ctx));
                }
                FileOperationResult::DialogClosed => self.file.dialog_open = false,
                FileOperationResult::Exported(path) => {
                    log::info!("Exported {path}");
                    self.status = format!("Exported {path}");
                }
                FileOperationResult::Failed(err) => {
                    log::warn!("File operation failed: {err}");
                    if err.is_user_visible() {
                        self.show_notice(err.to_string());
                    }
                }
            }
        }
    }

    /// Loads the first file dropped onto the window this frame.
    pub fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        let name = if file.name.is_empty() {
            file.path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        } else {
            Some(file.name.clone())
        };
        let bytes = match (&file.bytes, &file.path) {
            (Some(bytes), _) => Ok(bytes.to_vec()),
            (None, Some(path)) => std::fs::read(path)
                .map_err(|err| MeasureError::Decode(format!("{}: {err}", path.display()))),
            (None, None) => Err(MeasureError::NotAnImage),
        };
        match bytes {
            Ok(bytes) => self.load_image_bytes(name, bytes, Some(ctx)),
            Err(err) => {
                log::warn!("Could not read dropped file: {err}");
                self.show_notice(err.to_string());
            }
        }
    }

    /// Starts decoding a user-chosen image. Rejected payloads leave the session as is.
    pub fn load_image_bytes(
        &mut self,
        name: Option<String>,
        bytes: Vec<u8>,
        ctx: Option<&egui::Context>,
    ) {
        let label = name.clone().unwrap_or_else(|| "image".into());
        match self
            .loader
            .begin(name, bytes, LoadPurpose::Open, ctx.cloned())
        {
            Ok(_) => self.status = format!("Loading {label}…"),
            Err(err) => {
                log::warn!("Rejected {label}: {err}");
                self.show_notice(err.to_string());
            }
        }
    }

    /// Applies decodes that finished since the last frame.
    pub fn poll_image_loads(&mut self, ctx: &egui::Context) {
        for result in self.loader.poll() {
            match result {
                Ok(load) => self.apply_image_load(ctx, load),
                Err(err) => log::debug!("{err}"),
            }
        }
    }

    fn apply_image_load(&mut self, ctx: &egui::Context, load: ImageLoad) {
        let ImageLoad {
            generation,
            purpose,
            name,
            bytes,
            result,
        } = load;
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(err) => {
                match purpose {
                    LoadPurpose::Open => {
                        self.show_notice(err.to_string());
                        // This load superseded the decode of the current image.
                        if self.session.image.is_some() && !self.image_ready {
                            log::info!("Re-decoding the current image after a failed open");
                            self.start_restore(Some(ctx.clone()));
                        }
                    }
                    LoadPurpose::Restore => {
                        log::warn!("Saved image is unreadable, starting fresh: {err}");
                        self.discard_session();
                    }
                }
                return;
            }
        };

        self.texture = Some(upload_texture(ctx, &decoded));
        match purpose {
            LoadPurpose::Open => {
                self.session.replace_image(ImageRef {
                    name: name.clone(),
                    width: decoded.width,
                    height: decoded.height,
                    bytes,
                });
                self.dispatcher = Default::default();
                self.status = format!(
                    "Loaded {} ({}×{}). Draw a line of known length to calibrate.",
                    name.as_deref().unwrap_or("image"),
                    decoded.width,
                    decoded.height
                );
            }
            LoadPurpose::Restore => {
                if let Some(image) = &mut self.session.image {
                    image.width = decoded.width;
                    image.height = decoded.height;
                }
            }
        }
        log::info!("Image ready: {}x{}", decoded.width, decoded.height);
        self.image_ready = true;
        self.fit.request(generation);
        self.store.mark_dirty();
    }
}

fn upload_texture(ctx: &egui::Context, decoded: &DecodedImage) -> egui::TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [decoded.width as usize, decoded.height as usize],
        &decoded.rgba,
    );
    ctx.load_texture("floorplan", image, egui::TextureOptions::LINEAR)
}
