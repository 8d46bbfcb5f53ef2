//! Image source: validates and decodes floor plan images off the UI thread.
//!
//! Every load gets a generation number from a monotonic counter. Results come back
//! over a channel and are only accepted if their generation is still the latest, so
//! a slow decode can never clobber a newer image.

use crate::error::{MeasureError, MeasureResult};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Pixels of a decoded image, ready for upload as a texture.
#[derive(Clone, PartialEq)]
pub struct DecodedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Unpremultiplied RGBA8 pixels, row-major
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecodedImage({}x{})", self.width, self.height)
    }
}

/// Why an image is being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPurpose {
    /// A new image chosen by the user; replaces the session's image
    Open,
    /// Re-decoding the image of a restored session
    Restore,
}

/// A finished load.
#[derive(Debug)]
pub struct ImageLoad {
    /// Generation the load was started under
    pub generation: u64,
    /// Why it was started
    pub purpose: LoadPurpose,
    /// File name, if known
    pub name: Option<String>,
    /// Encoded bytes as received
    pub bytes: Vec<u8>,
    /// Decoded pixels or the decode error
    pub result: MeasureResult<DecodedImage>,
}

/// Checks that `bytes` look like a supported image format.
pub fn sniff(bytes: &[u8]) -> MeasureResult<image::ImageFormat> {
    image::guess_format(bytes).map_err(|_| MeasureError::NotAnImage)
}

/// Decodes image bytes into RGBA pixels.
pub fn decode(bytes: &[u8]) -> MeasureResult<DecodedImage> {
    let format = sniff(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(MeasureError::Decode("image has no pixels".into()));
    }
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Starts decodes in the background and hands back the results that are still current.
#[derive(Debug)]
pub struct ImageLoader {
    generation: u64,
    sender: Sender<ImageLoad>,
    receiver: Receiver<ImageLoad>,
    in_flight: usize,
}

impl Default for ImageLoader {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            generation: 0,
            sender,
            receiver,
            in_flight: 0,
        }
    }
}

impl ImageLoader {
    /// Creates a loader with no loads started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation of the most recently started load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether any started load has not reported back yet.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Validates the payload and starts decoding it. Non-image payloads are rejected
    /// immediately and do not advance the generation.
    ///
    /// `repaint` is notified when the decode finishes so the UI can poll promptly.
    pub fn begin(
        &mut self,
        name: Option<String>,
        bytes: Vec<u8>,
        purpose: LoadPurpose,
        repaint: Option<eframe::egui::Context>,
    ) -> MeasureResult<u64> {
        sniff(&bytes)?;
        self.generation += 1;
        self.in_flight += 1;
        let generation = self.generation;
        let sender = self.sender.clone();
        log::info!(
            "Decoding image {} ({} bytes, load {generation})",
            name.as_deref().unwrap_or("<unnamed>"),
            bytes.len()
        );
        let job = move || {
            let result = decode(&bytes);
            deliver(
                &sender,
                ImageLoad {
                    generation,
                    purpose,
                    name,
                    bytes,
                    result,
                },
            );
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        };
        spawn_decode(job);
        Ok(generation)
    }

    /// Drains finished loads. Loads superseded by a newer `begin` are returned as
    /// [`MeasureError::Stale`] so the caller can discard them.
    pub fn poll(&mut self) -> Vec<MeasureResult<ImageLoad>> {
        let mut out = Vec::new();
        while let Ok(load) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if load.generation == self.generation {
                out.push(Ok(load));
            } else {
                log::debug!(
                    "Discarding stale image load {} (current {})",
                    load.generation,
                    self.generation
                );
                out.push(Err(MeasureError::Stale {
                    generation: load.generation,
                    current: self.generation,
                }));
            }
        }
        out
    }
}

/// Sends a finished load back to its loader. Returns `false` if the loader is gone.
fn deliver(sender: &Sender<ImageLoad>, load: ImageLoad) -> bool {
    let generation = load.generation;
    if sender.send(load).is_err() {
        log::debug!("Image load {generation} finished after its loader was dropped");
        return false;
    }
    true
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_decode(job: impl FnOnce() + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(job);
        }
        Err(_) => {
            std::thread::spawn(job);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_decode(job: impl FnOnce() + Send + 'static) {
    job();
}
