//! Application state.
//!
//! The session is the only persisted model; everything else here is transient UI state
//! (loaded texture, pending loads, open dialogs, text field contents) or display
//! preferences stored under their own key.

use crate::constants::UI_PREFS_STORAGE_KEY;
use crate::geometry::Point;
use crate::image_source::{ImageLoader, LoadPurpose};
use crate::input::Dispatcher;
use crate::persistence::{self, SessionStore};
use crate::types::Session;
use crate::view::FitScheduler;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Display preferences. They never affect measurement results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPrefs {
    /// Dark or light visuals
    pub dark_mode: bool,
    /// Whether the measurements panel is shown
    pub show_side_panel: bool,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            dark_mode: true,
            show_side_panel: true,
        }
    }
}

impl UiPrefs {
    /// Reads preferences, falling back to defaults on any failure.
    pub fn restore(storage: Option<&dyn eframe::Storage>) -> Self {
        storage
            .and_then(|s| s.get_string(UI_PREFS_STORAGE_KEY))
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    /// Writes preferences.
    pub fn save(&self, storage: &mut dyn eframe::Storage) {
        match serde_json::to_string(self) {
            Ok(json) => storage.set_string(UI_PREFS_STORAGE_KEY, json),
            Err(err) => log::warn!("Failed to serialize UI preferences: {err}"),
        }
    }
}

/// Outcome of a file dialog or export running on a background task.
#[derive(Debug)]
pub enum FileOperationResult {
    /// The user picked an image file
    Opened {
        /// File name shown in the UI
        name: String,
        /// File contents
        bytes: Vec<u8>,
    },
    /// The open dialog was dismissed without a choice
    DialogClosed,
    /// A PNG export was written
    Exported(String),
    /// Reading or writing failed
    Failed(crate::error::MeasureError),
}

/// Channel for background file operations.
pub struct FileState {
    /// Sender cloned into background tasks
    pub sender: Sender<FileOperationResult>,
    /// Receiver drained once per frame
    pub receiver: Receiver<FileOperationResult>,
    /// Whether an open dialog is currently showing
    pub dialog_open: bool,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            dialog_open: false,
        }
    }
}

/// Transient state of a platform pinch gesture, which egui reports as per-frame
/// multiplicative zoom events.
#[derive(Debug, Default)]
pub struct GestureState {
    /// Scale accumulated since the gesture began, if one is active
    pub cumulative: Option<f64>,
}

/// The floor plan measuring application.
pub struct MeasureApp {
    /// Image, view, calibration and measurements
    pub session: Session,
    /// Routes input to the session
    pub dispatcher: Dispatcher,
    /// Coalesces persistence writes
    pub store: SessionStore,
    /// Background image decoding
    pub loader: ImageLoader,
    /// Fit-to-view requested by the latest load
    pub fit: FitScheduler,
    /// GPU copy of the decoded image
    pub texture: Option<egui::TextureHandle>,
    /// Whether the session image is decoded and drawable
    pub image_ready: bool,
    /// Contents of the reference length field
    pub reference_text: String,
    /// Error waiting to be acknowledged in the modal
    pub notice: Option<String>,
    /// Short hint about what to do next, or what just happened
    pub status: String,
    /// Display preferences
    pub prefs: UiPrefs,
    /// Background file dialogs and exports
    pub file: FileState,
    /// Platform pinch in progress
    pub gesture: GestureState,
    /// Canvas size seen on the last frame
    pub viewport: Point,
}

impl Default for MeasureApp {
    fn default() -> Self {
        Self::with_session(Session::new(), UiPrefs::default())
    }
}

impl MeasureApp {
    /// Builds the app from whatever the previous run persisted.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let session = persistence::restore(cc.storage).unwrap_or_default();
        let prefs = UiPrefs::restore(cc.storage);
        let mut app = Self::with_session(session, prefs);
        app.start_restore(Some(cc.egui_ctx.clone()));
        app
    }

    /// Builds the app around an existing session without decoding its image.
    pub fn with_session(session: Session, prefs: UiPrefs) -> Self {
        let reference_text = format_reference(session.measure.reference_length);
        Self {
            session,
            dispatcher: Dispatcher::new(),
            store: SessionStore::new(),
            loader: ImageLoader::new(),
            fit: FitScheduler::new(),
            texture: None,
            image_ready: false,
            reference_text,
            notice: None,
            status: String::new(),
            prefs,
            file: FileState::default(),
            gesture: GestureState::default(),
            viewport: Point::ZERO,
        }
    }

    /// Starts re-decoding the restored session's image. A payload that is not an image
    /// means the saved session is unusable, so it is dropped silently.
    pub fn start_restore(&mut self, repaint: Option<egui::Context>) {
        let Some(image) = &self.session.image else {
            return;
        };
        let begun = self.loader.begin(
            image.name.clone(),
            image.bytes.clone(),
            LoadPurpose::Restore,
            repaint,
        );
        if let Err(err) = begun {
            log::warn!("Discarding saved session: {err}");
            self.discard_session();
        }
    }

    /// Replaces the session with an empty one, also in storage.
    pub fn discard_session(&mut self) {
        self.session = Session::new();
        self.reference_text = format_reference(self.session.measure.reference_length);
        self.texture = None;
        self.image_ready = false;
        self.store.mark_dirty();
    }

    /// Shows `message` in the blocking modal unless one is already showing.
    pub fn show_notice(&mut self, message: impl Into<String>) {
        if self.notice.is_none() {
            self.notice = Some(message.into());
        }
    }
}

/// Text for the reference length field.
pub fn format_reference(meters: f64) -> String {
    format!("{meters}")
}
