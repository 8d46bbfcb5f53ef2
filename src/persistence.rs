//! Session persistence against eframe's key-value storage.
//!
//! Writes are coalesced with a dirty flag: any number of mutations mark the store
//! dirty, and a flush serializes the session as it is at that moment. Flushes are
//! spaced at least [`PERSIST_INTERVAL_SECS`] apart, so continuous zooming writes on a
//! fixed cadence rather than every frame. Reads treat every failure as "no prior
//! session".

use crate::constants::{PERSIST_INTERVAL_SECS, SESSION_STORAGE_KEY};
use crate::error::{MeasureError, MeasureResult};
use crate::types::Session;

/// Tracks whether the persisted copy of the session is out of date.
#[derive(Debug, Default)]
pub struct SessionStore {
    dirty: bool,
    writes: u64,
    /// Time of the last flush that wrote, in seconds
    last_flush: Option<f64>,
}

impl SessionStore {
    /// Creates a clean store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that persisted fields changed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a flush is due.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Whether a flush at `now` (seconds) would write.
    pub fn is_due(&self, now: f64) -> bool {
        self.dirty
            && self
                .last_flush
                .is_none_or(|last| now - last >= PERSIST_INTERVAL_SECS)
    }

    /// Writes the session if dirty and the last write is at least
    /// [`PERSIST_INTERVAL_SECS`] old. Returns whether a write happened.
    ///
    /// The dirty flag is cleared even when the write fails; the next mutation will
    /// schedule another attempt.
    pub fn flush(
        &mut self,
        session: &Session,
        storage: Option<&mut (dyn eframe::Storage + 'static)>,
        now: f64,
    ) -> MeasureResult<bool> {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.dirty = false;
        self.last_flush = Some(now);
        let storage = storage
            .ok_or_else(|| MeasureError::Persistence("no storage backend".into()))?;
        self.write(session, storage)?;
        Ok(true)
    }

    /// Serializes the session unconditionally.
    pub fn write(&mut self, session: &Session, storage: &mut dyn eframe::Storage) -> MeasureResult<()> {
        let json = session.to_json()?;
        storage.set_string(SESSION_STORAGE_KEY, json);
        storage.flush();
        self.writes += 1;
        Ok(())
    }
}

/// Reads the persisted session. Missing or malformed entries yield `None`.
pub fn restore(storage: Option<&dyn eframe::Storage>) -> Option<Session> {
    let json = storage?.get_string(SESSION_STORAGE_KEY)?;
    match Session::from_json(&json) {
        Ok(mut session) => {
            if !session.view.is_valid() {
                session.view = Default::default();
            }
            log::info!(
                "Restored session with {} measurement line(s)",
                session.measure.lines.len()
            );
            Some(session)
        }
        Err(err) => {
            log::warn!("Ignoring unreadable saved session: {err}");
            None
        }
    }
}
