//! Attachment Selector
//!
//! Captures exactly one dataset file, from a file picker (or a path on the
//! command line) or from a drag-and-drop gesture, and hands it to whoever
//! implements [`SelectorEvents`] - normally the
//! [`SubmissionController`](crate::pipeline::SubmissionController).
//!
//! The selector never touches pipeline state itself. It only proposes a new
//! attachment and reports the drag highlight.

use crate::error::{SelectionError, SubmitError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Whatever a platform gesture produced.
#[derive(Debug, Clone)]
pub enum FileHandle {
    /// A file on disk (native picker or CLI argument).
    Path(PathBuf),
    /// Bytes that already arrived elsewhere, e.g. an upload from the local UI.
    Memory { name: String, bytes: Vec<u8> },
}

/// Files carried by a drop event.
#[derive(Debug, Clone, Default)]
pub struct DropPayload {
    pub files: Vec<FileHandle>,
}

impl DropPayload {
    pub fn single(handle: FileHandle) -> Self {
        Self { files: vec![handle] }
    }
}

/// The selected dataset. Immutable once built: a new selection replaces
/// the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    content: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Result<Self, SelectionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SelectionError::InvalidAttachment);
        }
        Ok(Self { name, content })
    }

    pub fn from_handle(handle: FileHandle) -> Result<Self, SelectionError> {
        match handle {
            FileHandle::Memory { name, bytes } => Self::new(name, bytes),
            FileHandle::Path(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or(SelectionError::InvalidAttachment)?;
                let content = std::fs::read(&path)
                    .map_err(|source| SelectionError::Unreadable { path, source })?;
                Self::new(name, content)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Size as the drop zone shows it: kilobytes, two decimals.
    pub fn size_label(&self) -> String {
        format!("{:.2} KB", self.size_bytes() as f64 / 1024.0)
    }

    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            name: self.name.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

// Dataset bytes can be megabytes; keep them out of debug output.
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// What a view needs to describe the attachment, without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Capabilities the selector calls into. Dispatch is synchronous and
/// single-threaded.
pub trait SelectorEvents {
    /// Offer a new attachment. A refusal is passed back to the gesture
    /// that produced it as [`SelectionError::Rejected`].
    fn on_select(&mut self, attachment: Attachment) -> Result<(), SubmitError>;
    fn on_drag_state_change(&mut self, active: bool);
}

/// Drop-zone and picker front end.
#[derive(Debug, Default)]
pub struct AttachmentSelector {
    drag_active: bool,
}

impl AttachmentSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn drag_enter<E: SelectorEvents + ?Sized>(&mut self, events: &mut E) {
        self.set_drag(true, events);
    }

    pub fn drag_over<E: SelectorEvents + ?Sized>(&mut self, events: &mut E) {
        self.set_drag(true, events);
    }

    pub fn drag_leave<E: SelectorEvents + ?Sized>(&mut self, events: &mut E) {
        self.set_drag(false, events);
    }

    /// Picker result. `None` means the dialog was cancelled.
    pub fn select_from_browse<E: SelectorEvents + ?Sized>(
        &mut self,
        handle: Option<FileHandle>,
        events: &mut E,
    ) -> Result<(), SelectionError> {
        let handle = handle.ok_or(SelectionError::InvalidAttachment)?;
        let attachment = Attachment::from_handle(handle)?;
        debug!(name = attachment.name(), "attachment selected via browse");
        events.on_select(attachment)?;
        Ok(())
    }

    /// Drop result. Completing a drop always clears the highlight, even
    /// when the payload turns out to be empty.
    pub fn select_from_drop<E: SelectorEvents + ?Sized>(
        &mut self,
        payload: DropPayload,
        events: &mut E,
    ) -> Result<(), SelectionError> {
        self.set_drag(false, events);

        let mut files = payload.files.into_iter();
        let first = files.next().ok_or(SelectionError::InvalidAttachment)?;
        let ignored = files.count();
        if ignored > 0 {
            debug!(ignored, "drop carried extra files; only the first is used");
        }

        let attachment = Attachment::from_handle(first)?;
        debug!(name = attachment.name(), "attachment selected via drop");
        events.on_select(attachment)?;
        Ok(())
    }

    fn set_drag<E: SelectorEvents + ?Sized>(&mut self, active: bool, events: &mut E) {
        if self.drag_active != active {
            self.drag_active = active;
            events.on_drag_state_change(active);
        }
    }
}
