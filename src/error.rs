//! Error taxonomy for the upload-submit-render pipeline
//!
//! Selection and submission errors are *rejections*: the operation did not
//! happen and no request left the machine. Transport errors describe a
//! request that did happen but produced nothing usable; they end up inside
//! an [`ErrorDetail`] on the `Failed` pipeline state instead of escaping.

use std::fmt;
use std::path::PathBuf;

/// Reason shown to the user for every transport-class failure.
pub const GENERIC_FAILURE_REASON: &str = "Upload failed. Please check your connection.";

/// A pick or drop gesture that did not yield a usable file.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// No file handle (dialog cancelled, drop with zero files, empty name).
    /// Callers treat this as a silent no-op.
    #[error("no file was selected")]
    InvalidAttachment,

    #[error("could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The controller refused the new attachment, e.g. while a request is
    /// in flight. The previous attachment is still selected.
    #[error(transparent)]
    Rejected(#[from] SubmitError),
}

/// Operations the Submission Controller refused to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("no dataset selected")]
    NoAttachment,

    #[error("an analysis request is already in flight")]
    AlreadySubmitting,

    /// Selection or reset attempted while a request is in flight.
    #[error("the current dataset is locked while the analysis runs")]
    Busy,

    #[error("the controller has been detached from its view")]
    Detached,
}

/// Anything that went wrong between sending the request and holding a
/// recognisable response. Messages are diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout, reset.
    #[error("request failed: {0}")]
    Request(String),

    #[error("service answered with HTTP {0}")]
    Status(u16),

    /// Body was not JSON, or was truncated/malformed.
    #[error("response body is not valid JSON: {0}")]
    Body(String),

    /// Valid JSON that is neither a result nor an error marker.
    #[error("unrecognised response shape: {0}")]
    Shape(String),

    /// The HTTP client itself could not be constructed.
    #[error("http client unavailable: {0}")]
    Client(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid service url {url:?}: {message}")]
    ServiceUrl { url: String, message: String },
}

/// Which side reported the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service ran and reported a semantic failure.
    Application,
    /// Network failure or an unusable response.
    Transport,
}

/// Payload of the `Failed` state. `reason` is safe to show to the user;
/// `cause` is kept for diagnostic logging only.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ErrorDetail {
    pub kind: FailureKind,
    pub reason: String,
    #[serde(skip)]
    pub cause: Option<TransportError>,
}

impl ErrorDetail {
    pub fn application(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Application,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn transport(cause: TransportError) -> Self {
        Self {
            kind: FailureKind::Transport,
            reason: GENERIC_FAILURE_REASON.to_string(),
            cause: Some(cause),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}
