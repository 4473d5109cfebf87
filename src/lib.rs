//! Windscope - wind-plant analysis client
//!
//! Windscope takes one operational dataset (CSV, JSON or Excel export from a
//! plant's SCADA system), sends it to a remote analysis service, and turns
//! the JSON it gets back into a report: summary metrics, monthly
//! production, the power curve and a turbine ranking.
//!
//! The analysis itself (energy yield, availability, wake losses) happens on
//! the service. This crate owns the pipeline around it.
//!
//! # Pipeline
//!
//! 1. **Attachment Selector** ([`attachment`]): one file, from a picker,
//!    a path or a drop. A new selection replaces the old one.
//!
//! 2. **Submission Controller** ([`pipeline`]): the state machine
//!    `Idle → Ready → Submitting → Succeeded | Failed`. One request per
//!    submission, never retried, never concurrent.
//!
//! 3. **Report Projector** ([`report`]): a pure mapping from the decoded
//!    result to cards, chart series and the top-10 ranking, plus HTML,
//!    JSON and CSV writers.
//!
//! # Quick Start
//!
//! ```no_run
//! use windscope::{Attachment, HttpTransport, PipelineState, SubmissionController};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let url = "http://127.0.0.1:5000".parse()?;
//! let transport = HttpTransport::new(&url)?;
//!
//! let mut controller = SubmissionController::new();
//! controller.select(Attachment::new("scada.csv", std::fs::read("scada.csv")?)?)?;
//!
//! match controller.submit(&transport).await? {
//!     PipelineState::Succeeded(result) => {
//!         let view = windscope::report::project(result);
//!         println!("{}", view.summary_line());
//!     }
//!     PipelineState::Failed(detail) => eprintln!("{}", detail.reason),
//!     _ => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Failure classes
//!
//! | Class | Example | Shown to the user |
//! |-------|---------|-------------------|
//! | Invalid attachment | picker cancelled | nothing |
//! | Application error | `{"error": "unsupported file format"}` | the reason, verbatim |
//! | Transport error | connection refused, HTML error page | a generic message |
//!
//! # Modules
//!
//! - [`attachment`]: File selection and drag state
//! - [`pipeline`]: Submission state machine and snapshot publishing
//! - [`response`]: Wire decoding of service replies
//! - [`transport`]: Multipart HTTP client
//! - [`report`]: View projection and output formatters (HTML, JSON, CSV)
//! - [`serve`]: Local drag-and-drop UI
//! - [`config`]: `windscope.toml` settings

pub mod attachment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod response;
pub mod serve;
pub mod transport;

pub use attachment::{Attachment, AttachmentSelector, DropPayload, FileHandle, SelectorEvents};
pub use config::Config;
pub use error::{ErrorDetail, FailureKind, SelectionError, SubmitError, TransportError};
pub use pipeline::{PipelineSnapshot, PipelineState, SubmissionController};
pub use report::{project, ReportView};
pub use response::{AnalysisResult, RawResponse};
pub use transport::{AnalysisTransport, HttpTransport};
