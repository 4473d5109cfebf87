//! Submission Controller
//!
//! Owns the single [`PipelineState`] value and the current [`Attachment`].
//! Views never mutate state; they call the controller (directly, or through
//! the [`SelectorEvents`] it implements) and watch [`PipelineSnapshot`]s
//! published on a `tokio::sync::watch` channel.
//!
//! ```text
//!            select               begin                complete
//!   Idle ───────────▶ Ready ───────────▶ Submitting ───────────▶ Succeeded
//!                      ▲  ▲                                  └──▶ Failed
//!                      │  └──────── select (replaces) ───────────────┘
//!                      └────────────── begin (resubmit) ◀────────────┘
//! ```
//!
//! A submission is split in two so the reentry guard can be exercised on
//! its own: [`SubmissionController::begin`] takes the lock and produces a
//! [`SubmissionTicket`], and [`SubmissionController::complete`] consumes it.
//! Tickets from an earlier generation, or arriving after
//! [`SubmissionController::detach`], are discarded without touching state.

use crate::attachment::{Attachment, AttachmentInfo, SelectorEvents};
use crate::error::{ErrorDetail, SubmitError, TransportError};
use crate::response::{self, AnalysisResult, RawResponse};
use crate::transport::{AnalysisTransport, TransferPayload, FILE_FIELD};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Ready,
    Submitting,
    Succeeded(AnalysisResult),
    Failed(ErrorDetail),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded(_) | PipelineState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Ready => "ready",
            PipelineState::Submitting => "submitting",
            PipelineState::Succeeded(_) => "succeeded",
            PipelineState::Failed(_) => "failed",
        }
    }
}

/// Everything a rendering layer needs, published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub attachment: Option<AttachmentInfo>,
    pub drag_active: bool,
    /// Whether the "Run Analysis" affordance should be enabled.
    pub submit_enabled: bool,
}

/// Proof that a request may be sent. Carries the body to send.
#[derive(Debug)]
pub struct SubmissionTicket {
    generation: u64,
    payload: TransferPayload,
}

impl SubmissionTicket {
    pub fn payload(&self) -> &TransferPayload {
        &self.payload
    }

    /// Hand the body to the transport. The ticket keeps its generation.
    pub fn take_payload(&mut self) -> TransferPayload {
        TransferPayload {
            field: self.payload.field,
            file_name: std::mem::take(&mut self.payload.file_name),
            bytes: std::mem::take(&mut self.payload.bytes),
        }
    }
}

/// What `complete` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The ticket was stale or the view is gone; state is unchanged.
    Discarded,
}

pub struct SubmissionController {
    state: PipelineState,
    attachment: Option<Attachment>,
    drag_active: bool,
    generation: u64,
    detached: bool,
    tx: watch::Sender<PipelineSnapshot>,
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PipelineSnapshot {
            state: PipelineState::Idle,
            attachment: None,
            drag_active: false,
            submit_enabled: false,
        });
        Self {
            state: PipelineState::Idle,
            attachment: None,
            drag_active: false,
            generation: 0,
            detached: false,
            tx,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn submit_enabled(&self) -> bool {
        self.attachment.is_some()
            && !self.detached
            && !matches!(self.state, PipelineState::Submitting)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            state: self.state.clone(),
            attachment: self.attachment.as_ref().map(Attachment::info),
            drag_active: self.drag_active,
            submit_enabled: self.submit_enabled(),
        }
    }

    /// Receive a snapshot after every change. The receiver starts with the
    /// current snapshot already marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.tx.subscribe()
    }

    /// Replace the attachment and clear any prior result.
    pub fn select(&mut self, attachment: Attachment) -> Result<(), SubmitError> {
        if self.detached {
            return Err(SubmitError::Detached);
        }
        if matches!(self.state, PipelineState::Submitting) {
            warn!(name = attachment.name(), "selection rejected while submitting");
            return Err(SubmitError::Busy);
        }
        debug!(from = self.state.name(), name = attachment.name(), "attachment replaced");
        self.attachment = Some(attachment);
        self.transition(PipelineState::Ready);
        Ok(())
    }

    /// Drop the attachment and return to `Idle`.
    pub fn reset(&mut self) -> Result<(), SubmitError> {
        if self.detached {
            return Err(SubmitError::Detached);
        }
        if matches!(self.state, PipelineState::Submitting) {
            return Err(SubmitError::Busy);
        }
        self.attachment = None;
        self.transition(PipelineState::Idle);
        Ok(())
    }

    /// Take the submission lock. Rejections never produce a ticket, so no
    /// request can be sent for them.
    pub fn begin(&mut self) -> Result<SubmissionTicket, SubmitError> {
        if self.detached {
            return Err(SubmitError::Detached);
        }
        if matches!(self.state, PipelineState::Submitting) {
            warn!("submit rejected: request already in flight");
            return Err(SubmitError::AlreadySubmitting);
        }
        let attachment = self.attachment.as_ref().ok_or_else(|| {
            warn!("submit rejected: no attachment");
            SubmitError::NoAttachment
        })?;

        let payload = TransferPayload {
            field: FILE_FIELD,
            file_name: attachment.name().to_string(),
            bytes: attachment.content().to_vec(),
        };

        self.generation += 1;
        info!(
            name = attachment.name(),
            size_bytes = attachment.size_bytes(),
            generation = self.generation,
            "submitting dataset"
        );
        self.transition(PipelineState::Submitting);

        Ok(SubmissionTicket {
            generation: self.generation,
            payload,
        })
    }

    /// Apply the outcome of the request a ticket was issued for.
    pub fn complete(
        &mut self,
        ticket: SubmissionTicket,
        response: Result<RawResponse, TransportError>,
    ) -> Completion {
        if self.detached
            || ticket.generation != self.generation
            || !matches!(self.state, PipelineState::Submitting)
        {
            debug!(generation = ticket.generation, "discarding stale response");
            return Completion::Discarded;
        }

        let next = match response {
            Ok(raw) => match response::decode(&raw) {
                Ok(result) => {
                    info!(status = raw.status, "analysis succeeded");
                    PipelineState::Succeeded(result)
                }
                Err(detail) => {
                    log_failure(&detail);
                    PipelineState::Failed(detail)
                }
            },
            Err(cause) => {
                let detail = ErrorDetail::transport(cause);
                log_failure(&detail);
                PipelineState::Failed(detail)
            }
        };

        self.transition(next);
        Completion::Applied
    }

    /// Run one submission end to end: one request, no retry.
    pub async fn submit<T>(&mut self, transport: &T) -> Result<&PipelineState, SubmitError>
    where
        T: AnalysisTransport + ?Sized,
    {
        let mut ticket = self.begin()?;
        let response = transport.send(ticket.take_payload()).await;
        self.complete(ticket, response);
        Ok(&self.state)
    }

    /// The view is gone. Late responses are ignored from now on.
    pub fn detach(&mut self) {
        debug!(generation = self.generation, "controller detached");
        self.detached = true;
        self.publish();
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = self.state.name(), to = next.name(), "pipeline transition");
        self.state = next;
        self.publish();
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }
}

impl SelectorEvents for SubmissionController {
    fn on_select(&mut self, attachment: Attachment) -> Result<(), SubmitError> {
        self.select(attachment)
    }

    fn on_drag_state_change(&mut self, active: bool) {
        if !self.detached && self.drag_active != active {
            self.drag_active = active;
            self.publish();
        }
    }
}

fn log_failure(detail: &ErrorDetail) {
    match &detail.cause {
        Some(cause) => warn!(reason = %detail.reason, %cause, "analysis failed"),
        None => warn!(reason = %detail.reason, "analysis reported an error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{AttachmentSelector, DropPayload, FileHandle};
    use crate::error::{FailureKind, SelectionError, GENERIC_FAILURE_REASON};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const RESULT_BODY: &str = r#"{
        "summary": {"gross_aep": 120.5, "net_aep": 110.2, "availability": 0.962, "wake_loss": 0.031},
        "monthly_production": [],
        "power_curve": [],
        "turbine_performance": []
    }"#;

    /// Replies with a canned outcome and counts requests.
    struct FakeTransport {
        reply: Result<RawResponse, TransportError>,
        calls: AtomicUsize,
        seen: Mutex<Vec<TransferPayload>>,
    }

    impl FakeTransport {
        fn replying(reply: Result<RawResponse, TransportError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisTransport for FakeTransport {
        async fn send(&self, payload: TransferPayload) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(payload);
            self.reply.clone()
        }
    }

    fn dataset(name: &str) -> Attachment {
        Attachment::new(name, b"time,power\n".to_vec()).unwrap()
    }

    fn ready(name: &str) -> SubmissionController {
        let mut controller = SubmissionController::new();
        controller.select(dataset(name)).unwrap();
        controller
    }

    // ==========================================================================
    // STATE MACHINE
    // ==========================================================================

    #[test]
    fn test_starts_idle_with_submit_disabled() {
        let controller = SubmissionController::new();
        assert_eq!(controller.state(), &PipelineState::Idle);
        assert!(!controller.submit_enabled());
        assert!(controller.attachment().is_none());
    }

    #[test]
    fn test_select_moves_to_ready() {
        let controller = ready("plant.csv");
        assert_eq!(controller.state(), &PipelineState::Ready);
        assert!(controller.submit_enabled());
    }

    #[test]
    fn test_begin_without_attachment_is_rejected() {
        let mut controller = SubmissionController::new();
        assert_eq!(controller.begin().unwrap_err(), SubmitError::NoAttachment);
        assert_eq!(controller.state(), &PipelineState::Idle);
    }

    #[test]
    fn test_reentry_is_rejected_while_submitting() {
        let mut controller = ready("plant.csv");
        let _ticket = controller.begin().unwrap();
        assert_eq!(controller.state(), &PipelineState::Submitting);
        assert!(!controller.submit_enabled());

        assert_eq!(controller.begin().unwrap_err(), SubmitError::AlreadySubmitting);
        assert_eq!(controller.state(), &PipelineState::Submitting);
    }

    #[test]
    fn test_attachment_locked_while_submitting() {
        let mut controller = ready("plant.csv");
        let _ticket = controller.begin().unwrap();

        assert_eq!(controller.select(dataset("other.csv")), Err(SubmitError::Busy));
        assert_eq!(controller.reset(), Err(SubmitError::Busy));
        assert_eq!(controller.attachment().unwrap().name(), "plant.csv");
    }

    #[test]
    fn test_ticket_carries_file_field() {
        let mut controller = ready("plant.csv");
        let ticket = controller.begin().unwrap();
        assert_eq!(ticket.payload().field, "file");
        assert_eq!(ticket.payload().file_name, "plant.csv");
        assert_eq!(ticket.payload().bytes, b"time,power\n");
    }

    #[test]
    fn test_new_selection_clears_terminal_state() {
        let mut controller = ready("plant.csv");
        let ticket = controller.begin().unwrap();
        controller.complete(ticket, Ok(RawResponse::new(200, RESULT_BODY)));
        assert!(matches!(controller.state(), PipelineState::Succeeded(_)));

        controller.select(dataset("next.csv")).unwrap();
        assert_eq!(controller.state(), &PipelineState::Ready);
        assert_eq!(controller.attachment().unwrap().name(), "next.csv");

        let ticket = controller.begin().unwrap();
        controller.complete(ticket, Err(TransportError::Request("refused".into())));
        assert!(matches!(controller.state(), PipelineState::Failed(_)));

        controller.select(dataset("third.csv")).unwrap();
        assert_eq!(controller.state(), &PipelineState::Ready);
    }

    #[test]
    fn test_terminal_state_does_not_revert_on_its_own() {
        let mut controller = ready("plant.csv");
        let ticket = controller.begin().unwrap();
        controller.complete(ticket, Ok(RawResponse::new(200, RESULT_BODY)));

        let _ = controller.snapshot();
        let _ = controller.subscribe();
        assert!(controller.state().is_terminal());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut controller = ready("plant.csv");
        controller.reset().unwrap();
        assert_eq!(controller.state(), &PipelineState::Idle);
        assert!(controller.attachment().is_none());
    }

    // ==========================================================================
    // STALE RESPONSES
    // ==========================================================================

    #[test]
    fn test_response_after_detach_is_discarded() {
        let mut controller = ready("plant.csv");
        let ticket = controller.begin().unwrap();
        controller.detach();

        let completion = controller.complete(ticket, Ok(RawResponse::new(200, RESULT_BODY)));
        assert_eq!(completion, Completion::Discarded);
        assert_eq!(controller.state(), &PipelineState::Submitting);
        assert_eq!(controller.begin().unwrap_err(), SubmitError::Detached);
        assert!(!controller.submit_enabled());
    }

    #[test]
    fn test_detached_controller_ignores_every_mutation() {
        let mut controller = ready("plant.csv");
        controller.detach();
        let mut rx = controller.subscribe();

        assert_eq!(controller.reset(), Err(SubmitError::Detached));
        assert_eq!(controller.select(dataset("b.csv")), Err(SubmitError::Detached));
        controller.on_drag_state_change(true);

        assert_eq!(controller.state(), &PipelineState::Ready);
        assert_eq!(controller.attachment().unwrap().name(), "plant.csv");
        assert!(!controller.drag_active());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_ticket_from_older_generation_is_discarded() {
        let mut controller = ready("plant.csv");
        let first = controller.begin().unwrap();
        controller.complete(first, Err(TransportError::Status(503)));

        let old = SubmissionTicket {
            generation: 1,
            payload: controller.begin().unwrap().take_payload(),
        };
        assert_eq!(
            controller.complete(old, Ok(RawResponse::new(200, RESULT_BODY))),
            Completion::Discarded
        );
        assert_eq!(controller.state(), &PipelineState::Submitting);
    }

    // ==========================================================================
    // END-TO-END SUBMISSION
    // ==========================================================================

    #[tokio::test]
    async fn test_success_issues_exactly_one_request() {
        let transport = FakeTransport::replying(Ok(RawResponse::new(200, RESULT_BODY)));
        let mut controller = ready("plant.csv");

        let state = controller.submit(&transport).await.unwrap();
        match state {
            PipelineState::Succeeded(result) => {
                assert_eq!(result.summary.gross_aep, Some(120.5));
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.seen.lock().unwrap()[0].file_name, "plant.csv");
    }

    #[tokio::test]
    async fn test_submit_without_attachment_sends_nothing() {
        let transport = FakeTransport::replying(Ok(RawResponse::new(200, RESULT_BODY)));
        let mut controller = SubmissionController::new();

        let err = controller.submit(&transport).await.unwrap_err();
        assert_eq!(err, SubmitError::NoAttachment);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_attachment() {
        let transport =
            FakeTransport::replying(Err(TransportError::Request("connection refused".into())));
        let mut controller = ready("scada_2020.csv");

        let state = controller.submit(&transport).await.unwrap().clone();
        let PipelineState::Failed(detail) = state else {
            panic!("expected failure");
        };
        assert_eq!(detail.kind, FailureKind::Transport);
        assert_eq!(detail.reason, GENERIC_FAILURE_REASON);
        assert_eq!(controller.attachment().unwrap().name(), "scada_2020.csv");
        assert!(controller.submit_enabled());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_application_error_reason_is_exact() {
        let transport = FakeTransport::replying(Ok(RawResponse::new(
            200,
            r#"{ "error": "unsupported file format" }"#,
        )));
        let mut controller = ready("plant.txt");

        let state = controller.submit(&transport).await.unwrap();
        assert!(matches!(
            state,
            PipelineState::Failed(ErrorDetail { kind: FailureKind::Application, reason, .. })
                if reason == "unsupported file format"
        ));
    }

    #[tokio::test]
    async fn test_resubmission_after_failure_is_a_fresh_request() {
        let transport = FakeTransport::replying(Err(TransportError::Status(502)));
        let mut controller = ready("plant.csv");

        controller.submit(&transport).await.unwrap();
        controller.submit(&transport).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    // ==========================================================================
    // SELECTOR WIRING AND SUBSCRIPTION
    // ==========================================================================

    #[test]
    fn test_selector_drives_controller() {
        let mut selector = AttachmentSelector::new();
        let mut controller = SubmissionController::new();
        let mut rx = controller.subscribe();

        selector.drag_enter(&mut controller);
        assert!(controller.drag_active());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().drag_active);

        let handle = FileHandle::Memory {
            name: "plant.json".into(),
            bytes: b"{}".to_vec(),
        };
        selector
            .select_from_drop(DropPayload::single(handle), &mut controller)
            .unwrap();

        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.drag_active);
        assert_eq!(snapshot.state, PipelineState::Ready);
        assert_eq!(snapshot.attachment.unwrap().name, "plant.json");
        assert!(snapshot.submit_enabled);
    }

    #[test]
    fn test_selector_during_submission_keeps_first_file() {
        let mut selector = AttachmentSelector::new();
        let mut controller = ready("plant.csv");
        let _ticket = controller.begin().unwrap();

        let handle = FileHandle::Memory {
            name: "late.csv".into(),
            bytes: vec![1],
        };
        let err = selector
            .select_from_browse(Some(handle), &mut controller)
            .unwrap_err();
        assert!(matches!(err, SelectionError::Rejected(SubmitError::Busy)));
        assert_eq!(controller.attachment().unwrap().name(), "plant.csv");
        assert_eq!(controller.state(), &PipelineState::Submitting);
    }

    #[test]
    fn test_snapshot_serializes_state_tag() {
        let controller = ready("plant.csv");
        let json = serde_json::to_value(controller.snapshot()).unwrap();
        assert_eq!(json["state"]["state"], "ready");
        assert_eq!(json["attachment"]["name"], "plant.csv");
        assert_eq!(json["submit_enabled"], true);
    }
}
