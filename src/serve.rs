//! HTTP server for interactive mode
//!
//! `windscope serve` → starts server, opens browser, shows a drop zone.
//!
//! Drag highlighting and drops go through the same [`AttachmentSelector`]
//! and [`SubmissionController`] the CLI uses: the page reports
//! `dragenter`/`dragleave` to `/api/drag` and uploads the dropped file to
//! `/api/select`. "Run Analysis" posts to `/api/submit`, which takes the
//! submission lock and answers `202` at once; the request to the analysis
//! service runs on a background runtime worker while the page polls
//! `/api/state`. The request loop never waits on the analysis service.

use crate::attachment::{AttachmentSelector, DropPayload, FileHandle};
use crate::error::SelectionError;
use crate::pipeline::{Completion, PipelineSnapshot, PipelineState, SubmissionController};
use crate::report::{self, ReportView};
use crate::transport::{AnalysisTransport, HttpTransport};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    fn failure(data: Option<T>, error: impl Into<String>) -> Self {
        Self { ok: false, data, error: Some(error.into()) }
    }
}

#[derive(Deserialize, Debug)]
pub struct SelectParams {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct DragParams {
    pub active: bool,
}

/// A routed reply, before it is turned into a `tiny_http` response.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}"}}"#, e));
        Self { status, content_type: "application/json", body }
    }

    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn not_found() -> Self {
        Self { status: 404, content_type: "text/plain", body: "Not found".to_string() }
    }
}

/// Pipeline pieces shared between the request loop and the submission task.
struct Shared {
    controller: SubmissionController,
    selector: AttachmentSelector,
    last_report: Option<ReportView>,
}

/// One browser session: the pipeline, the last rendered report and the
/// runtime submissions run on.
pub struct Session<T> {
    shared: Arc<Mutex<Shared>>,
    transport: Arc<T>,
    runtime: tokio::runtime::Runtime,
}

impl<T> Session<T>
where
    T: AnalysisTransport + Send + Sync + 'static,
{
    pub fn new(transport: T) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("windscope-submit")
            .enable_all()
            .build()?;
        Ok(Self {
            shared: Arc::new(Mutex::new(Shared {
                controller: SubmissionController::new(),
                selector: AttachmentSelector::new(),
                last_report: None,
            })),
            transport: Arc::new(transport),
            runtime,
        })
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.lock().controller.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock_shared(&self.shared)
    }

    pub fn route(&self, method: &Method, url: &str, body: Vec<u8>) -> Reply {
        let mut parts = url.splitn(2, '?');
        let path = parts.next().unwrap_or("/");
        let query = parts.next().unwrap_or("");

        match (method, path) {
            // Serve embedded UI
            (&Method::Get, "/") => Reply::html(UI_HTML.to_string()),

            (&Method::Get, "/api/state") => Reply::json(200, &ApiResponse::success(self.snapshot())),

            (&Method::Post, "/api/drag") => self.drag(query),

            (&Method::Post, "/api/select") => self.select(query, body),

            (&Method::Post, "/api/submit") => self.submit(),

            (&Method::Get, "/report") => match &self.lock().last_report {
                Some(view) => {
                    let mut html = Vec::new();
                    match report::html::write(&mut html, view) {
                        Ok(()) => Reply::html(String::from_utf8_lossy(&html).into_owned()),
                        Err(e) => Reply::json(500, &ApiResponse::<()>::failure(None, e.to_string())),
                    }
                }
                None => Reply::not_found(),
            },

            // 404
            _ => Reply::not_found(),
        }
    }

    fn drag(&self, query: &str) -> Reply {
        let params = match serde_urlencoded::from_str::<DragParams>(query) {
            Ok(p) => p,
            Err(e) => return Reply::json(400, &ApiResponse::<()>::failure(None, e.to_string())),
        };

        let mut guard = self.lock();
        let Shared { controller, selector, .. } = &mut *guard;
        if params.active {
            selector.drag_enter(controller);
        } else {
            selector.drag_leave(controller);
        }
        Reply::json(200, &ApiResponse::success(controller.snapshot()))
    }

    fn select(&self, query: &str, body: Vec<u8>) -> Reply {
        let params = serde_urlencoded::from_str::<SelectParams>(query)
            .unwrap_or(SelectParams { name: String::new() });

        let mut guard = self.lock();
        let Shared { controller, selector, last_report } = &mut *guard;

        let payload = DropPayload::single(FileHandle::Memory { name: params.name, bytes: body });
        match selector.select_from_drop(payload, controller) {
            Ok(()) => *last_report = None,
            // Nothing to select; the page state stays as it was.
            Err(SelectionError::InvalidAttachment) => {}
            Err(e @ SelectionError::Rejected(_)) => {
                return Reply::json(409, &ApiResponse::failure(Some(controller.snapshot()), e.to_string()));
            }
            Err(e) => return Reply::json(400, &ApiResponse::<()>::failure(None, e.to_string())),
        }

        Reply::json(200, &ApiResponse::success(controller.snapshot()))
    }

    /// Take the submission lock and hand the request to the runtime. The
    /// reply carries the `submitting` snapshot; the outcome shows up on
    /// `/api/state` once the service answers.
    fn submit(&self) -> Reply {
        let mut guard = self.lock();
        let mut ticket = match guard.controller.begin() {
            Ok(ticket) => ticket,
            Err(e) => {
                return Reply::json(409, &ApiResponse::failure(Some(guard.controller.snapshot()), e.to_string()));
            }
        };
        guard.last_report = None;
        let snapshot = guard.controller.snapshot();
        drop(guard);

        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        self.runtime.spawn(async move {
            let response = transport.send(ticket.take_payload()).await;

            let mut guard = lock_shared(&shared);
            let Shared { controller, last_report, .. } = &mut *guard;
            if controller.complete(ticket, response) == Completion::Applied {
                if let PipelineState::Succeeded(result) = controller.state() {
                    *last_report = Some(report::project(result));
                }
            }
        });

        Reply::json(202, &ApiResponse::success(snapshot))
    }
}

// The page is gone once the session is; a request still in flight must not
// land afterwards.
impl<T> Drop for Session<T> {
    fn drop(&mut self) {
        lock_shared(&self.shared).controller.detach();
    }
}

// Controller mutations are single assignments, so a poisoned lock still
// holds a consistent pipeline.
fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start server, open browser, serve UI until Ctrl-C
pub fn start(port: u16, service_url: &Url) -> io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let server = Arc::new(server);

    let transport = HttpTransport::new(service_url)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let session = Session::new(transport)?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;34m🌬  Windscope\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Analysis service: {}\n", service_url);
    info!(%url, service = %service_url, "interactive mode listening");

    let stopper = Arc::clone(&server);
    session.runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            stopper.unblock();
        }
    });

    // Open browser
    let _ = open::that(&url);

    serve_requests(&server, &session);
    debug!("request loop finished");
    Ok(())
}

/// Answer requests until the server is unblocked.
fn serve_requests<T>(server: &Server, session: &Session<T>)
where
    T: AnalysisTransport + Send + Sync + 'static,
{
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, session) {
            error!(error = %e, "failed to answer request");
        }
    }
}

fn handle_request<T>(mut request: Request, session: &Session<T>) -> io::Result<()>
where
    T: AnalysisTransport + Send + Sync + 'static,
{
    let url = request.url().to_string();
    let method = request.method().clone();

    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;

    let reply = session.route(&method, &url, body);
    let content_type = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad content type"))?;
    let response = Response::from_string(reply.body)
        .with_status_code(reply.status)
        .with_header(content_type);
    request.respond(response)
}
