//! In-memory implementations of every platform seam.
//!
//! Used by unit tests and, with the `mock` feature, by integration tests
//! and downstream crates that want to drive the workflow without a browser.
//! All mocks are cheap to clone; clones share their recorded state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;

use crate::backend::{HttpClient, HttpResponse};
use crate::capture::{
    CoverCapture, RasterOptions, Rasterizer, RasterizerLoader, RenderSurface, SurfaceFactory,
    Timer,
};
use crate::config::Viewport;
use crate::error::{FetchError, PublishError};
use crate::events::{EventHandler, EventSource, OpenEvent};
use crate::models::CapturedImage;
use crate::notice::{Notice, Notifier};
use crate::resume::Navigator;

// =============================================================================
// HTTP
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<String>,
}

/// Routes requests by exact URL. Unrouted URLs answer `404 Not Found`.
#[derive(Clone, Default)]
pub struct MockHttp {
    routes: Rc<RefCell<HashMap<String, Result<HttpResponse, FetchError>>>>,
    requests: Rc<RefCell<Vec<RecordedRequest>>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.routes.borrow_mut().insert(url.to_string(), Ok(response));
    }

    pub fn respond_json(&self, url: &str, status: u16, body: serde_json::Value) {
        self.respond(
            url,
            HttpResponse {
                status,
                status_text: reason_phrase(status).to_string(),
                content_type: Some("application/json".to_string()),
                body: body.to_string().into_bytes(),
            },
        );
    }

    pub fn respond_status(&self, url: &str, status: u16) {
        self.respond(url, empty_response(status));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.routes.borrow_mut().insert(url.to_string(), Err(error));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }

    fn route(
        &self,
        method: &'static str,
        url: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, FetchError> {
        self.requests.borrow_mut().push(RecordedRequest {
            method,
            url: url.to_string(),
            body: body.map(str::to_string),
        });
        self.routes
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(empty_response(404)))
    }
}

impl HttpClient for MockHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.route("GET", url, None)
    }

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, FetchError> {
        self.route("POST", url, Some(body))
    }
}

fn empty_response(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        status_text: reason_phrase(status).to_string(),
        content_type: None,
        body: Vec::new(),
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

// =============================================================================
// Navigation & Notices
// =============================================================================

#[derive(Clone, Default)]
pub struct MockNavigator {
    url: Rc<RefCell<String>>,
    replacements: Rc<RefCell<Vec<String>>>,
    assigned: Rc<RefCell<Vec<String>>>,
    opened: Rc<RefCell<Vec<String>>>,
}

impl MockNavigator {
    pub fn new(url: &str) -> Self {
        Self {
            url: Rc::new(RefCell::new(url.to_string())),
            ..Self::default()
        }
    }

    pub fn replacements(&self) -> Vec<String> {
        self.replacements.borrow().clone()
    }

    pub fn assigned(&self) -> Vec<String> {
        self.assigned.borrow().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl Navigator for MockNavigator {
    fn current_url(&self) -> String {
        self.url.borrow().clone()
    }

    fn replace_url(&self, url: &str) {
        self.replacements.borrow_mut().push(url.to_string());
        *self.url.borrow_mut() = url.to_string();
    }

    fn assign(&self, url: &str) {
        self.assigned.borrow_mut().push(url.to_string());
    }

    fn open_in_new_tab(&self, url: &str) {
        self.opened.borrow_mut().push(url.to_string());
    }
}

#[derive(Clone, Default)]
pub struct MockNotifier {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

// =============================================================================
// Timer
// =============================================================================

/// Every sleep completes immediately; requested durations are recorded
/// when the sleep is created, not when it is awaited.
#[derive(Clone, Default)]
pub struct InstantTimer {
    sleeps: Rc<RefCell<Vec<u32>>>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }
}

impl Timer for InstantTimer {
    fn sleep(&self, ms: u32) -> impl Future<Output = ()> {
        self.sleeps.borrow_mut().push(ms);
        std::future::ready(())
    }
}

// =============================================================================
// Render Surfaces
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadBehavior {
    Load,
    /// The surface reports a load error.
    Fail,
    /// The surface never signals.
    Hang,
    /// Loads, but exposes no document.
    LoadWithoutDocument,
}

#[derive(Default)]
struct SurfaceLog {
    created: Cell<usize>,
    detach_calls: Cell<usize>,
    removals: Cell<usize>,
    loaded: RefCell<Vec<String>>,
    viewports: RefCell<Vec<Viewport>>,
    fail_fonts: Cell<bool>,
}

#[derive(Clone)]
pub struct MockSurfaceFactory {
    behavior: LoadBehavior,
    log: Rc<SurfaceLog>,
}

impl MockSurfaceFactory {
    pub fn new(behavior: LoadBehavior) -> Self {
        Self {
            behavior,
            log: Rc::new(SurfaceLog::default()),
        }
    }

    /// Make `fonts_ready` fail on every surface.
    pub fn fail_fonts(&self) {
        self.log.fail_fonts.set(true);
    }

    pub fn created(&self) -> usize {
        self.log.created.get()
    }

    pub fn detach_calls(&self) -> usize {
        self.log.detach_calls.get()
    }

    /// Detaches that actually removed a surface.
    pub fn removals(&self) -> usize {
        self.log.removals.get()
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.log.loaded.borrow().clone()
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.log.viewports.borrow().clone()
    }
}

impl SurfaceFactory for MockSurfaceFactory {
    type Surface = MockSurface;

    fn create(&self, viewport: Viewport) -> Result<MockSurface, PublishError> {
        self.log.created.set(self.log.created.get() + 1);
        self.log.viewports.borrow_mut().push(viewport);
        Ok(MockSurface {
            behavior: self.behavior,
            log: self.log.clone(),
            loaded_url: RefCell::new(None),
            attached: Cell::new(true),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockDocument {
    pub url: String,
}

pub struct MockSurface {
    behavior: LoadBehavior,
    log: Rc<SurfaceLog>,
    loaded_url: RefCell<Option<String>>,
    attached: Cell<bool>,
}

impl RenderSurface for MockSurface {
    type Document = MockDocument;

    async fn load(&self, url: &str) -> Result<(), PublishError> {
        self.log.loaded.borrow_mut().push(url.to_string());
        match self.behavior {
            LoadBehavior::Load | LoadBehavior::LoadWithoutDocument => {
                *self.loaded_url.borrow_mut() = Some(url.to_string());
                Ok(())
            }
            LoadBehavior::Fail => Err(PublishError::PreviewLoad(format!("{url} failed to load"))),
            LoadBehavior::Hang => futures::future::pending().await,
        }
    }

    fn document(&self) -> Option<MockDocument> {
        if self.behavior == LoadBehavior::LoadWithoutDocument {
            return None;
        }
        self.loaded_url
            .borrow()
            .clone()
            .map(|url| MockDocument { url })
    }

    async fn fonts_ready(&self, _document: &MockDocument) -> Result<(), PublishError> {
        if self.log.fail_fonts.get() {
            return Err(PublishError::PreviewLoad("fonts unavailable".to_string()));
        }
        Ok(())
    }

    fn detach(&self) {
        self.log.detach_calls.set(self.log.detach_calls.get() + 1);
        if self.attached.replace(false) {
            self.log.removals.set(self.log.removals.get() + 1);
        }
    }
}

// =============================================================================
// Rasterizer
// =============================================================================

/// Bytes every mock rasterization produces.
pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock";

#[derive(Clone)]
pub struct MockRasterizerLoader {
    available: bool,
    loads: Rc<Cell<usize>>,
    gate: Rc<RefCell<Option<oneshot::Receiver<()>>>>,
    last_options: Rc<RefCell<Option<RasterOptions>>>,
}

impl MockRasterizerLoader {
    pub fn available() -> Self {
        Self::with_availability(true)
    }

    pub fn unavailable() -> Self {
        Self::with_availability(false)
    }

    fn with_availability(available: bool) -> Self {
        Self {
            available,
            loads: Rc::new(Cell::new(0)),
            gate: Rc::new(RefCell::new(None)),
            last_options: Rc::new(RefCell::new(None)),
        }
    }

    /// The first load waits until the returned sender fires or is dropped.
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let loader = Self::available();
        let (release, gate) = oneshot::channel();
        *loader.gate.borrow_mut() = Some(gate);
        (loader, release)
    }

    /// Successful library loads.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }

    pub fn last_options(&self) -> Option<RasterOptions> {
        self.last_options.borrow().clone()
    }
}

impl RasterizerLoader for MockRasterizerLoader {
    type Document = MockDocument;
    type Rasterizer = MockRasterizer;

    async fn load(&self) -> Result<MockRasterizer, PublishError> {
        if !self.available {
            return Err(PublishError::ScreenshotLibraryUnavailable);
        }
        self.loads.set(self.loads.get() + 1);
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(MockRasterizer {
            last_options: self.last_options.clone(),
        })
    }
}

pub struct MockRasterizer {
    last_options: Rc<RefCell<Option<RasterOptions>>>,
}

impl Rasterizer for MockRasterizer {
    type Document = MockDocument;

    async fn rasterize(
        &self,
        _document: &MockDocument,
        options: &RasterOptions,
    ) -> Result<CapturedImage, PublishError> {
        *self.last_options.borrow_mut() = Some(options.clone());
        Ok(CapturedImage::from_bytes(MOCK_PNG, "image/png"))
    }
}

// =============================================================================
// Cover Capture
// =============================================================================

/// Returns a fixed result, optionally after a gate is released.
#[derive(Clone)]
pub struct MockCapture {
    result: Rc<RefCell<Result<CapturedImage, PublishError>>>,
    gate: Rc<RefCell<Option<oneshot::Receiver<()>>>>,
    paths: Rc<RefCell<Vec<String>>>,
}

impl MockCapture {
    pub fn returning(result: Result<CapturedImage, PublishError>) -> Self {
        Self {
            result: Rc::new(RefCell::new(result)),
            gate: Rc::new(RefCell::new(None)),
            paths: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The first capture waits until the returned sender fires or is dropped.
    pub fn gated(result: Result<CapturedImage, PublishError>) -> (Self, oneshot::Sender<()>) {
        let capture = Self::returning(result);
        let (release, gate) = oneshot::channel();
        *capture.gate.borrow_mut() = Some(gate);
        (capture, release)
    }

    pub fn captured_paths(&self) -> Vec<String> {
        self.paths.borrow().clone()
    }
}

impl CoverCapture for MockCapture {
    async fn capture_cover(&self, project_path: &str) -> Result<CapturedImage, PublishError> {
        self.paths.borrow_mut().push(project_path.to_string());
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.result.borrow().clone()
    }
}

// =============================================================================
// Events
// =============================================================================

type Subscribers = HashMap<u64, (String, Rc<dyn Fn(OpenEvent)>)>;

#[derive(Clone, Default)]
pub struct MockEventSource {
    subscribers: Rc<RefCell<Subscribers>>,
    next_handle: Rc<Cell<u64>>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every current subscriber of `event`.
    pub fn emit(&self, event: &str, detail: OpenEvent) {
        let handlers: Vec<Rc<dyn Fn(OpenEvent)>> = self
            .subscribers
            .borrow()
            .values()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(detail.clone());
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .borrow()
            .values()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl EventSource for MockEventSource {
    type Handle = u64;

    fn subscribe(&self, event: &str, handler: EventHandler) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.subscribers
            .borrow_mut()
            .insert(handle, (event.to_string(), Rc::from(handler)));
        handle
    }

    fn unsubscribe(&self, handle: u64) {
        self.subscribers.borrow_mut().remove(&handle);
    }
}
