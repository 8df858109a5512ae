//! Screenshot capture of a project's rendered preview.
//!
//! The pipeline renders the preview inside an isolated, invisible surface,
//! waits for it to settle and rasterizes it into a PNG `data:` URL:
//!
//! 1. [`SurfaceFactory::create`] acquires a surface sized to the viewport.
//! 2. The surface load is raced against the capture deadline.
//! 3. Font readiness is awaited on a best-effort basis.
//! 4. A fixed settle delay lets late layout finish.
//! 5. The rasterizer is obtained through [`LazyRasterizer`], which loads the
//!    underlying library at most once.
//!
//! The surface is held by a [`SurfaceGuard`] for the whole operation, so it
//! is detached on every exit path, including the capture future being
//! dropped mid-flight.

use std::cell::{Cell, OnceCell, RefCell};
use std::ops::Deref;
use std::pin::pin;

use futures::channel::oneshot;
use futures::future::{Either, select};
use log::{debug, info};
use serde::Serialize;

use crate::backend::HttpClient;
use crate::config::{CaptureConfig, Endpoints, Viewport};
use crate::error::PublishError;
use crate::models::CapturedImage;
use crate::preview::PreviewResolver;

// =============================================================================
// Seams
// =============================================================================

/// Cooperative timer.
#[allow(async_fn_in_trait)]
pub trait Timer {
    async fn sleep(&self, ms: u32);
}

/// An isolated, off-screen environment that can load and display a page.
#[allow(async_fn_in_trait)]
pub trait RenderSurface {
    /// Handle to the loaded document handed to the rasterizer.
    type Document;

    /// Start loading `url`; resolves on the surface's load signal and fails
    /// with [`PublishError::PreviewLoad`] on its error signal.
    async fn load(&self, url: &str) -> Result<(), PublishError>;

    /// The loaded document, if the surface exposes one.
    fn document(&self) -> Option<Self::Document>;

    /// Resolves once web fonts are ready. Surfaces without such a signal
    /// resolve immediately.
    async fn fonts_ready(&self, document: &Self::Document) -> Result<(), PublishError>;

    /// Remove the surface from the host. Must be idempotent.
    fn detach(&self);
}

/// Creates rendering surfaces. Each capture gets a fresh one.
pub trait SurfaceFactory {
    type Surface: RenderSurface;

    fn create(&self, viewport: Viewport) -> Result<Self::Surface, PublishError>;
}

/// Options passed to the rasterizer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterOptions {
    #[serde(rename = "useCORS")]
    pub use_cors: bool,
    pub background_color: String,
    pub window_width: u32,
    pub window_height: u32,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub scale: f64,
}

impl RasterOptions {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            use_cors: true,
            background_color: config.background_color.clone(),
            window_width: config.viewport.width,
            window_height: config.viewport.height,
            scroll_x: 0,
            scroll_y: 0,
            scale: 1.0,
        }
    }
}

/// Turns a loaded document into a still image.
#[allow(async_fn_in_trait)]
pub trait Rasterizer {
    type Document;

    async fn rasterize(
        &self,
        document: &Self::Document,
        options: &RasterOptions,
    ) -> Result<CapturedImage, PublishError>;
}

/// Fetches the rasterization library.
#[allow(async_fn_in_trait)]
pub trait RasterizerLoader {
    type Document;
    type Rasterizer: Rasterizer<Document = Self::Document>;

    /// Load the library; fails with
    /// [`PublishError::ScreenshotLibraryUnavailable`].
    async fn load(&self) -> Result<Self::Rasterizer, PublishError>;
}

// =============================================================================
// Lazy Rasterizer
// =============================================================================

/// Memoizing wrapper: the library is loaded on first use and reused for the
/// lifetime of the wrapper. Callers arriving while a load is in flight wait
/// for it instead of starting another. Failed loads are not cached.
pub struct LazyRasterizer<L: RasterizerLoader> {
    loader: L,
    loaded: OnceCell<L::Rasterizer>,
    loading: Cell<bool>,
    waiters: RefCell<Vec<oneshot::Sender<()>>>,
}

impl<L: RasterizerLoader> LazyRasterizer<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            loaded: OnceCell::new(),
            loading: Cell::new(false),
            waiters: RefCell::new(Vec::new()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    pub async fn get(&self) -> Result<&L::Rasterizer, PublishError> {
        loop {
            if let Some(rasterizer) = self.loaded.get() {
                return Ok(rasterizer);
            }
            if !self.loading.get() {
                break;
            }
            let (wake, woken) = oneshot::channel();
            self.waiters.borrow_mut().push(wake);
            debug!("screenshot library load in flight; waiting");
            let _ = woken.await;
        }

        let _in_flight = InFlight::begin(&self.loading, &self.waiters);
        let rasterizer = self.loader.load().await?;
        info!("screenshot library loaded");
        Ok(self.loaded.get_or_init(|| rasterizer))
    }
}

/// Marks a load as in flight; releases waiters when the load settles or is
/// dropped.
struct InFlight<'a> {
    loading: &'a Cell<bool>,
    waiters: &'a RefCell<Vec<oneshot::Sender<()>>>,
}

impl<'a> InFlight<'a> {
    fn begin(loading: &'a Cell<bool>, waiters: &'a RefCell<Vec<oneshot::Sender<()>>>) -> Self {
        loading.set(true);
        Self { loading, waiters }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.loading.set(false);
        for waiter in self.waiters.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }
}

// =============================================================================
// Surface Guard
// =============================================================================

/// Scoped ownership of a rendering surface; detaches it when dropped.
pub struct SurfaceGuard<S: RenderSurface> {
    surface: S,
}

impl<S: RenderSurface> SurfaceGuard<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }
}

impl<S: RenderSurface> Deref for SurfaceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.surface
    }
}

impl<S: RenderSurface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        self.surface.detach();
    }
}

// =============================================================================
// Screenshot Capture
// =============================================================================

/// Renders a preview URL off-screen and rasterizes it.
pub struct ScreenshotCapture<F, L, T>
where
    F: SurfaceFactory,
    L: RasterizerLoader<Document = <F::Surface as RenderSurface>::Document>,
{
    surfaces: F,
    rasterizer: LazyRasterizer<L>,
    timer: T,
    config: CaptureConfig,
}

impl<F, L, T> ScreenshotCapture<F, L, T>
where
    F: SurfaceFactory,
    L: RasterizerLoader<Document = <F::Surface as RenderSurface>::Document>,
    T: Timer,
{
    pub fn new(surfaces: F, loader: L, timer: T, config: CaptureConfig) -> Self {
        Self {
            surfaces,
            rasterizer: LazyRasterizer::new(loader),
            timer,
            config,
        }
    }

    pub async fn capture(&self, preview_url: &str) -> Result<CapturedImage, PublishError> {
        debug!("capturing {preview_url}");
        let surface = SurfaceGuard::new(self.surfaces.create(self.config.viewport)?);

        self.load_with_deadline(&surface, preview_url).await?;

        let document = surface
            .document()
            .ok_or_else(|| PublishError::PreviewLoad("Preview not available".to_string()))?;

        if let Err(e) = surface.fonts_ready(&document).await {
            debug!("ignoring font readiness failure: {e}");
        }

        self.timer.sleep(self.config.settle_delay_ms).await;

        let rasterizer = self.rasterizer.get().await?;
        rasterizer
            .rasterize(&document, &RasterOptions::new(&self.config))
            .await
    }

    async fn load_with_deadline(
        &self,
        surface: &F::Surface,
        url: &str,
    ) -> Result<(), PublishError> {
        let load = pin!(surface.load(url));
        let deadline = pin!(self.timer.sleep(self.config.timeout_ms));

        match select(load, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(PublishError::ScreenshotTimeout),
        }
    }
}

// =============================================================================
// Cover Capture
// =============================================================================

/// Produces a cover image for a project path.
#[allow(async_fn_in_trait)]
pub trait CoverCapture {
    async fn capture_cover(&self, project_path: &str) -> Result<CapturedImage, PublishError>;
}

/// [`PreviewResolver`] followed by [`ScreenshotCapture`].
pub struct ScreenshotPipeline<H, F, L, T>
where
    F: SurfaceFactory,
    L: RasterizerLoader<Document = <F::Surface as RenderSurface>::Document>,
{
    resolver: PreviewResolver<H>,
    capture: ScreenshotCapture<F, L, T>,
}

impl<H, F, L, T> ScreenshotPipeline<H, F, L, T>
where
    H: HttpClient,
    F: SurfaceFactory,
    L: RasterizerLoader<Document = <F::Surface as RenderSurface>::Document>,
    T: Timer,
{
    pub fn new(http: H, endpoints: Endpoints, capture: ScreenshotCapture<F, L, T>) -> Self {
        Self {
            resolver: PreviewResolver::new(http, endpoints),
            capture,
        }
    }
}

impl<H, F, L, T> CoverCapture for ScreenshotPipeline<H, F, L, T>
where
    H: HttpClient,
    F: SurfaceFactory,
    L: RasterizerLoader<Document = <F::Surface as RenderSurface>::Document>,
    T: Timer,
{
    async fn capture_cover(&self, project_path: &str) -> Result<CapturedImage, PublishError> {
        let url = self.resolver.resolve(project_path).await?;
        self.capture.capture(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        InstantTimer, LoadBehavior, MockHttp, MockRasterizerLoader, MockSurfaceFactory,
    };

    type TestCapture = ScreenshotCapture<MockSurfaceFactory, MockRasterizerLoader, InstantTimer>;

    fn capture_with(
        surfaces: &MockSurfaceFactory,
        loader: &MockRasterizerLoader,
        timer: &InstantTimer,
    ) -> TestCapture {
        ScreenshotCapture::new(
            surfaces.clone(),
            loader.clone(),
            timer.clone(),
            CaptureConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_success_detaches_once() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::available();
        let timer = InstantTimer::new();
        let capture = capture_with(&surfaces, &loader, &timer);

        let image = capture.capture("/view/proj/index.html").await.unwrap();

        assert_eq!(image.content_type(), Some("image/png"));
        assert_eq!(surfaces.created(), 1);
        assert_eq!(surfaces.detach_calls(), 1);
        assert_eq!(surfaces.loaded_urls(), vec!["/view/proj/index.html"]);
        assert_eq!(surfaces.viewports(), vec![Viewport { width: 1280, height: 720 }]);
        // Deadline raced against the load, then the settle delay.
        assert_eq!(timer.sleeps(), vec![15_000, 500]);
    }

    #[tokio::test]
    async fn test_timeout_detaches_once() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Hang);
        let loader = MockRasterizerLoader::available();
        let timer = InstantTimer::new();
        let capture = capture_with(&surfaces, &loader, &timer);

        let err = capture.capture("/view/proj/index.html").await.unwrap_err();

        assert_eq!(err, PublishError::ScreenshotTimeout);
        assert_eq!(surfaces.detach_calls(), 1);
        assert_eq!(loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_load_error_detaches_once() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Fail);
        let loader = MockRasterizerLoader::available();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        let err = capture.capture("/view/proj/index.html").await.unwrap_err();

        assert!(matches!(err, PublishError::PreviewLoad(_)));
        assert_eq!(surfaces.detach_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_load_error() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::LoadWithoutDocument);
        let loader = MockRasterizerLoader::available();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        let err = capture.capture("/render/proj/index.html").await.unwrap_err();

        assert_eq!(err, PublishError::PreviewLoad("Preview not available".into()));
        assert_eq!(surfaces.detach_calls(), 1);
    }

    #[tokio::test]
    async fn test_font_failure_is_swallowed() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        surfaces.fail_fonts();
        let loader = MockRasterizerLoader::available();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        assert!(capture.capture("/view/proj/index.html").await.is_ok());
        assert_eq!(surfaces.detach_calls(), 1);
    }

    #[tokio::test]
    async fn test_library_unavailable() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::unavailable();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        let err = capture.capture("/view/proj/index.html").await.unwrap_err();

        assert_eq!(err, PublishError::ScreenshotLibraryUnavailable);
        assert_eq!(surfaces.detach_calls(), 1);
    }

    #[tokio::test]
    async fn test_library_loaded_once_and_surfaces_not_reused() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::available();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        capture.capture("/view/a/index.html").await.unwrap();
        capture.capture("/view/b/index.html").await.unwrap();

        assert_eq!(loader.load_count(), 1);
        assert_eq!(surfaces.created(), 2);
        assert_eq!(surfaces.detach_calls(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_captures_share_one_library_load() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let (loader, release) = MockRasterizerLoader::gated();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        let (first, second, ()) = futures::join!(
            capture.capture("/view/a/index.html"),
            capture.capture("/view/b/index.html"),
            async {
                let _ = release.send(());
            },
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(loader.load_count(), 1);
        assert_eq!(surfaces.detach_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_clears_in_flight_state() {
        let lazy = LazyRasterizer::new(MockRasterizerLoader::unavailable());

        assert_eq!(
            lazy.get().await.err(),
            Some(PublishError::ScreenshotLibraryUnavailable)
        );
        assert!(!lazy.is_loaded());
        assert!(!lazy.loading.get());
        assert!(lazy.get().await.is_err());
    }

    #[tokio::test]
    async fn test_raster_options() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::available();
        let capture = capture_with(&surfaces, &loader, &InstantTimer::new());

        capture.capture("/view/a/index.html").await.unwrap();

        let options = loader.last_options().unwrap();
        assert!(options.use_cors);
        assert_eq!(options.background_color, "#ffffff");
        assert_eq!((options.window_width, options.window_height), (1280, 720));

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["useCORS"], true);
        assert_eq!(json["backgroundColor"], "#ffffff");
    }

    #[test]
    fn test_guard_detach_is_idempotent() {
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let surface = surfaces.create(Viewport::default()).unwrap();
        surface.detach();
        drop(SurfaceGuard::new(surface));

        assert_eq!(surfaces.detach_calls(), 2);
        assert_eq!(surfaces.removals(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_resolves_then_captures() {
        let http = MockHttp::new();
        http.respond_status("/render/projA/index.html", 200);
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::available();
        let pipeline = ScreenshotPipeline::new(
            http.clone(),
            Endpoints::default(),
            capture_with(&surfaces, &loader, &InstantTimer::new()),
        );

        pipeline.capture_cover("/projA/index.html").await.unwrap();

        assert_eq!(surfaces.loaded_urls(), vec!["/render/projA/index.html"]);
    }

    #[tokio::test]
    async fn test_pipeline_without_preview_never_creates_surface() {
        let http = MockHttp::new();
        let surfaces = MockSurfaceFactory::new(LoadBehavior::Load);
        let loader = MockRasterizerLoader::available();
        let pipeline = ScreenshotPipeline::new(
            http,
            Endpoints::default(),
            capture_with(&surfaces, &loader, &InstantTimer::new()),
        );

        let err = pipeline.capture_cover("projA").await.unwrap_err();

        assert_eq!(err, PublishError::PreviewNotFound);
        assert_eq!(surfaces.created(), 0);
    }
}
