//! Platform-neutral core of the project publisher.
//!
//! The publisher turns a "publish this project" trigger from the editor
//! into either a push to a GitHub repository or a listing in the community
//! gallery. Everything that touches the browser sits behind a small trait
//! so the whole workflow runs, and is tested, natively.
//!
//! Modules:
//! - [`workflow`] - State machine, session context and the orchestrator
//! - [`flows`] - GitHub and community destination flows
//! - [`preview`] - Preview URL discovery
//! - [`capture`] - Off-screen screenshot capture
//! - [`media`] - Cover image normalization
//! - [`resume`] - OAuth round-trip resumption
//! - [`events`] - The `publisher:open` trigger
//! - [`backend`] - HTTP seam and the publisher backend client
//! - [`config`] - Constants and deployment configuration

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod flows;
pub mod media;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod models;
pub mod notice;
pub mod preview;
pub mod resume;
pub mod workflow;

pub use backend::{BackendClient, CommunityApi, GitHubApi, HttpClient, HttpResponse};
pub use capture::{
    CoverCapture, LazyRasterizer, RasterOptions, Rasterizer, RasterizerLoader, RenderSurface,
    ScreenshotCapture, ScreenshotPipeline, SurfaceFactory, SurfaceGuard, Timer,
};
pub use config::PublisherConfig;
pub use error::{ConfigError, FetchError, PublishError, ValidationError};
pub use events::{EventSource, OpenEvent, OpenHandler, PUBLISHER_OPEN_EVENT, Registration};
pub use media::CoverMediaResolver;
pub use notice::{Notice, NoticeLevel, Notifier};
pub use preview::PreviewResolver;
pub use resume::{Navigator, ResumptionContext};
pub use workflow::{Action, Destination, Orchestrator, SessionSnapshot, WorkflowState};
