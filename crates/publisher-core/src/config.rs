//! Publisher configuration.
//!
//! Centralizes the constants the workflow relies on and the
//! [`PublisherConfig`] value that can override them from a TOML document.

use serde::Deserialize;

use crate::error::ConfigError;

// =============================================================================
// Screenshot Capture
// =============================================================================

/// Width of the off-screen rendering surface in CSS pixels.
pub const VIEWPORT_WIDTH: u32 = 1280;

/// Height of the off-screen rendering surface in CSS pixels.
pub const VIEWPORT_HEIGHT: u32 = 720;

/// Deadline for the rendering surface to signal load, in milliseconds.
pub const CAPTURE_TIMEOUT_MS: u32 = 15_000;

/// Delay after load so late layout and async rendering can finish.
pub const SETTLE_DELAY_MS: u32 = 500;

/// Background painted behind transparent page regions.
pub const CAPTURE_BACKGROUND: &str = "#ffffff";

/// Script providing the `html2canvas` rasterizer.
pub const RASTERIZER_SCRIPT_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/html2canvas/1.4.1/html2canvas.min.js";

// =============================================================================
// Workflow Timing
// =============================================================================

/// Delay before re-entering the GitHub flow after an OAuth round trip.
pub const RESUME_DELAY_MS: u32 = 500;

/// Lifetime of a transient notice in milliseconds.
pub const NOTICE_DURATION_MS: u32 = 3_000;

// =============================================================================
// Backend Endpoints
// =============================================================================

/// Default backend routes.
pub mod endpoints {
    /// Credential probe; answers `{ success, resp }`.
    pub const CREDENTIAL_CHECK: &str = "/migrate/getrepolist";
    /// Repository listing; answers `{ data: { gitRepoList } }`.
    pub const REPOSITORIES: &str = "/edit/publisher/_api/github/repos";
    /// GitHub publish endpoint.
    pub const PUBLISH_GITHUB: &str = "/edit/publisher/_api/publish/github";
    /// Community gallery publish endpoint.
    pub const PUBLISH_COMMUNITY: &str = "/edit/publisher/_api/publish/qoom";
    /// OAuth handoff; receives the return URL in its `url` parameter.
    pub const AUTHORIZE: &str = "/edit/publisher/_api/github/checktoken";
    /// Static preview prefix.
    pub const VIEW_PREFIX: &str = "/view";
    /// Server-rendered preview prefix.
    pub const RENDER_PREFIX: &str = "/render";
    /// Prefix of a published project's public link.
    pub const PROJECT_LINK_PREFIX: &str = "/~";
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Backend routes used by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub credential_check: String,
    pub repositories: String,
    pub publish_github: String,
    pub publish_community: String,
    pub authorize: String,
    pub view_prefix: String,
    pub render_prefix: String,
    pub project_link_prefix: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            credential_check: endpoints::CREDENTIAL_CHECK.to_string(),
            repositories: endpoints::REPOSITORIES.to_string(),
            publish_github: endpoints::PUBLISH_GITHUB.to_string(),
            publish_community: endpoints::PUBLISH_COMMUNITY.to_string(),
            authorize: endpoints::AUTHORIZE.to_string(),
            view_prefix: endpoints::VIEW_PREFIX.to_string(),
            render_prefix: endpoints::RENDER_PREFIX.to_string(),
            project_link_prefix: endpoints::PROJECT_LINK_PREFIX.to_string(),
        }
    }
}

/// Dimensions of the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
        }
    }
}

/// Screenshot capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub viewport: Viewport,
    pub timeout_ms: u32,
    pub settle_delay_ms: u32,
    pub background_color: String,
    pub rasterizer_script_url: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            timeout_ms: CAPTURE_TIMEOUT_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            background_color: CAPTURE_BACKGROUND.to_string(),
            rasterizer_script_url: RASTERIZER_SCRIPT_URL.to_string(),
        }
    }
}

/// Query parameter names carried through the OAuth round trip.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResumptionKeys {
    pub publish_flag: String,
    pub project_path: String,
    pub list_flag: String,
    pub session_token: String,
    pub auth_code: String,
}

impl Default for ResumptionKeys {
    fn default() -> Self {
        Self {
            publish_flag: "github_publish".to_string(),
            project_path: "project_path".to_string(),
            list_flag: "list".to_string(),
            session_token: "codingspace".to_string(),
            auth_code: "code".to_string(),
        }
    }
}

impl ResumptionKeys {
    /// Every key stripped from the URL once resumption is consumed.
    pub fn all(&self) -> [&str; 5] {
        [
            &self.publish_flag,
            &self.project_path,
            &self.list_flag,
            &self.auth_code,
            &self.session_token,
        ]
    }
}

/// Complete publisher configuration.
///
/// Every field has a default, so an empty TOML document is valid:
///
/// ```
/// use publisher_core::config::PublisherConfig;
///
/// let config = PublisherConfig::from_toml_str("default_private = true").unwrap();
/// assert!(config.default_private);
/// assert_eq!(config.capture.timeout_ms, 15_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub endpoints: Endpoints,
    pub capture: CaptureConfig,
    pub resumption: ResumptionKeys,
    pub resume_delay_ms: u32,
    pub notice_duration_ms: u32,
    /// Visibility requested for GitHub repositories.
    pub default_private: bool,
    /// Value of the community payload's `submittoqoom` flag.
    pub submit_to_featured_listing: bool,
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            capture: CaptureConfig::default(),
            resumption: ResumptionKeys::default(),
            resume_delay_ms: RESUME_DELAY_MS,
            notice_duration_ms: NOTICE_DURATION_MS,
            default_private: false,
            submit_to_featured_listing: false,
            log_level: "info".to_string(),
        }
    }
}

impl PublisherConfig {
    /// Parse a configuration from TOML, filling gaps with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// The configured log level, falling back to `Info` when unrecognized.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
