//! Error types for the publish workflow.
//!
//! Provides structured error handling with meaningful, user-facing messages
//! for each domain:
//!
//! - [`PublishError`] - Preview, screenshot, media and submission failures
//! - [`ValidationError`] - Missing user input that blocks a transition
//! - [`FetchError`] - Transport failures reported by an [`HttpClient`](crate::backend::HttpClient)
//! - [`ConfigError`] - Invalid TOML configuration

use thiserror::Error;

/// Errors raised while resolving, capturing, normalizing or submitting.
///
/// Every variant's `Display` output is shown to the user verbatim inside a
/// transient notice, so messages are phrased for humans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// No preview candidate answered with a 2xx status.
    #[error("Preview page not found")]
    PreviewNotFound,

    /// The rendering surface reported a load error or has no document.
    #[error("Failed to load project preview: {0}")]
    PreviewLoad(String),

    /// The surface did not signal load before the capture deadline.
    #[error("Screenshot timed out")]
    ScreenshotTimeout,

    /// The rasterization library could not be loaded.
    #[error("Screenshot library unavailable")]
    ScreenshotLibraryUnavailable,

    /// Rasterizing the loaded document failed.
    #[error("Screenshot failed to render: {0}")]
    Rasterize(String),

    /// A remote cover image could not be fetched.
    #[error("Failed to fetch cover image: {0}")]
    MediaFetch(String),

    /// Required input is missing.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered but refused the publish request.
    #[error("{0}")]
    PublishFailure(String),
}

/// Missing or invalid user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The trigger path has no resolvable project folder.
    #[error("Project folder not found.")]
    ProjectFolderNotFound,
    /// Community title is empty after trimming.
    #[error("Please enter a project title.")]
    MissingTitle,
    /// Community description is empty after trimming.
    #[error("Please enter a project description.")]
    MissingDescription,
    /// "Existing repository" was chosen without picking one.
    #[error("Please select a repository.")]
    NoRepositorySelected,
}

/// Transport-level failures for HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Browser window not available
    #[error("Browser window not available")]
    NoWindow,
    /// Failed to create HTTP request
    #[error("Failed to create request")]
    RequestCreationFailed,
    /// Network request failed (offline, CORS, DNS, ...)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Failed to read response body
    #[error("Failed to read response")]
    ResponseReadFailed,
    /// Response was not what the caller expected
    #[error("Invalid response content")]
    InvalidContent,
}

impl From<FetchError> for PublishError {
    fn from(err: FetchError) -> Self {
        PublishError::Network(err.to_string())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed into a configuration.
    #[error("invalid publisher configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        let err: PublishError = ValidationError::NoRepositorySelected.into();
        assert_eq!(err.to_string(), "Please select a repository.");
        assert_eq!(
            PublishError::from(ValidationError::ProjectFolderNotFound).to_string(),
            "Project folder not found."
        );
    }

    #[test]
    fn test_fetch_error_maps_to_network() {
        let err: PublishError = FetchError::NetworkError("offline".into()).into();
        assert_eq!(err, PublishError::Network("Network error: offline".into()));
    }

    #[test]
    fn test_publish_failure_displays_backend_message() {
        let err = PublishError::PublishFailure("HTTP 500: Internal Server Error".into());
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    }
}
