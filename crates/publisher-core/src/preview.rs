//! Preview URL discovery.
//!
//! A project can be served from several places depending on how it was
//! built. [`PreviewResolver`] probes the candidates in a fixed priority
//! order and returns the first one the server answers with a 2xx status.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::backend::HttpClient;
use crate::config::Endpoints;
use crate::error::PublishError;

/// A trailing `name.ext` segment marks a single-file path.
static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^/]+\.[a-z0-9]+$").expect("static regex"));

/// Whether the (normalized) path points at a single file.
pub fn is_file_path(path: &str) -> bool {
    FILE_PATH.is_match(path)
}

/// Candidate preview URLs in probe order.
pub fn preview_candidates(project_path: &str, endpoints: &Endpoints) -> Vec<String> {
    let path = project_path.strip_prefix('/').unwrap_or(project_path);
    let view = &endpoints.view_prefix;
    let render = &endpoints.render_prefix;

    if is_file_path(path) {
        return vec![format!("{render}/{path}")];
    }

    vec![
        format!("{view}/{path}/index.html"),
        format!("{view}/{path}/public/index.html"),
        format!("{view}/{path}/dist/index.html"),
        format!("{render}/{path}/index.html"),
    ]
}

/// Finds a servable preview URL for a project.
#[derive(Clone, Debug)]
pub struct PreviewResolver<H> {
    http: H,
    endpoints: Endpoints,
}

impl<H: HttpClient> PreviewResolver<H> {
    pub fn new(http: H, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Probe candidates in order and return the first that answers 2xx.
    ///
    /// Transport errors on a candidate only move on to the next one.
    pub async fn resolve(&self, project_path: &str) -> Result<String, PublishError> {
        for url in preview_candidates(project_path, &self.endpoints) {
            match self.http.get(&url).await {
                Ok(response) if response.ok() => {
                    debug!("preview resolved to {url}");
                    return Ok(url);
                }
                Ok(response) => debug!("preview candidate {url} answered {}", response.status),
                Err(e) => debug!("preview candidate {url} failed: {e}"),
            }
        }
        Err(PublishError::PreviewNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::mock::MockHttp;

    fn resolver(http: &MockHttp) -> PreviewResolver<MockHttp> {
        PreviewResolver::new(http.clone(), Endpoints::default())
    }

    #[test]
    fn test_file_path_detection() {
        assert!(is_file_path("projA/index.html"));
        assert!(is_file_path("projA/Main.JS"));
        assert!(!is_file_path("projA"));
        assert!(!is_file_path("projA/src"));
        assert!(!is_file_path("projA/.hidden/"));
    }

    #[test]
    fn test_directory_candidates_in_priority_order() {
        assert_eq!(
            preview_candidates("/proj", &Endpoints::default()),
            vec![
                "/view/proj/index.html",
                "/view/proj/public/index.html",
                "/view/proj/dist/index.html",
                "/render/proj/index.html",
            ]
        );
    }

    #[test]
    fn test_file_has_single_candidate() {
        assert_eq!(
            preview_candidates("projA/index.html", &Endpoints::default()),
            vec!["/render/projA/index.html"]
        );
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let http = MockHttp::new();
        http.respond_status("/view/proj/index.html", 200);
        http.respond_status("/view/proj/public/index.html", 200);

        assert_eq!(
            resolver(&http).resolve("proj").await.unwrap(),
            "/view/proj/index.html"
        );
        assert_eq!(http.requested_urls(), vec!["/view/proj/index.html"]);
    }

    #[tokio::test]
    async fn test_fourth_candidate_after_three_failures() {
        let http = MockHttp::new();
        http.respond_status("/view/proj/index.html", 404);
        http.fail(
            "/view/proj/public/index.html",
            FetchError::NetworkError("connection reset".into()),
        );
        http.respond_status("/view/proj/dist/index.html", 500);
        http.respond_status("/render/proj/index.html", 204);

        assert_eq!(
            resolver(&http).resolve("proj").await.unwrap(),
            "/render/proj/index.html"
        );
        assert_eq!(
            http.requested_urls(),
            vec![
                "/view/proj/index.html",
                "/view/proj/public/index.html",
                "/view/proj/dist/index.html",
                "/render/proj/index.html",
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_candidates() {
        let http = MockHttp::new();
        let err = resolver(&http).resolve("/proj").await.unwrap_err();
        assert_eq!(err, PublishError::PreviewNotFound);
        assert_eq!(http.requested_urls().len(), 4);
    }
}
