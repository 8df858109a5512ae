//! Backend contracts over an injectable HTTP seam.
//!
//! [`HttpClient`] is the only place the workflow touches the network. The
//! browser build implements it with the Fetch API; tests use
//! [`MockHttp`](crate::mock::MockHttp). [`BackendClient`] layers the JSON
//! contracts of the publisher endpoints on top of it and exposes them
//! through one trait per destination, so each flow can only reach its own
//! endpoints.

use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Endpoints;
use crate::error::{FetchError, PublishError};
use crate::models::{CommunityPublishRequest, GitHubPublishRequest};

// =============================================================================
// Transport
// =============================================================================

/// A completed HTTP exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PublishError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| PublishError::Network(format!("JSON parse error: {e}")))
    }
}

/// Minimal HTTP capability used by the workflow.
///
/// Errors mean the request never produced a response; HTTP error statuses
/// are returned as regular responses.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, FetchError>;
}

// =============================================================================
// Destination APIs
// =============================================================================

/// Endpoints owned by the GitHub flow.
#[allow(async_fn_in_trait)]
pub trait GitHubApi {
    /// Whether a hosting credential is already stored for the user.
    async fn has_credential(&self) -> bool;

    /// Names of the user's repositories.
    async fn list_repositories(&self) -> Result<Vec<String>, PublishError>;

    /// Publish and return the repository URL when the backend reports one.
    async fn publish_github(
        &self,
        request: &GitHubPublishRequest,
    ) -> Result<Option<String>, PublishError>;
}

/// Endpoint owned by the community flow.
#[allow(async_fn_in_trait)]
pub trait CommunityApi {
    async fn publish_community(&self, request: &CommunityPublishRequest)
    -> Result<(), PublishError>;
}

// =============================================================================
// Response Shapes
// =============================================================================

#[derive(Deserialize)]
struct CredentialResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    resp: serde_json::Value,
}

#[derive(Deserialize)]
struct RepositoryListResponse {
    #[serde(default)]
    data: Option<RepositoryListData>,
}

#[derive(Deserialize)]
struct RepositoryListData {
    #[serde(default, rename = "gitRepoList")]
    git_repo_list: Vec<String>,
}

#[derive(Deserialize)]
struct PublishResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<PublishData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct PublishData {
    #[serde(default, rename = "repoUrl")]
    repo_url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// JavaScript-style truthiness of a JSON value.
fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_message(error: Option<String>, message: Option<String>) -> Option<String> {
    error
        .filter(|e| !e.is_empty())
        .or(message.filter(|m| !m.is_empty()))
}

/// Message for a non-2xx publish response: the body's `error` or `message`
/// field, else the HTTP status line.
fn failure_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| first_message(body.error, body.message))
        .unwrap_or_else(|| format!("HTTP {}: {}", response.status, response.status_text))
}

// =============================================================================
// Backend Client
// =============================================================================

/// JSON client for the publisher backend.
#[derive(Clone, Debug)]
pub struct BackendClient<H> {
    http: H,
    endpoints: Endpoints,
}

impl<H: HttpClient> BackendClient<H> {
    pub fn new(http: H, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// POST a publish request and interpret the `{ success, ... }` envelope.
    async fn publish<T: serde::Serialize>(
        &self,
        url: &str,
        request: &T,
        default_failure: &str,
    ) -> Result<PublishResponse, PublishError> {
        let body = serde_json::to_string(request)
            .map_err(|e| PublishError::PublishFailure(format!("Failed to encode request: {e}")))?;
        let response = self.http.post_json(url, &body).await?;

        if !response.ok() {
            return Err(PublishError::PublishFailure(failure_message(&response)));
        }

        let parsed: PublishResponse = response.json()?;
        if !parsed.success {
            let message = first_message(parsed.error, parsed.message)
                .unwrap_or_else(|| default_failure.to_string());
            return Err(PublishError::PublishFailure(message));
        }
        Ok(parsed)
    }
}

impl<H: HttpClient> GitHubApi for BackendClient<H> {
    async fn has_credential(&self) -> bool {
        let response = match self.http.get(&self.endpoints.credential_check).await {
            Ok(response) if response.ok() => response,
            Ok(response) => {
                debug!("credential check answered HTTP {}", response.status);
                return false;
            }
            Err(e) => {
                debug!("credential check failed: {e}");
                return false;
            }
        };

        response
            .json::<CredentialResponse>()
            .map(|body| body.success && is_truthy(&body.resp))
            .unwrap_or(false)
    }

    async fn list_repositories(&self) -> Result<Vec<String>, PublishError> {
        let response = self.http.get(&self.endpoints.repositories).await?;
        if !response.ok() {
            return Err(PublishError::Network(format!(
                "HTTP {}: {}",
                response.status, response.status_text
            )));
        }
        let body: RepositoryListResponse = response.json()?;
        Ok(body.data.map(|d| d.git_repo_list).unwrap_or_default())
    }

    async fn publish_github(
        &self,
        request: &GitHubPublishRequest,
    ) -> Result<Option<String>, PublishError> {
        let response = self
            .publish(
                &self.endpoints.publish_github,
                request,
                "Failed to publish to GitHub",
            )
            .await?;
        let url = response
            .data
            .and_then(|data| data.repo_url.or(data.html_url))
            .filter(|url| !url.is_empty());
        if url.is_none() {
            warn!("GitHub publish succeeded without a repository URL");
        }
        Ok(url)
    }
}

impl<H: HttpClient> CommunityApi for BackendClient<H> {
    async fn publish_community(
        &self,
        request: &CommunityPublishRequest,
    ) -> Result<(), PublishError> {
        self.publish(
            &self.endpoints.publish_community,
            request,
            "Failed to publish to the community gallery",
        )
        .await
        .map(|_| ())
    }
}
