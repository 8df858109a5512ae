//! OAuth round-trip support.
//!
//! Before handing off to the external authorization page the current URL is
//! tagged with a publish flag and the project folder. When the page comes
//! back, [`ResumptionContext::take`] reads those parameters once, strips
//! them from the visible URL with a history replacement (so a reload does
//! not resume again) and tells the orchestrator which project to re-enter.

use log::{debug, info, warn};
use url::Url;
use url::form_urlencoded;

use crate::config::ResumptionKeys;

/// Browser navigation seam.
pub trait Navigator {
    /// Full URL of the current page.
    fn current_url(&self) -> String;

    /// Replace the visible URL without a navigation or history entry.
    fn replace_url(&self, url: &str);

    /// Navigate the page away.
    fn assign(&self, url: &str);

    /// Open a URL in a new tab.
    fn open_in_new_tab(&self, url: &str);
}

/// State recovered from the OAuth return URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumptionContext {
    pub project_path: String,
}

impl ResumptionContext {
    /// Consume the resumption parameters from the current URL.
    ///
    /// Returns `None` when the URL carries no resumption; in that case the
    /// URL is left untouched.
    pub fn take<N: Navigator>(navigator: &N, keys: &ResumptionKeys) -> Option<Self> {
        let current = navigator.current_url();
        let Ok(mut url) = Url::parse(&current) else {
            warn!("cannot parse current URL for resumption: {current}");
            return None;
        };

        let context = Self::from_url(&url, keys)?;

        strip_params(&mut url, &keys.all());
        navigator.replace_url(url.as_str());
        info!("resuming GitHub publish for {}", context.project_path);
        Some(context)
    }

    /// Extract a context from a URL without modifying anything.
    pub fn from_url(url: &Url, keys: &ResumptionKeys) -> Option<Self> {
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        let publish = param(&keys.publish_flag).is_some_and(|v| v == "true");
        let listing = param(&keys.list_flag).is_some_and(|v| v == "true");
        if !publish && !listing {
            return None;
        }

        let project_path = param(&keys.project_path)
            .filter(|p| !p.is_empty())
            .or_else(|| {
                param(&keys.session_token)
                    .and_then(|token| project_path_from_token(&token, &keys.project_path))
            });

        match project_path {
            Some(project_path) => Some(Self { project_path }),
            None => {
                debug!("resumption flag present without a project path");
                None
            }
        }
    }
}

/// The session token is a URL, possibly percent-encoded a second time,
/// that may itself carry the project path.
fn project_path_from_token(token: &str, key: &str) -> Option<String> {
    let url = Url::parse(token).ok().or_else(|| {
        let decoded = form_urlencoded::parse(format!("t={token}").as_bytes())
            .find(|(k, _)| k == "t")
            .map(|(_, v)| v.into_owned())?;
        Url::parse(&decoded).ok()
    })?;

    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|p| !p.is_empty())
}

/// Remove every pair whose key is in `keys`, keeping the others in order.
pub fn strip_params(url: &mut Url, keys: &[&str]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !keys.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Set (replace) query parameters on a URL.
pub fn set_params(url: &mut Url, params: &[(&str, &str)]) {
    let keys: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
    strip_params(url, &keys);
    url.query_pairs_mut().extend_pairs(params.iter().copied());
}

/// Build the authorization handoff URL for a project.
///
/// The current page URL is tagged with the publish flag and project folder
/// and passed, percent-encoded, as the `url` parameter of the authorize
/// endpoint. Returns `None` if the current URL cannot be parsed.
pub fn authorization_url(
    current_url: &str,
    authorize_endpoint: &str,
    project_folder: &str,
    keys: &ResumptionKeys,
) -> Option<String> {
    let mut return_url = Url::parse(current_url).ok()?;
    set_params(
        &mut return_url,
        &[
            (keys.publish_flag.as_str(), "true"),
            (keys.project_path.as_str(), project_folder),
        ],
    );

    let encoded: String =
        form_urlencoded::byte_serialize(return_url.as_str().as_bytes()).collect();
    Some(format!("{authorize_endpoint}?url={encoded}"))
}
