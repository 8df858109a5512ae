//! Cover image sources and their upload form.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::Serialize;

/// File name used when the source carries none.
pub const DEFAULT_COVER_NAME: &str = "cover.png";

/// Content type assumed when the source declares none.
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

static DATA_URL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:(.*);base64").expect("static regex"));

/// The cover attached to a community listing.
///
/// Exactly one variant is active per session; setting a new cover drops the
/// previous one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoverImage {
    /// A file picked by the user.
    File(CoverFile),
    /// A screenshot of the project's own preview.
    Captured(CapturedImage),
    /// An image hosted elsewhere, fetched at submit time.
    RemoteUrl(String),
    /// Already base64-encoded image data.
    InlineEncoded {
        base64: String,
        content_type: Option<String>,
    },
}

/// Raw bytes of a user-selected file.
#[derive(Clone, PartialEq, Eq)]
pub struct CoverFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for CoverFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A rasterized screenshot in `data:` URL form.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data_url: String,
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("content_type", &self.content_type())
            .field("len", &self.data_url.len())
            .finish()
    }
}

impl CapturedImage {
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
        }
    }

    /// Encode raw image bytes as a base64 `data:` URL.
    pub fn from_bytes(bytes: &[u8], content_type: &str) -> Self {
        Self::from_data_url(format!(
            "data:{content_type};base64,{}",
            STANDARD.encode(bytes)
        ))
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Declared content type, if the URL declares one.
    pub fn content_type(&self) -> Option<&str> {
        DATA_URL_TYPE
            .captures(&self.data_url)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }

    /// Base64 payload after the first comma.
    pub fn payload(&self) -> Option<&str> {
        self.data_url.split_once(',').map(|(_, payload)| payload)
    }
}

/// Canonical upload form of a cover image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub path: String,
    pub filename: String,
    /// Base64 encoded bytes.
    pub content: String,
    /// Always `"base64"`.
    pub encoding: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl MediaPayload {
    pub fn base64(
        filename: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
        size: Option<u64>,
    ) -> Self {
        let filename = filename.into();
        Self {
            path: filename.clone(),
            filename,
            content: content.into(),
            encoding: "base64".to_string(),
            content_type: content_type.into(),
            size,
        }
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.content)
    }
}
