//! Cover image normalization.
//!
//! Every [`CoverImage`] variant is turned into the single [`MediaPayload`]
//! shape the community endpoint accepts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;

use crate::backend::HttpClient;
use crate::error::PublishError;
use crate::models::{CoverFile, CoverImage, DEFAULT_COVER_NAME, DEFAULT_IMAGE_TYPE, MediaPayload};

/// Resolves cover images into upload payloads.
#[derive(Clone, Debug)]
pub struct CoverMediaResolver<H> {
    http: H,
}

impl<H: HttpClient> CoverMediaResolver<H> {
    pub fn new(http: H) -> Self {
        Self { http }
    }

    /// Normalize a cover. `None` stays `None`; only remote URLs can fail.
    pub async fn resolve(
        &self,
        cover: Option<&CoverImage>,
    ) -> Result<Option<MediaPayload>, PublishError> {
        let Some(cover) = cover else {
            return Ok(None);
        };

        match cover {
            CoverImage::File(file) => Ok(Some(file_payload(file))),
            CoverImage::Captured(image) => {
                let Some(content) = image.payload() else {
                    warn!("captured image has no payload; dropping cover");
                    return Ok(None);
                };
                Ok(Some(MediaPayload::base64(
                    DEFAULT_COVER_NAME,
                    content,
                    image.content_type().unwrap_or(DEFAULT_IMAGE_TYPE),
                    None,
                )))
            }
            CoverImage::InlineEncoded {
                base64,
                content_type,
            } => Ok(Some(MediaPayload::base64(
                DEFAULT_COVER_NAME,
                base64.as_str(),
                content_type.as_deref().unwrap_or(DEFAULT_IMAGE_TYPE),
                None,
            ))),
            CoverImage::RemoteUrl(url) => {
                let file = self.fetch(url).await?;
                Ok(Some(file_payload(&file)))
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<CoverFile, PublishError> {
        let response = self
            .http
            .get(url)
            .await
            .map_err(|e| PublishError::MediaFetch(e.to_string()))?;

        if !response.ok() {
            return Err(PublishError::MediaFetch(format!(
                "HTTP {}: {}",
                response.status, response.status_text
            )));
        }

        Ok(CoverFile {
            name: DEFAULT_COVER_NAME.to_string(),
            content_type: response.content_type.filter(|t| !t.is_empty()),
            bytes: response.body,
        })
    }
}

fn file_payload(file: &CoverFile) -> MediaPayload {
    MediaPayload::base64(
        file.name.as_str(),
        STANDARD.encode(&file.bytes),
        file.content_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE),
        Some(file.bytes.len() as u64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HttpResponse;
    use crate::error::FetchError;
    use crate::mock::MockHttp;
    use crate::models::CapturedImage;

    fn resolver(http: &MockHttp) -> CoverMediaResolver<MockHttp> {
        CoverMediaResolver::new(http.clone())
    }

    #[tokio::test]
    async fn test_no_cover() {
        let resolved = resolver(&MockHttp::new()).resolve(None).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_captured_image_round_trip() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3, 255];
        let cover = CoverImage::Captured(CapturedImage::from_bytes(&bytes, "image/png"));

        let payload = resolver(&MockHttp::new())
            .resolve(Some(&cover))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payload.decode().unwrap(), bytes);
        assert_eq!(payload.content_type, "image/png");
        assert_eq!(payload.filename, "cover.png");
        assert_eq!(payload.path, "cover.png");
        assert_eq!(payload.encoding, "base64");
        assert_eq!(payload.size, None);
    }

    #[tokio::test]
    async fn test_malformed_capture_is_dropped() {
        let cover = CoverImage::Captured(CapturedImage::from_data_url("not-a-data-url"));
        let resolved = resolver(&MockHttp::new()).resolve(Some(&cover)).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_file_cover() {
        let cover = CoverImage::File(CoverFile {
            name: "shot.jpg".into(),
            content_type: Some("image/jpeg".into()),
            bytes: b"jpeg".to_vec(),
        });

        let payload = resolver(&MockHttp::new())
            .resolve(Some(&cover))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(payload.path, "shot.jpg");
        assert_eq!(payload.filename, "shot.jpg");
        assert_eq!(payload.content, "anBlZw==");
        assert_eq!(payload.content_type, "image/jpeg");
        assert_eq!(payload.size, Some(4));
    }

    #[tokio::test]
    async fn test_file_without_type_defaults_to_png() {
        let cover = CoverImage::File(CoverFile {
            name: "blob".into(),
            content_type: Some(String::new()),
            bytes: vec![1],
        });
        let payload = resolver(&MockHttp::new())
            .resolve(Some(&cover))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_inline_encoded_passes_through() {
        let cover = CoverImage::InlineEncoded {
            base64: "R0lGOD".into(),
            content_type: Some("image/gif".into()),
        };
        let payload = resolver(&MockHttp::new())
            .resolve(Some(&cover))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.content, "R0lGOD");
        assert_eq!(payload.content_type, "image/gif");
        assert_eq!(payload.filename, "cover.png");
    }

    #[tokio::test]
    async fn test_remote_url_is_fetched_like_a_file() {
        let http = MockHttp::new();
        http.respond(
            "https://cdn.example.com/cover.webp",
            HttpResponse {
                status: 200,
                status_text: "OK".into(),
                content_type: Some("image/webp".into()),
                body: b"webp".to_vec(),
            },
        );
        let cover = CoverImage::RemoteUrl("https://cdn.example.com/cover.webp".into());

        let payload = resolver(&http).resolve(Some(&cover)).await.unwrap().unwrap();

        assert_eq!(payload.filename, "cover.png");
        assert_eq!(payload.content_type, "image/webp");
        assert_eq!(payload.decode().unwrap(), b"webp");
        assert_eq!(payload.size, Some(4));
    }

    #[tokio::test]
    async fn test_remote_url_failures() {
        let http = MockHttp::new();
        http.respond_status("https://cdn.example.com/missing.png", 404);
        let cover = CoverImage::RemoteUrl("https://cdn.example.com/missing.png".into());
        let err = resolver(&http).resolve(Some(&cover)).await.unwrap_err();
        assert_eq!(err, PublishError::MediaFetch("HTTP 404: Not Found".into()));

        let http = MockHttp::new();
        http.fail(
            "https://cdn.example.com/down.png",
            FetchError::NetworkError("offline".into()),
        );
        let cover = CoverImage::RemoteUrl("https://cdn.example.com/down.png".into());
        let err = resolver(&http).resolve(Some(&cover)).await.unwrap_err();
        assert!(matches!(err, PublishError::MediaFetch(_)));
    }
}
