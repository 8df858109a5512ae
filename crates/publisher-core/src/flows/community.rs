//! Publishing to the community gallery.

use log::warn;

use crate::backend::{CommunityApi, HttpClient};
use crate::error::{PublishError, ValidationError};
use crate::media::CoverMediaResolver;
use crate::models::{CommunityPublishRequest, CoverImage, MediaPayload, ProjectData};

/// Display type of gallery listings.
const DISPLAY_TYPE: &str = "card";

/// Inputs of the Compose step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommunityFlow {
    pub title: String,
    pub description: String,
    pub cover: Option<CoverImage>,
    /// A screenshot is being captured for this session.
    pub capture_pending: bool,
}

/// Validated Compose inputs, ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommunityDraft {
    pub title: String,
    pub description: String,
    pub cover: Option<CoverImage>,
}

/// Deployment-specific parts of the community request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommunityOptions {
    pub link_prefix: String,
    pub submit_to_featured: bool,
}

impl CommunityFlow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Replace the cover; the previous one is dropped.
    pub fn set_cover(&mut self, cover: Option<CoverImage>) {
        self.cover = cover;
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<CommunityDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        Ok(CommunityDraft {
            title: title.to_string(),
            description: description.to_string(),
            cover: self.cover.clone(),
        })
    }
}

pub fn build_request(
    folder: &str,
    draft: &CommunityDraft,
    media: Option<MediaPayload>,
    options: &CommunityOptions,
) -> CommunityPublishRequest {
    CommunityPublishRequest {
        folder: folder.to_string(),
        project_data: ProjectData {
            name: draft.title.clone(),
            description: draft.description.clone(),
            link: format!("{}/{}", options.link_prefix, folder),
            display_type: DISPLAY_TYPE.to_string(),
            img_link: String::new(),
            submit_to_featured: options.submit_to_featured,
            tags: Vec::new(),
        },
        media_files: media.into_iter().collect(),
    }
}

/// Resolve the cover, build the request and submit it.
///
/// A cover that cannot be resolved is left out; it never blocks the publish.
pub async fn publish<A, H>(
    api: &A,
    media: &CoverMediaResolver<H>,
    folder: &str,
    draft: &CommunityDraft,
    options: &CommunityOptions,
) -> Result<(), PublishError>
where
    A: CommunityApi,
    H: HttpClient,
{
    let payload = match media.resolve(draft.cover.as_ref()).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!("publishing without cover: {e}");
            None
        }
    };

    let request = build_request(folder, draft, payload, options);
    api.publish_community(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CapturedImage;

    fn options() -> CommunityOptions {
        CommunityOptions {
            link_prefix: "/~".into(),
            submit_to_featured: false,
        }
    }

    #[test]
    fn test_validation_trims_inputs() {
        let mut flow = CommunityFlow::new("  ");
        flow.description = "desc".into();
        assert_eq!(flow.validate(), Err(ValidationError::MissingTitle));

        flow.title = " My App ".into();
        flow.description = "\n\t".into();
        assert_eq!(flow.validate(), Err(ValidationError::MissingDescription));
        assert!(!flow.can_submit());

        flow.description = " desc ".into();
        let draft = flow.validate().unwrap();
        assert_eq!(draft.title, "My App");
        assert_eq!(draft.description, "desc");
    }

    #[test]
    fn test_cover_is_replaced() {
        let mut flow = CommunityFlow::new("projA");
        flow.set_cover(Some(CoverImage::RemoteUrl("https://a/1.png".into())));
        flow.set_cover(Some(CoverImage::Captured(CapturedImage::from_bytes(b"x", "image/png"))));
        assert!(matches!(flow.cover, Some(CoverImage::Captured(_))));
        flow.set_cover(None);
        assert!(flow.cover.is_none());
    }

    #[test]
    fn test_build_request() {
        let draft = CommunityDraft {
            title: "My App".into(),
            description: "desc".into(),
            cover: None,
        };
        let media = MediaPayload::base64("cover.png", "AAEC", "image/png", None);
        let request = build_request("projA", &draft, Some(media.clone()), &options());

        assert_eq!(request.folder, "projA");
        assert_eq!(request.project_data.link, "/~/projA");
        assert_eq!(request.project_data.display_type, "card");
        assert!(request.project_data.tags.is_empty());
        assert!(!request.project_data.submit_to_featured);
        assert_eq!(request.media_files, vec![media]);
    }

    #[test]
    fn test_featured_flag_is_configurable() {
        let draft = CommunityDraft {
            title: "t".into(),
            description: "d".into(),
            cover: None,
        };
        let request = build_request(
            "projA",
            &draft,
            None,
            &CommunityOptions {
                link_prefix: "/~".into(),
                submit_to_featured: true,
            },
        );
        assert!(request.project_data.submit_to_featured);
        assert!(request.media_files.is_empty());
    }
}
