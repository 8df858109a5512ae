//! Publish request payloads, one per destination.

use serde::Serialize;

use super::MediaPayload;

/// Body of the GitHub publish call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubPublishRequest {
    pub project_path: String,
    pub repo_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_repo: Option<String>,
    pub is_private: bool,
}

/// Listing metadata of a community publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub name: String,
    pub description: String,
    pub link: String,
    pub display_type: String,
    pub img_link: String,
    /// Whether the listing asks to be featured by the platform itself.
    #[serde(rename = "submittoqoom")]
    pub submit_to_featured: bool,
    pub tags: Vec<String>,
}

/// Body of the community publish call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPublishRequest {
    pub folder: String,
    pub project_data: ProjectData,
    pub media_files: Vec<MediaPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_request_omits_missing_repo() {
        let request = GitHubPublishRequest {
            project_path: "projA".into(),
            repo_name: "projA".into(),
            existing_repo: None,
            is_private: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "projectPath": "projA",
                "repoName": "projA",
                "isPrivate": false
            })
        );
    }

    #[test]
    fn test_community_request_wire_names() {
        let request = CommunityPublishRequest {
            folder: "projA".into(),
            project_data: ProjectData {
                name: "My App".into(),
                description: "desc".into(),
                link: "/~/projA".into(),
                display_type: "card".into(),
                img_link: String::new(),
                submit_to_featured: false,
                tags: vec![],
            },
            media_files: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["folder"], "projA");
        assert_eq!(json["projectData"]["displayType"], "card");
        assert_eq!(json["projectData"]["imgLink"], "");
        assert_eq!(json["projectData"]["submittoqoom"], false);
        assert_eq!(json["mediaFiles"], serde_json::json!([]));
    }
}
