//! Publishing to a GitHub repository.

use log::warn;
use serde::Serialize;

use crate::backend::GitHubApi;
use crate::error::{PublishError, ValidationError};
use crate::models::{GitHubPublishRequest, ResolvedProject};

/// Where the project is pushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoTarget {
    /// A repository the user already owns; one must be selected.
    #[default]
    Existing,
    /// A new repository named after the project.
    New,
}

/// Inputs of the Configure step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GitHubFlow {
    pub repositories: Vec<String>,
    pub repositories_loaded: bool,
    pub target: RepoTarget,
    pub selected: Option<String>,
}

impl GitHubFlow {
    pub fn set_repositories(&mut self, repositories: Vec<String>) {
        self.repositories = repositories;
        self.repositories_loaded = true;
    }

    pub fn select(&mut self, repository: Option<String>) {
        self.selected = repository.filter(|r| !r.is_empty());
    }

    /// A new repository always proceeds; an existing one needs a selection.
    pub fn can_submit(&self) -> bool {
        match self.target {
            RepoTarget::New => true,
            RepoTarget::Existing => self.selected.is_some(),
        }
    }

    pub fn build_request(
        &self,
        project: &ResolvedProject,
        is_private: bool,
    ) -> Result<GitHubPublishRequest, ValidationError> {
        let existing_repo = match self.target {
            RepoTarget::New => None,
            RepoTarget::Existing => Some(
                self.selected
                    .clone()
                    .ok_or(ValidationError::NoRepositorySelected)?,
            ),
        };

        Ok(GitHubPublishRequest {
            project_path: project.folder.clone(),
            repo_name: project.name.clone(),
            existing_repo,
            is_private,
        })
    }
}

pub async fn check_credential<A: GitHubApi>(api: &A) -> bool {
    api.has_credential().await
}

/// Repository names; a failed listing yields an empty list.
pub async fn load_repositories<A: GitHubApi>(api: &A) -> Vec<String> {
    api.list_repositories().await.unwrap_or_else(|e| {
        warn!("repository list unavailable: {e}");
        Vec::new()
    })
}

pub async fn publish<A: GitHubApi>(
    api: &A,
    request: &GitHubPublishRequest,
) -> Result<Option<String>, PublishError> {
    api.publish_github(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ResolvedProject {
        ResolvedProject::from_folder("projA")
    }

    #[test]
    fn test_existing_requires_selection() {
        let mut flow = GitHubFlow::default();
        assert!(!flow.can_submit());
        assert_eq!(
            flow.build_request(&project(), false),
            Err(ValidationError::NoRepositorySelected)
        );

        flow.select(Some(String::new()));
        assert!(!flow.can_submit());

        flow.select(Some("me/site".into()));
        assert!(flow.can_submit());
        let request = flow.build_request(&project(), false).unwrap();
        assert_eq!(request.existing_repo.as_deref(), Some("me/site"));
        assert_eq!(request.repo_name, "projA");
        assert_eq!(request.project_path, "projA");
    }

    #[test]
    fn test_new_repository_always_proceeds() {
        let flow = GitHubFlow {
            target: RepoTarget::New,
            selected: Some("me/ignored".into()),
            ..GitHubFlow::default()
        };
        assert!(flow.can_submit());
        let request = flow.build_request(&project(), true).unwrap();
        assert_eq!(request.existing_repo, None);
        assert!(request.is_private);
    }
}
