//! Session context and the pure transition function.

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use super::state::{Action, Destination, Step, WorkflowState, next_step};
use crate::error::ValidationError;
use crate::flows::{CommunityDraft, CommunityFlow, GitHubFlow, RepoTarget};
use crate::models::{CoverImage, GitHubPublishRequest, ResolvedProject};
use crate::notice::Notice;

/// Identifies one open/close cycle of the publisher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The destination flow a session is running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    GitHub(GitHubFlow),
    Community(CommunityFlow),
}

/// Work requested by a transition; the orchestrator performs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    CheckCredential,
    LoadRepositories,
    /// Leave the page for the GitHub authorization handoff.
    BeginAuthorization { project_folder: String },
    PublishGitHub(GitHubPublishRequest),
    PublishCommunity { folder: String, draft: CommunityDraft },
    CaptureScreenshot { preview_path: String },
    Notify(Notice),
    OpenUrl(String),
}

/// Outcome of [`Session::apply`]. A `None` session means it was closed.
#[derive(Debug)]
pub struct Transition {
    pub session: Option<Session>,
    pub effects: Vec<Effect>,
}

/// Context threaded through every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    state: WorkflowState,
    project: Option<ResolvedProject>,
    flow: Option<Flow>,
    private_repositories: bool,
}

impl Session {
    pub fn new(id: SessionId, private_repositories: bool) -> Self {
        Self {
            id,
            state: WorkflowState::Start,
            project: None,
            flow: None,
            private_repositories,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn project(&self) -> Option<&ResolvedProject> {
        self.project.as_ref()
    }

    pub fn flow(&self) -> Option<&Flow> {
        self.flow.as_ref()
    }

    pub fn github(&self) -> Option<&GitHubFlow> {
        match &self.flow {
            Some(Flow::GitHub(flow)) => Some(flow),
            _ => None,
        }
    }

    pub fn community(&self) -> Option<&CommunityFlow> {
        match &self.flow {
            Some(Flow::Community(flow)) => Some(flow),
            _ => None,
        }
    }

    fn github_mut(&mut self) -> Option<&mut GitHubFlow> {
        match &mut self.flow {
            Some(Flow::GitHub(flow)) => Some(flow),
            _ => None,
        }
    }

    fn community_mut(&mut self) -> Option<&mut CommunityFlow> {
        match &mut self.flow {
            Some(Flow::Community(flow)) => Some(flow),
            _ => None,
        }
    }

    fn folder(&self) -> Option<String> {
        self.project.as_ref().map(|p| p.folder.clone())
    }

    /// Apply one action.
    ///
    /// Actions the table ignores leave the session untouched. Guarded
    /// transitions that fail report a notice and keep the current state.
    pub fn apply(mut self, action: Action) -> Transition {
        let next = match next_step(&self.state, &action) {
            Step::Ignore => {
                debug!("session {}: ignoring {action:?} in {}", self.id, self.state.name());
                return Transition::keep(self, Vec::new());
            }
            Step::Close => {
                info!("session {} closed", self.id);
                return Transition {
                    session: None,
                    effects: Vec::new(),
                };
            }
            Step::Stay => None,
            Step::Goto(state) => Some(state),
        };

        let mut effects = Vec::new();
        match action {
            Action::Open(reference) => match reference.resolve() {
                Some(project) => {
                    info!("session {} opened for {}", self.id, project.folder);
                    self.project = Some(project);
                    self.goto(next);
                }
                None => {
                    effects.push(Effect::Notify(Notice::error(
                        ValidationError::ProjectFolderNotFound.to_string(),
                    )));
                }
            },
            Action::Resume(folder) => {
                self.project = Some(ResolvedProject::from_folder(folder));
                self.flow = Some(Flow::GitHub(GitHubFlow::default()));
                self.goto(next);
                effects.push(Effect::LoadRepositories);
            }
            Action::Choose(Destination::GitHub) => {
                self.flow = Some(Flow::GitHub(GitHubFlow::default()));
                self.goto(next);
                effects.push(Effect::CheckCredential);
            }
            Action::Choose(Destination::Community) => {
                let title = self
                    .project
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                self.flow = Some(Flow::Community(CommunityFlow::new(title)));
                self.goto(next);
            }
            Action::CredentialChecked(connected) => {
                self.goto(next);
                if connected {
                    effects.push(Effect::LoadRepositories);
                }
            }
            Action::ConfirmConnect => {
                if let Some(project_folder) = self.folder() {
                    effects.push(Effect::BeginAuthorization { project_folder });
                }
            }
            Action::RepositoriesLoaded(repositories) => {
                if let Some(flow) = self.github_mut() {
                    flow.set_repositories(repositories);
                }
            }
            Action::SelectTarget(target) => {
                if let Some(flow) = self.github_mut() {
                    flow.target = target;
                }
            }
            Action::SelectRepository(repository) => {
                if let Some(flow) = self.github_mut() {
                    flow.select(repository);
                }
            }
            Action::EditTitle(title) => {
                if let Some(flow) = self.community_mut() {
                    flow.title = title;
                }
            }
            Action::EditDescription(description) => {
                if let Some(flow) = self.community_mut() {
                    flow.description = description;
                }
            }
            Action::SetCover(cover) => {
                if let Some(flow) = self.community_mut() {
                    flow.set_cover(Some(cover));
                }
            }
            Action::ClearCover => {
                if let Some(flow) = self.community_mut() {
                    flow.set_cover(None);
                }
            }
            Action::CaptureScreenshot => self.begin_capture(&mut effects),
            Action::ScreenshotCaptured(result) => {
                if let Some(flow) = self.community_mut() {
                    flow.capture_pending = false;
                    match result {
                        Ok(image) => flow.set_cover(Some(CoverImage::Captured(image))),
                        Err(e) => effects.push(Effect::Notify(Notice::error(format!(
                            "Screenshot failed: {e}"
                        )))),
                    }
                }
            }
            Action::Submit => self.submit(next, &mut effects),
            Action::Published(result) => {
                let destination = match self.state {
                    WorkflowState::GitHubSubmitting => Destination::GitHub,
                    _ => Destination::Community,
                };
                self.goto(next);
                match result {
                    Ok(repository_url) => {
                        info!("session {} published to {destination:?}", self.id);
                        published_effects(destination, repository_url, &mut effects);
                    }
                    Err(e) => {
                        effects.push(Effect::Notify(Notice::error(format!("Publish failed: {e}"))));
                    }
                }
            }
            Action::Retry => self.goto(next),
            Action::Cancel => {}
        }

        Transition::keep(self, effects)
    }

    fn goto(&mut self, next: Option<WorkflowState>) {
        if let Some(state) = next {
            debug!("session {}: {} -> {}", self.id, self.state.name(), state.name());
            self.state = state;
        }
    }

    fn begin_capture(&mut self, effects: &mut Vec<Effect>) {
        let Some(preview_path) = self.project.as_ref().map(|p| p.preview_path.clone()) else {
            return;
        };
        let Some(flow) = self.community_mut() else {
            return;
        };
        if flow.capture_pending {
            debug!("screenshot already in progress");
            return;
        }
        flow.capture_pending = true;
        effects.push(Effect::CaptureScreenshot { preview_path });
    }

    fn submit(&mut self, next: Option<WorkflowState>, effects: &mut Vec<Effect>) {
        let Some(project) = self.project.clone() else {
            effects.push(Effect::Notify(Notice::error(
                ValidationError::ProjectFolderNotFound.to_string(),
            )));
            return;
        };

        let outcome = match &self.flow {
            Some(Flow::GitHub(flow)) => flow
                .build_request(&project, self.private_repositories)
                .map(|request| {
                    vec![
                        Effect::Notify(Notice::info("Publishing to GitHub...")),
                        Effect::PublishGitHub(request),
                    ]
                }),
            Some(Flow::Community(flow)) => flow.validate().map(|draft| {
                vec![
                    Effect::Notify(Notice::info("Publishing to the community gallery...")),
                    Effect::PublishCommunity {
                        folder: project.folder.clone(),
                        draft,
                    },
                ]
            }),
            None => return,
        };

        match outcome {
            Ok(submitted) => {
                effects.extend(submitted);
                self.goto(next);
            }
            Err(e) => effects.push(Effect::Notify(Notice::error(e.to_string()))),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.0,
            state: self.state.name(),
            failed_destination: match self.state {
                WorkflowState::Failed(Destination::GitHub) => Some("github"),
                WorkflowState::Failed(Destination::Community) => Some("community"),
                _ => None,
            },
            project_folder: self.project.as_ref().map(|p| p.folder.clone()),
            project_name: self.project.as_ref().map(|p| p.name.clone()),
            github: self.github().map(|flow| GitHubSnapshot {
                repositories: flow.repositories.clone(),
                repositories_loaded: flow.repositories_loaded,
                target: flow.target,
                selected: flow.selected.clone(),
                can_submit: flow.can_submit(),
            }),
            community: self.community().map(|flow| CommunitySnapshot {
                title: flow.title.clone(),
                description: flow.description.clone(),
                cover_preview: flow.cover.as_ref().and_then(cover_preview),
                has_cover: flow.cover.is_some(),
                capture_pending: flow.capture_pending,
                can_submit: flow.can_submit(),
            }),
        }
    }
}

impl Transition {
    fn keep(session: Session, effects: Vec<Effect>) -> Self {
        Self {
            session: Some(session),
            effects,
        }
    }
}

fn published_effects(
    destination: Destination,
    repository_url: Option<String>,
    effects: &mut Vec<Effect>,
) {
    match (destination, repository_url) {
        (Destination::GitHub, Some(url)) => {
            effects.push(Effect::Notify(Notice::success(format!(
                "Published! Repository: {url}"
            ))));
            effects.push(Effect::OpenUrl(url));
        }
        (Destination::GitHub, None) => {
            effects.push(Effect::Notify(Notice::success("Published to GitHub!")));
        }
        (Destination::Community, _) => {
            effects.push(Effect::Notify(Notice::success(
                "Project successfully published to the community gallery!",
            )));
        }
    }
}

/// Something an `<img>` can display.
fn cover_preview(cover: &CoverImage) -> Option<String> {
    match cover {
        CoverImage::Captured(image) => Some(image.data_url().to_string()),
        CoverImage::RemoteUrl(url) => Some(url.clone()),
        CoverImage::InlineEncoded {
            base64,
            content_type,
        } => Some(format!(
            "data:{};base64,{base64}",
            content_type.as_deref().unwrap_or(crate::models::DEFAULT_IMAGE_TYPE)
        )),
        CoverImage::File(_) => None,
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Read-only view of a session for the UI layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: u64,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_destination: Option<&'static str>,
    pub project_folder: Option<String>,
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunitySnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSnapshot {
    pub repositories: Vec<String>,
    pub repositories_loaded: bool,
    pub target: RepoTarget,
    pub selected: Option<String>,
    pub can_submit: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySnapshot {
    pub title: String,
    pub description: String,
    pub has_cover: bool,
    pub cover_preview: Option<String>,
    pub capture_pending: bool,
    pub can_submit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::models::{CapturedImage, ProjectReference};

    fn session() -> Session {
        Session::new(SessionId(1), false)
    }

    fn apply_all(mut session: Session, actions: Vec<Action>) -> (Session, Vec<Effect>) {
        let mut effects = Vec::new();
        for action in actions {
            let transition = session.apply(action);
            session = transition.session.expect("session closed");
            effects.extend(transition.effects);
        }
        (session, effects)
    }

    fn opened(path: &str, is_directory: bool) -> Session {
        session()
            .apply(Action::Open(ProjectReference::new(path, is_directory)))
            .session
            .unwrap()
    }

    fn composing() -> Session {
        let (session, _) = apply_all(
            opened("/projA/index.html", false),
            vec![Action::Choose(Destination::Community)],
        );
        session
    }

    #[test]
    fn test_open_resolves_project() {
        let session = opened("/projA/index.html", false);
        assert_eq!(session.state(), &WorkflowState::ChooseDestination);
        let project = session.project().unwrap();
        assert_eq!(project.folder, "projA");
        assert_eq!(project.preview_path, "projA/index.html");
    }

    #[test]
    fn test_open_without_folder_stays_at_start() {
        let transition = session().apply(Action::Open(ProjectReference::new("index.html", false)));
        let session = transition.session.unwrap();
        assert_eq!(session.state(), &WorkflowState::Start);
        assert_eq!(
            transition.effects,
            vec![Effect::Notify(Notice::error("Project folder not found."))]
        );
    }

    #[test]
    fn test_github_choice_checks_credential() {
        let transition = opened("/projA", true).apply(Action::Choose(Destination::GitHub));
        assert_eq!(transition.effects, vec![Effect::CheckCredential]);
        let session = transition.session.unwrap();
        assert_eq!(session.state(), &WorkflowState::GitHubCheckToken);
        assert!(session.github().is_some());
    }

    #[test]
    fn test_connected_user_loads_repositories() {
        let (session, effects) = apply_all(
            opened("/projA", true),
            vec![
                Action::Choose(Destination::GitHub),
                Action::CredentialChecked(true),
            ],
        );
        assert_eq!(session.state(), &WorkflowState::GitHubConfigure);
        assert_eq!(effects.last(), Some(&Effect::LoadRepositories));
    }

    #[test]
    fn test_connect_hands_off_authorization() {
        let (session, effects) = apply_all(
            opened("/projA", true),
            vec![
                Action::Choose(Destination::GitHub),
                Action::CredentialChecked(false),
                Action::ConfirmConnect,
            ],
        );
        assert_eq!(session.state(), &WorkflowState::GitHubConnect);
        assert_eq!(
            effects.last(),
            Some(&Effect::BeginAuthorization {
                project_folder: "projA".into()
            })
        );
    }

    #[test]
    fn test_github_submit_requires_selection() {
        let (session, effects) = apply_all(
            session(),
            vec![Action::Resume("projA".into()), Action::Submit],
        );
        assert_eq!(session.state(), &WorkflowState::GitHubConfigure);
        assert_eq!(
            effects.last(),
            Some(&Effect::Notify(Notice::error("Please select a repository.")))
        );

        let (session, effects) = apply_all(
            session,
            vec![
                Action::RepositoriesLoaded(vec!["me/site".into()]),
                Action::SelectRepository(Some("me/site".into())),
                Action::Submit,
            ],
        );
        assert_eq!(session.state(), &WorkflowState::GitHubSubmitting);
        assert_eq!(
            effects,
            vec![
                Effect::Notify(Notice::info("Publishing to GitHub...")),
                Effect::PublishGitHub(GitHubPublishRequest {
                    project_path: "projA".into(),
                    repo_name: "projA".into(),
                    existing_repo: Some("me/site".into()),
                    is_private: false,
                }),
            ]
        );
    }

    #[test]
    fn test_github_success_opens_repository() {
        let (session, effects) = apply_all(
            session(),
            vec![
                Action::Resume("projA".into()),
                Action::SelectTarget(RepoTarget::New),
                Action::Submit,
                Action::Published(Ok(Some("https://github.com/me/projA".into()))),
            ],
        );
        assert_eq!(session.state(), &WorkflowState::Done);
        assert!(effects.contains(&Effect::Notify(Notice::success(
            "Published! Repository: https://github.com/me/projA"
        ))));
        assert_eq!(
            effects.last(),
            Some(&Effect::OpenUrl("https://github.com/me/projA".into()))
        );
    }

    #[test]
    fn test_community_title_defaults_to_project_name() {
        assert_eq!(composing().community().unwrap().title, "projA");
    }

    #[test]
    fn test_community_submit_validates() {
        let (session, effects) = apply_all(
            composing(),
            vec![Action::EditTitle("   ".into()), Action::Submit],
        );
        assert_eq!(session.state(), &WorkflowState::CommunityCompose);
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::error("Please enter a project title."))]
        );
    }

    #[test]
    fn test_community_failure_and_retry_keep_inputs() {
        let (session, _) = apply_all(
            composing(),
            vec![
                Action::EditTitle("My App".into()),
                Action::EditDescription("A demo".into()),
                Action::Submit,
                Action::Published(Err(PublishError::PublishFailure("quota".into()))),
            ],
        );
        assert_eq!(session.state(), &WorkflowState::Failed(Destination::Community));

        let (session, _) = apply_all(session, vec![Action::Retry]);
        assert_eq!(session.state(), &WorkflowState::CommunityCompose);
        let flow = session.community().unwrap();
        assert_eq!(flow.title, "My App");
        assert_eq!(flow.description, "A demo");
    }

    #[test]
    fn test_second_capture_is_ignored_while_pending() {
        let (session, effects) = apply_all(
            composing(),
            vec![Action::CaptureScreenshot, Action::CaptureScreenshot],
        );
        assert_eq!(
            effects,
            vec![Effect::CaptureScreenshot {
                preview_path: "projA/index.html".into()
            }]
        );
        assert!(session.community().unwrap().capture_pending);

        let image = CapturedImage::from_bytes(b"png", "image/png");
        let (session, _) = apply_all(
            session,
            vec![Action::ScreenshotCaptured(Ok(image.clone()))],
        );
        let flow = session.community().unwrap();
        assert!(!flow.capture_pending);
        assert_eq!(flow.cover, Some(CoverImage::Captured(image)));
    }

    #[test]
    fn test_failed_capture_reports_notice() {
        let (session, effects) = apply_all(
            composing(),
            vec![
                Action::CaptureScreenshot,
                Action::ScreenshotCaptured(Err(PublishError::ScreenshotTimeout)),
            ],
        );
        assert!(!session.community().unwrap().capture_pending);
        assert_eq!(
            effects.last(),
            Some(&Effect::Notify(Notice::error(format!(
                "Screenshot failed: {}",
                PublishError::ScreenshotTimeout
            ))))
        );
    }

    #[test]
    fn test_cancel_closes() {
        let transition = composing().apply(Action::Cancel);
        assert!(transition.session.is_none());
        assert!(transition.effects.is_empty());
    }

    #[test]
    fn test_snapshot_reflects_flow() {
        let (session, _) = apply_all(
            composing(),
            vec![Action::SetCover(CoverImage::RemoteUrl(
                "https://cdn.example.com/c.png".into(),
            ))],
        );
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, "Community.Compose");
        assert_eq!(snapshot.project_folder.as_deref(), Some("projA"));
        assert!(snapshot.github.is_none());
        let community = snapshot.community.unwrap();
        assert!(community.has_cover);
        assert_eq!(
            community.cover_preview.as_deref(),
            Some("https://cdn.example.com/c.png")
        );
        assert!(!community.can_submit);

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["sessionId"], 1);
        assert_eq!(json["community"]["capturePending"], false);
    }
}
