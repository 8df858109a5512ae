//! Workflow states and the `(state, action) -> step` table.
//!
//! The table only encodes which transitions exist. Guards that depend on
//! session data (a resolvable project, a selected repository, a non-empty
//! title) are checked by [`Session::apply`](super::Session::apply), which
//! may refuse a `Goto` and keep the current state.

use crate::error::PublishError;
use crate::flows::RepoTarget;
use crate::models::{CapturedImage, CoverImage, ProjectReference};

/// Where a project is published.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    GitHub,
    Community,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    ChooseDestination,
    GitHubCheckToken,
    GitHubConnect,
    GitHubConfigure,
    GitHubSubmitting,
    CommunityCompose,
    CommunitySubmitting,
    Done,
    /// The last submission to the given destination failed.
    Failed(Destination),
}

impl WorkflowState {
    /// Stable name exposed to the UI layer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::ChooseDestination => "ChooseDestination",
            Self::GitHubCheckToken => "GitHub.CheckToken",
            Self::GitHubConnect => "GitHub.Connect",
            Self::GitHubConfigure => "GitHub.Configure",
            Self::GitHubSubmitting => "GitHub.Submitting",
            Self::CommunityCompose => "Community.Compose",
            Self::CommunitySubmitting => "Community.Submitting",
            Self::Done => "Done",
            Self::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// Everything that can move a session: user input and completed I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Trigger event with the project to publish.
    Open(ProjectReference),
    /// Re-enter the GitHub flow after the OAuth round trip.
    Resume(String),
    Choose(Destination),
    Cancel,
    CredentialChecked(bool),
    ConfirmConnect,
    RepositoriesLoaded(Vec<String>),
    SelectTarget(RepoTarget),
    SelectRepository(Option<String>),
    EditTitle(String),
    EditDescription(String),
    SetCover(CoverImage),
    ClearCover,
    CaptureScreenshot,
    ScreenshotCaptured(Result<CapturedImage, PublishError>),
    Submit,
    /// Submission finished; GitHub reports the repository URL when known.
    Published(Result<Option<String>, PublishError>),
    Retry,
}

/// Result of looking up a `(state, action)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Goto(WorkflowState),
    /// Valid action that only updates session data.
    Stay,
    /// Abandon the session.
    Close,
    /// Not valid in this state.
    Ignore,
}

pub fn next_step(state: &WorkflowState, action: &Action) -> Step {
    use Action as A;
    use Destination::{Community, GitHub};
    use WorkflowState as S;

    match (state, action) {
        (_, A::Cancel) => Step::Close,

        (S::Start, A::Open(_)) => Step::Goto(S::ChooseDestination),
        (S::Start, A::Resume(_)) => Step::Goto(S::GitHubConfigure),

        (S::ChooseDestination, A::Choose(GitHub)) => Step::Goto(S::GitHubCheckToken),
        (S::ChooseDestination, A::Choose(Community)) => Step::Goto(S::CommunityCompose),

        (S::GitHubCheckToken, A::CredentialChecked(true)) => Step::Goto(S::GitHubConfigure),
        (S::GitHubCheckToken, A::CredentialChecked(false)) => Step::Goto(S::GitHubConnect),
        (S::GitHubConnect, A::ConfirmConnect) => Step::Stay,
        (
            S::GitHubConfigure,
            A::RepositoriesLoaded(_) | A::SelectTarget(_) | A::SelectRepository(_),
        ) => Step::Stay,
        (S::GitHubConfigure, A::Submit) => Step::Goto(S::GitHubSubmitting),
        (S::GitHubSubmitting, A::Published(Ok(_))) => Step::Goto(S::Done),
        (S::GitHubSubmitting, A::Published(Err(_))) => Step::Goto(S::Failed(GitHub)),

        (
            S::CommunityCompose,
            A::EditTitle(_)
            | A::EditDescription(_)
            | A::SetCover(_)
            | A::ClearCover
            | A::CaptureScreenshot,
        ) => Step::Stay,
        (S::CommunityCompose, A::Submit) => Step::Goto(S::CommunitySubmitting),
        (
            S::CommunityCompose | S::CommunitySubmitting | S::Failed(Community),
            A::ScreenshotCaptured(_),
        ) => Step::Stay,
        (S::CommunitySubmitting, A::Published(Ok(_))) => Step::Goto(S::Done),
        (S::CommunitySubmitting, A::Published(Err(_))) => Step::Goto(S::Failed(Community)),

        (S::Failed(GitHub), A::Retry) => Step::Goto(S::GitHubConfigure),
        (S::Failed(Community), A::Retry) => Step::Goto(S::CommunityCompose),

        _ => Step::Ignore,
    }
}
