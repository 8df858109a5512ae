//! Owns the live session and performs transition effects.
//!
//! Everything runs on one thread. Actions may arrive from several spawned
//! tasks (a click while a screenshot is still rendering), so the session
//! is only borrowed for the duration of a single transition and every
//! asynchronous result is tagged with the id of the session that asked
//! for it. Results for a session that has since been closed or replaced
//! are dropped.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use log::{debug, info, warn};

use super::session::{Effect, Session, SessionId, SessionSnapshot};
use super::state::{Action, WorkflowState};
use crate::backend::{BackendClient, HttpClient};
use crate::capture::{CoverCapture, Timer};
use crate::config::PublisherConfig;
use crate::flows::{CommunityOptions, community, github};
use crate::media::CoverMediaResolver;
use crate::models::ProjectReference;
use crate::notice::{Notice, Notifier};
use crate::resume::{Navigator, ResumptionContext, authorization_url};

/// Called after every transition; `None` once the session is closed.
pub type StateListener = Box<dyn Fn(Option<&SessionSnapshot>)>;

pub struct Orchestrator<H, N, U, T, C> {
    backend: BackendClient<H>,
    media: CoverMediaResolver<H>,
    capture: C,
    navigator: N,
    notifier: U,
    timer: T,
    config: PublisherConfig,
    session: RefCell<Option<Session>>,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<StateListener>>,
}

impl<H, N, U, T, C> Orchestrator<H, N, U, T, C>
where
    H: HttpClient + Clone,
    N: Navigator,
    U: Notifier,
    T: Timer,
    C: CoverCapture,
{
    pub fn new(
        http: H,
        navigator: N,
        notifier: U,
        timer: T,
        capture: C,
        config: PublisherConfig,
    ) -> Self {
        Self {
            backend: BackendClient::new(http.clone(), config.endpoints.clone()),
            media: CoverMediaResolver::new(http),
            capture,
            navigator,
            notifier,
            timer,
            config,
            session: RefCell::new(None),
            next_id: Cell::new(1),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn subscribe_state(&self, listener: StateListener) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session.borrow().as_ref().map(Session::snapshot)
    }

    pub fn state(&self) -> Option<WorkflowState> {
        self.session.borrow().as_ref().map(|s| s.state().clone())
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.session.borrow().as_ref().map(Session::id)
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Start a new session for a project, replacing any open one.
    ///
    /// Returns `None` (and shows a notice) when the reference has no
    /// project folder.
    pub fn open(&self, reference: ProjectReference) -> Option<SessionId> {
        let id = self.begin_session();
        let effects = self.apply(id, Action::Open(reference))?;
        for effect in effects {
            match effect {
                Effect::Notify(notice) => self.notifier.notify(notice),
                other => warn!("unexpected effect while opening: {other:?}"),
            }
        }

        if self.state() == Some(WorkflowState::Start) {
            self.session.borrow_mut().take();
            self.notify_listeners();
            return None;
        }
        Some(id)
    }

    /// Re-enter the GitHub flow if the page was reached through the
    /// authorization redirect. Returns whether a session was resumed.
    pub async fn resume_from_navigation(&self) -> bool {
        let Some(context) = ResumptionContext::take(&self.navigator, &self.config.resumption)
        else {
            return false;
        };

        self.timer.sleep(self.config.resume_delay_ms).await;
        if let Some(open) = self.current_session() {
            info!(
                "session {open} opened during the resume delay; not resuming {}",
                context.project_path
            );
            return false;
        }
        let id = self.begin_session();
        self.drive(id, Action::Resume(context.project_path)).await;
        true
    }

    /// Apply an action to the open session and run what it triggers.
    pub async fn dispatch(&self, action: Action) {
        let Some(id) = self.current_session() else {
            debug!("no open session; dropping {action:?}");
            return;
        };
        self.drive(id, action).await;
    }

    /// Close the open session; pending results for it are discarded.
    pub fn cancel(&self) {
        if let Some(id) = self.current_session() {
            let _ = self.apply(id, Action::Cancel);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_session(&self) -> SessionId {
        let id = SessionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let session = Session::new(id, self.config.default_private);
        if let Some(previous) = self.session.replace(Some(session)) {
            debug!("session {} replaced by {id}", previous.id());
        }
        id
    }

    async fn drive(&self, id: SessionId, action: Action) {
        let mut pending = VecDeque::from([action]);
        while let Some(action) = pending.pop_front() {
            let Some(effects) = self.apply(id, action) else {
                return;
            };
            for effect in effects {
                if let Some(next) = self.run_effect(effect).await {
                    pending.push_back(next);
                }
            }
        }
    }

    /// One transition of session `id`; `None` if that session is gone.
    fn apply(&self, id: SessionId, action: Action) -> Option<Vec<Effect>> {
        let effects = {
            let mut slot = self.session.borrow_mut();
            match slot.take() {
                Some(session) if session.id() == id => {
                    let transition = session.apply(action);
                    *slot = transition.session;
                    transition.effects
                }
                other => {
                    *slot = other;
                    debug!("discarding {action:?} for stale session {id}");
                    return None;
                }
            }
        };
        self.notify_listeners();
        Some(effects)
    }

    fn notify_listeners(&self) {
        let snapshot = self.snapshot();
        for listener in self.listeners.borrow().iter() {
            listener(snapshot.as_ref());
        }
    }

    async fn run_effect(&self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::Notify(notice) => {
                self.notifier.notify(notice);
                None
            }
            Effect::OpenUrl(url) => {
                self.navigator.open_in_new_tab(&url);
                None
            }
            Effect::CheckCredential => Some(Action::CredentialChecked(
                github::check_credential(&self.backend).await,
            )),
            Effect::LoadRepositories => Some(Action::RepositoriesLoaded(
                github::load_repositories(&self.backend).await,
            )),
            Effect::BeginAuthorization { project_folder } => {
                self.begin_authorization(&project_folder);
                None
            }
            Effect::PublishGitHub(request) => Some(Action::Published(
                github::publish(&self.backend, &request).await,
            )),
            Effect::PublishCommunity { folder, draft } => {
                let options = CommunityOptions {
                    link_prefix: self.config.endpoints.project_link_prefix.clone(),
                    submit_to_featured: self.config.submit_to_featured_listing,
                };
                let result =
                    community::publish(&self.backend, &self.media, &folder, &draft, &options).await;
                Some(Action::Published(result.map(|()| None)))
            }
            Effect::CaptureScreenshot { preview_path } => Some(Action::ScreenshotCaptured(
                self.capture.capture_cover(&preview_path).await,
            )),
        }
    }

    fn begin_authorization(&self, project_folder: &str) {
        let current = self.navigator.current_url();
        match authorization_url(
            &current,
            &self.config.endpoints.authorize,
            project_folder,
            &self.config.resumption,
        ) {
            Some(url) => {
                info!("handing off to GitHub authorization for {project_folder}");
                self.navigator.assign(&url);
            }
            None => self
                .notifier
                .notify(Notice::error("Unable to start GitHub authorization.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::mock::{InstantTimer, MockCapture, MockHttp, MockNavigator, MockNotifier};
    use crate::models::CapturedImage;
    use crate::workflow::Destination;

    type TestOrchestrator =
        Orchestrator<MockHttp, MockNavigator, MockNotifier, InstantTimer, MockCapture>;

    fn idle_capture() -> MockCapture {
        MockCapture::returning(Err(crate::error::PublishError::ScreenshotTimeout))
    }

    fn orchestrator(http: &MockHttp, capture: MockCapture) -> TestOrchestrator {
        orchestrator_at("https://app.example.com/edit/projA/index.html", http, capture)
    }

    fn orchestrator_at(url: &str, http: &MockHttp, capture: MockCapture) -> TestOrchestrator {
        Orchestrator::new(
            http.clone(),
            MockNavigator::new(url),
            MockNotifier::new(),
            InstantTimer::new(),
            capture,
            PublisherConfig::default(),
        )
    }

    #[test]
    fn test_open_without_folder_leaves_no_session() {
        let orch = orchestrator(&MockHttp::new(), idle_capture());
        assert_eq!(orch.open(ProjectReference::new("index.html", false)), None);
        assert!(orch.state().is_none());
        assert_eq!(
            orch.notifier.messages(),
            vec!["Project folder not found.".to_string()]
        );
    }

    #[test]
    fn test_open_replaces_previous_session() {
        let orch = orchestrator(&MockHttp::new(), idle_capture());
        let first = orch.open(ProjectReference::new("/projA", true)).unwrap();
        let second = orch.open(ProjectReference::new("/projB", true)).unwrap();
        assert_ne!(first, second);
        assert_eq!(orch.current_session(), Some(second));
        assert_eq!(
            orch.snapshot().unwrap().project_folder.as_deref(),
            Some("projB")
        );
    }

    #[tokio::test]
    async fn test_listeners_see_every_transition() {
        let image = CapturedImage::from_bytes(b"png", "image/png");
        let orch = orchestrator(&MockHttp::new(), MockCapture::returning(Ok(image)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        orch.subscribe_state(Box::new(move |snapshot: Option<&SessionSnapshot>| {
            sink.borrow_mut()
                .push(snapshot.map(|s| s.state).unwrap_or("closed"));
        }));

        orch.open(ProjectReference::new("/projA", true));
        orch.dispatch(Action::Choose(Destination::Community)).await;
        orch.dispatch(Action::CaptureScreenshot).await;
        orch.cancel();

        assert_eq!(
            *seen.borrow(),
            vec![
                "ChooseDestination",
                "Community.Compose",
                "Community.Compose",
                "Community.Compose",
                "closed",
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_session_is_noop() {
        let http = MockHttp::new();
        let orch = orchestrator(&http, idle_capture());
        orch.dispatch(Action::Choose(Destination::GitHub)).await;
        assert!(http.requests().is_empty());
        assert!(orch.state().is_none());
    }

    #[tokio::test]
    async fn test_resume_does_not_replace_an_open_session() {
        let http = MockHttp::new();
        let orch = orchestrator_at(
            "https://app.example.com/edit?github_publish=true&project_path=projB",
            &http,
            idle_capture(),
        );
        let opened = orch.open(ProjectReference::new("/projA", true)).unwrap();

        assert!(!orch.resume_from_navigation().await);

        assert_eq!(orch.current_session(), Some(opened));
        assert_eq!(orch.state(), Some(WorkflowState::ChooseDestination));
        assert!(http.requests().is_empty());
    }
}
