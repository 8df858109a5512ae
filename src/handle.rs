//! JavaScript-facing handle to a running publisher.
//!
//! Host UI code renders the dialogs from state snapshots and reports user
//! input through these methods. Every method returns immediately; the
//! resulting work runs on the page's task queue.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Uint8Array};
use log::warn;
use publisher_core::flows::RepoTarget;
use publisher_core::models::{CoverFile, CoverImage, ProjectReference};
use publisher_core::workflow::SessionSnapshot;
use publisher_core::{Action, Destination, Orchestrator, Registration, ScreenshotPipeline};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::File;

use crate::platform::{
    DomNotifier, GlooTimer, Html2CanvasLoader, IframeFactory, WebNavigator, WindowEventSource,
};
use crate::utils::{WebHttpClient, dom};

pub(crate) type WebCapture =
    ScreenshotPipeline<WebHttpClient, IframeFactory, Html2CanvasLoader, GlooTimer>;
pub(crate) type WebOrchestrator =
    Orchestrator<WebHttpClient, WebNavigator, DomNotifier, GlooTimer, WebCapture>;

#[wasm_bindgen]
pub struct PublisherHandle {
    orchestrator: Rc<WebOrchestrator>,
    registration: RefCell<Option<Registration<WindowEventSource>>>,
}

impl PublisherHandle {
    pub(crate) fn new(
        orchestrator: Rc<WebOrchestrator>,
        registration: Registration<WindowEventSource>,
    ) -> Self {
        Self {
            orchestrator,
            registration: RefCell::new(Some(registration)),
        }
    }

    fn dispatch(&self, action: Action) {
        let orchestrator = self.orchestrator.clone();
        spawn_local(async move {
            orchestrator.dispatch(action).await;
        });
    }
}

#[wasm_bindgen]
impl PublisherHandle {
    /// Open the publisher for a path, as the trigger event would.
    pub fn open(&self, path: String, is_directory: bool) -> bool {
        self.orchestrator
            .open(ProjectReference::new(path, is_directory))
            .is_some()
    }

    #[wasm_bindgen(js_name = chooseGitHub)]
    pub fn choose_github(&self) {
        self.dispatch(Action::Choose(Destination::GitHub));
    }

    #[wasm_bindgen(js_name = chooseCommunity)]
    pub fn choose_community(&self) {
        self.dispatch(Action::Choose(Destination::Community));
    }

    #[wasm_bindgen(js_name = confirmConnect)]
    pub fn confirm_connect(&self) {
        self.dispatch(Action::ConfirmConnect);
    }

    /// `"new"` or `"existing"`.
    #[wasm_bindgen(js_name = selectTarget)]
    pub fn select_target(&self, target: &str) {
        let target = match target {
            "new" => RepoTarget::New,
            _ => RepoTarget::Existing,
        };
        self.dispatch(Action::SelectTarget(target));
    }

    #[wasm_bindgen(js_name = selectRepository)]
    pub fn select_repository(&self, name: Option<String>) {
        self.dispatch(Action::SelectRepository(name));
    }

    #[wasm_bindgen(js_name = editTitle)]
    pub fn edit_title(&self, title: String) {
        self.dispatch(Action::EditTitle(title));
    }

    #[wasm_bindgen(js_name = editDescription)]
    pub fn edit_description(&self, description: String) {
        self.dispatch(Action::EditDescription(description));
    }

    #[wasm_bindgen(js_name = setCoverUrl)]
    pub fn set_cover_url(&self, url: String) {
        self.dispatch(Action::SetCover(CoverImage::RemoteUrl(url)));
    }

    /// Base64 image data without the `data:` prefix.
    #[wasm_bindgen(js_name = setCoverBase64)]
    pub fn set_cover_base64(&self, base64: String, content_type: Option<String>) {
        self.dispatch(Action::SetCover(CoverImage::InlineEncoded {
            base64,
            content_type,
        }));
    }

    /// Read a user-selected file and use it as the cover.
    #[wasm_bindgen(js_name = setCoverFile)]
    pub fn set_cover_file(&self, file: File) {
        let orchestrator = self.orchestrator.clone();
        spawn_local(async move {
            let buffer = match JsFuture::from(file.array_buffer()).await {
                Ok(buffer) => buffer,
                Err(e) => {
                    warn!("cannot read {}: {}", file.name(), dom::error_message(&e));
                    return;
                }
            };
            let cover = CoverFile {
                name: file.name(),
                content_type: Some(file.type_()).filter(|t| !t.is_empty()),
                bytes: Uint8Array::new(&buffer).to_vec(),
            };
            orchestrator
                .dispatch(Action::SetCover(CoverImage::File(cover)))
                .await;
        });
    }

    #[wasm_bindgen(js_name = clearCover)]
    pub fn clear_cover(&self) {
        self.dispatch(Action::ClearCover);
    }

    #[wasm_bindgen(js_name = captureScreenshot)]
    pub fn capture_screenshot(&self) {
        self.dispatch(Action::CaptureScreenshot);
    }

    pub fn submit(&self) {
        self.dispatch(Action::Submit);
    }

    pub fn retry(&self) {
        self.dispatch(Action::Retry);
    }

    pub fn cancel(&self) {
        self.orchestrator.cancel();
    }

    /// Current session as a plain object, or `null` when closed.
    pub fn snapshot(&self) -> JsValue {
        to_js(self.orchestrator.snapshot().as_ref())
    }

    /// Call `callback(snapshot | null)` after every transition.
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn on_state_change(&self, callback: Function) {
        self.orchestrator
            .subscribe_state(Box::new(move |snapshot: Option<&SessionSnapshot>| {
                if let Err(e) = callback.call1(&JsValue::NULL, &to_js(snapshot)) {
                    warn!("state listener threw: {}", dom::error_message(&e));
                }
            }));
    }

    /// Stop listening for trigger events and close any open session.
    pub fn teardown(&self) {
        if let Some(registration) = self.registration.borrow_mut().take() {
            registration.teardown();
        }
        self.orchestrator.cancel();
    }
}

fn to_js(snapshot: Option<&SessionSnapshot>) -> JsValue {
    let Some(snapshot) = snapshot else {
        return JsValue::NULL;
    };
    snapshot
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}
