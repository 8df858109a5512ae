//! Browser build of the project publisher.
//!
//! Wires the `web-sys` implementations in [`platform`] into the core
//! orchestrator and exports [`initialize`] to JavaScript.

mod handle;
mod logger;
mod platform;
mod utils;

use std::rc::Rc;

use log::info;
use publisher_core::{
    Orchestrator, PublisherConfig, Registration, ScreenshotCapture, ScreenshotPipeline,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

pub use handle::PublisherHandle;
use handle::WebOrchestrator;
use platform::{
    DomNotifier, GlooTimer, Html2CanvasLoader, IframeFactory, WebNavigator, WindowEventSource,
};
use utils::WebHttpClient;

/// Start the publisher on this page.
///
/// Parses the optional TOML configuration, installs the console logger,
/// subscribes to `publisher:open` and resumes a GitHub publish if the page
/// was reached through the authorization redirect.
#[wasm_bindgen]
pub fn initialize(config_toml: Option<String>) -> Result<PublisherHandle, JsValue> {
    console_error_panic_hook::set_once();

    let config = match config_toml.as_deref() {
        Some(source) => {
            PublisherConfig::from_toml_str(source).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => PublisherConfig::default(),
    };
    logger::init(config.log_level_filter());

    let orchestrator = Rc::new(build_orchestrator(config));
    let registration = Registration::register(WindowEventSource, orchestrator.clone());

    let resuming = orchestrator.clone();
    spawn_local(async move {
        resuming.resume_from_navigation().await;
    });

    info!("publisher initialized");
    Ok(PublisherHandle::new(orchestrator, registration))
}

fn build_orchestrator(config: PublisherConfig) -> WebOrchestrator {
    let capture = ScreenshotPipeline::new(
        WebHttpClient,
        config.endpoints.clone(),
        ScreenshotCapture::new(
            IframeFactory,
            Html2CanvasLoader::new(config.capture.rasterizer_script_url.clone()),
            GlooTimer,
            config.capture.clone(),
        ),
    );

    Orchestrator::new(
        WebHttpClient,
        WebNavigator,
        DomNotifier::new(config.notice_duration_ms),
        GlooTimer,
        capture,
        config,
    )
}
