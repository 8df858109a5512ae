//! html2canvas, injected from a CDN on first use.

use js_sys::{Function, Promise, Reflect};
use log::{debug, warn};
use publisher_core::models::CapturedImage;
use publisher_core::{PublishError, RasterOptions, Rasterizer, RasterizerLoader};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlCanvasElement, HtmlScriptElement, Window};

use crate::utils::dom;

/// Global the library registers itself under.
const GLOBAL_NAME: &str = "html2canvas";

pub struct Html2CanvasLoader {
    script_url: String,
}

impl Html2CanvasLoader {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
        }
    }

    async fn inject(&self, document: &Document) -> Result<(), PublishError> {
        let head = document
            .head()
            .ok_or(PublishError::ScreenshotLibraryUnavailable)?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(|_| PublishError::ScreenshotLibraryUnavailable)?
            .dyn_into()
            .map_err(|_| PublishError::ScreenshotLibraryUnavailable)?;

        let loaded = Promise::new(&mut |resolve, reject| {
            script.set_onload(Some(&resolve));
            script.set_onerror(Some(&reject));
        });
        script.set_src(&self.script_url);
        script.set_async(true);
        head.append_child(&script)
            .map_err(|_| PublishError::ScreenshotLibraryUnavailable)?;

        if JsFuture::from(loaded).await.is_err() {
            warn!("failed to load {}", self.script_url);
            script.remove();
            return Err(PublishError::ScreenshotLibraryUnavailable);
        }
        Ok(())
    }
}

impl RasterizerLoader for Html2CanvasLoader {
    type Document = Document;
    type Rasterizer = Html2Canvas;

    async fn load(&self) -> Result<Html2Canvas, PublishError> {
        let window = dom::window().ok_or(PublishError::ScreenshotLibraryUnavailable)?;
        if let Some(function) = lookup(&window) {
            debug!("{GLOBAL_NAME} already present");
            return Ok(Html2Canvas { function });
        }

        let document = window
            .document()
            .ok_or(PublishError::ScreenshotLibraryUnavailable)?;
        self.inject(&document).await?;

        lookup(&window)
            .map(|function| Html2Canvas { function })
            .ok_or(PublishError::ScreenshotLibraryUnavailable)
    }
}

fn lookup(window: &Window) -> Option<Function> {
    Reflect::get(window, &JsValue::from_str(GLOBAL_NAME))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

pub struct Html2Canvas {
    function: Function,
}

impl Rasterizer for Html2Canvas {
    type Document = Document;

    async fn rasterize(
        &self,
        document: &Document,
        options: &RasterOptions,
    ) -> Result<CapturedImage, PublishError> {
        let fail = |e: JsValue| PublishError::Rasterize(dom::error_message(&e));

        let target = document
            .body()
            .ok_or_else(|| PublishError::Rasterize("Preview has no body".to_string()))?;
        let options = options
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| PublishError::Rasterize(e.to_string()))?;

        let promise: Promise = self
            .function
            .call2(&JsValue::NULL, &target, &options)
            .map_err(fail)?
            .dyn_into()
            .map_err(fail)?;
        let canvas: HtmlCanvasElement = JsFuture::from(promise)
            .await
            .map_err(fail)?
            .dyn_into()
            .map_err(fail)?;

        let data_url = canvas.to_data_url_with_type("image/png").map_err(fail)?;
        Ok(CapturedImage::from_data_url(data_url))
    }
}
