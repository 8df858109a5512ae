//! Off-screen iframe rendering surface.

use std::cell::Cell;

use js_sys::Promise;
use publisher_core::config::Viewport;
use publisher_core::{PublishError, RenderSurface, SurfaceFactory};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlIFrameElement};

use crate::utils::dom;

/// Creates a hidden iframe per capture.
#[derive(Clone, Copy, Debug, Default)]
pub struct IframeFactory;

impl SurfaceFactory for IframeFactory {
    type Surface = IframeSurface;

    fn create(&self, viewport: Viewport) -> Result<IframeSurface, PublishError> {
        let unavailable = || PublishError::PreviewLoad("Document not available".to_string());
        let document = dom::document().ok_or_else(unavailable)?;
        let body = document.body().ok_or_else(unavailable)?;

        let iframe: HtmlIFrameElement = document
            .create_element("iframe")
            .map_err(|e| PublishError::PreviewLoad(dom::error_message(&e)))?
            .dyn_into()
            .map_err(|_| unavailable())?;

        let width = format!("{}px", viewport.width);
        let height = format!("{}px", viewport.height);
        dom::set_styles(
            &iframe,
            &[
                ("position", "fixed"),
                ("left", "-10000px"),
                ("top", "0"),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("border", "0"),
                ("visibility", "hidden"),
                ("pointer-events", "none"),
            ],
        );
        let _ = iframe.set_attribute("aria-hidden", "true");

        body.append_child(&iframe)
            .map_err(|e| PublishError::PreviewLoad(dom::error_message(&e)))?;

        Ok(IframeSurface {
            iframe,
            attached: Cell::new(true),
        })
    }
}

pub struct IframeSurface {
    iframe: HtmlIFrameElement,
    attached: Cell<bool>,
}

impl RenderSurface for IframeSurface {
    type Document = Document;

    async fn load(&self, url: &str) -> Result<(), PublishError> {
        let iframe = &self.iframe;
        let loaded = Promise::new(&mut |resolve, reject| {
            iframe.set_onload(Some(&resolve));
            iframe.set_onerror(Some(&reject));
        });
        iframe.set_src(url);

        JsFuture::from(loaded)
            .await
            .map(|_| ())
            .map_err(|_| PublishError::PreviewLoad(format!("Failed to load {url}")))
    }

    /// `None` for cross-origin previews.
    fn document(&self) -> Option<Document> {
        self.iframe.content_document()
    }

    async fn fonts_ready(&self, document: &Document) -> Result<(), PublishError> {
        let ready = document
            .fonts()
            .ready()
            .map_err(|e| PublishError::PreviewLoad(dom::error_message(&e)))?;
        JsFuture::from(ready)
            .await
            .map(|_| ())
            .map_err(|e| PublishError::PreviewLoad(dom::error_message(&e)))
    }

    fn detach(&self) {
        if self.attached.replace(false) {
            self.iframe.set_onload(None);
            self.iframe.set_onerror(None);
            self.iframe.remove();
        }
    }
}
