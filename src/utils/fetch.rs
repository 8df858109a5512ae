//! Fetch API implementation of the core HTTP seam.

use js_sys::Uint8Array;
use publisher_core::backend::{HttpClient, HttpResponse};
use publisher_core::error::FetchError;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::utils::dom;

/// Issues requests through `window.fetch`. Non-2xx answers are returned as
/// responses, not errors; only transport failures fail.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebHttpClient;

impl HttpClient for WebHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        fetch_url("GET", url, None).await
    }

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, FetchError> {
        fetch_url("POST", url, Some(body)).await
    }
}

async fn fetch_url(
    method: &str,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse, FetchError> {
    let window = dom::window().ok_or(FetchError::NoWindow)?;

    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    if let Some(body) = body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|_| FetchError::RequestCreationFailed)?;
    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| FetchError::RequestCreationFailed)?;
    }

    let result = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| FetchError::NetworkError(dom::error_message(&e)))?;
    let resp: Response = result.dyn_into().map_err(|_| FetchError::InvalidContent)?;

    let content_type = resp.headers().get("content-type").ok().flatten();
    let buffer = JsFuture::from(resp.array_buffer().map_err(|_| FetchError::ResponseReadFailed)?)
        .await
        .map_err(|_| FetchError::ResponseReadFailed)?;

    Ok(HttpResponse {
        status: resp.status(),
        status_text: resp.status_text(),
        content_type,
        body: Uint8Array::new(&buffer).to_vec(),
    })
}
