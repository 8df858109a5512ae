use publisher_core::Navigator;

use crate::utils::dom;

/// `window.location` and `window.history`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebNavigator;

impl Navigator for WebNavigator {
    fn current_url(&self) -> String {
        dom::current_href()
    }

    fn replace_url(&self, url: &str) {
        dom::replace_url(url);
    }

    fn assign(&self, url: &str) {
        if let Some(window) = dom::window()
            && let Err(e) = window.location().assign(url)
        {
            log::error!("navigation to {url} failed: {}", dom::error_message(&e));
        }
    }

    fn open_in_new_tab(&self, url: &str) {
        if let Some(window) = dom::window() {
            let _ = window.open_with_url_and_target(url, "_blank");
        }
    }
}
