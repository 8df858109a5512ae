//! Toast-style notices appended to the page body.

use gloo_timers::callback::Timeout;
use log::{error, info};
use publisher_core::{Notice, NoticeLevel, Notifier};

use crate::utils::dom;

/// Renders each notice as a `div.publisher-notice` and removes it after
/// `duration_ms`.
#[derive(Clone, Copy, Debug)]
pub struct DomNotifier {
    duration_ms: u32,
}

impl DomNotifier {
    pub fn new(duration_ms: u32) -> Self {
        Self { duration_ms }
    }
}

impl Notifier for DomNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => error!("{}", notice.message),
            _ => info!("{}", notice.message),
        }

        let Some(document) = dom::document() else {
            return;
        };
        let Some(body) = document.body() else {
            return;
        };
        let Ok(element) = document.create_element("div") else {
            return;
        };

        element.set_class_name(&format!(
            "publisher-notice publisher-notice-{}",
            notice.level.as_str()
        ));
        let _ = element.set_attribute("role", "status");
        element.set_text_content(Some(&notice.message));
        if body.append_child(&element).is_err() {
            return;
        }

        Timeout::new(self.duration_ms, move || element.remove()).forget();
    }
}
