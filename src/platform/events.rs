use log::warn;
use publisher_core::events::EventHandler;
use publisher_core::{EventSource, OpenEvent};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{CustomEvent, Event};

use crate::utils::dom;

/// Listens for `CustomEvent`s dispatched on `window`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowEventSource;

pub struct WindowListener {
    event: String,
    callback: Closure<dyn Fn(Event)>,
}

impl EventSource for WindowEventSource {
    type Handle = Option<WindowListener>;

    fn subscribe(&self, event: &str, handler: EventHandler) -> Option<WindowListener> {
        let window = dom::window()?;
        let callback = Closure::<dyn Fn(Event)>::new(move |event: Event| {
            let Some(custom) = event.dyn_ref::<CustomEvent>() else {
                return;
            };
            let detail = custom.detail();
            if detail.is_null() || detail.is_undefined() {
                handler(OpenEvent::default());
                return;
            }
            match serde_wasm_bindgen::from_value::<OpenEvent>(detail) {
                Ok(open) => handler(open),
                Err(e) => warn!("malformed {} detail: {e}", event.type_()),
            }
        });

        window
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .ok()?;
        Some(WindowListener {
            event: event.to_string(),
            callback,
        })
    }

    fn unsubscribe(&self, handle: Option<WindowListener>) {
        let (Some(listener), Some(window)) = (handle, dom::window()) else {
            return;
        };
        let _ = window.remove_event_listener_with_callback(
            &listener.event,
            listener.callback.as_ref().unchecked_ref(),
        );
    }
}
