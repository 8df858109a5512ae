//! The `publisher:open` trigger.
//!
//! The editor announces "publish this project" with a DOM event whose
//! detail carries the selected path. [`Registration`] subscribes an
//! [`OpenHandler`] to that event and unsubscribes it again on teardown.

use std::rc::Rc;

use log::debug;
use serde::Deserialize;

use crate::backend::HttpClient;
use crate::capture::{CoverCapture, Timer};
use crate::models::ProjectReference;
use crate::notice::Notifier;
use crate::resume::Navigator;
use crate::workflow::Orchestrator;

/// Name of the trigger event.
pub const PUBLISHER_OPEN_EVENT: &str = "publisher:open";

/// Detail payload of the trigger event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenEvent {
    pub path: Option<String>,
    pub is_directory: bool,
}

impl OpenEvent {
    pub fn new(path: impl Into<String>, is_directory: bool) -> Self {
        Self {
            path: Some(path.into()),
            is_directory,
        }
    }

    /// `None` when the event names no path.
    pub fn project_reference(&self) -> Option<ProjectReference> {
        self.path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| ProjectReference::new(p, self.is_directory))
    }
}

pub type EventHandler = Box<dyn Fn(OpenEvent)>;

/// Something that delivers named events.
pub trait EventSource {
    type Handle;

    fn subscribe(&self, event: &str, handler: EventHandler) -> Self::Handle;

    fn unsubscribe(&self, handle: Self::Handle);
}

/// Receiver of trigger events.
pub trait OpenHandler {
    fn handle_open(&self, event: OpenEvent);
}

impl<H, N, U, T, C> OpenHandler for Orchestrator<H, N, U, T, C>
where
    H: HttpClient + Clone,
    N: Navigator,
    U: Notifier,
    T: Timer,
    C: CoverCapture,
{
    fn handle_open(&self, event: OpenEvent) {
        match event.project_reference() {
            Some(reference) => {
                self.open(reference);
            }
            None => debug!("ignoring {PUBLISHER_OPEN_EVENT} without a path"),
        }
    }
}

/// An active trigger subscription. Dropping it unsubscribes.
pub struct Registration<E: EventSource> {
    source: E,
    handle: Option<E::Handle>,
}

impl<E: EventSource> Registration<E> {
    pub fn register<O: OpenHandler + 'static>(source: E, target: Rc<O>) -> Self {
        let handle = source.subscribe(
            PUBLISHER_OPEN_EVENT,
            Box::new(move |event| target.handle_open(event)),
        );
        Self {
            source,
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Remove the subscription.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.source.unsubscribe(handle);
            debug!("{PUBLISHER_OPEN_EVENT} listener removed");
        }
    }
}

impl<E: EventSource> Drop for Registration<E> {
    fn drop(&mut self) {
        self.release();
    }
}
