pub mod webdriver;

use crate::capture::{ObservedResponse, ResponseSink};
use crate::error::Result;
use std::future::Future;
use tokio::task::JoinHandle;

pub use webdriver::WebDriverSession;

/// Raw observable state of the next-page control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonSnapshot {
    /// Whether the browser reports the element as displayed
    pub visible: bool,
    /// Inline `style` attribute
    pub style: String,
    /// Whether a `disabled` attribute is present
    pub disabled: bool,
    /// Value of `aria-disabled`, if any
    pub aria_disabled: Option<String>,
    /// Value of `class`
    pub class: String,
}

/// The next-page control of a viewer session
pub trait NextControl: Send + Sync {
    /// Read the control's current state; `None` when it is not on the page
    fn snapshot(&self) -> impl Future<Output = Result<Option<ButtonSnapshot>>> + Send;

    /// Activate the control
    fn click(&self) -> impl Future<Output = Result<()>> + Send;
}

/// A live viewer session positioned on the first page of an issue
pub trait ViewerSession: NextControl {
    type Response: ObservedResponse;

    /// Start forwarding every network response of the viewer into `sink`
    fn subscribe(
        &self,
        sink: ResponseSink<Self::Response>,
    ) -> impl Future<Output = Result<Subscription>> + Send;
}

/// Keeps a response feed alive; stopping it releases the feed's sink
pub struct Subscription {
    task: Option<JoinHandle<()>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Subscription backed by a polling task
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self {
            task: Some(task),
            release: None,
        }
    }

    /// Subscription for sessions that push responses themselves; `release` must drop
    /// the session's sink
    pub fn on_stop(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            task: None,
            release: Some(Box::new(release)),
        }
    }

    /// Stop the feed and wait for it to release its resources
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    ::log::warn!("Response feed ended abnormally: {}", e);
                }
            }
        }
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
