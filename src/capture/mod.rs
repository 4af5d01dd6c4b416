//! Capture listener: turns the viewer's network responses into numbered page files.
//!
//! Responses are sent into a single consumer task that owns the [`RunAccumulator`],
//! so the seen-set and the page list are never mutated concurrently no matter how
//! many producers feed the channel.

pub mod accumulator;

pub use accumulator::RunAccumulator;

use crate::error::{Error, Result};
use crate::filter::ResponseFilter;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A network response observed on the viewer session
pub trait ObservedResponse: Send + Sync + 'static {
    /// Full URL of the response, query string included
    fn url(&self) -> &str;

    /// Retrieve the response body. May fail transiently.
    fn body(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Sending half handed to whatever produces responses
pub type ResponseSink<R> = mpsc::UnboundedSender<R>;

/// What happened to a single observed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not a per-page document
    Ignored,
    /// A page with the same canonical URL was already saved
    AlreadyCaptured,
    /// The body could not be retrieved; the URL stays eligible
    BodyUnavailable,
    /// Saved as the page with this sequence number
    Captured(u32),
}

/// Applies the filter and deduplication rules to responses, one at a time
#[derive(Debug)]
pub struct PageCollector {
    filter: ResponseFilter,
    accumulator: RunAccumulator,
}

impl PageCollector {
    pub fn new(filter: ResponseFilter, accumulator: RunAccumulator) -> Self {
        Self {
            filter,
            accumulator,
        }
    }

    /// Handle one response. Errors only escape for failures after the body was retrieved
    /// (persisting the page); body retrieval failures are reported as a disposition.
    pub async fn observe<R: ObservedResponse>(&mut self, response: &R) -> Result<Disposition> {
        let url = response.url();

        let Some(canonical) = self.filter.qualify(url) else {
            return Ok(Disposition::Ignored);
        };

        if self.accumulator.is_captured(&canonical) {
            ::log::trace!("Already captured, ignoring: {}", url);
            return Ok(Disposition::AlreadyCaptured);
        }

        let payload = match response.body().await {
            Ok(payload) => payload,
            Err(e) => {
                ::log::warn!("Error retrieving page document {}: {}", url, e);
                return Ok(Disposition::BodyUnavailable);
            }
        };

        let page_index = self.filter.page_index(&canonical);
        let page = self.accumulator.record(canonical, payload, page_index)?;
        ::log::info!(
            "New page document saved as page {} ({} bytes): {}",
            page.sequence,
            page.payload.len(),
            url
        );

        Ok(Disposition::Captured(page.sequence))
    }

    /// Number of pages captured so far
    pub fn captured(&self) -> usize {
        self.accumulator.len()
    }

    pub fn into_accumulator(self) -> RunAccumulator {
        self.accumulator
    }
}

/// Handle to a running capture listener task
pub struct CaptureListener<R: ObservedResponse> {
    sink: ResponseSink<R>,
    progress: watch::Receiver<usize>,
    task: JoinHandle<RunAccumulator>,
}

impl<R: ObservedResponse> CaptureListener<R> {
    /// Spawn the listener. Pages are written into `page_dir`.
    pub fn spawn(filter: ResponseFilter, page_dir: impl Into<PathBuf>) -> Result<Self> {
        let accumulator = RunAccumulator::new(page_dir)?;
        let mut collector = PageCollector::new(filter, accumulator);

        let (sink, mut rx) = mpsc::unbounded_channel::<R>();
        let (progress_tx, progress) = watch::channel(0usize);

        let task = tokio::spawn(async move {
            ::log::debug!("Capture listener started");

            while let Some(response) = rx.recv().await {
                if let Err(e) = collector.observe(&response).await {
                    ::log::error!(
                        "Unexpected error handling response {}: {}",
                        response.url(),
                        e
                    );
                }

                let captured = collector.captured();
                progress_tx.send_if_modified(|count| {
                    if *count != captured {
                        *count = captured;
                        true
                    } else {
                        false
                    }
                });
            }

            ::log::debug!(
                "Capture listener drained, {} pages captured",
                collector.captured()
            );
            collector.into_accumulator()
        });

        Ok(Self {
            sink,
            progress,
            task,
        })
    }

    /// A sender for feeding responses into the listener
    pub fn sink(&self) -> ResponseSink<R> {
        self.sink.clone()
    }

    /// Observer of the number of pages captured so far
    pub fn progress(&self) -> watch::Receiver<usize> {
        self.progress.clone()
    }

    /// Stop accepting responses, drain the queue and return the run state.
    ///
    /// Every other sink clone must be dropped first or this waits for them.
    pub async fn finish(self) -> Result<RunAccumulator> {
        drop(self.sink);
        self.task.await.map_err(Error::from)
    }
}
