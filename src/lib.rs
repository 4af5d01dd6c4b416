//! Capture a paginated newspaper issue from a web viewer.
//!
//! The viewer streams one PDF per page while the reader turns pages. A capture run
//! attaches a [`capture::CaptureListener`] to the viewer's network responses, turns
//! pages until the next-page control disappears, and returns the saved page files in
//! order. [`merge_documents`] then joins them into a single document.
//!
//! ```no_run
//! use paper_capture::sessions::WebDriverSession;
//! use paper_capture::{CaptureConfig, merge_documents, run_capture};
//!
//! # async fn demo() -> paper_capture::Result<()> {
//! let config = CaptureConfig::default().with_env_overrides();
//! let session = WebDriverSession::connect(&config).await?;
//! // ... log in and open the viewer ...
//! let run = run_capture(&session, &config).await?;
//! merge_documents(&run.files(), &config.output_dir.join("issue.pdf"))?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod merge;
pub mod navigation;
pub mod results;
pub mod sessions;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use config::CaptureConfig;
pub use error::{Error, Result};
pub use merge::{MergeReport, merge_documents};
pub use results::{CaptureRun, CapturedPage, NavigationOutcome};

use capture::CaptureListener;
use filter::ResponseFilter;
use navigation::Settle;
use sessions::ViewerSession;

/// Capture every page of the issue currently open in `session`.
///
/// The listener is attached before the first navigation decision so page 1 is not
/// missed. Reaching the step ceiling is not an error; check
/// [`CaptureRun::is_complete`].
pub async fn run_capture<S: ViewerSession>(session: &S, config: &CaptureConfig) -> Result<CaptureRun> {
    let filter = ResponseFilter::new(config.filter.clone())?;
    let listener = CaptureListener::<S::Response>::spawn(filter, config.page_dir())?;
    ::log::info!(
        "Capturing page documents into {}",
        config.page_dir().display()
    );

    let subscription = match session.subscribe(listener.sink()).await {
        Ok(subscription) => subscription,
        Err(e) => {
            listener.finish().await?;
            return Err(e);
        }
    };

    let mut settle = Settle::new(listener.progress(), &config.navigation);
    let outcome = navigation::navigate_all_pages(session, &config.navigation, &mut settle).await;

    subscription.stop().await;
    let accumulator = listener.finish().await?;

    let run = CaptureRun::new(outcome, accumulator.into_pages());
    if run.is_complete() {
        ::log::info!("Capture complete: {} pages", run.pages.len());
    } else {
        ::log::warn!(
            "Capture stopped at the step ceiling with {} pages; the issue may be incomplete",
            run.pages.len()
        );
    }

    Ok(run)
}

/// Capture the issue and merge it into `output_path`
pub async fn capture_issue<S: ViewerSession>(
    session: &S,
    config: &CaptureConfig,
    output_path: &std::path::Path,
) -> Result<(CaptureRun, MergeReport)> {
    let run = run_capture(session, config).await?;
    let report = merge_documents(&run.files(), output_path)?;
    Ok((run, report))
}
