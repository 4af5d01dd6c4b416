use std::path::PathBuf;

/// A per-page document captured from the viewer's network traffic
#[derive(Debug, Clone)]
pub struct CapturedPage {
    /// Response URL without query or fragment; unique within a run
    pub canonical_url: String,

    /// Position in capture order, starting at 1
    pub sequence: u32,

    /// Raw bytes of the artifact
    pub payload: Vec<u8>,

    /// Where the payload was written
    pub stored_path: PathBuf,

    /// Page number extracted from the URL (if a page index pattern is configured)
    pub page_index: Option<u32>,
}

/// Why the page-turning loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The next-page control disappeared: the issue has no further pages
    LastPage { steps: usize },

    /// The step ceiling was reached before the last page; the capture is likely incomplete
    StepCeiling { steps: usize },
}

impl NavigationOutcome {
    /// Number of navigation steps taken
    pub fn steps(&self) -> usize {
        match self {
            NavigationOutcome::LastPage { steps } | NavigationOutcome::StepCeiling { steps } => {
                *steps
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, NavigationOutcome::LastPage { .. })
    }
}

/// Everything a capture run produced
#[derive(Debug, Clone)]
pub struct CaptureRun {
    pub outcome: NavigationOutcome,

    /// Captured pages in capture order
    pub pages: Vec<CapturedPage>,
}

impl CaptureRun {
    pub fn new(outcome: NavigationOutcome, pages: Vec<CapturedPage>) -> Self {
        Self { outcome, pages }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    /// Stored files in merge order.
    ///
    /// Capture order is page order unless every page carries an extracted page
    /// index, in which case pages are ordered by it (ties keep capture order).
    pub fn files(&self) -> Vec<PathBuf> {
        let mut pages: Vec<&CapturedPage> = self.pages.iter().collect();
        if !pages.is_empty() && pages.iter().all(|page| page.page_index.is_some()) {
            pages.sort_by_key(|page| page.page_index);
        }
        pages.into_iter().map(|page| page.stored_path.clone()).collect()
    }
}
