use crate::error::Result;
use crate::results::CapturedPage;
use crate::utils::page_file_name;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Run-scoped capture state: which pages were saved, where, and in what order
#[derive(Debug)]
pub struct RunAccumulator {
    page_dir: PathBuf,
    seen: HashSet<String>,
    pages: Vec<CapturedPage>,
}

impl RunAccumulator {
    /// Create an empty accumulator writing into `page_dir` (created if missing)
    pub fn new(page_dir: impl Into<PathBuf>) -> Result<Self> {
        let page_dir = page_dir.into();
        std::fs::create_dir_all(&page_dir)?;
        Ok(Self {
            page_dir,
            seen: HashSet::new(),
            pages: Vec::new(),
        })
    }

    pub fn page_dir(&self) -> &Path {
        &self.page_dir
    }

    /// Whether a page with this canonical URL has already been saved
    pub fn is_captured(&self, canonical_url: &str) -> bool {
        self.seen.contains(canonical_url)
    }

    /// Number of pages saved so far
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Persist a payload as the next page.
    ///
    /// The URL is only marked as seen once the file is on disk; if the write fails the
    /// sequence number is not consumed and the URL stays eligible.
    pub fn record(
        &mut self,
        canonical_url: String,
        payload: Vec<u8>,
        page_index: Option<u32>,
    ) -> Result<&CapturedPage> {
        let sequence = self.pages.len() as u32 + 1;
        let stored_path = self.page_dir.join(page_file_name(sequence));
        std::fs::write(&stored_path, &payload)?;

        self.seen.insert(canonical_url.clone());
        self.pages.push(CapturedPage {
            canonical_url,
            sequence,
            payload,
            stored_path,
            page_index,
        });

        Ok(&self.pages[self.pages.len() - 1])
    }

    pub fn pages(&self) -> &[CapturedPage] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<CapturedPage> {
        self.pages
    }
}
