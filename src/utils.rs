use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// File name for the page captured with the given sequence number.
///
/// Zero-padded so a lexical listing of the directory matches capture order.
pub fn page_file_name(sequence: u32) -> String {
    format!("page_{sequence:03}.pdf")
}

/// Default location of the merged issue: `<output_dir>/<YYYYMMDD>.pdf`
pub fn dated_output_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{}.pdf", date.format("%Y%m%d")))
}
