use crate::config::{CaptureConfig, NavigationConfig};
use crate::results::NavigationOutcome;
use crate::sessions::ButtonSnapshot;
use crate::tests::fake_session::{FakeResponse, FakeViewer, Step};
use crate::tests::fixtures::{labelled_pdf, page_labels};
use crate::{capture_issue, merge_documents, run_capture};
use std::path::Path;
use std::sync::atomic::Ordering;

const BASE: &str = "https://viewer.example.com/issue/OPS";

fn page_url(n: u32) -> String {
    format!("{BASE}/page{n}_pdf.pdf")
}

fn page(n: u32) -> FakeResponse {
    FakeResponse::ok(&page_url(n), labelled_pdf(&[&format!("page {n}")]))
}

fn noise(path: &str) -> FakeResponse {
    FakeResponse::ok(&format!("https://viewer.example.com/{path}"), b"noise".to_vec())
}

fn config(output_dir: &Path) -> CaptureConfig {
    CaptureConfig {
        navigation: NavigationConfig {
            initial_wait_ms: 0,
            click_wait_ms: 0,
            interstitial_wait_ms: 0,
            final_wait_ms: 0,
            quiet_ms: 0,
            ..NavigationConfig::default()
        },
        ..CaptureConfig::default()
    }
    .with_output_dir(output_dir)
}

#[tokio::test]
async fn test_three_page_issue_with_interstitial() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    // Clickable, Disabled, Disabled, Clickable, Missing
    let viewer = FakeViewer::new(
        vec![page(1), noise("app.js"), noise("OPS/cover.jpg")],
        vec![
            Step::clickable(vec![noise("ads/banner.png")]),
            Step::disabled(Vec::new()),
            Step::disabled(vec![page(2)]),
            Step::clickable(vec![page(3)]),
            Step::missing(),
        ],
    );

    let run = run_capture(&viewer, &config).await.unwrap();
    assert_eq!(run.outcome, NavigationOutcome::LastPage { steps: 4 });
    assert!(run.is_complete());
    assert_eq!(viewer.clicks.load(Ordering::SeqCst), 2);

    let files = run.files();
    assert_eq!(files.len(), 3);
    let page_dir = config.page_dir();
    assert_eq!(
        files,
        vec![
            page_dir.join("page_001.pdf"),
            page_dir.join("page_002.pdf"),
            page_dir.join("page_003.pdf"),
        ]
    );
    assert_eq!(std::fs::read_dir(&page_dir).unwrap().count(), 3);

    let output = dir.path().join("issue.pdf");
    let report = merge_documents(&files, &output).unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(page_labels(&output), vec!["page 1", "page 2", "page 3"]);
}

#[tokio::test]
async fn test_duplicate_delivery_yields_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let viewer = FakeViewer::new(
        vec![page(1)],
        vec![
            Step::clickable(vec![
                FakeResponse::ok(
                    &format!("{}?nonce=123", page_url(2)),
                    labelled_pdf(&["page 2"]),
                ),
                FakeResponse::ok(
                    &format!("{}?nonce=456", page_url(2)),
                    labelled_pdf(&["page 2 again"]),
                ),
            ]),
            Step::missing(),
        ],
    );

    let run = run_capture(&viewer, &config).await.unwrap();
    let urls: Vec<&str> = run.pages.iter().map(|p| p.canonical_url.as_str()).collect();
    assert_eq!(urls, vec![page_url(1), page_url(2)]);
    assert_eq!(run.files().len(), 2);

    // The first successful delivery wins
    assert_eq!(page_labels(&run.pages[1].stored_path), vec!["page 2"]);
}

#[tokio::test]
async fn test_failed_first_delivery_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let viewer = FakeViewer::new(
        vec![
            FakeResponse::failing(&page_url(1)),
            FakeResponse::failing(&format!("{}?retry=1", page_url(1))),
        ],
        vec![
            Step::clickable(vec![
                FakeResponse::ok(&format!("{}?retry=2", page_url(1)), labelled_pdf(&["page 1"])),
                page(2),
            ]),
            Step::missing(),
        ],
    );

    let run = run_capture(&viewer, &config).await.unwrap();
    let sequences: Vec<u32> = run.pages.iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
    assert_eq!(run.pages[0].canonical_url, page_url(1));
    assert_eq!(page_labels(&run.pages[0].stored_path), vec!["page 1"]);
}

#[tokio::test]
async fn test_step_ceiling_is_reported_as_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path()).with_max_steps(7);

    let viewer = FakeViewer::endless(
        vec![page(1)],
        ButtonSnapshot {
            visible: true,
            ..ButtonSnapshot::default()
        },
    );

    let run = run_capture(&viewer, &config).await.unwrap();
    assert_eq!(run.outcome, NavigationOutcome::StepCeiling { steps: 7 });
    assert!(!run.is_complete());
    assert_eq!(viewer.clicks.load(Ordering::SeqCst), 7);
    assert_eq!(run.pages.len(), 1);
}

#[tokio::test]
async fn test_page_index_orders_out_of_order_arrivals() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.filter.page_index_pattern = Some(r"page(\d+)_pdf\.pdf$".to_string());

    // Page 3 arrives before page 2 in the same settle window
    let viewer = FakeViewer::new(
        vec![page(1)],
        vec![Step::clickable(vec![page(3), page(2)]), Step::missing()],
    );

    let run = run_capture(&viewer, &config).await.unwrap();
    assert_eq!(run.pages[1].page_index, Some(3));

    let output = dir.path().join("issue.pdf");
    merge_documents(&run.files(), &output).unwrap();
    assert_eq!(page_labels(&output), vec!["page 1", "page 2", "page 3"]);
}

#[tokio::test]
async fn test_capture_issue_with_nothing_captured_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let viewer = FakeViewer::new(vec![noise("index.html")], vec![Step::missing()]);

    let err = capture_issue(&viewer, &config, &dir.path().join("issue.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::Error::NothingToMerge));
}

#[tokio::test]
async fn test_capture_issue_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let viewer = FakeViewer::new(
        vec![page(1)],
        vec![Step::clickable(vec![page(2)]), Step::missing()],
    );

    let output = dir.path().join("merged").join("20240101.pdf");
    let (run, report) = capture_issue(&viewer, &config, &output).await.unwrap();
    assert!(run.is_complete());
    assert_eq!(report.documents, 2);
    assert_eq!(page_labels(&output), vec!["page 1", "page 2"]);
}
