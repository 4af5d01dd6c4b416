use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a capture run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory receiving the per-page artifacts and the merged document
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Subdirectory of `output_dir` holding the numbered per-page files
    #[serde(default = "default_page_dir_name")]
    pub page_dir_name: String,

    /// Which responses count as per-page documents
    #[serde(default)]
    pub filter: FilterConfig,

    /// Timings and bounds of the page-turning loop
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// WebDriver connection settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,
}

/// Configuration for recognising per-page document responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Path segment identifying the artifact-serving endpoint
    #[serde(default = "default_resource_marker")]
    pub resource_marker: String,

    /// Filename suffix identifying a page-level document
    #[serde(default = "default_document_suffix")]
    pub document_suffix: String,

    /// Regex patterns rejecting URLs that would otherwise qualify
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Regex with one capture group extracting the page number from the canonical URL.
    /// When set and every capture yields a number, pages are merged in that order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index_pattern: Option<String>,
}

/// Configuration for the navigation controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// XPath of the next-page control
    #[serde(default = "default_next_button_xpath")]
    pub next_button_xpath: String,

    /// Class marking the control as disabled
    #[serde(default = "default_disabled_class")]
    pub disabled_class: String,

    /// Safety ceiling on navigation steps
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Wait before the first classification, so page 1 can be captured
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,

    /// Wait after clicking the control
    #[serde(default = "default_click_wait_ms")]
    pub click_wait_ms: u64,

    /// Wait when the control is disabled (interstitial page)
    #[serde(default = "default_interstitial_wait_ms")]
    pub interstitial_wait_ms: u64,

    /// Wait after the loop for straggling responses
    #[serde(default = "default_final_wait_ms")]
    pub final_wait_ms: u64,

    /// A settle wait ends once no capture arrived for this long (0 = fixed waits)
    #[serde(default = "default_quiet_ms")]
    pub quiet_ms: u64,

    /// How far a settle wait may be extended past its minimum
    #[serde(default = "default_max_extension_ms")]
    pub max_extension_ms: u64,
}

/// Configuration for the WebDriver-backed viewer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// How often the viewer page is polled for new network responses
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single body retrieval
    #[serde(default = "default_body_timeout_ms")]
    pub body_timeout_ms: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_page_dir_name() -> String {
    "page_pdfs".to_string()
}

fn default_resource_marker() -> String {
    "/OPS/".to_string()
}

fn default_document_suffix() -> String {
    "_pdf.pdf".to_string()
}

fn default_next_button_xpath() -> String {
    "//*[@id='next-page-button']".to_string()
}

fn default_disabled_class() -> String {
    "is-disabled".to_string()
}

fn default_max_steps() -> usize {
    300
}

fn default_initial_wait_ms() -> u64 {
    8000
}

fn default_click_wait_ms() -> u64 {
    500
}

fn default_interstitial_wait_ms() -> u64 {
    1000
}

fn default_final_wait_ms() -> u64 {
    3000
}

fn default_quiet_ms() -> u64 {
    750
}

fn default_max_extension_ms() -> u64 {
    5000
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_body_timeout_ms() -> u64 {
    30_000
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            page_dir_name: default_page_dir_name(),
            filter: FilterConfig::default(),
            navigation: NavigationConfig::default(),
            webdriver: WebDriverConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            resource_marker: default_resource_marker(),
            document_suffix: default_document_suffix(),
            exclude_patterns: Vec::new(),
            page_index_pattern: None,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            next_button_xpath: default_next_button_xpath(),
            disabled_class: default_disabled_class(),
            max_steps: default_max_steps(),
            initial_wait_ms: default_initial_wait_ms(),
            click_wait_ms: default_click_wait_ms(),
            interstitial_wait_ms: default_interstitial_wait_ms(),
            final_wait_ms: default_final_wait_ms(),
            quiet_ms: default_quiet_ms(),
            max_extension_ms: default_max_extension_ms(),
        }
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            poll_interval_ms: default_poll_interval_ms(),
            body_timeout_ms: default_body_timeout_ms(),
        }
    }
}

impl CaptureConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver.url = webdriver_url;
            }
        }
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the navigation step ceiling
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.navigation.max_steps = max_steps;
        self
    }

    /// Set the XPath of the next-page control
    pub fn with_next_button_xpath(mut self, xpath: &str) -> Self {
        self.navigation.next_button_xpath = xpath.to_string();
        self
    }

    /// Directory holding the numbered per-page files
    pub fn page_dir(&self) -> PathBuf {
        self.output_dir.join(&self.page_dir_name)
    }
}

impl NavigationConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn click_wait(&self) -> Duration {
        Duration::from_millis(self.click_wait_ms)
    }

    pub fn interstitial_wait(&self) -> Duration {
        Duration::from_millis(self.interstitial_wait_ms)
    }

    pub fn final_wait(&self) -> Duration {
        Duration::from_millis(self.final_wait_ms)
    }

    pub fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }

    pub fn max_extension(&self) -> Duration {
        Duration::from_millis(self.max_extension_ms)
    }
}
