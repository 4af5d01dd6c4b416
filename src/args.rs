use clap::Parser;
use paper_capture::{CaptureConfig, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paper-capture")]
#[command(about = "Capture a newspaper issue from a web viewer and merge its pages into one PDF")]
#[command(version)]
pub struct Args {
    /// Viewer URL to open (omit to capture whatever the browser shows after --wait-for-operator)
    pub url: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the per-page files and the merged issue
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Path of the merged document (default: <output-dir>/<YYYYMMDD>.pdf)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// WebDriver server URL (overrides config and WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Safety ceiling on navigation steps
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// XPath of the next-page control
    #[arg(long)]
    pub next_button_xpath: Option<String>,

    /// Pause until Enter is pressed, so the operator can log in and open the issue
    #[arg(long)]
    pub wait_for_operator: bool,

    /// Only capture the page files, do not merge them
    #[arg(long)]
    pub no_merge: bool,
}

impl Args {
    /// Build the run configuration: file (or defaults), then environment, then flags
    pub fn load_config(&self) -> Result<CaptureConfig> {
        let mut config = match &self.config {
            Some(path) => CaptureConfig::from_file(path)?,
            None => CaptureConfig::default(),
        }
        .with_env_overrides();

        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver.url = url.clone();
        }
        if let Some(max_steps) = self.max_steps {
            config = config.with_max_steps(max_steps);
        }
        if let Some(xpath) = &self.next_button_xpath {
            config = config.with_next_button_xpath(xpath);
        }

        Ok(config)
    }
}
