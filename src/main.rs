use clap::Parser;
use paper_capture::sessions::WebDriverSession;
use paper_capture::utils::dated_output_path;
use paper_capture::{CaptureConfig, merge_documents, run_capture};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

mod args;
use args::Args;

/// Exit code when navigation stopped at the step ceiling
const EXIT_INCOMPLETE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Note: capturing requires a WebDriver server (e.g., ChromeDriver).");
    println!("Set WEBDRIVER_URL if not using {}", config.webdriver.url);

    let session = match WebDriverSession::connect(&config).await {
        Ok(session) => session,
        Err(e) => {
            ::log::error!("Failed to start browser session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match capture(&session, &args, &config).await {
        Ok(code) => code,
        Err(e) => {
            ::log::error!("Capture failed: {}", e);
            ExitCode::FAILURE
        }
    };

    if let Err(e) = session.close().await {
        ::log::warn!("Failed to close browser session: {}", e);
    }

    code
}

async fn capture(
    session: &WebDriverSession,
    args: &Args,
    config: &CaptureConfig,
) -> paper_capture::Result<ExitCode> {
    let output_path = args.output.clone().unwrap_or_else(|| {
        dated_output_path(&config.output_dir, chrono::Local::now().date_naive())
    });
    ::log::info!("Final merged PDF will be: {}", output_path.display());

    if let Some(url) = &args.url {
        session.goto(url).await?;
    }

    if args.wait_for_operator {
        println!("Log in and open the issue in the viewer, then press Enter to start capturing.");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        session.focus_latest_window().await?;
    }

    let start_time = std::time::Instant::now();
    let run = run_capture(session, config).await?;
    ::log::info!(
        "Captured {} pages in {} steps ({:.2} seconds)",
        run.pages.len(),
        run.outcome.steps(),
        start_time.elapsed().as_secs_f64()
    );

    if args.no_merge {
        ::log::info!("Skipping merge; page files are in {}", config.page_dir().display());
    } else {
        let report = merge_documents(&run.files(), &output_path)?;
        println!(
            "Saved {} pages from {} page documents to {}",
            report.pages,
            report.documents,
            report.output_path.display()
        );
    }

    if run.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        ::log::warn!("Navigation hit the step ceiling; the issue is probably incomplete");
        Ok(ExitCode::from(EXIT_INCOMPLETE))
    }
}
