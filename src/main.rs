//! # Daily Scrape
//!
//! Scrapes five numeric indicators once per calendar day and writes each one
//! to its own plain-text file:
//!
//! | Target | Value | File |
//! |--------|-------|------|
//! | Redfin | home value | `redfin.txt` |
//! | Zillow | Zestimate | `zillow.txt` |
//! | Realtor.com | estimated home value | `realtor.txt` |
//! | Bitnodes | reachable Bitcoin nodes | `bitnodes.txt` |
//! | Etherscan | Ethereum nodes | `etherscan.txt` |
//!
//! ## Usage
//!
//! ```sh
//! daily_scrape --links links.json --output-dir ./values
//! ```
//!
//! ## Architecture
//!
//! 1. **Gate**: a date file makes repeat invocations on the same day a no-op
//! 2. **Links**: target URLs come from a JSON file
//! 3. **Scraping**: one headless browser session is shared by all five
//!    extractors and replaced if it breaks
//! 4. **Output**: values are normalized to bare digits and written out; a
//!    summary is printed and the exit code is 0 only if all five succeeded

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod gate;
mod links;
mod models;
mod orchestrator;
mod outputs;
mod scrapers;
mod utils;

use browser::SessionProvider;
use browser::chrome::ChromeProvider;
use browser::http::HttpProvider;
use cli::{Backend, Cli};
use gate::DateGate;
use orchestrator::{RunExit, RunSettings};

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("daily_scrape starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = RunSettings {
        links_file: args.links.clone(),
        output_dir: args.output_dir.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        force: args.force,
    };

    let exit = match args.backend {
        Backend::Chrome => {
            let provider = ChromeProvider::new(args.chrome_profile(), args.webdriver_url.clone());
            dispatch(&provider, &args, &settings).await
        }
        Backend::Http => {
            let provider = HttpProvider::new(Duration::from_secs(args.request_timeout_secs));
            dispatch(&provider, &args, &settings).await
        }
    };

    info!(code = exit.code(), "Exiting");
    ExitCode::from(exit.code())
}

async fn dispatch<P: SessionProvider>(provider: &P, args: &Cli, settings: &RunSettings) -> RunExit {
    match args.only {
        Some(target) => orchestrator::run_single(provider, target, settings).await,
        None => {
            let gate = DateGate::new(&args.gate_file);
            orchestrator::run(provider, &gate, settings).await
        }
    }
}
