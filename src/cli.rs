//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Paths and the WebDriver URL can also be provided via environment variables.

use crate::browser::chrome::ChromeProfile;
use crate::models::Target;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which kind of session the extractors run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Headless Chrome through chromedriver.
    Chrome,
    /// Plain HTTP requests; no JavaScript.
    Http,
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Daily run with links.json and output files in the current directory
/// daily_scrape
///
/// # Write values elsewhere and use an already running chromedriver
/// daily_scrape -o /var/lib/values --webdriver-url http://localhost:9515
///
/// # Scrape only Zillow, ignoring the daily gate
/// daily_scrape --only zillow
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON file with the target URLs
    #[arg(short, long, env = "LINKS_FILE", default_value = "links.json")]
    pub links: PathBuf,

    /// File recording the date of the last run
    #[arg(short, long, env = "GATE_FILE", default_value = "last_success")]
    pub gate_file: PathBuf,

    /// Directory the per-target value files are written to
    #[arg(short, long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Session backend
    #[arg(long, value_enum, default_value_t = Backend::Chrome)]
    pub backend: Backend,

    /// Connect to a running WebDriver server instead of starting chromedriver
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// chromedriver executable (defaults depend on the operating system)
    #[arg(long)]
    pub driver_path: Option<PathBuf>,

    /// Chrome/Chromium executable (defaults depend on the operating system)
    #[arg(long)]
    pub browser_path: Option<PathBuf>,

    /// chromedriver log file
    #[arg(long)]
    pub driver_log: Option<PathBuf>,

    /// Seconds to wait for each page element
    #[arg(long, default_value_t = crate::scrapers::DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Seconds allowed for a whole page request (http backend only)
    #[arg(long, default_value_t = crate::browser::http::DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub request_timeout_secs: u64,

    /// Scrape a single target with its own session; the daily gate is ignored
    #[arg(long, value_enum)]
    pub only: Option<Target>,

    /// Run even if a run already happened today
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// The OS default Chrome profile with any path overrides applied.
    pub fn chrome_profile(&self) -> ChromeProfile {
        let mut profile = ChromeProfile::detect();
        if let Some(driver) = &self.driver_path {
            profile.driver_binary = driver.clone();
        }
        match &self.browser_path {
            Some(browser) => profile.browser_binary = Some(browser.clone()),
            // Remote drivers use their own browser install.
            None if self.webdriver_url.is_some() => profile.browser_binary = None,
            None => {}
        }
        if let Some(log) = &self.driver_log {
            profile.driver_log = Some(log.clone());
        }
        profile
    }
}
