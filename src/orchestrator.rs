//! The daily run: gate, links, one shared session, five extractions, summary.
//!
//! # Flow
//!
//! 1. **Gate**: skip the whole run if it already happened today
//! 2. **Links**: load and validate the five target URLs; any problem aborts
//!    before a browser is started
//! 3. **Scrape**: visit every target in order with one shared session,
//!    replacing the session whenever an extractor reports it broken
//! 4. **Report**: print the summary, record today's date, derive the exit code
//!
//! A run that gets as far as scraping always records the date, even if every
//! target failed, so retries are limited to one per day.

use crate::browser::{SessionHandle, SessionProvider, close_quietly};
use crate::gate::DateGate;
use crate::links::Links;
use crate::models::{Extraction, RunReport, Target, TargetOutcome, Verdict};
use crate::outputs::{summary, values};
use crate::scrapers::PageExtractor;
use crate::utils::ensure_writable_dir;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Where results go and how long extractors wait.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub links_file: PathBuf,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    /// Run even if the gate says today is done.
    pub force: bool,
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The gate had already seen today.
    Skipped,
    /// Nothing was scraped: bad links file, unusable output directory, or no
    /// browser session could be started.
    Aborted,
    /// Every target was attempted.
    Finished(Verdict),
}

impl RunExit {
    pub fn code(self) -> u8 {
        match self {
            RunExit::Skipped => 0,
            RunExit::Aborted => 1,
            RunExit::Finished(verdict) => verdict.exit_code(),
        }
    }
}

/// Run the full daily scrape.
#[instrument(level = "info", skip_all)]
pub async fn run<P: SessionProvider>(
    provider: &P,
    gate: &DateGate,
    settings: &RunSettings,
) -> RunExit {
    let started = Instant::now();

    if settings.force {
        info!("Gate check bypassed");
    } else if !gate.proceed() {
        info!(last_run = ?gate.last_run(), "Already ran today. Skipping operation.");
        return RunExit::Skipped;
    }

    let Some(links) = prepare(settings).await else {
        return RunExit::Aborted;
    };

    let report = match scrape_all(provider, &links, settings).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Could not start the shared browser session");
            return RunExit::Aborted;
        }
    };

    println!("\n{}", summary::render(&report));

    if let Err(e) = gate.save_date() {
        error!(error = %e, "Failed to record run date");
    }

    let verdict = report.verdict();
    let elapsed = started.elapsed();
    info!(
        ?elapsed,
        succeeded = report.succeeded(),
        total = Target::ALL.len(),
        "Run complete"
    );
    RunExit::Finished(verdict)
}

/// Scrape a single target with a session of its own.
///
/// The gate is neither consulted nor updated.
#[instrument(level = "info", skip_all, fields(site = %target))]
pub async fn run_single<P: SessionProvider>(
    provider: &P,
    target: Target,
    settings: &RunSettings,
) -> RunExit {
    let Some(links) = prepare(settings).await else {
        return RunExit::Aborted;
    };

    let session = match provider.create().await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Could not start a browser session");
            return RunExit::Aborted;
        }
    };

    let extractor = PageExtractor::for_target(target, settings.timeout);
    let outcome = match extractor
        .extract(links.url(target), SessionHandle::Owned(session))
        .await
    {
        Ok(extraction) => persist(settings, target, extraction).await,
        Err(e) => {
            error!(error = %e, "{} scraper crashed", target.label());
            TargetOutcome::failed(target)
        }
    };

    match &outcome.saved {
        Some(value) => println!("\n✓ Successfully scraped {}: {value}", target.metric()),
        None => println!("\n✗ Failed to scrape {}", target.metric()),
    }

    if outcome.succeeded() {
        RunExit::Finished(Verdict::AllSucceeded)
    } else {
        RunExit::Finished(Verdict::AllFailed)
    }
}

/// Visit every target in order over one shared session.
///
/// A session fault marks that target failed, discards the session and starts
/// a fresh one for the next target. If no new session can be started, the
/// remaining targets are marked failed without any browser work.
///
/// # Errors
///
/// Only if the initial session cannot be created.
pub async fn scrape_all<P: SessionProvider>(
    provider: &P,
    links: &Links,
    settings: &RunSettings,
) -> Result<RunReport, crate::browser::BrowserError> {
    debug_assert!(links.is_loaded());

    info!("Initializing shared browser session");
    let mut session = Some(provider.create().await?);
    let mut report = RunReport::default();
    let total = Target::ALL.len();

    for (index, (target, url)) in links.get_all().enumerate() {
        info!(step = index + 1, total, site = %target, "Scraping {}", target.label());

        let Some(current) = session.as_mut() else {
            warn!(site = %target, "No browser session available; skipping");
            report.outcomes.push(TargetOutcome::failed(target));
            continue;
        };

        let extractor = PageExtractor::for_target(target, settings.timeout);
        let result = extractor.extract(url, SessionHandle::Borrowed(current)).await;
        match result {
            Ok(extraction) => {
                report.outcomes.push(persist(settings, target, extraction).await);
            }
            Err(fault) => {
                error!(site = %target, error = %fault, "{} scraper crashed", target.label());
                report.outcomes.push(TargetOutcome::failed(target));

                if let Some(broken) = session.take() {
                    close_quietly(broken).await;
                }
                if index + 1 < total {
                    info!("Recreating browser session");
                    session = match provider.create().await {
                        Ok(fresh) => Some(fresh),
                        Err(e) => {
                            error!(error = %e, "Failed to recreate browser session");
                            None
                        }
                    };
                }
            }
        }
    }

    if let Some(session) = session {
        info!("Closing shared browser session");
        close_quietly(session).await;
    }

    Ok(report)
}

/// Load links and check the output directory.
async fn prepare(settings: &RunSettings) -> Option<Links> {
    let links = match Links::load(&settings.links_file) {
        Ok(links) => links,
        Err(e) => {
            error!(error = %e, "Error loading links");
            return None;
        }
    };

    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(
            path = %settings.output_dir.display(),
            error = %e,
            "Output directory is not writable"
        );
        return None;
    }

    Some(links)
}

/// Write a found value to its file and turn the extraction into an outcome.
async fn persist(settings: &RunSettings, target: Target, extraction: Extraction) -> TargetOutcome {
    match extraction {
        Extraction::Found(value) => {
            info!(site = %target, %value, "{} value: {value}", target.label());
            match values::write_value(&settings.output_dir, target, &value).await {
                Ok(_) => TargetOutcome::saved(target, value),
                Err(e) => {
                    error!(
                        site = %target,
                        error = %e,
                        "Error writing to {}",
                        target.output_file()
                    );
                    TargetOutcome::failed(target)
                }
            }
        }
        Extraction::Missing(miss) => {
            warn!(site = %target, reason = %miss, "Failed to scrape {}", target.label());
            TargetOutcome::failed(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{FakeBrowser, Page};
    use chrono::Local;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const LINKS: &str = r#"{"redfin":"https://a","zillow":"https://b","realtor":"https://c","bitnodes":"https://d","etherscan":"https://e"}"#;

    struct Fixture {
        dir: TempDir,
        settings: RunSettings,
        gate: DateGate,
    }

    impl Fixture {
        fn new(links: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let links_file = dir.path().join("links.json");
            fs::write(&links_file, links).unwrap();
            let settings = RunSettings {
                links_file,
                output_dir: dir.path().join("out"),
                timeout: Duration::from_secs(15),
                force: false,
            };
            let gate = DateGate::new(dir.path().join("last_success"));
            Self {
                dir,
                settings,
                gate,
            }
        }

        fn output(&self, target: Target) -> Option<String> {
            fs::read_to_string(self.settings.output_dir.join(target.output_file())).ok()
        }

        fn seed(&self, target: Target, value: &str) {
            fs::create_dir_all(&self.settings.output_dir).unwrap();
            fs::write(self.settings.output_dir.join(target.output_file()), value).unwrap();
        }

        fn gate_file(&self) -> Option<String> {
            fs::read_to_string(self.dir.path().join("last_success")).ok()
        }
    }

    fn html(s: &str) -> Page {
        Page::Html(s.to_string())
    }

    fn all_found() -> Vec<(String, Page)> {
        vec![
            ("https://a".into(), html(r#"<div class="statsValue price">$1,234,000</div>"#)),
            ("https://b".into(), html(r#"<p data-testid="primary-zestimate">$1,150,500</p>"#)),
            (
                "https://c".into(),
                html(r#"<h2 data-testid="estimated-home-value-currency">$1,201,000</h2>"#),
            ),
            ("https://d".into(), html(r#"<a href=".">21874</a>"#)),
            (
                "https://e".into(),
                html(r#"<p class="text-muted">Total <strong>6,542</strong> nodes found</p>"#),
            ),
        ]
    }

    fn today() -> String {
        Local::now().date_naive().format("%Y-%m-%d").to_string()
    }

    fn assert_path_missing(path: &Path) {
        assert!(!path.exists(), "{} should not exist", path.display());
    }

    #[tokio::test]
    async fn test_all_targets_succeed() {
        let fx = Fixture::new(LINKS);
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::AllSucceeded));
        assert_eq!(exit.code(), 0);
        assert_eq!(fx.output(Target::Redfin).as_deref(), Some("1234000"));
        assert_eq!(fx.output(Target::Zillow).as_deref(), Some("1150500"));
        assert_eq!(fx.output(Target::Realtor).as_deref(), Some("1201000"));
        assert_eq!(fx.output(Target::Bitnodes).as_deref(), Some("21874"));
        assert_eq!(fx.output(Target::Etherscan).as_deref(), Some("6542"));

        let journal = browser.journal();
        assert_eq!(journal.created, 1);
        assert_eq!(journal.closed, 1);
        assert_eq!(fx.gate_file(), Some(today()));
    }

    #[tokio::test]
    async fn test_all_targets_missing() {
        let fx = Fixture::new(LINKS);
        for target in Target::ALL {
            fx.seed(target, "previous");
        }
        let pages = ["a", "b", "c", "d", "e"]
            .map(|host| (format!("https://{host}"), html("<p>maintenance</p>")));
        let browser = FakeBrowser::new(pages);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::AllFailed));
        assert_eq!(exit.code(), 1);
        for target in Target::ALL {
            assert_eq!(fx.output(target).as_deref(), Some("previous"));
        }
        assert_eq!(fx.gate_file(), Some(today()));
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_stale_value() {
        let fx = Fixture::new(LINKS);
        fx.seed(Target::Zillow, "999");
        let mut pages = all_found();
        pages[1].1 = Page::Unreachable;
        let browser = FakeBrowser::new(pages);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::SomeFailed));
        assert_eq!(exit.code(), 1);
        assert_eq!(fx.output(Target::Zillow).as_deref(), Some("999"));
        assert_eq!(fx.output(Target::Realtor).as_deref(), Some("1201000"));
    }

    #[tokio::test]
    async fn test_write_failure_marks_target_failed_and_continues() {
        let fx = Fixture::new(LINKS);
        fs::create_dir_all(fx.settings.output_dir.join("zillow.txt")).unwrap();
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::SomeFailed));
        assert_eq!(exit.code(), 1);
        assert!(fx.settings.output_dir.join("zillow.txt").is_dir());
        assert_eq!(fx.output(Target::Realtor).as_deref(), Some("1201000"));
        assert_eq!(fx.output(Target::Bitnodes).as_deref(), Some("21874"));
        assert_eq!(fx.output(Target::Etherscan).as_deref(), Some("6542"));
        assert_eq!(browser.journal().visits.len(), 5);
        assert_eq!(fx.gate_file(), Some(today()));
    }

    #[tokio::test]
    async fn test_gate_write_failure_keeps_verdict() {
        let fx = Fixture::new(LINKS);
        let gate_path = fx.dir.path().join("missing").join("last_success");
        let gate = DateGate::new(&gate_path);
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::AllSucceeded));
        assert_eq!(exit.code(), 0);
        assert_path_missing(&gate_path);
        assert_eq!(fx.output(Target::Etherscan).as_deref(), Some("6542"));
    }

    #[tokio::test]
    async fn test_crash_on_fourth_target_recreates_session() {
        let fx = Fixture::new(LINKS);
        let mut pages = all_found();
        pages[3].1 = Page::Crash;
        let browser = FakeBrowser::new(pages);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::SomeFailed));
        assert_path_missing(&fx.settings.output_dir.join("bitnodes.txt"));
        assert_eq!(fx.output(Target::Etherscan).as_deref(), Some("6542"));

        let journal = browser.journal();
        assert_eq!(journal.created, 2);
        assert_eq!(journal.closed, 2);
        assert_eq!(journal.visits.last(), Some(&(2, "https://e".to_string())));
        assert_eq!(fx.gate_file(), Some(today()));
    }

    #[tokio::test]
    async fn test_crash_on_last_target_does_not_recreate() {
        let fx = Fixture::new(LINKS);
        let mut pages = all_found();
        pages[4].1 = Page::Crash;
        let browser = FakeBrowser::new(pages);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::SomeFailed));
        let journal = browser.journal();
        assert_eq!(journal.created, 1);
        assert_eq!(journal.closed, 1);
    }

    #[tokio::test]
    async fn test_failed_recreation_skips_remaining_targets() {
        let fx = Fixture::new(LINKS);
        let mut pages = all_found();
        pages[1].1 = Page::Crash;
        let browser = FakeBrowser::new(pages).failing_after(1);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::SomeFailed));
        assert_eq!(fx.output(Target::Redfin).as_deref(), Some("1234000"));
        assert_eq!(fx.output(Target::Etherscan), None);
        assert_eq!(browser.journal().visits.len(), 2);
        assert_eq!(fx.gate_file(), Some(today()));
    }

    #[tokio::test]
    async fn test_missing_key_aborts_before_browser() {
        let fx = Fixture::new(
            r#"{"redfin":"https://a","zillow":"https://b","realtor":"https://c","bitnodes":"https://d"}"#,
        );
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Aborted);
        assert_eq!(exit.code(), 1);
        assert_eq!(browser.journal().created, 0);
        assert_eq!(fx.gate_file(), None);
    }

    #[tokio::test]
    async fn test_startup_failure_aborts() {
        let fx = Fixture::new(LINKS);
        let browser = FakeBrowser::new(all_found()).failing_after(0);

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Aborted);
        assert_eq!(fx.gate_file(), None);
    }

    #[tokio::test]
    async fn test_gate_skips_second_run_same_day() {
        let fx = Fixture::new(LINKS);
        fx.gate.save_date().unwrap();
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Skipped);
        assert_eq!(exit.code(), 0);
        assert_eq!(browser.journal().created, 0);
        assert_path_missing(&fx.settings.output_dir);
    }

    #[tokio::test]
    async fn test_force_ignores_gate() {
        let mut fx = Fixture::new(LINKS);
        fx.gate.save_date().unwrap();
        fx.settings.force = true;
        let browser = FakeBrowser::new(all_found());

        let exit = run(&browser, &fx.gate, &fx.settings).await;

        assert_eq!(exit, RunExit::Finished(Verdict::AllSucceeded));
        assert_eq!(browser.journal().created, 1);
    }

    #[tokio::test]
    async fn test_single_target_uses_owned_session() {
        let fx = Fixture::new(LINKS);
        let browser = FakeBrowser::new(all_found());

        let exit = run_single(&browser, Target::Bitnodes, &fx.settings).await;

        assert_eq!(exit.code(), 0);
        assert_eq!(fx.output(Target::Bitnodes).as_deref(), Some("21874"));
        assert_eq!(fx.output(Target::Redfin), None);
        let journal = browser.journal();
        assert_eq!(journal.created, 1);
        assert_eq!(journal.closed, 1);
        assert_eq!(fx.gate_file(), None);
    }

    #[tokio::test]
    async fn test_single_target_failure() {
        let fx = Fixture::new(LINKS);
        let browser = FakeBrowser::new(vec![("https://e".to_string(), html("<p>down</p>"))]);

        let exit = run_single(&browser, Target::Etherscan, &fx.settings).await;

        assert_eq!(exit.code(), 1);
        assert_eq!(browser.journal().closed, 1);
    }
}
