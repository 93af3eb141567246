//! Page extractors, one per scrape target.
//!
//! Every target is described declaratively by a [`PageExtractor`]: which
//! element holds the value and, for pages that move things around, which
//! fallbacks to try. One shared routine runs all of them.
//!
//! # Supported Sources
//!
//! | Source | Module | Strategy | Element |
//! |--------|--------|----------|---------|
//! | Redfin | [`redfin`] | single selector | `div.statsValue.price` |
//! | Zillow | [`zillow`] | single selector | `p[data-testid="primary-zestimate"]` |
//! | Realtor.com | [`realtor`] | single selector | `h2[data-testid="estimated-home-value-currency"]` |
//! | Bitnodes | [`bitnodes`] | attribute selector | `a[href="."]` |
//! | Etherscan | [`etherscan`] | fallback chain | summary paragraph, any paragraph, page-source regex |
//!
//! # Outcomes
//!
//! Extraction returns `Ok(Extraction::Found)` with the trimmed element text,
//! `Ok(Extraction::Missing)` when the page did not yield a value for any
//! expected reason, and `Err` only when the browser session broke.

pub mod bitnodes;
pub mod etherscan;
pub mod realtor;
pub mod redfin;
pub mod zillow;

use crate::browser::{BrowserError, BrowserSession, Probe, SessionHandle, Wait};
use crate::models::{Extraction, Miss, Target};
use crate::utils::truncate_for_log;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default ceiling for waiting on a page element.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// One attempt within a fallback chain.
#[derive(Debug, Clone, Copy)]
pub enum Tier {
    /// Poll for the probe up to the extractor's timeout.
    Waited(Probe),
    /// Look for the probe once, without waiting.
    Immediate(Probe),
    /// Scan the raw page markup; the first capture group is the value.
    SourcePattern(&'static Regex),
}

impl Tier {
    fn describe(&self) -> String {
        match self {
            Tier::Waited(probe) | Tier::Immediate(probe) => probe.describe(),
            Tier::SourcePattern(pattern) => format!("page source /{}/", pattern.as_str()),
        }
    }
}

/// How a page is searched for its value.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Wait for one element and read its text.
    Single(Probe),
    /// Try each tier in order; the first non-empty value wins.
    FallbackChain(Vec<Tier>),
}

/// Everything needed to pull one target's value off its page.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    pub target: Target,
    pub strategy: Strategy,
    pub timeout: Duration,
}

impl PageExtractor {
    pub fn new(target: Target, strategy: Strategy, timeout: Duration) -> Self {
        Self {
            target,
            strategy,
            timeout,
        }
    }

    /// The extractor for `target`.
    pub fn for_target(target: Target, timeout: Duration) -> Self {
        match target {
            Target::Redfin => redfin::extractor(timeout),
            Target::Zillow => zillow::extractor(timeout),
            Target::Realtor => realtor::extractor(timeout),
            Target::Bitnodes => bitnodes::extractor(timeout),
            Target::Etherscan => etherscan::extractor(timeout),
        }
    }

    /// Navigate to `url` and extract this target's value.
    ///
    /// An owned handle is closed before returning, whatever the outcome; a
    /// borrowed one is left open.
    ///
    /// # Errors
    ///
    /// Only session faults ([`BrowserError::is_session_fault`]) are returned
    /// as errors. Everything else is folded into [`Extraction::Missing`].
    #[instrument(level = "info", skip_all, fields(site = %self.target, %url))]
    pub async fn extract<S: BrowserSession>(
        &self,
        url: &str,
        mut handle: SessionHandle<'_, S>,
    ) -> Result<Extraction, BrowserError> {
        let result = self.extract_with(url, handle.session()).await;
        handle.release().await;
        result
    }

    async fn extract_with<S: BrowserSession>(
        &self,
        url: &str,
        session: &mut S,
    ) -> Result<Extraction, BrowserError> {
        info!("Navigating to: {url}");
        if let Err(e) = session.navigate(url).await {
            let miss = settle(e)?;
            warn!(reason = %miss, "Error occurred");
            return Ok(Extraction::Missing(miss));
        }

        let extraction = match &self.strategy {
            Strategy::Single(probe) => {
                match session.probe_text(probe, Wait::Poll(self.timeout)).await {
                    Ok(text) if text.is_empty() => Extraction::Missing(Miss::Empty {
                        selector: probe.describe(),
                    }),
                    Ok(text) => Extraction::Found(text),
                    Err(e) => Extraction::Missing(settle(e)?),
                }
            }
            Strategy::FallbackChain(tiers) => self.run_chain(session, tiers).await?,
        };

        match &extraction {
            Extraction::Found(value) => info!(%value, "{} found", self.target.metric()),
            Extraction::Missing(miss) => warn!(reason = %miss, "Error occurred"),
        }
        Ok(extraction)
    }

    async fn run_chain<S: BrowserSession>(
        &self,
        session: &mut S,
        tiers: &[Tier],
    ) -> Result<Extraction, BrowserError> {
        for (index, tier) in tiers.iter().enumerate() {
            let attempt = index + 1;
            info!(attempt, strategy = %tier.describe(), "Attempting strategy");

            let result = match tier {
                Tier::Waited(probe) => session.probe_text(probe, Wait::Poll(self.timeout)).await,
                Tier::Immediate(probe) => session.probe_text(probe, Wait::Once).await,
                Tier::SourcePattern(pattern) => {
                    session.page_source().await.and_then(|source| {
                        extract_from_source(pattern, &source).ok_or_else(|| {
                            debug!(preview = %truncate_for_log(&source, 300), "Pattern not found in page source");
                            BrowserError::NotFound {
                                selector: tier.describe(),
                            }
                        })
                    })
                }
            };

            match result {
                Ok(value) if !value.is_empty() => {
                    info!(attempt, %value, "Strategy successful");
                    return Ok(Extraction::Found(value));
                }
                Ok(_) => warn!(attempt, "Strategy failed: empty value"),
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => warn!(attempt, error = %e, "Strategy failed"),
            }
        }

        Ok(Extraction::Missing(Miss::AllStrategiesFailed))
    }
}

/// First capture group of `pattern` in `source`, trimmed.
pub fn extract_from_source(pattern: &Regex, source: &str) -> Option<String> {
    pattern
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Turn an expected lookup failure into a [`Miss`]; session faults pass
/// through as errors.
fn settle(e: BrowserError) -> Result<Miss, BrowserError> {
    match e {
        BrowserError::Navigation { reason, .. } => Ok(Miss::Navigation(reason)),
        BrowserError::Timeout { selector, secs } => Ok(Miss::Timeout { selector, secs }),
        BrowserError::NotFound { selector } => Ok(Miss::NotFound { selector }),
        BrowserError::Command(message) => Ok(Miss::Command(message)),
        fault @ (BrowserError::Session(_) | BrowserError::Startup(_)) => Err(fault),
    }
}
