//! Data models for scrape targets and their outcomes.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Target`]: One of the five fixed data sources, in scrape order
//! - [`Extraction`]: What a single page extraction produced
//! - [`Miss`]: Why an extraction came back without a value
//! - [`RunReport`]: Per-target outcomes of a full run, and the derived [`Verdict`]

use std::fmt;
use thiserror::Error;

/// A scrape target.
///
/// The declaration order is the order in which a full run visits the
/// targets; [`Target::ALL`] exposes it as an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Target {
    Redfin,
    Zillow,
    Realtor,
    Bitnodes,
    Etherscan,
}

impl Target {
    /// Every target, in run order.
    pub const ALL: [Target; 5] = [
        Target::Redfin,
        Target::Zillow,
        Target::Realtor,
        Target::Bitnodes,
        Target::Etherscan,
    ];

    /// The key this target's URL is stored under in the links file.
    pub fn key(self) -> &'static str {
        match self {
            Target::Redfin => "redfin",
            Target::Zillow => "zillow",
            Target::Realtor => "realtor",
            Target::Bitnodes => "bitnodes",
            Target::Etherscan => "etherscan",
        }
    }

    /// Human-readable name used in console narration and the summary.
    pub fn label(self) -> &'static str {
        match self {
            Target::Redfin => "Redfin",
            Target::Zillow => "Zillow",
            Target::Realtor => "Realtor.com",
            Target::Bitnodes => "Bitnodes",
            Target::Etherscan => "Etherscan",
        }
    }

    /// What the scraped number means, for log lines.
    pub fn metric(self) -> &'static str {
        match self {
            Target::Redfin => "home value",
            Target::Zillow => "Zestimate",
            Target::Realtor => "estimated home value",
            Target::Bitnodes => "Bitcoin node count",
            Target::Etherscan => "Ethereum node count",
        }
    }

    /// Name of the file this target's value is written to.
    pub fn output_file(self) -> String {
        format!("{}.txt", self.key())
    }

    /// Position of this target in [`Target::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reason an extraction produced no value.
///
/// These are expected outcomes (the page changed, the site was slow), not
/// session failures; a session failure is reported as an error instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Miss {
    #[error("timed out after {secs}s waiting for `{selector}`")]
    Timeout { selector: String, secs: u64 },

    #[error("no element matches `{selector}`")]
    NotFound { selector: String },

    #[error("element `{selector}` has no text")]
    Empty { selector: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("driver command failed: {0}")]
    Command(String),

    #[error("all strategies failed to find a value")]
    AllStrategiesFailed,
}

/// The result of running one extractor against one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The trimmed text of the located element.
    Found(String),
    /// Nothing usable was on the page.
    Missing(Miss),
}

/// How a single target fared in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: Target,
    /// The value as scraped (before normalization), present only when it was
    /// also written to the target's output file.
    pub saved: Option<String>,
}

impl TargetOutcome {
    pub fn saved(target: Target, value: String) -> Self {
        Self {
            target,
            saved: Some(value),
        }
    }

    pub fn failed(target: Target) -> Self {
        Self {
            target,
            saved: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.saved.is_some()
    }
}

/// Overall classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllSucceeded,
    SomeFailed,
    AllFailed,
}

impl Verdict {
    /// Process exit code for this verdict.
    ///
    /// Partial and total failure share exit code 1; only the printed summary
    /// tells them apart.
    pub fn exit_code(self) -> u8 {
        match self {
            Verdict::AllSucceeded => 0,
            Verdict::SomeFailed | Verdict::AllFailed => 1,
        }
    }
}

/// Outcomes of a full run, one per target in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn verdict(&self) -> Verdict {
        let succeeded = self.succeeded();
        if succeeded == Target::ALL.len() && self.outcomes.len() == Target::ALL.len() {
            Verdict::AllSucceeded
        } else if succeeded > 0 {
            Verdict::SomeFailed
        } else {
            Verdict::AllFailed
        }
    }
}
