//! Loading of target URLs from the JSON links file.
//!
//! The links file is a flat JSON object mapping each target key to the page
//! that should be scraped for it:
//!
//! ```json
//! {
//!   "redfin": "https://www.redfin.com/...",
//!   "zillow": "https://www.zillow.com/...",
//!   "realtor": "https://www.realtor.com/...",
//!   "bitnodes": "https://bitnodes.io/",
//!   "etherscan": "https://etherscan.io/nodetracker"
//! }
//! ```
//!
//! All five keys are required. Loading produces an immutable [`Links`] value
//! that is handed to whoever needs a URL; nothing is kept in global state.

use crate::models::Target;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Reasons the links file could not be turned into a [`Links`] value.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("configuration file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration is not a valid JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("configuration key '{key}' is not a usable URL: {reason}")]
    InvalidUrl { key: &'static str, reason: String },
}

/// The URL of every target, validated and in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    urls: [String; 5],
}

impl Links {
    /// Read and validate the links file at `path`.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotFound`] if the file does not exist
    /// - [`LinkError::Parse`] if it is not a JSON object
    /// - [`LinkError::MissingKey`] if any target key is absent
    /// - [`LinkError::InvalidUrl`] if a value is not a non-empty, parseable URL
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LinkError::NotFound(path.to_path_buf())
            } else {
                LinkError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let links = Self::from_json(&text)?;
        info!("Successfully loaded links");
        Ok(links)
    }

    /// Parse and validate links from a JSON document. Unknown keys are ignored.
    pub fn from_json(text: &str) -> Result<Self, LinkError> {
        let raw: HashMap<String, Value> = serde_json::from_str(text)?;

        let mut urls: [String; 5] = Default::default();
        for target in Target::ALL {
            let key = target.key();
            let value = raw.get(key).ok_or(LinkError::MissingKey(key))?;
            urls[target.index()] = validate_url(key, value)?;
        }

        Ok(Self { urls })
    }

    /// The URL configured for `target`.
    pub fn url(&self, target: Target) -> &str {
        &self.urls[target.index()]
    }

    /// Every (target, URL) pair, in run order.
    pub fn get_all(&self) -> impl Iterator<Item = (Target, &str)> {
        Target::ALL
            .into_iter()
            .map(move |target| (target, self.url(target)))
    }

    /// Whether every target has a URL.
    ///
    /// Always true for a value built by [`Links::load`] or [`Links::from_json`].
    pub fn is_loaded(&self) -> bool {
        self.urls.iter().all(|url| !url.is_empty())
    }
}

fn validate_url(key: &'static str, value: &Value) -> Result<String, LinkError> {
    let Some(raw) = value.as_str() else {
        return Err(LinkError::InvalidUrl {
            key,
            reason: format!("expected a string, found {value}"),
        });
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkError::InvalidUrl {
            key,
            reason: "value is empty".to_string(),
        });
    }

    Url::parse(trimmed).map_err(|e| LinkError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;

    Ok(trimmed.to_string())
}
