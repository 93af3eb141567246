//! Etherscan Ethereum node count.
//!
//! The node tracker page reports its total in a muted paragraph such as
//! `<p class="text-muted">Total <strong>6,542</strong> nodes found</p>`.
//! Its markup has shifted over time, so three strategies are tried in order:
//!
//! 1. Wait for a `p.text-muted` mentioning both "Total" and "nodes found" and
//!    read its `<strong>`.
//! 2. Look once for any `<p>` mentioning "nodes found" and read its `<strong>`.
//! 3. Scan the raw page source for `Total <strong>N</strong> nodes found`.

use super::{PageExtractor, Strategy, Tier};
use crate::browser::Probe;
use crate::models::Target;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub const SUMMARY: Probe = Probe::css("p.text-muted")
    .containing(&["Total", "nodes found"])
    .within("strong");

pub const ANY_PARAGRAPH: Probe = Probe::css("p")
    .containing(&["nodes found"])
    .within("strong");

pub static NODE_COUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Total\s*<strong[^>]*>([^<]+)</strong>\s*nodes found")
        .expect("node count pattern is valid")
});

pub fn extractor(timeout: Duration) -> PageExtractor {
    PageExtractor::new(
        Target::Etherscan,
        Strategy::FallbackChain(vec![
            Tier::Waited(SUMMARY),
            Tier::Immediate(ANY_PARAGRAPH),
            Tier::SourcePattern(&NODE_COUNT_PATTERN),
        ]),
        timeout,
    )
}
