//! Redfin home value.
//!
//! A Redfin property page shows its price in the stats block at the top of the
//! listing, rendered as `<div class="statsValue price">$1,234,000</div>`.

use super::{PageExtractor, Strategy};
use crate::browser::Probe;
use crate::models::Target;
use std::time::Duration;

/// The price cell in the listing's stats block.
pub const PRICE: Probe = Probe::css("div.statsValue.price");

pub fn extractor(timeout: Duration) -> PageExtractor {
    PageExtractor::new(Target::Redfin, Strategy::Single(PRICE), timeout)
}
