//! Realtor.com estimated home value.
//!
//! The estimate is the heading tagged `data-testid="estimated-home-value-currency"`
//! in the property's valuation panel.

use super::{PageExtractor, Strategy};
use crate::browser::Probe;
use crate::models::Target;
use std::time::Duration;

pub const ESTIMATE: Probe = Probe::css(r#"h2[data-testid="estimated-home-value-currency"]"#);

pub fn extractor(timeout: Duration) -> PageExtractor {
    PageExtractor::new(Target::Realtor, Strategy::Single(ESTIMATE), timeout)
}
