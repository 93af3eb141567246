//! Zillow Zestimate.

use super::{PageExtractor, Strategy};
use crate::browser::Probe;
use crate::models::Target;
use std::time::Duration;

pub const ZESTIMATE: Probe = Probe::css(r#"p[data-testid="primary-zestimate"]"#);

pub fn extractor(timeout: Duration) -> PageExtractor {
    PageExtractor::new(Target::Zillow, Strategy::Single(ZESTIMATE), timeout)
}
