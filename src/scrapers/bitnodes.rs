//! Bitnodes reachable Bitcoin node count.
//!
//! The bitnodes.io front page links the current snapshot total to itself, so
//! the count is the text of the anchor whose `href` is exactly `"."`.

use super::{PageExtractor, Strategy};
use crate::browser::Probe;
use crate::models::Target;
use std::time::Duration;

pub const NODE_COUNT: Probe = Probe::css(r#"a[href="."]"#);

pub fn extractor(timeout: Duration) -> PageExtractor {
    PageExtractor::new(Target::Bitnodes, Strategy::Single(NODE_COUNT), timeout)
}
