//! The summary block printed at the end of a run.
//!
//! ```text
//! ============================================================
//! Summary
//! ============================================================
//! Redfin:      $1,234,000 → redfin.txt
//! Zillow:      FAILED
//! ...
//! ============================================================
//!
//! ⚠ Some scrapers failed
//! ```

use crate::models::{RunReport, Verdict};

const RULE: &str = "============================================================";
const LABEL_WIDTH: usize = 13;

/// Render the per-target summary and the overall verdict line.
pub fn render(report: &RunReport) -> String {
    let mut lines = vec![RULE.to_string(), "Summary".to_string(), RULE.to_string()];

    for outcome in &report.outcomes {
        let label = format!("{}:", outcome.target.label());
        lines.push(match &outcome.saved {
            Some(value) => format!(
                "{label:<LABEL_WIDTH$}{value} → {}",
                outcome.target.output_file()
            ),
            None => format!("{label:<LABEL_WIDTH$}FAILED"),
        });
    }

    lines.push(RULE.to_string());
    lines.push(String::new());
    lines.push(verdict_line(report.verdict()).to_string());
    lines.join("\n")
}

pub fn verdict_line(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::AllSucceeded => "✓ All scrapers completed successfully!",
        Verdict::SomeFailed => "⚠ Some scrapers failed",
        Verdict::AllFailed => "✗ All scrapers failed",
    }
}
