//! Small helpers shared by the extractors and the output writers.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

const WRITE_PROBE: &str = ".daily_scrape_probe";

/// Strip currency symbols and thousands separators from a scraped value.
///
/// Prices arrive as `"$1,234,000"` and node counts as `"21,874"`; both are
/// written out as bare digits. Any other text passes through unchanged.
pub fn normalize_value(raw: &str) -> String {
    raw.replace(['$', ','], "")
}

/// Shorten `text` to at most `max` bytes for a log line, noting how much was
/// dropped.
pub fn truncate_for_log(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let cut = (0..=max)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}…(+{} bytes)", &text[..cut], text.len() - cut)
}

/// Create `dir` if needed and check that files can be written into it.
///
/// # Errors
///
/// Any I/O error from creating the directory or the probe file.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub async fn ensure_writable_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await?;

    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, b"").await?;
    if let Err(e) = fs::remove_file(&probe).await {
        debug!(error = %e, "Could not remove write probe");
    }
    Ok(())
}
