//! Per-target value files.

use crate::models::Target;
use crate::utils::normalize_value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Normalize `raw` and overwrite `target`'s file in `output_dir` with it.
///
/// # Returns
///
/// The path that was written.
#[instrument(level = "info", skip_all, fields(site = %target, dir = %output_dir.display()))]
pub async fn write_value(output_dir: &Path, target: Target, raw: &str) -> io::Result<PathBuf> {
    let path = output_dir.join(target.output_file());
    let value = normalize_value(raw);
    fs::write(&path, &value).await?;
    info!(path = %path.display(), %value, "Saved to {}", target.output_file());
    Ok(path)
}
