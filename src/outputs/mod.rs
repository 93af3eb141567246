//! Output generation: per-target value files and the end-of-run summary.
//!
//! # Submodules
//!
//! - [`values`]: Writes each scraped value to its own text file
//! - [`summary`]: Renders the console summary block
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── redfin.txt      # 1234000
//! ├── zillow.txt
//! ├── realtor.txt
//! ├── bitnodes.txt    # 21874
//! └── etherscan.txt
//! ```
//!
//! A file is only rewritten when its target succeeds, so a failed target
//! keeps the value from its last good run.

pub mod summary;
pub mod values;
