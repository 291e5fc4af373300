//! Writing harvest results and reporting on them.
//!
//! # Submodules
//!
//! - [`table`]: the CSV result table
//! - [`json`]: the same records as a JSON array
//! - [`summary`]: tally and samples logged at the end of a run
//!
//! Result files share a timestamped stem:
//!
//! ```text
//! output_dir/
//! ├── pubdate_results_20250506_141502.csv
//! └── pubdate_results_20250506_141502.json
//! ```

pub mod json;
pub mod summary;
pub mod table;

use chrono::Local;
use std::path::{Path, PathBuf};

const FILE_STEM: &str = "pubdate_results";

/// Local time formatted for result file names (`YYYYMMDD_HHMMSS`).
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<dir>/pubdate_results_<stamp>.<ext>`
pub fn results_path(dir: impl AsRef<Path>, stamp: &str, ext: &str) -> PathBuf {
    dir.as_ref().join(format!("{FILE_STEM}_{stamp}.{ext}"))
}
