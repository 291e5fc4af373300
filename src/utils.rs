//! Small helpers for logging and the file system.

use crate::error::OutputError;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest char boundary at
/// or below `max`, with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```
/// use pubdate_harvest::utils::truncate_for_log;
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file, so
/// a bad output path fails before any URL is fetched.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn ensure_writable_dir(path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    let io_err = |p: &Path| {
        let p = p.display().to_string();
        move |source| OutputError::Io { path: p, source }
    };

    fs::create_dir_all(path).await.map_err(io_err(path))?;

    let scratch = path.join("..__write_check__");
    fs::write(&scratch, b"").await.map_err(io_err(&scratch))?;
    let _ = fs::remove_file(&scratch).await;
    info!("Output directory is writable");
    Ok(())
}
