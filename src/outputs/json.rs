//! JSON output: the result records as a single array.
//!
//! Field names and value renderings match the CSV table, with absent values
//! written as `null`.

use crate::error::OutputError;
use crate::models::ResultRecord;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `records` to `path` as a pretty-printed JSON array.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), records = records.len()))]
pub async fn write_records(
    records: &[ResultRecord],
    path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(records)?;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(OutputError::Io {
                path: parent.display().to_string(),
                source: e,
            });
        }
    }

    fs::write(path, json).await.map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!("Wrote JSON results");
    Ok(())
}
