//! CSV result table: `url,date,source,status,error`.
//!
//! Absent dates and messages are written as empty cells.

use crate::error::OutputError;
use crate::models::ResultRecord;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Render records as CSV, header included.
pub fn to_csv(records: &[ResultRecord], path: &str) -> Result<Vec<u8>, OutputError> {
    let csv_err = |source| OutputError::Csv {
        path: path.to_string(),
        source,
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Io {
            path: path.to_string(),
            source: e.into_error(),
        })
}

/// Write the result table to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), records = records.len()))]
pub async fn write_csv(records: &[ResultRecord], path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let io_err = |source| OutputError::Io {
        path: display.clone(),
        source,
    };

    let bytes = to_csv(records, &display)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    fs::write(path, bytes).await.map_err(io_err)?;
    info!("Wrote CSV results");
    Ok(())
}
