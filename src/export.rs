//! Tabular exporter
//!
//! Converts a materialized table to CSV in memory and uploads it under a
//! deterministic, date-stamped blob name. Re-running on the same date
//! with unchanged data overwrites the blob with identical bytes.

use crate::database::TableData;
use crate::storage::BlobContainer;
use bytes::Bytes;
use chrono::NaiveDate;
use eyre::{Context, Result};

/// Blob name for one exported table:
/// `{datasource with spaces as underscores}-{table}-{YYYY-MM-DD}.csv`.
pub fn blob_name(datasource: &str, table: &str, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}.csv",
        datasource.replace(' ', "_"),
        table,
        date.format("%Y-%m-%d")
    )
}

/// Serialize a table to CSV: header row of column names in source order,
/// comma-delimited UTF-8, nulls as empty fields, no index column.
pub fn to_csv(table: &TableData) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.columns)
        .context("Failed to write CSV header")?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))
            .context("Failed to write CSV row")?;
    }
    writer
        .into_inner()
        .map_err(|error| eyre::eyre!("Failed to flush CSV buffer: {}", error))
}

/// Upload one table as a CSV blob; returns the blob name and row count
/// for the run summary.
pub async fn export_table(
    container: &BlobContainer,
    datasource: &str,
    table: &TableData,
    date: NaiveDate,
) -> Result<(String, usize)> {
    let name = blob_name(datasource, &table.name, date);
    let body = to_csv(table)?;
    container.put(&name, Bytes::from(body)).await?;
    log::debug!("Uploaded {} ({} rows)", name, table.rows.len());
    Ok((name, table.rows.len()))
}
