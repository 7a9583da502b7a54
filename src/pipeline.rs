//! Run orchestration
//!
//! One linear pass per invocation: connect storage, sign in, list data
//! sources once, then for each configured target locate → download →
//! extract → read → export, collecting the summary. Skips stay inside
//! the per-target loop; anything else propagates to the caller, which
//! renders the error document.

use crate::archive;
use crate::client::{PatCredentials, Session, TableauClient};
use crate::config::Config;
use crate::database::{self, SCHEMA};
use crate::export;
use crate::locate::match_datasource;
use crate::storage::BlobContainer;
use crate::summary::{ExportOutcome, RunSummary, SkipReason};
use chrono::NaiveDate;
use eyre::{Context, Result};
use std::path::Path;

/// Execute one export run.
///
/// The session is signed out on every exit path. A sign-out failure
/// after an otherwise successful run is logged as a warning rather than
/// failing the run.
pub async fn run(config: &Config, date: NaiveDate) -> Result<RunSummary> {
    let container = BlobContainer::connect(&config.blob_conn_str, &config.blob_container)?;
    log::info!("Exporting to {}", container);

    let client = TableauClient::try_new(config.server_url.clone())?;
    let credentials = PatCredentials::new(&config.token_name, &config.token_secret);

    log::info!("Signing in to {} (site: {})", client, config.site_name);
    let session = client.sign_in(&credentials, &config.site_name).await?;

    let result = run_targets(&session, config, &container, date).await;

    if let Err(error) = session.sign_out().await {
        match &result {
            Ok(_) => log::warn!("Sign-out failed after successful run: {}", error),
            Err(_) => log::debug!("Sign-out failed during aborted run: {}", error),
        }
    }

    result
}

/// Exactly one export attempt per configured target: a target yields one
/// skip record, or one record per table in its matched data source.
async fn run_targets(
    session: &Session,
    config: &Config,
    container: &BlobContainer,
    date: NaiveDate,
) -> Result<RunSummary> {
    let datasources = session.list_datasources().await?;
    log::info!("Server returned {} data source(s)", datasources.len());

    let mut summary = RunSummary::new();
    for target in &config.targets {
        match match_datasource(target, &datasources) {
            Some(ds) => {
                log::info!("Found: {}", ds.name);
                let bytes = session
                    .download_datasource(&ds.id)
                    .await
                    .with_context(|| format!("Failed to download data source: {}", ds.name))?;
                let outcomes = process_datasource(
                    target,
                    &ds.name,
                    &bytes,
                    &config.scratch_dir,
                    container,
                    date,
                )
                .await?;
                for outcome in outcomes {
                    summary.push(outcome);
                }
            }
            None => {
                log::info!("No data source matched target: {}", target);
                summary.push(ExportOutcome::Skipped {
                    target: target.clone(),
                    reason: SkipReason::DatasourceNotFound,
                });
            }
        }
    }
    Ok(summary)
}

/// Process one downloaded archive: extract the embedded database, read
/// every table in the public schema, and upload one CSV per table.
///
/// Public so integration tests can drive the download-onward path
/// without a live server.
pub async fn process_datasource(
    target: &str,
    datasource_name: &str,
    archive_bytes: &[u8],
    scratch_dir: &Path,
    container: &BlobContainer,
    date: NaiveDate,
) -> Result<Vec<ExportOutcome>> {
    let Some(db_path) = archive::extract_database(archive_bytes, scratch_dir)? else {
        log::info!(
            "No {} entry in archive for {}",
            archive::DATABASE_EXT,
            datasource_name
        );
        return Ok(vec![ExportOutcome::Skipped {
            target: target.to_string(),
            reason: SkipReason::NoDatabaseFile,
        }]);
    };

    let tables = database::read_schema_tables(&db_path, SCHEMA)
        .with_context(|| format!("Failed to read embedded database for {}", datasource_name))?;

    let mut outcomes = Vec::with_capacity(tables.len());
    for table in &tables {
        let (blob_file, rows) = export::export_table(container, datasource_name, table, date)
            .await
            .with_context(|| format!("Failed to export table: {}", table.name))?;
        log::info!(
            "Exported {}.{} ({} rows) as {}",
            SCHEMA,
            table.name,
            rows,
            blob_file
        );
        outcomes.push(ExportOutcome::Exported {
            datasource: datasource_name.to_string(),
            table: table.name.clone(),
            blob_file,
            rows,
        });
    }
    Ok(outcomes)
}
