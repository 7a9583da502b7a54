//! Tableau data source exporter
//!
//! A scheduled extraction job: signs in to a Tableau Server site with a
//! personal access token, downloads a configured set of data sources as
//! packaged archives, reads every table inside each embedded database
//! file, and uploads one dated CSV per table to blob storage. Each run
//! ends with a single JSON summary (or error) document in the log.

pub mod archive;
pub mod client;
pub mod config;
pub mod database;
pub mod export;
pub mod locate;
pub mod pipeline;
pub mod storage;
pub mod summary;

// Re-exports for convenience
pub use client::{Datasource, PatCredentials, Session, TableauClient};
pub use config::Config;
pub use database::TableData;
pub use storage::BlobContainer;
pub use summary::{ExportOutcome, RunSummary, SkipReason};
