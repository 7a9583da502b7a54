//! Runtime configuration for an export run
//!
//! Connection parameters are read from the environment once at process
//! start and carried in an explicit [`Config`] passed by reference into
//! the pipeline, so no component does ambient lookups of its own.

use eyre::{Context, Result};
use std::path::PathBuf;
use url::Url;

/// Default destination container when `BLOB_CONTAINER` is unset.
pub const DEFAULT_CONTAINER: &str = "tableau-exports";

/// Data sources exported when `TARGET_DATASOURCES` is unset.
pub const DEFAULT_TARGETS: [&str; 4] = ["TS Events", "TS Users", "Groups", "Site Content"];

/// Connection parameters for one export run.
#[derive(Clone)]
pub struct Config {
    /// Tableau Server base URL.
    pub server_url: Url,
    /// Site content URL; empty string selects the default site.
    pub site_name: String,
    /// Personal access token name.
    pub token_name: String,
    /// Personal access token secret.
    pub token_secret: String,
    /// Object storage connection string or URL.
    pub blob_conn_str: String,
    /// Destination container for exported CSV blobs.
    pub blob_container: String,
    /// Ordered list of data source names to export.
    pub targets: Vec<String>,
    /// Directory that extracted database files are written under.
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Expected environment variables:
    /// - `SERVER_URL`: Tableau Server base URL (required)
    /// - `SITE_NAME`: site content URL, empty for the default site (required)
    /// - `TOKEN_NAME`: personal access token name (required)
    /// - `TOKEN_SECRET`: personal access token secret (required)
    /// - `BLOB_CONN_STR`: storage connection string or URL (required)
    /// - `BLOB_CONTAINER`: destination container (default "tableau-exports")
    /// - `TARGET_DATASOURCES`: comma-separated data source names (optional)
    /// - `SCRATCH_DIR`: scratch directory for extracted files (default OS temp dir)
    pub fn from_env() -> Result<Self> {
        let url_str =
            std::env::var("SERVER_URL").context("SERVER_URL environment variable not set")?;
        let server_url =
            Url::parse(&url_str).with_context(|| format!("Invalid SERVER_URL: {}", url_str))?;

        let site_name =
            std::env::var("SITE_NAME").context("SITE_NAME environment variable not set")?;
        let token_name =
            std::env::var("TOKEN_NAME").context("TOKEN_NAME environment variable not set")?;
        let token_secret =
            std::env::var("TOKEN_SECRET").context("TOKEN_SECRET environment variable not set")?;
        let blob_conn_str =
            std::env::var("BLOB_CONN_STR").context("BLOB_CONN_STR environment variable not set")?;

        let blob_container =
            std::env::var("BLOB_CONTAINER").unwrap_or_else(|_| DEFAULT_CONTAINER.to_string());

        let targets = match std::env::var("TARGET_DATASOURCES") {
            Ok(list) => list
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            Err(_) => DEFAULT_TARGETS.iter().map(|name| name.to_string()).collect(),
        };

        let scratch_dir = std::env::var("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Ok(Self {
            server_url,
            site_name,
            token_name,
            token_secret,
            blob_conn_str,
            blob_container,
            targets,
            scratch_dir,
        })
    }
}

impl std::fmt::Debug for Config {
    // Secrets stay out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url.as_str())
            .field("site_name", &self.site_name)
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .field("blob_conn_str", &"<redacted>")
            .field("blob_container", &self.blob_container)
            .field("targets", &self.targets)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}
