//! Run summary collection
//!
//! Accumulates one record per exported table plus one record per skipped
//! target, and renders the single JSON document that is the run's only
//! log artifact.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Why a target produced no export records. Both cases are handled
/// outcomes inside the per-target loop, not failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No data source name contained the target string.
    DatasourceNotFound,
    /// The matched archive held no embedded database file.
    NoDatabaseFile,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DatasourceNotFound => "Datasource not found",
            Self::NoDatabaseFile => "No .hyper file found",
        }
    }
}

/// One entry in the run summary.
#[derive(Clone, Debug)]
pub enum ExportOutcome {
    /// A table was exported to blob storage.
    Exported {
        datasource: String,
        table: String,
        blob_file: String,
        rows: usize,
    },
    /// A target was skipped for a non-fatal reason.
    Skipped { target: String, reason: SkipReason },
}

impl Serialize for ExportOutcome {
    // Skips serialize as {"<target>": "<reason>"} to match the record
    // shape downstream log consumers already parse.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exported {
                datasource,
                table,
                blob_file,
                rows,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("datasource", datasource)?;
                map.serialize_entry("table", table)?;
                map.serialize_entry("blob_file", blob_file)?;
                map.serialize_entry("rows", rows)?;
                map.end()
            }
            Self::Skipped { target, reason } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(target, reason.as_str())?;
                map.end()
            }
        }
    }
}

/// Ordered outcomes across all targets of one run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    outcomes: Vec<ExportOutcome>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ExportOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ExportOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The document logged after a successful run:
    /// `{"status": "success", "summary": [...]}`.
    pub fn success_document(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "summary": &self.outcomes,
        })
    }
}

/// The document logged when a run aborts:
/// `{"status": "error", "message": ..., "trace": ...}`.
///
/// `trace` carries the full error chain; it is never empty.
pub fn error_document(error: &eyre::Report) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "message": error.to_string(),
        "trace": format!("{:?}", error),
    })
}

/// Render a summary or error document the way the run logs it:
/// pretty-printed with 2-space indentation.
pub fn render(document: &serde_json::Value) -> String {
    serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string())
}
