//! Data source matching
//!
//! Targets are configured as plain names and matched against the server
//! listing by case-insensitive substring.

use crate::client::Datasource;

/// First data source whose name contains `target`, case-insensitively,
/// in server-returned order.
///
/// The server does not guarantee a stable listing order, so when several
/// data sources satisfy one target the selection can differ between
/// runs. That mirrors the upstream behavior; no tie-break is imposed
/// here.
pub fn match_datasource<'a>(target: &str, datasources: &'a [Datasource]) -> Option<&'a Datasource> {
    let needle = target.to_lowercase();
    datasources
        .iter()
        .find(|ds| ds.name.to_lowercase().contains(&needle))
}
