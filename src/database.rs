//! Embedded database reader
//!
//! Opens the analytical database file extracted from a packaged archive
//! and materializes every table of one schema into memory. The exporter
//! is the only consumer and writes delimited text, so values are read
//! back as optional strings via VARCHAR casts.

use duckdb::Connection;
use eyre::{Context, Result};
use std::path::Path;

/// Schema holding the published table data.
pub const SCHEMA: &str = "public";

/// One fully materialized table: ordered column names plus all rows.
#[derive(Clone, Debug)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read every table in `schema` from the database file at `path`.
///
/// Tables are enumerated in lexical name order so run summaries are
/// deterministic. Each table is loaded whole with a single unfiltered
/// scan; there is no paging or row limit.
///
/// # Errors
/// Fails if the file is corrupt or the engine cannot open it.
pub fn read_schema_tables(path: &Path, schema: &str) -> Result<Vec<TableData>> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database file: {}", path.display()))?;

    let names = table_names(&conn, schema)?;
    log::debug!("Schema {} holds {} table(s)", schema, names.len());

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = table_columns(&conn, schema, &name)?;
        let rows = scan_table(&conn, schema, &name, &columns)
            .with_context(|| format!("Failed to scan table {}.{}", schema, name))?;
        tables.push(TableData {
            name,
            columns,
            rows,
        });
    }
    Ok(tables)
}

fn table_names(conn: &Connection, schema: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = ? ORDER BY table_name",
    )?;
    let names = stmt
        .query_map([schema], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to list tables")?;
    Ok(names)
}

fn table_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map([schema, table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list columns of {}.{}", schema, table))?;
    Ok(columns)
}

fn scan_table(
    conn: &Connection,
    schema: &str,
    table: &str,
    columns: &[String],
) -> Result<Vec<Vec<Option<String>>>> {
    let select_list = columns
        .iter()
        .map(|column| format!("CAST({} AS VARCHAR)", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {}.{}",
        select_list,
        quote_ident(schema),
        quote_ident(table)
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            record.push(row.get::<_, Option<String>>(index)?);
        }
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_database(path: &Path, sql: &str) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(sql).unwrap();
    }

    #[test]
    fn test_reads_all_tables_in_lexical_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.db");
        seed_database(
            &path,
            "CREATE SCHEMA public;
             CREATE TABLE public.users (id INTEGER, email VARCHAR);
             CREATE TABLE public.events (id INTEGER, kind VARCHAR);
             INSERT INTO public.users VALUES (1, 'a@example.com');
             INSERT INTO public.events VALUES (10, 'click'), (11, 'view');
             CHECKPOINT;",
        );

        let tables = read_schema_tables(&path, SCHEMA).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "events");
        assert_eq!(tables[1].name, "users");
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[1].rows.len(), 1);
    }

    #[test]
    fn test_columns_keep_source_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.db");
        seed_database(
            &path,
            "CREATE SCHEMA public;
             CREATE TABLE public.sessions (zulu INTEGER, alpha VARCHAR, mike DOUBLE);
             CHECKPOINT;",
        );

        let tables = read_schema_tables(&path, SCHEMA).unwrap();
        assert_eq!(tables[0].columns, vec!["zulu", "alpha", "mike"]);
        assert!(tables[0].rows.is_empty());
    }

    #[test]
    fn test_null_values_come_back_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.db");
        seed_database(
            &path,
            "CREATE SCHEMA public;
             CREATE TABLE public.t (id INTEGER, note VARCHAR);
             INSERT INTO public.t VALUES (1, NULL), (2, 'set');
             CHECKPOINT;",
        );

        let tables = read_schema_tables(&path, SCHEMA).unwrap();
        assert_eq!(tables[0].rows[0], vec![Some("1".to_string()), None]);
        assert_eq!(
            tables[0].rows[1],
            vec![Some("2".to_string()), Some("set".to_string())]
        );
    }

    #[test]
    fn test_non_text_values_are_stringified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.db");
        seed_database(
            &path,
            "CREATE SCHEMA public;
             CREATE TABLE public.t (d DATE, n DOUBLE, b BOOLEAN);
             INSERT INTO public.t VALUES (DATE '2024-06-01', 1.5, true);
             CHECKPOINT;",
        );

        let tables = read_schema_tables(&path, SCHEMA).unwrap();
        assert_eq!(
            tables[0].rows[0],
            vec![
                Some("2024-06-01".to_string()),
                Some("1.5".to_string()),
                Some("true".to_string())
            ]
        );
    }

    #[test]
    fn test_other_schemas_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.db");
        seed_database(
            &path,
            "CREATE SCHEMA public;
             CREATE TABLE public.kept (id INTEGER);
             CREATE TABLE main.skipped (id INTEGER);
             CHECKPOINT;",
        );

        let tables = read_schema_tables(&path, SCHEMA).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "kept");
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.db");
        std::fs::write(&path, b"definitely not a database").unwrap();

        assert!(read_schema_tables(&path, SCHEMA).is_err());
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
