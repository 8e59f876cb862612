//! SQL text synthesis: value literalization shared by the clipboard
//! encoders and the UPDATE generator that turns pending grid edits into
//! one statement per dirty row.

use thiserror::Error;

use crate::edits::EditTracker;
use crate::resultset::{fmt_number, hex_string, CellValue, ResultSet};

/// Why a save cannot even start. Surfaced as an inline status message; the
/// grid stays usable as a read-only view in every case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error("cannot save: result has no identity column to target")]
    NoIdentityColumn,
    #[error("cannot save: no table name could be inferred from the query")]
    NoTableName,
    #[error("cannot save: no updatable edits (rows without an identity value are skipped)")]
    NothingToSave,
}

/// Declared types whose string cells may be emitted as bare numeric
/// literals.
fn is_numeric_type(declared: &str) -> bool {
    let t = declared.to_lowercase();
    ["int", "bigint", "smallint", "tinyint", "decimal", "numeric", "float", "real", "money", "smallmoney", "bit"]
        .iter()
        .any(|p| t.starts_with(p))
}

fn is_numeric_text(s: &str) -> bool {
    !s.is_empty() && s.parse::<f64>().is_ok()
}

/// Literalize one value for SQL text (INSERT tuples, IN lists, UPDATE SET
/// and WHERE clauses all share this).
///
/// Strings double embedded quotes and take an `N` prefix when the declared
/// column type is a national character type (`nvarchar`/`nchar`/`ntext`);
/// numeric text in a numeric column is emitted unquoted.
pub fn format_value_for_insert(value: &CellValue, declared_type: &str) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Bool(b) => if *b { "1".into() } else { "0".into() },
        CellValue::Number(n) => fmt_number(*n),
        CellValue::Bytes(b) => format!("0x{}", hex_string(b)),
        CellValue::Text(s) => {
            if is_numeric_type(declared_type) && is_numeric_text(s) {
                return s.clone();
            }
            let escaped = s.replace('\'', "''");
            if declared_type.to_lowercase().starts_with('n') {
                format!("N'{}'", escaped)
            } else {
                format!("'{}'", escaped)
            }
        }
    }
}

/// One UPDATE per dirty row:
/// `UPDATE <table> SET [c] = v, ... WHERE [<identity>] = <id literal>`.
///
/// Rows whose identity value is NULL are skipped — there is no safe way to
/// target them. Producing zero statements is an error, not a silent no-op.
pub fn generate_update_queries(
    result: &ResultSet,
    edits: &EditTracker,
) -> Result<Vec<String>, SaveError> {
    let identity_col = result.identity_column().ok_or(SaveError::NoIdentityColumn)?;
    let table = result.table_name().ok_or(SaveError::NoTableName)?;
    let identity_name = &result.columns[identity_col].name;
    let identity_type = &result.columns[identity_col].data_type;

    let mut queries = Vec::new();
    for (row, row_edits) in edits.by_row() {
        let identity_value = match result.cell(row, identity_col) {
            Some(v) if !v.is_null() => v,
            _ => {
                log::warn!("skipping row {}: identity value is NULL or missing", row);
                continue;
            }
        };

        let assignments: Vec<String> = row_edits
            .iter()
            .map(|edit| {
                let meta = &result.columns[edit.col];
                format!(
                    "[{}] = {}",
                    meta.name,
                    format_value_for_insert(&edit.new_value, &meta.data_type)
                )
            })
            .collect();

        queries.push(format!(
            "UPDATE {} SET {} WHERE [{}] = {}",
            table,
            assignments.join(", "),
            identity_name,
            format_value_for_insert(identity_value, identity_type)
        ));
    }

    if queries.is_empty() {
        return Err(SaveError::NothingToSave);
    }
    Ok(queries)
}
