//! Result-set data model: typed cell values, column metadata, and the
//! heuristics (identity column, originating table) the save path needs.

use once_cell::sync::Lazy;
use regex::Regex;

/// One value in a result row. Every consumer matches exhaustively so a new
/// variant can't silently fall through formatting or edit parsing.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Plain string form used for clipboard text and edit buffers.
    /// NULL maps to the empty string here; the grid display uses
    /// `display_text` instead so NULL stays visible on screen.
    pub fn plain_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => if *b { "true".into() } else { "false".into() },
            CellValue::Number(n) => fmt_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Bytes(b) => format!("0x{}", hex_string(b)),
        }
    }

    /// String form shown in the grid. Same as `plain_text` except NULL.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            other => other.plain_text(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Render a number the way it went in: integers without a trailing ".0",
/// everything else with the shortest round-trip form f64 gives us.
pub fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02X}", b));
    }
    s
}

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
        }
    }
}

/// Immutable snapshot of one statement's output. Row and column counts are
/// fixed for its lifetime; the only in-place mutation is `patch_cell`, which
/// the workspace applies after every UPDATE of a save batch succeeded.
#[derive(Clone, Debug)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
    /// The single statement that produced this result (not the whole batch).
    pub statement: String,
}

/// Column-name suffixes that mark a primary-key-like column.
const IDENTITY_HINTS: [&str; 5] = ["id", "pk", "key", "_id", "identity"];

static FROM_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bfrom\s+((?:\[[^\]]+\]|[A-Za-z_][\w$]*)(?:\.(?:\[[^\]]+\]|[A-Za-z_][\w$]*))*)")
        .expect("from-table regex")
});

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<CellValue>>, statement: &str) -> Self {
        Self { columns, rows, statement: statement.to_string() }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn patch_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = value;
        }
    }

    /// Guess the column UPDATE statements should target.
    /// First column whose lower-cased name equals or ends with one of the
    /// identity hints wins; otherwise column 0; None when there are no
    /// columns at all.
    pub fn identity_column(&self) -> Option<usize> {
        if self.columns.is_empty() {
            return None;
        }
        for (idx, col) in self.columns.iter().enumerate() {
            let lower = col.name.to_lowercase();
            if IDENTITY_HINTS.iter().any(|h| lower == *h || lower.ends_with(h)) {
                return Some(idx);
            }
        }
        Some(0)
    }

    /// Extract `schema.table` (or bare `table`) from the originating
    /// statement's FROM clause.
    pub fn table_name(&self) -> Option<String> {
        FROM_TABLE
            .captures(&self.statement)
            .map(|c| c[1].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(cols: &[(&str, &str)], statement: &str) -> ResultSet {
        let columns = cols.iter().map(|(n, t)| ColumnMeta::new(n, t)).collect();
        ResultSet::new(columns, Vec::new(), statement)
    }

    #[test]
    fn identity_prefers_hint_match() {
        let r = rs(&[("name", "varchar"), ("order_id", "int"), ("id", "int")], "");
        assert_eq!(r.identity_column(), Some(1)); // first suffix match wins
    }

    #[test]
    fn identity_falls_back_to_first_column() {
        let r = rs(&[("alpha", "varchar"), ("beta", "int")], "");
        assert_eq!(r.identity_column(), Some(0));
    }

    #[test]
    fn identity_none_without_columns() {
        let r = rs(&[], "");
        assert_eq!(r.identity_column(), None);
    }

    #[test]
    fn identity_is_case_insensitive() {
        let r = rs(&[("CustomerID", "int"), ("Name", "varchar")], "");
        assert_eq!(r.identity_column(), Some(0));
    }

    #[test]
    fn table_name_simple() {
        let r = rs(&[], "select * from products where price > 5");
        assert_eq!(r.table_name().as_deref(), Some("products"));
    }

    #[test]
    fn table_name_with_schema() {
        let r = rs(&[], "SELECT a, b\nFROM dbo.Orders o JOIN x ON 1=1");
        assert_eq!(r.table_name().as_deref(), Some("dbo.Orders"));
    }

    #[test]
    fn table_name_bracketed() {
        let r = rs(&[], "select * from [My Schema].[Order Lines]");
        assert_eq!(r.table_name().as_deref(), Some("[My Schema].[Order Lines]"));
    }

    #[test]
    fn table_name_absent() {
        let r = rs(&[], "select 1 + 1");
        assert_eq!(r.table_name(), None);
    }

    #[test]
    fn numbers_format_without_float_noise() {
        assert_eq!(fmt_number(42.0), "42");
        assert_eq!(fmt_number(-3.5), "-3.5");
        assert_eq!(CellValue::Number(7.0).plain_text(), "7");
    }

    #[test]
    fn bytes_display_as_hex() {
        assert_eq!(CellValue::Bytes(vec![0xde, 0xad]).plain_text(), "0xDEAD");
    }
}
