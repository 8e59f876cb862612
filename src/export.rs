//! Clipboard encoders for the results grid.
//!
//! Every encoding walks columns in VISUAL order (through the column-order
//! model) so what lands on the clipboard matches what the selection looks
//! like on screen. NULL becomes an empty field in plain-text encodings and
//! a `NULL` literal in the SQL ones.

use std::time::{Duration, Instant};

use copypasta::{ClipboardContext, ClipboardProvider};

use crate::column_order::ColumnOrder;
use crate::edits::EditTracker;
use crate::resultset::{CellValue, ResultSet};
use crate::selection::SelectionRange;
use crate::sqlgen::format_value_for_insert;

/// How long the "just copied" highlight stays on screen.
pub const COPIED_MARK_TTL: Duration = Duration::from_millis(1500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyFormat {
    Cell,
    CellWithHeader,
    TabSeparated,
    TabSeparatedWithHeader,
    InsertValues,
    InClause,
}

fn effective<'a>(
    result: &'a ResultSet,
    edits: &'a EditTracker,
    row: usize,
    col: usize,
) -> &'a CellValue {
    let original = result.cell(row, col).unwrap_or(&CellValue::Null);
    edits.effective(row, col, original)
}

/// Encode the selection in the requested format. Pending edits are read
/// through, so the clipboard always matches what the grid shows.
pub fn encode_selection(
    result: &ResultSet,
    order: &ColumnOrder,
    edits: &EditTracker,
    range: &SelectionRange,
    format: CopyFormat,
) -> String {
    let (r0, r1) = range.row_span();
    let cols = range.logical_cols(order);
    if cols.is_empty() || result.row_count() == 0 {
        return String::new();
    }
    let r1 = r1.min(result.row_count() - 1);

    match format {
        CopyFormat::Cell => effective(result, edits, r0, cols[0]).plain_text(),
        CopyFormat::CellWithHeader => {
            let col = cols[0];
            format!(
                "{}\n{}",
                result.columns[col].name,
                effective(result, edits, r0, col).plain_text()
            )
        }
        CopyFormat::TabSeparated | CopyFormat::TabSeparatedWithHeader => {
            let mut lines = Vec::with_capacity(r1 - r0 + 2);
            if format == CopyFormat::TabSeparatedWithHeader {
                lines.push(
                    cols.iter()
                        .map(|&c| result.columns[c].name.clone())
                        .collect::<Vec<_>>()
                        .join("\t"),
                );
            }
            for row in r0..=r1 {
                lines.push(
                    cols.iter()
                        .map(|&c| effective(result, edits, row, c).plain_text())
                        .collect::<Vec<_>>()
                        .join("\t"),
                );
            }
            lines.join("\n")
        }
        CopyFormat::InsertValues => encode_insert_values(result, edits, r0, r1, &cols),
        CopyFormat::InClause => {
            let mut literals = Vec::new();
            for row in r0..=r1 {
                for &c in &cols {
                    literals.push(format_value_for_insert(
                        effective(result, edits, row, c),
                        &result.columns[c].data_type,
                    ));
                }
            }
            format!("IN ({})", literals.join(", "))
        }
    }
}

/// `VALUES (..), (..)` tuples with per-column alignment padding so the
/// pasted block lines up.
fn encode_insert_values(
    result: &ResultSet,
    edits: &EditTracker,
    r0: usize,
    r1: usize,
    cols: &[usize],
) -> String {
    let mut literal_rows: Vec<Vec<String>> = Vec::with_capacity(r1 - r0 + 1);
    for row in r0..=r1 {
        literal_rows.push(
            cols.iter()
                .map(|&c| {
                    format_value_for_insert(
                        effective(result, edits, row, c),
                        &result.columns[c].data_type,
                    )
                })
                .collect(),
        );
    }

    let mut widths = vec![0usize; cols.len()];
    for row in &literal_rows {
        for (i, lit) in row.iter().enumerate() {
            widths[i] = widths[i].max(lit.chars().count());
        }
    }

    let tuples: Vec<String> = literal_rows
        .iter()
        .map(|row| {
            let padded: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, lit)| {
                    if i + 1 == row.len() {
                        lit.clone()
                    } else {
                        format!("{:width$}", lit, width = widths[i])
                    }
                })
                .collect();
            format!("({})", padded.join(", "))
        })
        .collect();

    format!("VALUES {}", tuples.join(",\n       "))
}

/// Write to the platform clipboard. Failure is logged and reported as a
/// bool; it never blocks the UI.
pub fn copy_to_clipboard(clipboard: &mut ClipboardContext, text: String) -> bool {
    match clipboard.set_contents(text) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("clipboard write failed: {}", e);
            false
        }
    }
}

/// The transient highlight over whatever was last copied.
#[derive(Clone, Copy, Debug)]
pub struct CopiedMark {
    pub range: SelectionRange,
    pub at: Instant,
}

impl CopiedMark {
    pub fn new(range: SelectionRange) -> Self {
        Self { range, at: Instant::now() }
    }

    pub fn is_active(&self) -> bool {
        self.at.elapsed() < COPIED_MARK_TTL
    }

    pub fn contains(&self, row: usize, col: usize, order: &ColumnOrder) -> bool {
        self.is_active() && self.range.contains(row, col, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resultset::ColumnMeta;

    fn fixture() -> ResultSet {
        ResultSet::new(
            vec![
                ColumnMeta::new("id", "int"),
                ColumnMeta::new("name", "nvarchar(50)"),
                ColumnMeta::new("price", "decimal(10,2)"),
            ],
            vec![
                vec![
                    CellValue::Number(1.0),
                    CellValue::Text("Anvil".into()),
                    CellValue::Number(9.5),
                ],
                vec![
                    CellValue::Number(2.0),
                    CellValue::Null,
                    CellValue::Number(120.0),
                ],
            ],
            "select * from products",
        )
    }

    #[test]
    fn single_cell_copies_raw_text_and_null_as_empty() {
        let result = fixture();
        let order = ColumnOrder::identity(3);
        let edits = EditTracker::new();

        let cell = SelectionRange::cell(0, 1);
        assert_eq!(
            encode_selection(&result, &order, &edits, &cell, CopyFormat::Cell),
            "Anvil"
        );
        let null_cell = SelectionRange::cell(1, 1);
        assert_eq!(
            encode_selection(&result, &order, &edits, &null_cell, CopyFormat::Cell),
            ""
        );
        assert_eq!(
            encode_selection(&result, &order, &edits, &cell, CopyFormat::CellWithHeader),
            "name\nAnvil"
        );
    }

    #[test]
    fn tab_block_respects_visual_order() {
        let result = fixture();
        // name before id on screen
        let order = ColumnOrder::from_permutation(vec![1, 0, 2]).unwrap();
        let edits = EditTracker::new();
        let range = SelectionRange { start_row: 0, start_col: 1, end_row: 1, end_col: 0 };

        let text = encode_selection(
            &result,
            &order,
            &edits,
            &range,
            CopyFormat::TabSeparatedWithHeader,
        );
        assert_eq!(text, "name\tid\nAnvil\t1\n\t2");
    }

    #[test]
    fn insert_values_pads_columns() {
        let result = fixture();
        let order = ColumnOrder::identity(3);
        let edits = EditTracker::new();
        let range = SelectionRange { start_row: 0, start_col: 0, end_row: 1, end_col: 2 };

        let text = encode_selection(&result, &order, &edits, &range, CopyFormat::InsertValues);
        assert_eq!(
            text,
            "VALUES (1, N'Anvil', 9.5),\n       (2, NULL    , 120)"
        );
    }

    #[test]
    fn in_clause_flattens_all_selected_cells() {
        let result = fixture();
        let order = ColumnOrder::identity(3);
        let edits = EditTracker::new();
        let range = SelectionRange { start_row: 0, start_col: 0, end_row: 1, end_col: 0 };
        assert_eq!(
            encode_selection(&result, &order, &edits, &range, CopyFormat::InClause),
            "IN (1, 2)"
        );

        let wide = SelectionRange { start_row: 0, start_col: 1, end_row: 0, end_col: 2 };
        assert_eq!(
            encode_selection(&result, &order, &edits, &wide, CopyFormat::InClause),
            "IN (N'Anvil', 9.5)"
        );
    }

    #[test]
    fn pending_edits_are_read_through() {
        let result = fixture();
        let order = ColumnOrder::identity(3);
        let mut edits = EditTracker::new();
        edits.commit(0, 1, &CellValue::Text("Anvil".into()), "Hammer");

        let cell = SelectionRange::cell(0, 1);
        assert_eq!(
            encode_selection(&result, &order, &edits, &cell, CopyFormat::Cell),
            "Hammer"
        );
    }

    #[test]
    fn empty_result_encodes_to_nothing() {
        let result = ResultSet::new(vec![ColumnMeta::new("a", "int")], vec![], "select * from t");
        let order = ColumnOrder::identity(1);
        let edits = EditTracker::new();
        let range = SelectionRange::cell(0, 0);
        assert_eq!(
            encode_selection(&result, &order, &edits, &range, CopyFormat::TabSeparated),
            ""
        );
    }
}
