// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Transposed sheet parsing
//!
//! Each sheet is named after an EIM ID. Column 0 holds field labels running
//! down the rows; every further column describes one API.

use crate::fields::{canonicalize, EIM_ID, REPOSITORY_URL};
use crate::types::{ApiRecord, CellGrid, FieldValue};
use crate::workbook::Workbook;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Parse one sheet into API records.
///
/// Sheets with fewer than two columns yield nothing. Within a column, a row
/// with a blank label or blank value is skipped; a repeated field name keeps
/// the lowest row's value. Columns without a repository URL are dropped.
#[must_use]
pub fn parse_sheet(sheet_name: &str, grid: &CellGrid) -> Vec<ApiRecord> {
    let columns = grid.column_count();
    if columns < 2 || grid.is_empty() {
        warn!("Skipping sheet '{}': no data columns", sheet_name);
        return Vec::new();
    }

    let eim_id = sheet_name.trim().to_string();
    let labels: Vec<Option<String>> = (0..grid.row_count())
        .map(|row| {
            let cell = grid.cell(row, 0);
            cell.to_field_value().map(|v| canonicalize(&v.as_text()))
        })
        .collect();

    debug!("Sheet '{}': {} API column(s)", sheet_name, columns - 1);

    let mut records = Vec::new();
    for col in 1..columns {
        match parse_column(&eim_id, &labels, grid, col) {
            Some(record) => {
                debug!(
                    "  API {}: {} -> {} (EIM: {})",
                    col,
                    record.display_name(),
                    record.repository_url,
                    eim_id
                );
                records.push(record);
            }
            None => debug!("  API {}: no repository URL, dropped", col),
        }
    }
    records
}

fn parse_column(
    eim_id: &str,
    labels: &[Option<String>],
    grid: &CellGrid,
    col: usize,
) -> Option<ApiRecord> {
    let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        let Some(name) = label else { continue };
        if let Some(value) = grid.cell(row, col).to_field_value() {
            fields.insert(name.clone(), value);
        }
    }

    let repository_url = fields.remove(REPOSITORY_URL)?.as_text();
    if repository_url.trim().is_empty() {
        return None;
    }
    fields.remove(EIM_ID);

    Some(ApiRecord {
        eim_id: eim_id.to_string(),
        repository_url,
        fields,
    })
}

/// Parse every sheet of a workbook, in sheet order
#[must_use]
pub fn parse_workbook(workbook: &Workbook) -> Vec<ApiRecord> {
    let names = workbook.sheet_names();
    info!("Parsing {} sheet(s): {}", names.len(), names.join(", "));

    let records: Vec<ApiRecord> = workbook
        .sheets()
        .flat_map(|(name, grid)| parse_sheet(name, grid))
        .collect();

    info!("Parsed {} API record(s)", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn grid(rows: Vec<Vec<CellValue>>) -> CellGrid {
        CellGrid::new(rows)
    }

    #[test]
    fn test_single_column_record() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/acme/pay/")],
            vec![text("version"), text("2.1")],
        ]);
        let records = parse_sheet("EIM100", &g);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.repository_url, "https://github.com/acme/pay/");
        assert_eq!(r.text("version").as_deref(), Some("2.1"));
        assert_eq!(r.eim_id, "EIM100");
    }

    #[test]
    fn test_sheet_name_is_trimmed() {
        let g = grid(vec![vec![text("API Repo"), text("https://x/a/b")]]);
        let records = parse_sheet("  EIM7 ", &g);
        assert_eq!(records[0].eim_id, "EIM7");
    }

    #[test]
    fn test_single_column_sheet_yields_nothing() {
        let g = grid(vec![vec![text("API Repo")], vec![text("version")]]);
        assert!(parse_sheet("EIM1", &g).is_empty());
        assert!(parse_sheet("EIM1", &CellGrid::default()).is_empty());
    }

    #[test]
    fn test_partial_rows_are_tolerated() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/a/one"), text("https://github.com/a/two")],
            vec![text("version"), CellValue::Empty, text("3.0")],
            vec![CellValue::Empty, text("orphan value"), text("orphan")],
            vec![text("classification"), text("internal"), text("   ")],
        ]);
        let records = parse_sheet("EIM2", &g);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].get("version"), None);
        assert_eq!(records[0].text("classification").as_deref(), Some("internal"));
        assert_eq!(records[0].fields.len(), 1);

        assert_eq!(records[1].text("version").as_deref(), Some("3.0"));
        assert_eq!(records[1].get("classification"), None);
    }

    #[test]
    fn test_column_without_repository_url_is_dropped() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/a/one"), text("  ")],
            vec![text("version"), text("1"), text("2")],
        ]);
        let records = parse_sheet("EIM3", &g);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repository_url, "https://github.com/a/one");
    }

    #[test]
    fn test_duplicate_field_last_row_wins() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/a/first")],
            vec![text("apiId"), text("https://github.com/a/second")],
            vec![text("version"), text("1.0")],
            vec![text("version"), text("1.1")],
        ]);
        let records = parse_sheet("EIM4", &g);
        assert_eq!(records[0].repository_url, "https://github.com/a/second");
        assert_eq!(records[0].text("version").as_deref(), Some("1.1"));
    }

    #[test]
    fn test_numeric_cells_keep_their_type() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/a/one")],
            vec![text("version"), CellValue::Number(2.0)],
        ]);
        let records = parse_sheet("EIM5", &g);
        assert_eq!(records[0].get("version"), Some(FieldValue::Number(2.0)));
        assert_eq!(records[0].text("version").as_deref(), Some("2"));
    }

    #[test]
    fn test_sheet_eim_label_does_not_override_sheet_name() {
        let g = grid(vec![
            vec![text("API Repo"), text("https://github.com/a/one")],
            vec![text("EIM ID"), text("OTHER")],
        ]);
        let records = parse_sheet("EIM6", &g);
        assert_eq!(records[0].eim_id, "EIM6");
        assert!(!records[0].fields.contains_key("eim_id"));
    }

    #[test]
    fn test_parse_workbook_keeps_sheet_order() {
        let wb = Workbook::from_sheets(vec![
            (
                "B".into(),
                grid(vec![vec![text("API Repo"), text("https://github.com/b/b")]]),
            ),
            ("Empty".into(), CellGrid::default()),
            (
                "A".into(),
                grid(vec![vec![text("API Repo"), text("https://github.com/a/a")]]),
            ),
        ]);
        let records = parse_workbook(&wb);
        let ids: Vec<_> = records.iter().map(|r| r.eim_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }
}
