// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Workbook loading: decode `.xlsx` bytes into one cell grid per sheet

use crate::error::{Error, Result};
use crate::types::{CellGrid, CellValue};
use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// A decoded workbook: sheet names in workbook order and their grids
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, CellGrid)>,
}

impl Workbook {
    /// Decode workbook bytes, reading every sheet eagerly
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| Error::SourceUnreadable(format!("not a valid workbook: {e}")))?;

        let mut sheets = Vec::new();
        for name in xlsx.sheet_names() {
            let range = xlsx.worksheet_range(&name).map_err(|e| {
                Error::SourceUnreadable(format!("failed to read sheet '{name}': {e}"))
            })?;
            let grid = grid_from_range(&range);
            debug!(
                "Read sheet '{}' ({} rows x {} cols)",
                name,
                grid.row_count(),
                grid.column_count()
            );
            sheets.push((name, grid));
        }

        Ok(Self { sheets })
    }

    /// Read and decode a workbook file
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::SourceUnreadable(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Build a workbook directly from grids
    #[must_use]
    pub fn from_sheets(sheets: Vec<(String, CellGrid)>) -> Self {
        Self { sheets }
    }

    /// Sheet names in workbook order
    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Grid for the named sheet
    pub fn grid(&self, name: &str) -> Result<&CellGrid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, grid)| grid)
            .ok_or_else(|| {
                Error::SourceUnreadable(format!(
                    "sheet '{}' not found (available: {})",
                    name,
                    self.sheet_names().join(", ")
                ))
            })
    }

    /// Iterate over (name, grid) pairs in workbook order
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &CellGrid)> {
        self.sheets.iter().map(|(n, g)| (n.as_str(), g))
    }
}

/// Convert a calamine range into a grid anchored at A1.
///
/// calamine ranges start at the first used cell, so leading empty rows and
/// columns are padded back in to keep column 0 as column A.
fn grid_from_range(range: &Range<Data>) -> CellGrid {
    let Some((start_row, start_col)) = range.start() else {
        return CellGrid::default();
    };
    let start_col = start_col as usize;

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(cell_value));
        rows.push(cells);
    }
    CellGrid::new(rows)
}

#[allow(clippy::cast_precision_loss)]
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}
