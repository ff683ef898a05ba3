// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! apixflow library - publish API metadata from GitHub repositories to APIX
//!
//! The pipeline reads a transposed metadata workbook (one sheet per EIM ID,
//! one column per API), groups the resulting records by repository, and
//! drives a per-repository workflow: generate a metadata document, validate
//! it, commit it through a pull request, wait for the merge, and publish the
//! merged document to the production registry.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod fields;
pub mod github;
pub mod grouping;
pub mod publisher;
pub mod sheet;
pub mod validate;
pub mod workbook;
pub mod workflow;

pub use error::{Error, FieldProblem, Result};

/// Core data types shared by the parser, grouper and workflow
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::fmt;

    // =========================================================================
    // Cells
    // =========================================================================

    /// A single spreadsheet cell
    #[derive(Debug, Clone, PartialEq, Default)]
    pub enum CellValue {
        /// No value
        #[default]
        Empty,
        /// Text cell (kept verbatim, not trimmed)
        Text(String),
        /// Numeric cell
        Number(f64),
        /// Boolean cell
        Bool(bool),
    }

    impl CellValue {
        /// Empty cells and whitespace-only text count as blank
        #[must_use]
        pub fn is_blank(&self) -> bool {
            match self {
                Self::Empty => true,
                Self::Text(s) => s.trim().is_empty(),
                Self::Number(n) => n.is_nan(),
                Self::Bool(_) => false,
            }
        }

        /// Convert to a record value, `None` when blank
        #[must_use]
        pub fn to_field_value(&self) -> Option<FieldValue> {
            if self.is_blank() {
                return None;
            }
            match self {
                Self::Empty => None,
                Self::Text(s) => Some(FieldValue::Text(s.clone())),
                Self::Number(n) => Some(FieldValue::Number(*n)),
                Self::Bool(b) => Some(FieldValue::Bool(*b)),
            }
        }
    }

    /// Rows of cells for one sheet, addressed from A1
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CellGrid {
        rows: Vec<Vec<CellValue>>,
    }

    static EMPTY_CELL: CellValue = CellValue::Empty;

    impl CellGrid {
        /// Build a grid from rows; rows may have different lengths
        #[must_use]
        pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
            Self { rows }
        }

        /// All rows
        #[must_use]
        pub fn rows(&self) -> &[Vec<CellValue>] {
            &self.rows
        }

        /// Number of rows
        #[must_use]
        pub fn row_count(&self) -> usize {
            self.rows.len()
        }

        /// Width of the widest row
        #[must_use]
        pub fn column_count(&self) -> usize {
            self.rows.iter().map(Vec::len).max().unwrap_or(0)
        }

        /// Cell at (row, col); out-of-range cells read as empty
        #[must_use]
        pub fn cell(&self, row: usize, col: usize) -> &CellValue {
            self.rows
                .get(row)
                .and_then(|r| r.get(col))
                .unwrap_or(&EMPTY_CELL)
        }

        /// Whether the grid holds no non-blank cell
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.rows.iter().flatten().all(CellValue::is_blank)
        }
    }

    // =========================================================================
    // API records
    // =========================================================================

    /// Scalar value of a record field
    #[derive(Debug, Clone, PartialEq)]
    pub enum FieldValue {
        /// Text
        Text(String),
        /// Number
        Number(f64),
        /// Boolean
        Bool(bool),
    }

    impl FieldValue {
        /// Render as text; integral numbers lose their fractional part
        #[must_use]
        pub fn as_text(&self) -> String {
            match self {
                Self::Text(s) => s.clone(),
                Self::Number(n) => format_number(*n),
                Self::Bool(b) => b.to_string(),
            }
        }
    }

    impl fmt::Display for FieldValue {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.as_text())
        }
    }

    impl From<&str> for FieldValue {
        fn from(s: &str) -> Self {
            Self::Text(s.to_string())
        }
    }

    impl Serialize for FieldValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Self::Text(s) => serializer.serialize_str(s),
                Self::Bool(b) => serializer.serialize_bool(*b),
                Self::Number(n) => match integral(*n) {
                    Some(i) => serializer.serialize_i64(i),
                    None => serializer.serialize_f64(*n),
                },
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn integral(n: f64) -> Option<i64> {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
            Some(n as i64)
        } else {
            None
        }
    }

    fn format_number(n: f64) -> String {
        integral(n).map_or_else(|| n.to_string(), |i| i.to_string())
    }

    /// One API described by one data column of a transposed sheet
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct ApiRecord {
        /// Organizational identifier (the trimmed sheet name)
        pub eim_id: String,
        /// Repository URL exactly as written in the sheet
        pub repository_url: String,
        /// Remaining canonical fields
        #[serde(flatten)]
        pub fields: BTreeMap<String, FieldValue>,
    }

    impl ApiRecord {
        /// Look up a canonical field, including the two derived ones
        #[must_use]
        pub fn get(&self, name: &str) -> Option<FieldValue> {
            match name {
                "eim_id" => Some(FieldValue::Text(self.eim_id.clone())),
                "repository_url" => Some(FieldValue::Text(self.repository_url.clone())),
                other => self.fields.get(other).cloned(),
            }
        }

        /// Field rendered as text
        #[must_use]
        pub fn text(&self, name: &str) -> Option<String> {
            self.get(name).map(|v| v.as_text())
        }

        /// The API technical name, or `N/A`
        #[must_use]
        pub fn display_name(&self) -> String {
            self.text("api_technical_name")
                .unwrap_or_else(|| "N/A".to_string())
        }
    }

    // =========================================================================
    // Pull requests
    // =========================================================================

    /// Reference to a pull request on the content store
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct PullRequestRef {
        /// Browser URL of the pull request
        pub url: String,
        /// Pull request number
        pub number: u64,
        /// Head branch name
        pub branch: String,
    }

    /// Lifecycle state of a pull request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum PrState {
        /// Open, awaiting review
        Open,
        /// Closed without merging
        Closed,
        /// Merged
        Merged,
    }

    /// Result of a pull-request status check
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PullRequestStatus {
        /// No metadata pull request exists
        Absent,
        /// The newest metadata pull request
        Present {
            /// Which pull request
            pr: PullRequestRef,
            /// Its state
            state: PrState,
        },
    }

    impl PullRequestStatus {
        /// Whether a pull request was found at all
        #[must_use]
        pub fn pr_exists(&self) -> bool {
            matches!(self, Self::Present { .. })
        }

        /// Whether the pull request has been merged
        #[must_use]
        pub fn is_merged(&self) -> bool {
            matches!(self, Self::Present { state: PrState::Merged, .. })
        }

        /// True when a new pull request may be opened: none exists or the
        /// existing one was closed without merging
        #[must_use]
        pub fn permits_new_pr(&self) -> bool {
            matches!(self, Self::Absent | Self::Present { state: PrState::Closed, .. })
        }

        /// Flat report in the shape the registry tooling expects
        #[must_use]
        pub fn report(&self) -> PullRequestReport {
            match self {
                Self::Absent => PullRequestReport {
                    pr_exists: false,
                    pr_state: None,
                    is_merged: false,
                    can_publish: false,
                    pr_url: None,
                    pr_number: None,
                },
                Self::Present { pr, state } => PullRequestReport {
                    pr_exists: true,
                    pr_state: Some(*state),
                    is_merged: *state == PrState::Merged,
                    can_publish: *state == PrState::Merged,
                    pr_url: Some(pr.url.clone()),
                    pr_number: Some(pr.number),
                },
            }
        }
    }

    /// Serializable view of a [`PullRequestStatus`]
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct PullRequestReport {
        /// Whether a pull request exists
        pub pr_exists: bool,
        /// Its state, if any
        pub pr_state: Option<PrState>,
        /// Whether it is merged
        pub is_merged: bool,
        /// Whether publishing may proceed
        pub can_publish: bool,
        /// Browser URL
        pub pr_url: Option<String>,
        /// Number
        pub pr_number: Option<u64>,
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Summary of a successful publish
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct PublishSummary {
        /// Repository the metadata came from
        pub repository_url: String,
        /// EIM ID used for the invocation tag
        pub eim_id: String,
        /// Number of APIs in the published document
        pub published_apis: usize,
        /// When the publish completed
        pub timestamp: DateTime<Utc>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{Error, FieldProblem, Result};
    pub use crate::types::*;
}
