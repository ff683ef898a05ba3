// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Repository URL normalization and grouping of API records by repository

use crate::types::ApiRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Normalize a repository URL for identity comparison.
///
/// Trims, lower-cases, strips one trailing slash, then strips one trailing
/// `.git`, in that order.
#[must_use]
pub fn normalize_repo_url(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let url = url.strip_suffix('/').unwrap_or(&url);
    let url = url.strip_suffix(".git").unwrap_or(url);
    url.to_string()
}

/// All records sharing one normalized repository URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryGroup {
    /// Normalized repository URL
    pub key: String,
    /// Records in first-seen order
    pub records: Vec<ApiRecord>,
}

/// Records grouped by normalized repository URL.
///
/// Groups keep the order in which their first record was seen, and records
/// keep their order within a group.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    groups: Vec<RepositoryGroup>,
    by_key: HashMap<String, usize>,
}

impl RepositoryIndex {
    /// Group records by normalized repository URL
    #[must_use]
    pub fn build(records: Vec<ApiRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }

        info!("Grouped into {} unique repositories", index.len());
        for group in &index.groups {
            tracing::debug!("  {}: {} API(s)", group.key, group.records.len());
        }
        index
    }

    fn insert(&mut self, record: ApiRecord) {
        let key = normalize_repo_url(&record.repository_url);
        match self.by_key.get(&key) {
            Some(&i) => self.groups[i].records.push(record),
            None => {
                self.by_key.insert(key.clone(), self.groups.len());
                self.groups.push(RepositoryGroup {
                    key,
                    records: vec![record],
                });
            }
        }
    }

    /// Records for a raw repository URL, if any
    #[must_use]
    pub fn lookup(&self, repo_url: &str) -> Option<&RepositoryGroup> {
        self.by_key
            .get(&normalize_repo_url(repo_url))
            .map(|&i| &self.groups[i])
    }

    /// All groups in first-seen order
    #[must_use]
    pub fn groups(&self) -> &[RepositoryGroup] {
        &self.groups
    }

    /// Groups containing at least one record from the given sheet
    #[must_use]
    pub fn groups_for_sheet(&self, eim_id: &str) -> Vec<&RepositoryGroup> {
        self.groups
            .iter()
            .filter(|g| g.records.iter().any(|r| r.eim_id == eim_id))
            .collect()
    }

    /// Number of distinct repositories
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no repository was indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of records across all groups
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }
}

/// Group records into a key -> records map, in first-seen order
#[must_use]
pub fn group(records: Vec<ApiRecord>) -> Vec<(String, Vec<ApiRecord>)> {
    RepositoryIndex::build(records)
        .groups
        .into_iter()
        .map(|g| (g.key, g.records))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(eim: &str, url: &str, name: &str) -> ApiRecord {
        let mut fields = BTreeMap::new();
        fields.insert("api_technical_name".to_string(), name.into());
        ApiRecord {
            eim_id: eim.into(),
            repository_url: url.into(),
            fields,
        }
    }

    #[test]
    fn test_normalize_order_of_operations() {
        assert_eq!(normalize_repo_url("https://github.com/acme/pay/"), "https://github.com/acme/pay");
        assert_eq!(normalize_repo_url(" HTTPS://GitHub.com/Acme/Pay.git "), "https://github.com/acme/pay");
        // slash is stripped before .git, so ".git/" loses both
        assert_eq!(normalize_repo_url("https://github.com/acme/pay.git/"), "https://github.com/acme/pay");
        // only one trailing slash is removed
        assert_eq!(normalize_repo_url("https://github.com/acme/pay//"), "https://github.com/acme/pay/");
        assert_eq!(normalize_repo_url(""), "");
    }

    #[test]
    fn test_grouping_merges_variants() {
        let index = RepositoryIndex::build(vec![
            record("E1", "https://github.com/acme/pay", "a"),
            record("E2", "https://github.com/other/repo", "b"),
            record("E1", "https://GITHUB.com/acme/pay.git", "c"),
            record("E3", "https://github.com/acme/pay/", "d"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.record_count(), 4);

        let group = index.lookup("https://github.com/Acme/Pay/").unwrap();
        let names: Vec<_> = group.records.iter().map(ApiRecord::display_name).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let grouped = group(vec![
            record("E1", "https://github.com/z/z", "1"),
            record("E1", "https://github.com/a/a", "2"),
            record("E1", "https://github.com/z/z", "3"),
        ]);
        let keys: Vec<_> = grouped.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["https://github.com/z/z", "https://github.com/a/a"]);
    }

    #[test]
    fn test_lookup_miss() {
        let index = RepositoryIndex::build(vec![record("E1", "https://github.com/a/a", "x")]);
        assert!(index.lookup("https://github.com/a/b").is_none());
    }

    #[test]
    fn test_groups_for_sheet() {
        let index = RepositoryIndex::build(vec![
            record("E1", "https://github.com/a/a", "x"),
            record("E2", "https://github.com/b/b", "y"),
            record("E2", "https://github.com/a/a", "z"),
        ]);
        assert_eq!(index.groups_for_sheet("E2").len(), 2);
        assert_eq!(index.groups_for_sheet("E1").len(), 1);
        assert!(index.groups_for_sheet("E9").is_empty());
    }
}
