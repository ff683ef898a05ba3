// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Fetching a repository's committed metadata document

use crate::error::{Error, Result};
use crate::github::{ContentStore, RepoCoordinates};
use serde_json::Value;
use tracing::{debug, info};

/// Branches tried in order when looking for the metadata file
pub const BRANCHES: [&str; 2] = ["main", "master"];

/// A metadata document read from a repository
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    /// Branch the document was found on
    pub branch: String,
    /// Parsed JSON
    pub document: Value,
}

/// Fetch and parse `path` from the repository, trying `main` then `master`.
///
/// Only a 404 moves on to the next branch. Transport, decoding and JSON
/// errors end the fetch immediately.
pub fn fetch(store: &dyn ContentStore, repository_url: &str, path: &str) -> Result<FetchedDocument> {
    let repo = RepoCoordinates::require(repository_url)?;

    for branch in BRANCHES {
        debug!("Fetching {} from {} on {}", path, repo, branch);
        let Some(bytes) = store.get_file(&repo, path, branch)? else {
            debug!("{} not on {}", path, branch);
            continue;
        };

        let text = String::from_utf8(bytes)
            .map_err(|e| Error::MalformedDocument(format!("{path} is not UTF-8: {e}")))?;
        let document = serde_json::from_str(&text)
            .map_err(|e| Error::MalformedDocument(format!("{path} is not valid JSON: {e}")))?;

        info!("Fetched {} from {} ({})", path, repo, branch);
        return Ok(FetchedDocument {
            branch: branch.to_string(),
            document,
        });
    }

    Err(Error::NotFound(format!(
        "{path} not found in {repo} on {}",
        BRANCHES.join(" or ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::PullRequestDraft;
    use crate::types::{PullRequestRef, PullRequestStatus};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory content store keyed by (branch, path)
    #[derive(Default)]
    struct MemoryStore {
        files: HashMap<(String, String), Vec<u8>>,
        requests: RefCell<Vec<String>>,
        fail_with: Option<u16>,
    }

    impl MemoryStore {
        fn with_file(branch: &str, path: &str, content: &str) -> Self {
            let mut store = Self::default();
            store
                .files
                .insert((branch.into(), path.into()), content.as_bytes().to_vec());
            store
        }
    }

    impl ContentStore for MemoryStore {
        fn get_file(&self, _repo: &RepoCoordinates, path: &str, branch: &str) -> Result<Option<Vec<u8>>> {
            self.requests.borrow_mut().push(branch.to_string());
            if let Some(status) = self.fail_with {
                return Err(Error::RemoteCallFailed {
                    status: Some(status),
                    body: "boom".into(),
                });
            }
            Ok(self.files.get(&(branch.to_string(), path.to_string())).cloned())
        }

        fn create_pull_request(&self, _: &RepoCoordinates, _: &PullRequestDraft) -> Result<PullRequestRef> {
            unimplemented!("not used by fetch tests")
        }

        fn latest_pull_request(&self, _: &RepoCoordinates, _: &str) -> Result<PullRequestStatus> {
            unimplemented!("not used by fetch tests")
        }
    }

    const URL: &str = "https://github.com/acme/pay";

    #[test]
    fn test_found_on_main() {
        let store = MemoryStore::with_file("main", "apix-metadata.json", r#"{"v":1}"#);
        let fetched = fetch(&store, URL, "apix-metadata.json").unwrap();
        assert_eq!(fetched.branch, "main");
        assert_eq!(fetched.document["v"], 1);
        assert_eq!(*store.requests.borrow(), vec!["main"]);
    }

    #[test]
    fn test_falls_back_to_master_once() {
        let store = MemoryStore::with_file("master", "apix-metadata.json", r#"{"v":2}"#);
        let fetched = fetch(&store, URL, "apix-metadata.json").unwrap();
        assert_eq!(fetched.branch, "master");
        assert_eq!(fetched.document["v"], 2);
        assert_eq!(*store.requests.borrow(), vec!["main", "master"]);
    }

    #[test]
    fn test_not_found_on_either_branch() {
        let store = MemoryStore::default();
        let err = fetch(&store, URL, "apix-metadata.json").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.requests.borrow().len(), 2);
    }

    #[test]
    fn test_remote_error_is_not_retried() {
        let store = MemoryStore {
            fail_with: Some(500),
            ..MemoryStore::default()
        };
        let err = fetch(&store, URL, "apix-metadata.json").unwrap_err();
        assert!(matches!(err, Error::RemoteCallFailed { status: Some(500), .. }));
        assert_eq!(*store.requests.borrow(), vec!["main"]);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let store = MemoryStore::with_file("main", "apix-metadata.json", "{not json");
        let err = fetch(&store, URL, "apix-metadata.json").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn test_unparseable_url() {
        let store = MemoryStore::default();
        let err = fetch(&store, "nowhere", "apix-metadata.json").unwrap_err();
        assert!(matches!(err, Error::PreconditionNotMet(_)));
        assert!(store.requests.borrow().is_empty());
    }
}
