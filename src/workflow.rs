// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Per-repository publishing workflow
//!
//! A [`Session`] walks one repository through search, generation,
//! validation, pull request, merge check and publish. The current state is
//! a single [`Stage`] value carrying exactly the data that state needs, so
//! combinations such as "publishable but never validated" cannot be built.
//!
//! Transient phases (searching, generating, ...) only last for the duration
//! of one synchronous call and are reported through tracing. A failed stage
//! leaves the session in the stable state it was in before the call.

use crate::config::Settings;
use crate::document::MetadataDocument;
use crate::error::{Error, Result};
use crate::fetcher;
use crate::github::{ContentStore, PullRequestDraft, RepoCoordinates};
use crate::grouping::RepositoryIndex;
use crate::publisher::PublishSink;
use crate::types::{ApiRecord, PrState, PublishSummary, PullRequestRef, PullRequestStatus};
use crate::validate::{self, ValidationReport};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Commit message and pull request title for metadata changes
pub const COMMIT_MESSAGE: &str = "Add APIX metadata file";

// =========================================================================
// States
// =========================================================================

/// Every state of the workflow, stable and transient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// No repository selected
    Idle,
    /// Looking up a repository (transient)
    Searching,
    /// Records located
    Found,
    /// Building a document (transient)
    Generating,
    /// Document built
    Generated,
    /// Checking a document (transient)
    Validating,
    /// Document passed validation
    Validated,
    /// Opening a pull request (transient)
    PrPending,
    /// Pull request open
    PrCreated,
    /// Querying pull request state (transient)
    PrChecking,
    /// Pull request merged
    PublishReady,
    /// Sending to the registry (transient)
    Publishing,
    /// Done
    Published,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Searching => "Searching",
            Self::Found => "Found",
            Self::Generating => "Generating",
            Self::Generated => "Generated",
            Self::Validating => "Validating",
            Self::Validated => "Validated",
            Self::PrPending => "PRPending",
            Self::PrCreated => "PRCreated",
            Self::PrChecking => "PRChecking",
            Self::PublishReady => "PublishReady",
            Self::Publishing => "Publishing",
            Self::Published => "Published",
        };
        f.write_str(name)
    }
}

/// Records located for a repository
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    /// Repository URL as the user entered it
    pub repository_url: String,
    /// Every record for that repository, in sheet order
    pub records: Vec<ApiRecord>,
}

/// A generated document and the records it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Search result the draft came from
    pub found: Found,
    /// Indexes into `found.records` of the records used
    pub selected: Vec<usize>,
    /// The document
    pub document: MetadataDocument,
}

impl Draft {
    /// EIM ID of the first selected record
    #[must_use]
    pub fn eim_id(&self) -> &str {
        self.selected
            .first()
            .and_then(|&i| self.found.records.get(i))
            .map_or("", |r| r.eim_id.as_str())
    }
}

/// Stable workflow state with its payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    /// Nothing searched yet, or the last search failed
    #[default]
    Idle,
    /// Records found, nothing generated
    Found(Found),
    /// Document generated, not (or not successfully) validated
    Generated(Draft),
    /// Document validated
    Validated(Draft),
    /// Pull request open
    PrCreated(Draft, PullRequestRef),
    /// Pull request merged
    PublishReady(Draft, PullRequestRef),
    /// Published
    Published(Found, PublishSummary),
}

impl Stage {
    /// Which state this is
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Idle => StageKind::Idle,
            Self::Found(_) => StageKind::Found,
            Self::Generated(_) => StageKind::Generated,
            Self::Validated(_) => StageKind::Validated,
            Self::PrCreated(..) => StageKind::PrCreated,
            Self::PublishReady(..) => StageKind::PublishReady,
            Self::Published(..) => StageKind::Published,
        }
    }

    /// Search result, if any
    #[must_use]
    pub fn found(&self) -> Option<&Found> {
        match self {
            Self::Idle => None,
            Self::Found(found) | Self::Published(found, _) => Some(found),
            Self::Generated(draft)
            | Self::Validated(draft)
            | Self::PrCreated(draft, _)
            | Self::PublishReady(draft, _) => Some(&draft.found),
        }
    }

    /// Current draft, if any
    #[must_use]
    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Self::Generated(draft)
            | Self::Validated(draft)
            | Self::PrCreated(draft, _)
            | Self::PublishReady(draft, _) => Some(draft),
            _ => None,
        }
    }

    /// Current pull request, if any
    #[must_use]
    pub fn pull_request(&self) -> Option<&PullRequestRef> {
        match self {
            Self::PrCreated(_, pr) | Self::PublishReady(_, pr) => Some(pr),
            _ => None,
        }
    }
}

// =========================================================================
// Session
// =========================================================================

/// One user's walk through the workflow for one repository at a time
pub struct Session<'a> {
    index: &'a RepositoryIndex,
    store: &'a dyn ContentStore,
    sink: &'a dyn PublishSink,
    settings: &'a Settings,
    stage: Stage,
    last_validation: Option<ValidationReport>,
    last_error: Option<String>,
}

impl<'a> Session<'a> {
    /// Start an idle session
    #[must_use]
    pub fn new(
        index: &'a RepositoryIndex,
        store: &'a dyn ContentStore,
        sink: &'a dyn PublishSink,
        settings: &'a Settings,
    ) -> Self {
        Self {
            index,
            store,
            sink,
            settings,
            stage: Stage::Idle,
            last_validation: None,
            last_error: None,
        }
    }

    /// Current stable state
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Current state name
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    /// Result of the most recent validation since the last generate
    #[must_use]
    pub fn last_validation(&self) -> Option<&ValidationReport> {
        self.last_validation.as_ref()
    }

    /// Message of the most recent failed action
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Look up the records for a repository, discarding all prior state
    pub fn search(&mut self, repository_url: &str) -> Result<usize> {
        self.stage = Stage::Idle;
        self.last_validation = None;
        self.last_error = None;
        enter(StageKind::Searching);

        let url = repository_url.trim();
        if url.is_empty() {
            return self.fail(Error::PreconditionNotMet(
                "a repository URL is required".into(),
            ));
        }
        let Some(group) = self.index.lookup(url) else {
            return self.fail(Error::NotFound(format!(
                "no API records for repository {url}"
            )));
        };

        let count = group.records.len();
        info!("Found {} API record(s) for {}", count, group.key);
        self.settle(Stage::Found(Found {
            repository_url: url.to_string(),
            records: group.records.clone(),
        }));
        Ok(count)
    }

    /// Build a document from the selected records (all when `selection` is
    /// `None`). Indexes are zero-based positions in the search result.
    pub fn generate(&mut self, selection: Option<&[usize]>) -> Result<MetadataDocument> {
        let found = match &self.stage {
            Stage::Found(found) => found,
            Stage::Generated(draft) | Stage::Validated(draft) => &draft.found,
            other => {
                let err = rejected("generate", other.kind(), "search for a repository first");
                return self.fail(err);
            }
        };
        enter(StageKind::Generating);

        let selected = match resolve_selection(found.records.len(), selection) {
            Ok(selected) => selected,
            Err(e) => return self.fail(e),
        };
        let records: Vec<ApiRecord> = selected
            .iter()
            .map(|&i| found.records[i].clone())
            .collect();
        let document = MetadataDocument::generate(&records);
        debug!("Generated document with {} API(s)", document.api_count());

        let draft = Draft {
            found: found.clone(),
            selected,
            document: document.clone(),
        };
        self.last_validation = None;
        self.settle(Stage::Generated(draft));
        Ok(document)
    }

    /// Validate the current document
    pub fn validate(&mut self) -> Result<ValidationReport> {
        let draft = match &self.stage {
            Stage::Generated(draft) | Stage::Validated(draft) => draft.clone(),
            other => {
                let err = rejected("validate", other.kind(), "generate a document first");
                return self.fail(err);
            }
        };
        enter(StageKind::Validating);

        let report = validate::check(draft.document.value());
        self.last_validation = Some(report.clone());
        if report.valid {
            info!("Validation passed");
            self.settle(Stage::Validated(draft));
            Ok(report)
        } else {
            warn!("Validation failed with {} problem(s)", report.problems.len());
            self.stage = Stage::Generated(draft);
            self.fail(Error::ValidationFailed(report.problems))
        }
    }

    /// Commit the validated document through a new pull request
    pub fn create_pr(&mut self) -> Result<PullRequestRef> {
        let draft = match &self.stage {
            Stage::Validated(draft) | Stage::PublishReady(draft, _) => draft.clone(),
            Stage::PrCreated(_, pr) => {
                let err = Error::PreconditionNotMet(format!(
                    "pull request #{} is already open: {}",
                    pr.number, pr.url
                ));
                return self.fail(err);
            }
            other => {
                let err = rejected("create-pr", other.kind(), "the document must pass validation first");
                return self.fail(err);
            }
        };
        enter(StageKind::PrPending);

        let outcome = RepoCoordinates::require(&draft.found.repository_url).and_then(|repo| {
            let pr_draft = PullRequestDraft {
                branch: branch_name(&self.settings.github.branch_prefix),
                path: self.settings.github.metadata_path.clone(),
                content: draft.document.to_pretty_json(),
                commit_message: COMMIT_MESSAGE.to_string(),
                title: COMMIT_MESSAGE.to_string(),
                body: pr_body(&draft),
            };
            self.store.create_pull_request(&repo, &pr_draft)
        });

        match outcome {
            Ok(pr) => {
                info!("Pull request #{} created", pr.number);
                self.settle(Stage::PrCreated(draft, pr.clone()));
                Ok(pr)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Refresh the pull request state
    pub fn check_pr(&mut self) -> Result<PullRequestStatus> {
        let draft = match &self.stage {
            Stage::Validated(draft) | Stage::PrCreated(draft, _) | Stage::PublishReady(draft, _) => {
                draft.clone()
            }
            other => {
                let err = rejected("check-pr", other.kind(), "the document must pass validation first");
                return self.fail(err);
            }
        };
        enter(StageKind::PrChecking);

        let outcome = RepoCoordinates::require(&draft.found.repository_url).and_then(|repo| {
            self.store
                .latest_pull_request(&repo, &self.settings.github.branch_prefix)
        });
        let status = match outcome {
            Ok(status) => status,
            Err(e) => return self.fail(e),
        };

        let next = match &status {
            PullRequestStatus::Present { pr, state: PrState::Merged } => {
                Stage::PublishReady(draft, pr.clone())
            }
            PullRequestStatus::Present { pr, state: PrState::Open } => {
                Stage::PrCreated(draft, pr.clone())
            }
            PullRequestStatus::Absent | PullRequestStatus::Present { state: PrState::Closed, .. } => {
                Stage::Validated(draft)
            }
        };
        info!("Pull request check: {:?}", status.report());
        self.settle(next);
        Ok(status)
    }

    /// Fetch the merged document from the repository and publish it
    pub fn publish(&mut self) -> Result<PublishSummary> {
        let draft = match &self.stage {
            Stage::PublishReady(draft, _) => draft.clone(),
            other => {
                let err = rejected("publish", other.kind(), "the pull request must be merged first");
                return self.fail(err);
            }
        };
        enter(StageKind::Publishing);

        let eim_id = draft.eim_id().to_string();
        let outcome = fetcher::fetch(
            self.store,
            &draft.found.repository_url,
            &self.settings.github.metadata_path,
        )
        .and_then(|fetched| {
            let tag = self.settings.publish.invocation_tag(&eim_id);
            self.sink
                .publish(&fetched.document, &tag)
                .map(|_| MetadataDocument::from_value(fetched.document).api_count())
        });

        match outcome {
            Ok(published_apis) => {
                let summary = PublishSummary {
                    repository_url: draft.found.repository_url.clone(),
                    eim_id,
                    published_apis,
                    timestamp: Utc::now(),
                };
                info!("Published {} API(s) from {}", published_apis, summary.repository_url);
                self.settle(Stage::Published(draft.found, summary.clone()));
                Ok(summary)
            }
            Err(e) => self.fail(e),
        }
    }

    fn settle(&mut self, stage: Stage) {
        debug!("{} -> {}", self.stage.kind(), stage.kind());
        self.stage = stage;
        self.last_error = None;
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        warn!("{} (staying in {})", err, self.stage.kind());
        self.last_error = Some(err.to_string());
        Err(err)
    }
}

fn enter(kind: StageKind) {
    debug!("{}", kind);
}

fn rejected(action: &str, state: StageKind, hint: &str) -> Error {
    Error::PreconditionNotMet(format!("{action} is not allowed in state {state}: {hint}"))
}

fn resolve_selection(available: usize, selection: Option<&[usize]>) -> Result<Vec<usize>> {
    let Some(selection) = selection else {
        return Ok((0..available).collect());
    };
    if selection.is_empty() {
        return Err(Error::PreconditionNotMet("select at least one API".into()));
    }
    let mut selected = Vec::with_capacity(selection.len());
    for &i in selection {
        if i >= available {
            return Err(Error::PreconditionNotMet(format!(
                "API {} does not exist; {} found",
                i + 1,
                available
            )));
        }
        if !selected.contains(&i) {
            selected.push(i);
        }
    }
    Ok(selected)
}

/// Name of a new metadata branch, timestamped to the second
#[must_use]
pub fn branch_name(prefix: &str) -> String {
    format!("{prefix}{}", Utc::now().format("%Y%m%d-%H%M%S"))
}

fn pr_body(draft: &Draft) -> String {
    let mut body = String::from("This PR adds the APIX metadata file for API audit.\n\nAPIs:\n");
    for &i in &draft.selected {
        if let Some(record) = draft.found.records.get(i) {
            body.push_str(&format!("- {} (EIM {})\n", record.display_name(), record.eim_id));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::PublishReceipt;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    const REPO: &str = "https://github.com/acme/pay";

    struct FakeStore {
        pr_status: RefCell<PullRequestStatus>,
        file: Option<String>,
        created: Cell<u64>,
        fail_create: bool,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                pr_status: RefCell::new(PullRequestStatus::Absent),
                file: Some(r#"{"apixMetadata":{"list":[{"apiTechnicalName":"a"},{"apiTechnicalName":"b"}]}}"#.into()),
                created: Cell::new(0),
                fail_create: false,
            }
        }

        fn set_status(&self, state: PrState) {
            *self.pr_status.borrow_mut() = PullRequestStatus::Present { pr: pr_ref(7), state };
        }
    }

    fn pr_ref(number: u64) -> PullRequestRef {
        PullRequestRef {
            url: format!("https://github.com/acme/pay/pull/{number}"),
            number,
            branch: "apix-metadata-20250101-000000".into(),
        }
    }

    impl ContentStore for FakeStore {
        fn get_file(&self, _: &RepoCoordinates, _: &str, branch: &str) -> Result<Option<Vec<u8>>> {
            Ok(self
                .file
                .as_ref()
                .filter(|_| branch == "main")
                .map(|f| f.as_bytes().to_vec()))
        }

        fn create_pull_request(&self, _: &RepoCoordinates, draft: &PullRequestDraft) -> Result<PullRequestRef> {
            if self.fail_create {
                return Err(Error::RemoteCallFailed {
                    status: Some(422),
                    body: "Reference already exists".into(),
                });
            }
            assert_eq!(draft.path, "apix-metadata.json");
            assert!(draft.branch.starts_with("apix-metadata-"));
            self.created.set(self.created.get() + 1);
            Ok(pr_ref(self.created.get()))
        }

        fn latest_pull_request(&self, _: &RepoCoordinates, _: &str) -> Result<PullRequestStatus> {
            Ok(self.pr_status.borrow().clone())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        tags: RefCell<Vec<String>>,
        reject: Option<u16>,
    }

    impl PublishSink for FakeSink {
        fn publish(&self, _: &serde_json::Value, tag: &str) -> Result<PublishReceipt> {
            self.tags.borrow_mut().push(tag.to_string());
            match self.reject {
                Some(status) => Err(Error::RemoteCallFailed {
                    status: Some(status),
                    body: "denied".into(),
                }),
                None => Ok(PublishReceipt {
                    status: 200,
                    body: serde_json::Value::Null,
                }),
            }
        }
    }

    fn record(name: &str, complete: bool) -> ApiRecord {
        let mut fields = BTreeMap::new();
        fields.insert("api_technical_name".to_string(), name.into());
        if complete {
            for (k, v) in [
                ("version", "1.0"),
                ("lifecycle_status", "LIVE"),
                ("classification", "internal"),
                ("snow_business_application_id", "BA1"),
                ("platform_provider", "AWS"),
            ] {
                fields.insert(k.to_string(), v.into());
            }
        }
        ApiRecord {
            eim_id: "EIM100".into(),
            repository_url: format!("{REPO}/"),
            fields,
        }
    }

    fn index(complete: bool) -> RepositoryIndex {
        RepositoryIndex::build(vec![record("a", complete), record("b", complete)])
    }

    /// Drive a session to the given state
    fn advance(session: &mut Session<'_>, store: &FakeStore, to: StageKind) {
        session.search(REPO).unwrap();
        if to == StageKind::Found {
            return;
        }
        session.generate(None).unwrap();
        if to == StageKind::Generated {
            return;
        }
        session.validate().unwrap();
        if to == StageKind::Validated {
            return;
        }
        session.create_pr().unwrap();
        if to == StageKind::PrCreated {
            return;
        }
        store.set_status(PrState::Merged);
        session.check_pr().unwrap();
        assert_eq!(session.kind(), StageKind::PublishReady);
    }

    #[test]
    fn test_happy_path() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        assert_eq!(session.kind(), StageKind::Idle);

        assert_eq!(session.search("https://GitHub.com/acme/pay.git").unwrap(), 2);
        assert_eq!(session.kind(), StageKind::Found);

        let doc = session.generate(Some(&[1])).unwrap();
        assert_eq!(doc.api_count(), 1);
        assert_eq!(session.kind(), StageKind::Generated);

        assert!(session.validate().unwrap().valid);
        let pr = session.create_pr().unwrap();
        assert_eq!(pr.number, 1);
        assert_eq!(session.kind(), StageKind::PrCreated);

        store.set_status(PrState::Open);
        session.check_pr().unwrap();
        assert_eq!(session.kind(), StageKind::PrCreated);

        store.set_status(PrState::Merged);
        assert!(session.check_pr().unwrap().is_merged());
        assert_eq!(session.kind(), StageKind::PublishReady);

        let summary = session.publish().unwrap();
        assert_eq!(summary.published_apis, 2);
        assert_eq!(summary.eim_id, "EIM100");
        assert_eq!(session.kind(), StageKind::Published);
        assert_eq!(*sink.tags.borrow(), vec!["UI_EIM100"]);
    }

    #[test]
    fn test_create_pr_requires_passing_validation() {
        let (idx, store, sink, settings) = (index(false), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);

        advance(&mut session, &store, StageKind::Found);
        assert!(matches!(session.create_pr(), Err(Error::PreconditionNotMet(_))));

        session.generate(None).unwrap();
        assert!(matches!(session.create_pr(), Err(Error::PreconditionNotMet(_))));

        assert!(matches!(session.validate(), Err(Error::ValidationFailed(_))));
        assert_eq!(session.kind(), StageKind::Generated);
        assert!(!session.last_validation().unwrap().valid);
        assert!(matches!(session.create_pr(), Err(Error::PreconditionNotMet(_))));
        assert_eq!(store.created.get(), 0);
    }

    #[test]
    fn test_publish_requires_merged_pr() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);

        assert!(matches!(session.publish(), Err(Error::PreconditionNotMet(_))));
        advance(&mut session, &store, StageKind::Validated);
        assert!(matches!(session.publish(), Err(Error::PreconditionNotMet(_))));

        session.create_pr().unwrap();
        store.set_status(PrState::Open);
        session.check_pr().unwrap();
        assert!(matches!(session.publish(), Err(Error::PreconditionNotMet(_))));
        assert!(sink.tags.borrow().is_empty());
        assert!(session.last_error().is_some());
    }

    #[test]
    fn test_closed_pr_allows_new_pr() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::PrCreated);

        // an open pull request blocks a second one
        assert!(matches!(session.create_pr(), Err(Error::PreconditionNotMet(_))));

        store.set_status(PrState::Closed);
        let status = session.check_pr().unwrap();
        let report = status.report();
        assert!(report.pr_exists && !report.is_merged);
        assert!(status.permits_new_pr());
        assert_eq!(session.kind(), StageKind::Validated);

        assert_eq!(session.create_pr().unwrap().number, 2);
    }

    #[test]
    fn test_absent_pr_behaves_like_closed() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::Validated);

        assert!(!session.check_pr().unwrap().pr_exists());
        assert_eq!(session.kind(), StageKind::Validated);
        assert!(session.create_pr().is_ok());
    }

    #[test]
    fn test_search_discards_downstream_state() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::PublishReady);

        session.search(REPO).unwrap();
        assert_eq!(session.kind(), StageKind::Found);
        assert!(session.stage().pull_request().is_none());
        assert!(session.stage().draft().is_none());
        assert!(session.last_validation().is_none());
        assert!(matches!(session.publish(), Err(Error::PreconditionNotMet(_))));
    }

    #[test]
    fn test_failed_search_resets_to_idle() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::Generated);

        assert!(matches!(session.search("https://github.com/acme/nope"), Err(Error::NotFound(_))));
        assert_eq!(session.kind(), StageKind::Idle);
        assert!(matches!(session.search("   "), Err(Error::PreconditionNotMet(_))));
    }

    #[test]
    fn test_remote_failure_keeps_prior_state() {
        let (idx, sink, settings) = (index(true), FakeSink::default(), Settings::default());
        let store = FakeStore {
            fail_create: true,
            ..FakeStore::new()
        };
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::Validated);

        let err = session.create_pr().unwrap_err();
        assert!(matches!(err, Error::RemoteCallFailed { status: Some(422), .. }));
        assert_eq!(session.kind(), StageKind::Validated);
        assert!(session.last_error().unwrap().contains("422"));
    }

    #[test]
    fn test_publish_failure_stays_publish_ready() {
        let (idx, store, settings) = (index(true), FakeStore::new(), Settings::default());
        let sink = FakeSink {
            reject: Some(403),
            ..FakeSink::default()
        };
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::PublishReady);

        assert!(matches!(session.publish(), Err(Error::RemoteCallFailed { status: Some(403), .. })));
        assert_eq!(session.kind(), StageKind::PublishReady);
    }

    #[test]
    fn test_publish_without_metadata_file() {
        let (idx, sink, settings) = (index(true), FakeSink::default(), Settings::default());
        let store = FakeStore {
            file: None,
            ..FakeStore::new()
        };
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::PublishReady);

        assert!(matches!(session.publish(), Err(Error::NotFound(_))));
        assert!(sink.tags.borrow().is_empty());
    }

    #[test]
    fn test_regenerate_discards_validation() {
        let (idx, store, sink, settings) = (index(true), FakeStore::new(), FakeSink::default(), Settings::default());
        let mut session = Session::new(&idx, &store, &sink, &settings);
        advance(&mut session, &store, StageKind::Validated);

        session.generate(Some(&[0])).unwrap();
        assert_eq!(session.kind(), StageKind::Generated);
        assert!(session.last_validation().is_none());
        assert!(matches!(session.create_pr(), Err(Error::PreconditionNotMet(_))));
    }

    #[test]
    fn test_selection_bounds() {
        assert_eq!(resolve_selection(3, None).unwrap(), vec![0, 1, 2]);
        assert_eq!(resolve_selection(3, Some(&[2, 0, 2])).unwrap(), vec![2, 0]);
        assert!(resolve_selection(3, Some(&[3])).is_err());
        assert!(resolve_selection(3, Some(&[])).is_err());
    }

    #[test]
    fn test_branch_name_format() {
        let name = branch_name("apix-metadata-");
        let stamp = name.strip_prefix("apix-metadata-").unwrap();
        assert_eq!(stamp.len(), "20250101-000000".len());
        assert_eq!(stamp.as_bytes()[8], b'-');
    }
}
