// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! GitHub content store: file reads, pull-request creation and status

use crate::config::{HttpSettings, Settings};
use crate::error::{Error, Result};
use crate::types::{PrState, PullRequestRef, PullRequestStatus};
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

// =========================================================================
// Repository coordinates
// =========================================================================

/// Host, owner and name of a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoCoordinates {
    /// Host name, e.g. `github.com`
    pub host: String,
    /// Owner or organization
    pub owner: String,
    /// Repository name without `.git`
    pub name: String,
}

impl RepoCoordinates {
    /// Parse an HTTPS (`https://host/owner/repo`) or SSH
    /// (`git@host:owner/repo`, `ssh://git@host/owner/repo`) URL
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim().trim_end_matches('/');
        let url = url.strip_suffix(".git").unwrap_or(url);

        let (host, path) = if let Some(rest) = url.strip_prefix("git@") {
            rest.split_once(':')?
        } else {
            let rest = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))
                .or_else(|| url.strip_prefix("ssh://"))?;
            let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
            rest.split_once('/')?
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let name = segments.next()?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if host.is_empty() || owner.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            host: host.to_lowercase(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse, failing with [`Error::PreconditionNotMet`]
    pub fn require(url: &str) -> Result<Self> {
        Self::parse(url).ok_or_else(|| {
            Error::PreconditionNotMet(format!("not a recognizable repository URL: {url}"))
        })
    }

    /// REST base URL for this repository's host
    #[must_use]
    pub fn api_base(&self, override_base: Option<&str>) -> String {
        if let Some(base) = override_base {
            return base.trim_end_matches('/').to_string();
        }
        if self.host == "github.com" || self.host == "www.github.com" {
            "https://api.github.com".to_string()
        } else {
            format!("https://{}/api/v3", self.host)
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// =========================================================================
// Content store seam
// =========================================================================

/// A file change to propose through a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    /// New branch to create
    pub branch: String,
    /// File path inside the repository
    pub path: String,
    /// New file content
    pub content: String,
    /// Commit message
    pub commit_message: String,
    /// Pull request title
    pub title: String,
    /// Pull request body
    pub body: String,
}

/// Remote repository content and pull-request service
pub trait ContentStore {
    /// Raw bytes of `path` on `branch`, `None` when the store answers 404
    fn get_file(&self, repo: &RepoCoordinates, path: &str, branch: &str) -> Result<Option<Vec<u8>>>;

    /// Commit the draft's file on a new branch and open a pull request
    fn create_pull_request(
        &self,
        repo: &RepoCoordinates,
        draft: &PullRequestDraft,
    ) -> Result<PullRequestRef>;

    /// Newest pull request whose head branch starts with `branch_prefix`
    fn latest_pull_request(
        &self,
        repo: &RepoCoordinates,
        branch_prefix: &str,
    ) -> Result<PullRequestStatus>;
}

// =========================================================================
// HTTP plumbing
// =========================================================================

/// Build a blocking HTTP client from the shared settings
pub fn http_client(http: &HttpSettings) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("apixflow/", env!("CARGO_PKG_VERSION")));

    // Proxies come from settings only; the environment was already folded in
    match &http.proxy {
        Some(proxy) => {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        None => builder = builder.no_proxy(),
    }
    if !http.verify_tls {
        warn!("TLS certificate verification is DISABLED");
        builder = builder.danger_accept_invalid_certs(true);
    } else if let Some(path) = &http.ca_cert {
        let pem = std::fs::read(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| Error::Config(format!("invalid certificate {}: {e}", path.display())))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// `Authorization` header value for a GitHub token
#[must_use]
pub fn auth_header(token: &str) -> String {
    if token.starts_with("ghp_") || token.starts_with("github_pat_") {
        format!("Bearer {token}")
    } else {
        format!("token {token}")
    }
}

/// Fail with [`Error::RemoteCallFailed`] unless the response is 2xx
fn ensure_success(response: Response, step: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    debug!("{} failed: HTTP {} {}", step, status.as_u16(), body);
    Err(Error::RemoteCallFailed {
        status: Some(status.as_u16()),
        body,
    })
}

/// Decode a base64 payload as returned by the contents API (line-wrapped)
pub fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::MalformedDocument(format!("content is not valid base64: {e}")))
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
    state: String,
    merged_at: Option<String>,
    head: PullHead,
}

#[derive(Debug, Deserialize)]
struct PullHead {
    #[serde(rename = "ref")]
    branch: String,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

// =========================================================================
// GitHub REST client
// =========================================================================

/// [`ContentStore`] backed by the GitHub REST API (github.com or Enterprise)
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl GitHubClient {
    /// Build a client from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.github.token.is_none() {
            warn!("No GitHub token configured; private repositories will not be readable");
        }
        Ok(Self {
            client: http_client(&settings.http)?,
            api_base: settings.github.api_base.clone(),
            token: settings.github.token.clone(),
            timeout: settings.github.timeout(),
        })
    }

    fn repo_url(&self, repo: &RepoCoordinates, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            repo.api_base(self.api_base.as_deref()),
            repo.owner,
            repo.name,
            tail
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header("Accept", "application/vnd.github.v3+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            req = req.header("Authorization", auth_header(token));
        }
        req
    }

    fn content_response(
        &self,
        repo: &RepoCoordinates,
        path: &str,
        branch: &str,
    ) -> Result<Option<ContentResponse>> {
        let url = self.repo_url(repo, &format!("/contents/{path}"));
        debug!("GET {} (ref={})", url, branch);
        let response = self
            .request(Method::GET, &url)
            .query(&[("ref", branch)])
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, "read file")?;
        Ok(Some(response.json()?))
    }

    fn default_branch(&self, repo: &RepoCoordinates) -> Result<String> {
        let response = self.request(Method::GET, &self.repo_url(repo, "")).send()?;
        let info: RepoResponse = ensure_success(response, "read repository")?.json()?;
        Ok(info.default_branch)
    }

    fn branch_head(&self, repo: &RepoCoordinates, branch: &str) -> Result<String> {
        let url = self.repo_url(repo, &format!("/git/refs/heads/{branch}"));
        let response = self.request(Method::GET, &url).send()?;
        let reference: RefResponse = ensure_success(response, "read branch ref")?.json()?;
        Ok(reference.object.sha)
    }
}

impl ContentStore for GitHubClient {
    fn get_file(&self, repo: &RepoCoordinates, path: &str, branch: &str) -> Result<Option<Vec<u8>>> {
        let Some(content) = self.content_response(repo, path, branch)? else {
            return Ok(None);
        };
        let encoded = content.content.ok_or_else(|| {
            Error::MalformedDocument(format!(
                "no content returned for {repo}/{path}; the file may be too large"
            ))
        })?;
        decode_content(&encoded).map(Some)
    }

    fn create_pull_request(
        &self,
        repo: &RepoCoordinates,
        draft: &PullRequestDraft,
    ) -> Result<PullRequestRef> {
        let base = self.default_branch(repo)?;
        let base_sha = self.branch_head(repo, &base)?;
        debug!("Default branch {} at {}", base, base_sha);

        info!("Creating branch {} in {}", draft.branch, repo);
        let response = self
            .request(Method::POST, &self.repo_url(repo, "/git/refs"))
            .json(&CreateRef {
                reference: format!("refs/heads/{}", draft.branch),
                sha: &base_sha,
            })
            .send()?;
        ensure_success(response, "create branch")?;

        let existing_sha = self
            .content_response(repo, &draft.path, &draft.branch)?
            .and_then(|c| c.sha);
        if existing_sha.is_some() {
            debug!("{} exists on {}, updating", draft.path, draft.branch);
        }

        let response = self
            .request(Method::PUT, &self.repo_url(repo, &format!("/contents/{}", draft.path)))
            .json(&PutContent {
                message: &draft.commit_message,
                content: base64::engine::general_purpose::STANDARD.encode(draft.content.as_bytes()),
                branch: &draft.branch,
                sha: existing_sha,
            })
            .send()?;
        ensure_success(response, "write file")?;

        let response = self
            .request(Method::POST, &self.repo_url(repo, "/pulls"))
            .json(&CreatePull {
                title: &draft.title,
                body: &draft.body,
                head: &draft.branch,
                base: &base,
            })
            .send()?;
        let pull: PullResponse = ensure_success(response, "create pull request")?.json()?;
        info!("Opened pull request #{} {}", pull.number, pull.html_url);

        Ok(PullRequestRef {
            url: pull.html_url,
            number: pull.number,
            branch: pull.head.branch,
        })
    }

    fn latest_pull_request(
        &self,
        repo: &RepoCoordinates,
        branch_prefix: &str,
    ) -> Result<PullRequestStatus> {
        let response = self
            .request(Method::GET, &self.repo_url(repo, "/pulls"))
            .query(&[
                ("state", "all"),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", "50"),
            ])
            .send()?;
        let pulls: Vec<PullResponse> = ensure_success(response, "list pull requests")?.json()?;

        let Some(pull) = pulls
            .into_iter()
            .find(|p| p.head.branch.starts_with(branch_prefix))
        else {
            return Ok(PullRequestStatus::Absent);
        };

        let state = match (pull.state.as_str(), pull.merged_at.is_some()) {
            (_, true) => PrState::Merged,
            ("open", false) => PrState::Open,
            _ => PrState::Closed,
        };
        Ok(PullRequestStatus::Present {
            pr: PullRequestRef {
                url: pull.html_url,
                number: pull.number,
                branch: pull.head.branch,
            },
            state,
        })
    }
}
