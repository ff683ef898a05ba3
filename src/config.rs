// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest priority first: built-in defaults, the TOML config file,
//! `APIXFLOW_*` variables, then the conventional variables (`GITHUB_TOKEN`,
//! `HTTPS_PROXY`, `SSL_VERIFY`, ...).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default production publish endpoint
pub const DEFAULT_PUBLISH_ENDPOINT: &str = "https://apix.uk.hsbc/api/v1/publish/apis";

/// Default metadata file name inside a repository
pub const DEFAULT_METADATA_PATH: &str = "apix-metadata.json";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// GitHub content store
    pub github: GitHubSettings,
    /// Production publish endpoint
    pub publish: PublishSettings,
    /// Shared HTTP client options
    pub http: HttpSettings,
    /// Where the metadata workbook comes from
    pub workbook: WorkbookSettings,
}

/// GitHub settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// REST base URL override; derived from the repository host when unset
    pub api_base: Option<String>,
    /// Access token
    pub token: Option<String>,
    /// Path of the metadata file inside each repository
    pub metadata_path: String,
    /// Prefix of branches created for metadata pull requests
    pub branch_prefix: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            token: None,
            metadata_path: DEFAULT_METADATA_PATH.to_string(),
            branch_prefix: "apix-metadata-".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GitHubSettings {
    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Publish endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// Endpoint receiving metadata documents
    pub endpoint: String,
    /// Value of the `Authorization` header
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Prefix of the `Invocation-Source` header value
    pub invocation_prefix: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUBLISH_ENDPOINT.to_string(),
            token: None,
            timeout_secs: 60,
            invocation_prefix: "UI_".to_string(),
        }
    }
}

impl PublishSettings {
    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Invocation tag for an EIM ID
    #[must_use]
    pub fn invocation_tag(&self, eim_id: &str) -> String {
        format!("{}{}", self.invocation_prefix, eim_id)
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Proxy URL applied to all requests
    pub proxy: Option<String>,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Extra PEM root certificate
    pub ca_cert: Option<PathBuf>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            verify_tls: true,
            ca_cert: None,
        }
    }
}

/// Workbook source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookSettings {
    /// Local workbook file
    pub path: Option<PathBuf>,
    /// Repository holding the workbook
    pub repository: Option<String>,
    /// Path of the workbook inside `repository`
    pub file: Option<String>,
    /// Branch to read `file` from
    pub branch: Option<String>,
}

/// Where to read the metadata workbook from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookSource {
    /// Local file
    Local(PathBuf),
    /// File in a repository on the content store
    Remote {
        /// Repository URL
        repository: String,
        /// File path within the repository
        file: String,
        /// Branch
        branch: String,
    },
}

impl Settings {
    /// Resolve the workbook source; an explicit path wins over the settings
    pub fn workbook_source(&self, override_path: Option<&Path>) -> Result<WorkbookSource> {
        if let Some(path) = override_path.or(self.workbook.path.as_deref()) {
            return Ok(WorkbookSource::Local(path.to_path_buf()));
        }
        match (&self.workbook.repository, &self.workbook.file) {
            (Some(repository), Some(file)) => Ok(WorkbookSource::Remote {
                repository: repository.clone(),
                file: file.clone(),
                branch: self
                    .workbook
                    .branch
                    .clone()
                    .unwrap_or_else(|| "main".to_string()),
            }),
            (Some(_), None) => Err(Error::Config(
                "workbook.repository is set but workbook.file is not".into(),
            )),
            _ => Err(Error::Config(
                "no workbook configured; pass --workbook or set workbook.path".into(),
            )),
        }
    }

    /// Copy with tokens replaced by a mask, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.github.token = copy.github.token.as_deref().map(mask);
        copy.publish.token = copy.publish.token.as_deref().map(mask);
        copy
    }
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}

/// Default config file location
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "apixflow")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from disk and the environment
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let defaults = config::Config::try_from(&Settings::default())?;
    let mut builder = config::Config::builder().add_source(defaults);

    match path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!("config file not found: {}", p.display())));
            }
            builder = builder.add_source(config::File::from(p).required(true));
        }
        None => {
            if let Some(p) = default_config_path() {
                builder = builder.add_source(config::File::from(p).required(false));
            }
        }
    }

    let settings: Settings = builder
        .add_source(
            config::Environment::with_prefix("APIXFLOW")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Ok(apply_conventional_env(settings, |key| std::env::var(key).ok()))
}

/// Overlay the conventional environment variables on loaded settings
pub fn apply_conventional_env(
    mut settings: Settings,
    var: impl Fn(&str) -> Option<String>,
) -> Settings {
    let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("GITHUB_TOKEN").or_else(|| non_empty("SERVICE_GITHUB_TOKEN")) {
        settings.github.token = Some(token);
    }
    if let Some(base) = non_empty("GITHUB_API_BASE") {
        settings.github.api_base = Some(base);
    }
    if let Some(token) = non_empty("APIX_VALIDATION_TOKEN") {
        settings.publish.token = Some(token);
    }
    if let Some(proxy) = non_empty("HTTPS_PROXY")
        .or_else(|| non_empty("https_proxy"))
        .or_else(|| non_empty("HTTP_PROXY"))
        .or_else(|| non_empty("http_proxy"))
    {
        settings.http.proxy = Some(proxy);
    }
    if let Some(verify) = non_empty("SSL_VERIFY") {
        settings.http.verify_tls = !verify.trim().eq_ignore_ascii_case("false");
    }
    if let Some(cert) = non_empty("SSL_CERT_PATH") {
        settings.http.ca_cert = Some(PathBuf::from(cert));
    }
    settings
}
