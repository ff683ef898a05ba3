// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Publishing metadata documents to the production registry

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::github::http_client;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Header identifying who triggered a publish
pub const INVOCATION_HEADER: &str = "Invocation-Source";

/// Response to a successful publish
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    /// HTTP status returned by the endpoint
    pub status: u16,
    /// Response body, parsed when it is JSON
    pub body: Value,
}

/// Destination for metadata documents
pub trait PublishSink {
    /// Send `document` tagged with `invocation_tag`.
    ///
    /// Only HTTP 200 counts as success. Nothing is retried.
    fn publish(&self, document: &Value, invocation_tag: &str) -> Result<PublishReceipt>;
}

/// [`PublishSink`] posting to the APIX publish endpoint
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpPublisher {
    /// Build a publisher from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.publish.token.is_none() {
            warn!("No publish token configured; the endpoint will likely reject requests");
        }
        Ok(Self {
            client: http_client(&settings.http)?,
            endpoint: settings.publish.endpoint.clone(),
            token: settings.publish.token.clone(),
            timeout: settings.publish.timeout(),
        })
    }

    /// Endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PublishSink for HttpPublisher {
    fn publish(&self, document: &Value, invocation_tag: &str) -> Result<PublishReceipt> {
        info!("Publishing to {} as {}", self.endpoint, invocation_tag);

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header(INVOCATION_HEADER, invocation_tag)
            .json(document);
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text().map_err(Error::transport)?;

        if status != StatusCode::OK {
            warn!("Publish rejected: HTTP {}", status.as_u16());
            return Err(Error::RemoteCallFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        info!("Published successfully");
        Ok(PublishReceipt {
            status: status.as_u16(),
            body: serde_json::from_str(&body).unwrap_or(Value::String(body)),
        })
    }
}
