// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! APIX metadata documents: generation from records and preview summaries
//!
//! A document has the shape `{"apixMetadata": {"list": [api, ...]}}` with
//! one camelCase `api` object per record.

use crate::error::{Error, Result};
use crate::fields;
use crate::types::{ApiRecord, FieldValue};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Flat record fields and where they land in an `api` object
const PLACEMENT: &[(&str, &[&str])] = &[
    ("api_technical_name", &["apiTechnicalName"]),
    ("version", &["version"]),
    ("api_contract_url", &["apiContractURL"]),
    ("snow_business_application_id", &["businessApplicationID"]),
    ("snow_application_service_id", &["applicationServiceId"]),
    ("classification", &["classification"]),
    ("source_code_path", &["sourceCode", "pathToSource"]),
    ("source_code_url", &["sourceCode", "url"]),
    ("source_code_reference", &["sourceCode", "reference"]),
    ("platform_provider", &["platform", "provider"]),
    ("platform_technology", &["platform", "technology"]),
    ("platform_team", &["platform", "team"]),
    ("lifecycle_status", &["lifecycleStatus"]),
    ("gateway_type", &["gateway", "type"]),
    ("gateway_proxy_url", &["gateway", "proxyURL"]),
    ("gateway_config_url", &["gateway", "configURL"]),
    ("api_hosting_country", &["apiHostingCountry"]),
    ("documentation_url", &["documentationURL"]),
    ("application_name", &["applicationName"]),
];

/// A metadata document ready for validation, commit and publishing
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    value: Value,
}

impl MetadataDocument {
    /// Build a document describing `records`, in order
    #[must_use]
    pub fn generate(records: &[ApiRecord]) -> Self {
        let list: Vec<Value> = records.iter().map(api_entry).collect();
        Self {
            value: json!({ "apixMetadata": { "list": list } }),
        }
    }

    /// Parse document text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map(Self::from_value)
            .map_err(|e| Error::MalformedDocument(e.to_string()))
    }

    /// Wrap an already-parsed document
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// The JSON value
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Pretty-printed JSON text
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        // Serializing a Value cannot fail
        serde_json::to_string_pretty(&self.value).unwrap_or_default()
    }

    /// Entries of `apixMetadata.list`, or the whole document when it is not
    /// nested that way
    #[must_use]
    pub fn entries(&self) -> Vec<&Value> {
        match self.value.pointer("/apixMetadata/list") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![&self.value],
        }
    }

    /// Number of APIs described
    #[must_use]
    pub fn api_count(&self) -> usize {
        match self.value.pointer("/apixMetadata/list") {
            Some(Value::Array(items)) => items.len(),
            _ => usize::from(self.value.is_object()),
        }
    }

    /// Preview of the first API
    #[must_use]
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary::of(self)
    }
}

fn api_entry(record: &ApiRecord) -> Value {
    let mut api = Map::new();

    for (field, path) in PLACEMENT {
        if let Some(value) = record.text(field) {
            place(&mut api, path, Value::String(value));
        }
    }

    let consumers = split_list(
        record
            .text("consumer_application_service_ids")
            .or_else(|| record.text("consumers")),
    );
    if !consumers.is_empty() {
        let items = consumers
            .into_iter()
            .map(|id| json!({ "applicationServiceId": id }))
            .collect();
        api.insert("consumers".into(), Value::Array(items));
    }

    let countries = split_list(record.text("consuming_country_code"));
    let members = split_list(record.text("consuming_group_member_code"));
    if !countries.is_empty() || !members.is_empty() {
        let groups = (0..countries.len().max(members.len()))
            .map(|i| {
                let mut group = Map::new();
                if let Some(c) = countries.get(i) {
                    group.insert("countryCode".into(), Value::String(c.clone()));
                }
                if let Some(m) = members.get(i) {
                    group.insert("groupMemberCode".into(), Value::String(m.clone()));
                }
                Value::Object(group)
            })
            .collect();
        api.insert("consumingCountryGroups".into(), Value::Array(groups));
    }

    api.insert("eimId".into(), Value::String(record.eim_id.clone()));
    api.insert(
        "repositoryURL".into(),
        Value::String(record.repository_url.trim().to_string()),
    );

    // A free-text country groups cell is kept only when no codes were given
    let keep_groups_text = !api.contains_key("consumingCountryGroups");
    let extra: Map<String, Value> = record
        .fields
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            !fields::is_known(name)
                || (name == "consuming_country_groups" && keep_groups_text)
        })
        .map(|(name, value)| (name.clone(), field_json(value)))
        .collect();
    if !extra.is_empty() {
        api.insert("additionalProperties".into(), Value::Object(extra));
    }

    Value::Object(api)
}

fn place(api: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            api.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = api
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                place(map, rest, value);
            }
        }
    }
}

fn field_json(value: &FieldValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Split a comma, semicolon or newline separated cell into trimmed items
fn split_list(text: Option<String>) -> Vec<String> {
    text.map(|t| {
        t.split([',', ';', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

static NULL: Value = Value::Null;

/// Key facts about the first API of a document, for previews
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// `apiTechnicalName`, if present
    pub technical_name: Option<String>,
    /// `version`, if present
    pub version: Option<String>,
    /// `platform.provider` (or `platform` when it is a plain string)
    pub platform_provider: Option<String>,
    /// `platform.technology`
    pub platform_technology: Option<String>,
    /// Number of top-level fields of the first API
    pub field_count: usize,
    /// Number of APIs in the document
    pub api_count: usize,
}

impl DocumentSummary {
    /// Summarize a document
    #[must_use]
    pub fn of(document: &MetadataDocument) -> Self {
        let first = document.entries().into_iter().next().unwrap_or(&NULL);
        let text = |v: Option<&Value>| v.and_then(scalar_text);

        let (provider, technology) = match first.get("platform") {
            Some(Value::Object(p)) => (text(p.get("provider")), text(p.get("technology"))),
            other => (text(other), None),
        };

        Self {
            technical_name: text(first.get("apiTechnicalName")),
            version: text(first.get("version")),
            platform_provider: provider,
            platform_technology: technology,
            field_count: first.as_object().map_or(0, Map::len),
            api_count: document.api_count(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
