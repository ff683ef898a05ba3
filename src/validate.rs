// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Local validation of metadata documents
//!
//! Every problem is collected rather than stopping at the first one, so a
//! user can fix a document in a single pass.

use crate::error::{Error, FieldProblem, Result};
use crate::github::RepoCoordinates;
use serde::Serialize;
use serde_json::Value;

/// Fields every API entry must carry with a non-blank value
const REQUIRED: &[&str] = &[
    "apiTechnicalName",
    "version",
    "lifecycleStatus",
    "classification",
    "businessApplicationID",
    "platform.provider",
];

/// Fields that must hold an http(s) URL when present
const URL_FIELDS: &[&str] = &[
    "apiContractURL",
    "documentationURL",
    "sourceCode.url",
    "gateway.proxyURL",
    "gateway.configURL",
];

/// Source repository; HTTPS and SSH clone URLs are both accepted
const REPOSITORY_FIELD: &str = "repositoryURL";

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when no problem was found
    pub valid: bool,
    /// Number of API entries inspected
    pub api_count: usize,
    /// Problems found, in document order
    pub problems: Vec<FieldProblem>,
}

impl ValidationReport {
    /// Turn a failing report into [`Error::ValidationFailed`]
    pub fn into_result(self) -> Result<Self> {
        if self.valid {
            Ok(self)
        } else {
            Err(Error::ValidationFailed(self.problems))
        }
    }
}

/// Validate a metadata document
#[must_use]
pub fn check(document: &Value) -> ValidationReport {
    let mut problems = Vec::new();

    let list = match document.pointer("/apixMetadata/list") {
        Some(Value::Array(list)) => Some(list),
        Some(_) => {
            problems.push(FieldProblem::new("apixMetadata.list", "must be an array"));
            None
        }
        None if document.is_object() => {
            problems.push(FieldProblem::new("apixMetadata.list", "is missing"));
            None
        }
        None => {
            problems.push(FieldProblem::new("$", "document must be a JSON object"));
            None
        }
    };

    let mut api_count = 0;
    if let Some(list) = list {
        if list.is_empty() {
            problems.push(FieldProblem::new("apixMetadata.list", "must not be empty"));
        }
        api_count = list.len();
        for (i, entry) in list.iter().enumerate() {
            check_entry(&format!("apixMetadata.list[{i}]"), entry, &mut problems);
        }
    }

    ValidationReport {
        valid: problems.is_empty(),
        api_count,
        problems,
    }
}

/// Validate and fail with [`Error::ValidationFailed`] on any problem
pub fn validate(document: &Value) -> Result<ValidationReport> {
    check(document).into_result()
}

fn check_entry(prefix: &str, entry: &Value, problems: &mut Vec<FieldProblem>) {
    if !entry.is_object() {
        problems.push(FieldProblem::new(prefix, "must be an object"));
        return;
    }

    for field in REQUIRED {
        let path = format!("{prefix}.{field}");
        match lookup(entry, field) {
            None | Some(Value::Null) => problems.push(FieldProblem::new(path, "is required")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                problems.push(FieldProblem::new(path, "must not be blank"));
            }
            Some(Value::Array(_) | Value::Object(_)) => {
                problems.push(FieldProblem::new(path, "must be a scalar value"));
            }
            Some(_) => {}
        }
    }

    for field in URL_FIELDS {
        let Some(value) = lookup(entry, field) else {
            continue;
        };
        let path = format!("{prefix}.{field}");
        match value {
            Value::Null => {}
            Value::String(s) if is_http_url(s) => {}
            Value::String(_) => {
                problems.push(FieldProblem::new(path, "must start with http:// or https://"));
            }
            _ => problems.push(FieldProblem::new(path, "must be a URL string")),
        }
    }

    match lookup(entry, REPOSITORY_FIELD) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if RepoCoordinates::parse(s).is_some() => {}
        Some(_) => problems.push(FieldProblem::new(
            format!("{prefix}.{REPOSITORY_FIELD}"),
            "must be an https or SSH repository URL",
        )),
    }
}

fn lookup<'a>(entry: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(entry, |v, key| v.get(key))
}

fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("https://") || s.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn good_api() -> Value {
        json!({
            "apiTechnicalName": "payments-api",
            "version": "2.1",
            "lifecycleStatus": "LIVE",
            "classification": "internal",
            "businessApplicationID": "BA001",
            "platform": { "provider": "AWS" },
            "repositoryURL": "https://github.com/acme/pay"
        })
    }

    #[test]
    fn test_valid_document() {
        let doc = json!({ "apixMetadata": { "list": [good_api()] } });
        let report = validate(&doc).unwrap();
        assert!(report.valid);
        assert_eq!(report.api_count, 1);
    }

    #[test]
    fn test_collects_every_problem() {
        let mut api = good_api();
        api["version"] = json!("  ");
        api.as_object_mut().unwrap().remove("classification");
        api["documentationURL"] = json!("ftp://docs");
        let doc = json!({ "apixMetadata": { "list": [good_api(), api] } });

        let report = check(&doc);
        assert!(!report.valid);
        let paths: Vec<_> = report.problems.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "apixMetadata.list[1].version",
                "apixMetadata.list[1].classification",
                "apixMetadata.list[1].documentationURL",
            ]
        );
    }

    #[test]
    fn test_nested_required_field() {
        let mut api = good_api();
        api["platform"] = json!({ "technology": "k8s" });
        let report = check(&json!({ "apixMetadata": { "list": [api] } }));
        assert_eq!(report.problems[0].path, "apixMetadata.list[0].platform.provider");
    }

    #[test]
    fn test_numeric_version_is_accepted() {
        let mut api = good_api();
        api["version"] = json!(3);
        assert!(check(&json!({ "apixMetadata": { "list": [api] } })).valid);
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let doc = json!({ "apixMetadata": { "list": [good_api(), good_api()] } });
        assert!(check(&doc).valid);
    }

    #[test]
    fn test_structural_problems() {
        assert_eq!(check(&json!([])).problems[0].path, "$");
        assert_eq!(check(&json!({})).problems[0].message, "is missing");
        assert_eq!(
            check(&json!({ "apixMetadata": { "list": [] } })).problems[0].message,
            "must not be empty"
        );
        assert_eq!(
            check(&json!({ "apixMetadata": { "list": ["x"] } })).problems[0].path,
            "apixMetadata.list[0]"
        );
    }

    #[test]
    fn test_repository_url_forms() {
        for url in [
            "git@github.com:acme/pay.git",
            "ssh://git@github.example.com/acme/pay",
            "https://github.com/acme/pay.git",
        ] {
            let mut api = good_api();
            api["repositoryURL"] = json!(url);
            let report = check(&json!({ "apixMetadata": { "list": [api] } }));
            assert!(report.valid, "{url}: {:?}", report.problems);
        }

        let mut api = good_api();
        api["repositoryURL"] = json!("acme/pay");
        let report = check(&json!({ "apixMetadata": { "list": [api] } }));
        assert_eq!(report.problems[0].path, "apixMetadata.list[0].repositoryURL");
    }

    #[test]
    fn test_generated_from_ssh_sheet_url() {
        use crate::document::MetadataDocument;
        use crate::types::ApiRecord;

        let fields = [
            ("api_technical_name", "payments-api"),
            ("version", "2.1"),
            ("lifecycle_status", "LIVE"),
            ("classification", "internal"),
            ("snow_business_application_id", "BA001"),
            ("platform_provider", "AWS"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into()))
        .collect();
        let record = ApiRecord {
            eim_id: "EIM100".into(),
            repository_url: "git@github.com:acme/pay.git".into(),
            fields,
        };

        let doc = MetadataDocument::generate(&[record]);
        let report = check(doc.value());
        assert!(report.valid, "{:?}", report.problems);
    }

    #[test]
    fn test_failure_maps_to_error() {
        let err = validate(&json!({})).unwrap_err();
        match err {
            Error::ValidationFailed(problems) => assert_eq!(problems.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
