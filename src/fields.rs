// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Mapping from workbook field labels to canonical record field names

/// Canonical name of the repository URL field
pub const REPOSITORY_URL: &str = "repository_url";

/// Canonical name of the stamped organizational identifier
pub const EIM_ID: &str = "eim_id";

/// Labels used in the metadata workbook and their canonical names.
///
/// Two labels map onto `repository_url`; whichever appears lower in the
/// sheet wins for a given column.
pub const FIELD_TABLE: &[(&str, &str)] = &[
    ("API Repo", "repository_url"),
    ("apiId", "repository_url"),
    ("API Object/API Technical Name", "api_technical_name"),
    ("version", "version"),
    ("apiContractURL", "api_contract_url"),
    ("businessApplicationID", "snow_business_application_id"),
    ("applicationServiceId", "snow_application_service_id"),
    ("classification", "classification"),
    ("sourceCode.pathToSource", "source_code_path"),
    ("SourceCodeURL", "source_code_url"),
    ("SourceCode Reference", "source_code_reference"),
    ("Platform.provider", "platform_provider"),
    ("Platform.technology", "platform_technology"),
    ("Platform.team", "platform_team"),
    ("lifecycleStatus", "lifecycle_status"),
    ("consumers", "consumers"),
    ("consumers[].applicationServiceId", "consumer_application_service_ids"),
    ("gatewayType", "gateway_type"),
    ("proxyURL", "gateway_proxy_url"),
    ("configURL", "gateway_config_url"),
    ("apiHostingCountry", "api_hosting_country"),
    ("documentationURL", "documentation_url"),
    ("consumingCountryGroups", "consuming_country_groups"),
    ("countryCode", "consuming_country_code"),
    ("groupMemberCode", "consuming_group_member_code"),
    ("Application Name", "application_name"),
];

/// Translate a workbook label into its canonical field name.
///
/// The label is trimmed and looked up (case-sensitively) in [`FIELD_TABLE`];
/// unknown labels are lower-cased with spaces turned into underscores.
#[must_use]
pub fn canonicalize(label: &str) -> String {
    let label = label.trim();
    FIELD_TABLE
        .iter()
        .find(|(external, _)| *external == label)
        .map_or_else(
            || label.to_lowercase().replace(' ', "_"),
            |(_, canonical)| (*canonical).to_string(),
        )
}

/// Whether `canonical` is one of the names produced by the fixed table
#[must_use]
pub fn is_known(canonical: &str) -> bool {
    canonical == EIM_ID || FIELD_TABLE.iter().any(|(_, c)| *c == canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(canonicalize("lifecycleStatus"), "lifecycle_status");
        assert_eq!(canonicalize("API Repo"), "repository_url");
        assert_eq!(canonicalize("apiId"), "repository_url");
        assert_eq!(canonicalize("Platform.provider"), "platform_provider");
        assert_eq!(canonicalize("proxyURL"), "gateway_proxy_url");
    }

    #[test]
    fn test_unknown_label_fallback() {
        assert_eq!(canonicalize("Unknown Label X"), "unknown_label_x");
        assert_eq!(canonicalize("  Owner Team "), "owner_team");
        assert_eq!(canonicalize("description"), "description");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        // "api repo" is not in the table, so it falls through to the
        // derived name rather than repository_url
        assert_eq!(canonicalize("api repo"), "api_repo");
        assert_eq!(canonicalize("Version"), "version");
    }

    #[test]
    fn test_surrounding_whitespace_still_matches_table() {
        assert_eq!(canonicalize(" API Repo "), "repository_url");
    }

    #[test]
    fn test_table_targets_are_snake_case() {
        for (_, canonical) in FIELD_TABLE {
            assert!(
                canonical
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '_'),
                "{canonical} is not lower snake case"
            );
        }
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("platform_team"));
        assert!(is_known("eim_id"));
        assert!(!is_known("owner_team"));
    }
}
