//! Site configuration: REST endpoints, schemas, permissions, search options,
//! deposit and storage settings.
//!
//! Built once at startup and shared by reference. Nothing here reads global
//! state after construction.

use std::time::Duration;

use crate::error::CoreError;
use crate::permissions::PermissionPolicy;
use crate::pid::{PID_TYPE_AUTHID, PID_TYPE_RECID};
use crate::schema::definitions::{author_metadata_schema, record_metadata_schema};
use crate::schema::Schema;
use crate::search::{
    default_record_facets, default_sort, default_sort_options, SearchSettings,
    DEFAULT_MAX_RESULT_WINDOW,
};

/// Which REST endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Records,
    Authors,
}

/// Per-operation permission policies of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    pub create: PermissionPolicy,
    pub read: PermissionPolicy,
    pub update: PermissionPolicy,
    pub delete: PermissionPolicy,
    pub list: PermissionPolicy,
    /// Applied as a query restriction on list/search results.
    pub search_filter: PermissionPolicy,
}

impl PermissionSet {
    pub fn allow_all() -> Self {
        Self {
            create: PermissionPolicy::AllowAll,
            read: PermissionPolicy::AllowAll,
            update: PermissionPolicy::AllowAll,
            delete: PermissionPolicy::AllowAll,
            list: PermissionPolicy::AllowAll,
            search_filter: PermissionPolicy::AllowAll,
        }
    }
}

/// One REST endpoint (a record type with its PID type, schema and policies).
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub kind: EndpointKind,
    pub pid_type: &'static str,
    /// Name used in error messages and logs.
    pub entity: &'static str,
    /// Collection route, e.g. `/api/records/`.
    pub list_route: String,
    /// HTML page prefix, if the endpoint has one.
    pub html_route: Option<String>,
    /// Name of the search index documents are written to.
    pub search_index: &'static str,
    pub schema: Schema,
    /// `$schema` URL stamped on stored documents.
    pub json_schema: Option<String>,
    pub permissions: PermissionSet,
    pub search: SearchSettings,
}

impl EndpointConfig {
    pub fn records() -> Self {
        Self {
            kind: EndpointKind::Records,
            pid_type: PID_TYPE_RECID,
            entity: "Record",
            list_route: "/api/records/".to_string(),
            html_route: Some("/records".to_string()),
            search_index: "records",
            schema: record_metadata_schema(),
            json_schema: None,
            permissions: PermissionSet {
                read: PermissionPolicy::OwnerOnly,
                search_filter: PermissionPolicy::OwnerOnly,
                ..PermissionSet::allow_all()
            },
            search: SearchSettings {
                sort_options: default_sort_options(),
                default_sort: Some(default_sort()),
                facets: default_record_facets(),
                max_result_window: DEFAULT_MAX_RESULT_WINDOW,
            },
        }
    }

    pub fn authors(organization_required: bool, jsonschemas_host: &str) -> Self {
        Self {
            kind: EndpointKind::Authors,
            pid_type: PID_TYPE_AUTHID,
            entity: "Author",
            list_route: "/api/authors/".to_string(),
            html_route: None,
            search_index: "authors",
            schema: author_metadata_schema(organization_required),
            json_schema: Some(author_schema_url(jsonschemas_host)),
            permissions: PermissionSet::allow_all(),
            search: SearchSettings {
                sort_options: default_sort_options(),
                default_sort: Some(default_sort()),
                facets: Vec::new(),
                max_result_window: DEFAULT_MAX_RESULT_WINDOW,
            },
        }
    }

    /// Axum route of a single item, e.g. `/api/records/{pid_value}`.
    pub fn item_route(&self) -> String {
        format!("{}/{{pid_value}}", self.list_route.trim_end_matches('/'))
    }
}

/// URL of the author JSON schema on the configured host.
pub fn author_schema_url(jsonschemas_host: &str) -> String {
    format!("https://{jsonschemas_host}/schemas/authors/author-v1.0.0.json")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositConfig {
    /// Redirect anonymous users to `login_url` instead of showing the form.
    pub require_auth: bool,
    pub login_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on one Record Store transaction.
    pub timeout: Duration,
    /// In-line attempts per index operation before leaving it to the sweeper.
    pub index_retry_attempts: u32,
    pub index_retry_backoff: Duration,
    /// Period of the background reindex sweep.
    pub reindex_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Public base URL used in `links`.
    pub site_url: String,
    pub jsonschemas_host: String,
    pub records: EndpointConfig,
    pub authors: EndpointConfig,
    pub deposit: DepositConfig,
    pub store: StoreConfig,
}

const DEFAULT_SITE_URL: &str = "https://127.0.0.1:5000";
const DEFAULT_JSONSCHEMAS_HOST: &str = "my-site.com";

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            jsonschemas_host: DEFAULT_JSONSCHEMAS_HOST.to_string(),
            records: EndpointConfig::records(),
            authors: EndpointConfig::authors(true, DEFAULT_JSONSCHEMAS_HOST),
            deposit: DepositConfig {
                require_auth: true,
                login_url: "/login".to_string(),
            },
            store: StoreConfig {
                timeout: Duration::from_secs(10),
                index_retry_attempts: 3,
                index_retry_backoff: Duration::from_millis(200),
                reindex_interval: Duration::from_secs(60),
            },
        }
    }
}

impl SiteConfig {
    pub fn endpoint(&self, kind: EndpointKind) -> &EndpointConfig {
        match kind {
            EndpointKind::Records => &self.records,
            EndpointKind::Authors => &self.authors,
        }
    }

    /// The endpoint minting `pid_type`, which is also the stored record type.
    pub fn endpoint_for_pid_type(&self, pid_type: &str) -> Option<&EndpointConfig> {
        [&self.records, &self.authors]
            .into_iter()
            .find(|e| e.pid_type == pid_type)
    }

    /// Build from a key lookup (normally `std::env::var`), falling back to
    /// defaults for absent keys.
    ///
    /// | Key                                  | Default                   |
    /// |--------------------------------------|---------------------------|
    /// | `SITE_URL`                           | `https://127.0.0.1:5000`  |
    /// | `JSONSCHEMAS_HOST`                   | `my-site.com`             |
    /// | `AUTHORS_ORGANIZATION_REQUIRED`      | `true`                    |
    /// | `DEPOSIT_REQUIRE_AUTH`               | `true`                    |
    /// | `DEPOSIT_LOGIN_URL`                  | `/login`                  |
    /// | `STORE_TIMEOUT_SECS`                 | `10`                      |
    /// | `INDEX_RETRY_ATTEMPTS`               | `3`                       |
    /// | `REINDEX_INTERVAL_SECS`              | `60`                      |
    /// | `RECORDS_<OP>_PERMISSION`            | see [`EndpointConfig::records`] |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SiteConfig::default();

        if let Some(url) = lookup("SITE_URL") {
            config.site_url = url;
        }
        if let Some(host) = lookup("JSONSCHEMAS_HOST") {
            config.jsonschemas_host = host;
        }

        let organization_required = parse_or(&lookup, "AUTHORS_ORGANIZATION_REQUIRED", true)?;
        config.authors = EndpointConfig::authors(organization_required, &config.jsonschemas_host);

        config.deposit.require_auth = parse_or(&lookup, "DEPOSIT_REQUIRE_AUTH", true)?;
        if let Some(url) = lookup("DEPOSIT_LOGIN_URL") {
            config.deposit.login_url = url;
        }

        config.store.timeout = parse_secs(&lookup, "STORE_TIMEOUT_SECS", 10)?;
        config.store.index_retry_attempts = parse_or(&lookup, "INDEX_RETRY_ATTEMPTS", 3)?;
        config.store.reindex_interval = parse_secs(&lookup, "REINDEX_INTERVAL_SECS", 60)?;

        let perms = &mut config.records.permissions;
        for (key, slot) in [
            ("RECORDS_CREATE_PERMISSION", &mut perms.create),
            ("RECORDS_READ_PERMISSION", &mut perms.read),
            ("RECORDS_UPDATE_PERMISSION", &mut perms.update),
            ("RECORDS_DELETE_PERMISSION", &mut perms.delete),
            ("RECORDS_LIST_PERMISSION", &mut perms.list),
            ("RECORDS_SEARCH_PERMISSION", &mut perms.search_filter),
        ] {
            if let Some(raw) = lookup(key) {
                *slot = raw.parse()?;
            }
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value '{raw}'"))),
    }
}

/// A whole number of seconds; zero is rejected.
fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(CoreError::Validation(format!("{key} must be greater than zero"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_shipped_configuration() {
        let config = SiteConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.records.permissions.read, PermissionPolicy::OwnerOnly);
        assert_eq!(config.records.permissions.create, PermissionPolicy::AllowAll);
        assert_eq!(config.records.item_route(), "/api/records/{pid_value}");
        assert_eq!(config.authors.pid_type, "authid");
        assert!(config.authors.schema.field("organization").unwrap().required);
        assert_eq!(
            config.authors.json_schema.as_deref(),
            Some("https://my-site.com/schemas/authors/author-v1.0.0.json")
        );
        assert!(config.deposit.require_auth);
        assert_eq!(
            config.endpoint_for_pid_type("recid").map(|e| e.kind),
            Some(EndpointKind::Records)
        );
        assert!(config.endpoint_for_pid_type("doi").is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = SiteConfig::from_lookup(lookup(&[
            ("AUTHORS_ORGANIZATION_REQUIRED", "false"),
            ("RECORDS_SEARCH_PERMISSION", "owner_or_role:managers"),
            ("STORE_TIMEOUT_SECS", "2"),
            ("JSONSCHEMAS_HOST", "example.org"),
        ]))
        .unwrap();
        assert!(!config.authors.schema.field("organization").unwrap().required);
        assert_eq!(
            config.records.permissions.search_filter,
            PermissionPolicy::OwnerOrRole("managers".into())
        );
        assert_eq!(config.store.timeout, Duration::from_secs(2));
        assert!(config
            .authors
            .json_schema
            .as_deref()
            .unwrap()
            .starts_with("https://example.org/"));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(SiteConfig::from_lookup(lookup(&[("STORE_TIMEOUT_SECS", "soon")])).is_err());
        assert!(SiteConfig::from_lookup(lookup(&[("RECORDS_READ_PERMISSION", "nobody")])).is_err());
    }

    #[test]
    fn zero_durations_are_rejected() {
        for key in ["STORE_TIMEOUT_SECS", "REINDEX_INTERVAL_SECS"] {
            let err = SiteConfig::from_lookup(lookup(&[(key, "0")])).unwrap_err();
            assert!(
                matches!(&err, CoreError::Validation(msg) if msg.contains(key)),
                "{key}: {err:?}"
            );
        }
    }
}
