//! Serialized record representation returned by the REST endpoints.

use serde::Serialize;

use crate::types::{JsonMap, Timestamp};

/// `{id, metadata, created, updated, revision, links}`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: String,
    pub metadata: JsonMap,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub revision: i32,
    pub links: RecordLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Join a site URL and a route, collapsing the slash between them.
pub fn absolute_url(site_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        site_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl RecordLinks {
    /// Links for the record `pid_value` served under `list_route`
    /// (e.g. `/api/records/`). `html_route` is the optional UI prefix.
    pub fn build(
        site_url: &str,
        list_route: &str,
        html_route: Option<&str>,
        pid_value: &str,
    ) -> Self {
        let item = |route: &str| {
            absolute_url(
                site_url,
                &format!("{}/{}", route.trim_end_matches('/'), pid_value),
            )
        };
        Self {
            self_link: item(list_route),
            html: html_route.map(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_join_without_double_slashes() {
        let links = RecordLinks::build(
            "https://127.0.0.1:5000/",
            "/api/records/",
            Some("/records"),
            "12",
        );
        assert_eq!(links.self_link, "https://127.0.0.1:5000/api/records/12");
        assert_eq!(links.html.as_deref(), Some("https://127.0.0.1:5000/records/12"));
    }

    #[test]
    fn self_link_serializes_as_self() {
        let links = RecordLinks::build("http://h", "/api/authors/", None, "1");
        let json = serde_json::to_value(&links).unwrap();
        assert_eq!(json["self"], "http://h/api/authors/1");
        assert!(json.get("html").is_none());
    }
}
