//! Search request parsing: sort options, facets and pagination.
//!
//! This module lives in `core` (no I/O) so the repository layer receives an
//! already-validated [`SearchRequest`] and only has to turn it into SQL.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default page size.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on `page * size`.
pub const DEFAULT_MAX_RESULT_WINDOW: i64 = 10_000;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Column a sort option orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Full-text rank of the query.
    Relevance,
    /// Record creation time.
    Created,
}

/// A named sort option exposed through the `sort` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOption {
    pub name: &'static str,
    pub title: &'static str,
    pub field: SortField,
    pub descending: bool,
    /// Display position in UIs.
    pub order: u32,
}

/// Which option applies when the client sends no `sort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSort {
    /// Used when a query string is present.
    pub query: &'static str,
    /// Used for plain listings.
    pub noquery: &'static str,
}

/// A sort option after applying an optional `-` reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSort {
    pub name: &'static str,
    pub field: SortField,
    pub descending: bool,
    pub reversed: bool,
}

impl ResolvedSort {
    /// Value to echo back in the `sort` parameter of pagination links.
    pub fn param(&self) -> String {
        if self.reversed {
            format!("-{}", self.name)
        } else {
            self.name.to_string()
        }
    }
}

pub fn default_sort_options() -> Vec<SortOption> {
    vec![
        SortOption {
            name: "bestmatch",
            title: "Best match",
            field: SortField::Relevance,
            descending: true,
            order: 1,
        },
        SortOption {
            name: "mostrecent",
            title: "Most recent",
            field: SortField::Created,
            descending: true,
            order: 2,
        },
    ]
}

pub fn default_sort() -> DefaultSort {
    DefaultSort {
        query: "bestmatch",
        noquery: "mostrecent",
    }
}

/// Pick the sort option for a request.
///
/// A leading `-` reverses the option's natural direction. Unknown names are
/// a validation error.
pub fn resolve_sort(
    options: &[SortOption],
    default: &DefaultSort,
    requested: Option<&str>,
    has_query: bool,
) -> Result<ResolvedSort, CoreError> {
    let (name, reversed) = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (s, false),
        },
        None if has_query => (default.query, false),
        None => (default.noquery, false),
    };

    let option = options
        .iter()
        .find(|o| o.name == name)
        .ok_or_else(|| CoreError::Validation(format!("Invalid sort option '{name}'")))?;

    Ok(ResolvedSort {
        name: option.name,
        field: option.field,
        descending: option.descending != reversed,
        reversed,
    })
}

// ---------------------------------------------------------------------------
// Facets
// ---------------------------------------------------------------------------

/// A terms facet over a top-level metadata key. Its name doubles as the
/// post-filter query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetDefinition {
    pub name: &'static str,
    pub field: &'static str,
    /// `true` when the field holds a list of terms.
    pub multi_valued: bool,
}

pub fn default_record_facets() -> Vec<FacetDefinition> {
    vec![
        FacetDefinition {
            name: "type",
            field: "type",
            multi_valued: false,
        },
        FacetDefinition {
            name: "keywords",
            field: "keywords",
            multi_valued: true,
        },
    ]
}

/// Values a request filters one facet on (OR within a facet, AND across).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFilter {
    pub facet: FacetDefinition,
    pub values: Vec<String>,
}

/// One aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    pub key: String,
    pub doc_count: i64,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything the search endpoint needs besides permissions.
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    pub sort_options: Vec<SortOption>,
    pub default_sort: Option<DefaultSort>,
    pub facets: Vec<FacetDefinition>,
    pub max_result_window: i64,
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Raw query text as sent by the client.
    pub q: Option<String>,
    /// Sanitized PostgreSQL `tsquery`; `None` means "match everything".
    pub tsquery: Option<String>,
    pub sort: ResolvedSort,
    pub page: i64,
    pub size: i64,
    pub filters: Vec<FacetFilter>,
    pub max_result_window: i64,
}

impl SearchRequest {
    /// Build a request from raw query-string pairs. Repeated facet keys
    /// accumulate; unknown keys are ignored.
    pub fn from_pairs(
        pairs: &[(String, String)],
        settings: &SearchSettings,
    ) -> Result<Self, CoreError> {
        let last = |key: &str| last_value(pairs, key);

        let q = last("q")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let tsquery = q.as_deref().and_then(build_tsquery);

        let default = settings.default_sort.clone().unwrap_or_else(default_sort);
        let sort = resolve_sort(
            &settings.sort_options,
            &default,
            last("sort"),
            tsquery.is_some(),
        )?;

        let page = parse_positive(last("page"), "page", 1)?;
        let size = parse_positive(last("size"), "size", DEFAULT_PAGE_SIZE)?;
        if page.saturating_mul(size) > settings.max_result_window {
            return Err(CoreError::Validation(format!(
                "Maximum number of results ({}) exceeded",
                settings.max_result_window
            )));
        }

        let filters = settings
            .facets
            .iter()
            .filter_map(|facet| {
                let values: Vec<String> = pairs
                    .iter()
                    .filter(|(k, v)| k == facet.name && !v.trim().is_empty())
                    .map(|(_, v)| v.trim().to_string())
                    .collect();
                (!values.is_empty()).then(|| FacetFilter {
                    facet: facet.clone(),
                    values,
                })
            })
            .collect();

        Ok(Self {
            q,
            tsquery,
            sort,
            page,
            size,
            filters,
            max_result_window: settings.max_result_window,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    /// Query-string pairs reproducing this request at another page.
    pub fn query_pairs(&self, page: i64) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q".to_string(), q.clone()));
        }
        pairs.push(("sort".to_string(), self.sort.param()));
        pairs.push(("page".to_string(), page.to_string()));
        pairs.push(("size".to_string(), self.size.to_string()));
        for filter in &self.filters {
            for value in &filter.values {
                pairs.push((filter.facet.name.to_string(), value.clone()));
            }
        }
        pairs
    }

    pub fn has_next_page(&self, total: i64) -> bool {
        self.page * self.size < total
            && (self.page + 1).saturating_mul(self.size) <= self.max_result_window
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_positive(raw: Option<&str>, name: &str, default: i64) -> Result<i64, CoreError> {
    match raw {
        None => Ok(default),
        Some(s) => match s.trim().parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(CoreError::Validation(format!(
                "Invalid {name} value '{s}': expected a positive integer"
            ))),
        },
    }
}

// ---------------------------------------------------------------------------
// Query builder helpers
// ---------------------------------------------------------------------------

/// Sanitize user input into a PostgreSQL `tsquery` string.
///
/// Input is split on every non-alphanumeric character, so tsquery operators
/// (`|`, `!`, `:`, parentheses) never reach the parser; the remaining terms
/// are joined with `&`. Returns `None` when nothing usable remains.
pub fn build_tsquery(query: &str) -> Option<String> {
    let terms: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" & "))
    }
}
