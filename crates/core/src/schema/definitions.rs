//! Schemas for the record types served by this site.

use super::rules::{FieldKind, FieldRule, Schema};

/// `{source, value}` pair identifying a person in an external registry.
pub fn person_ids_schema() -> Schema {
    Schema::new(
        "person_ids",
        vec![
            FieldRule::optional("source", FieldKind::text()),
            FieldRule::optional("value", FieldKind::text()),
        ],
    )
}

pub fn contributor_schema() -> Schema {
    Schema::new(
        "contributor",
        vec![
            FieldRule::optional(
                "ids",
                FieldKind::list_of(FieldKind::Nested(person_ids_schema())),
            ),
            FieldRule::required("name", FieldKind::text_min(1)),
            FieldRule::optional("role", FieldKind::text()),
            FieldRule::optional("affiliations", FieldKind::list_of(FieldKind::text())),
            FieldRule::optional("email", FieldKind::Email),
        ],
    )
}

/// Metadata of a generic record.
pub fn record_metadata_schema() -> Schema {
    Schema::new(
        "record",
        vec![
            FieldRule::optional("id", FieldKind::PersistentIdentifier),
            FieldRule::required("title", FieldKind::text_min(3)),
            FieldRule::optional("keywords", FieldKind::list_of(FieldKind::text())),
            FieldRule::optional("publication_date", FieldKind::Date),
            FieldRule::required(
                "contributors",
                FieldKind::list_of(FieldKind::Nested(contributor_schema())),
            ),
            FieldRule::optional("owner", FieldKind::Integer),
            FieldRule::optional("type", FieldKind::text()),
        ],
    )
}

/// Metadata of an author record. Whether `organization` is mandatory is a
/// deployment choice.
pub fn author_metadata_schema(organization_required: bool) -> Schema {
    let organization = if organization_required {
        FieldRule::required("organization", FieldKind::text())
    } else {
        FieldRule::optional("organization", FieldKind::text())
    };
    Schema::new(
        "author",
        vec![
            FieldRule::optional("id", FieldKind::PersistentIdentifier),
            FieldRule::required("name", FieldKind::text()),
            organization,
        ],
    )
}
