/// User ids come from the identity provider's BIGSERIAL keys.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A JSON object, the shape of every record's metadata.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
