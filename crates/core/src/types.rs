/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Composite connector identifier, `"{group}:{name}"`.
pub type ConnectorId = String;
