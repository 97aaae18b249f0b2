/// Primary key type for rows with BIGSERIAL ids (users, presets, projects).
pub type DbId = i64;

/// Jobs are keyed by server-assigned UUIDs.
pub type JobId = uuid::Uuid;

/// Datasets are keyed by server-assigned UUIDs.
pub type DatasetId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
