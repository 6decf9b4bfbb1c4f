use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cause: something already true that may trigger risks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cause {
    pub id: i64,
    pub project: i64,
    pub text: String,
    /// One-character marker, at most.
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Autocomplete item for cause search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseItem {
    /// `"C{id}: {text}"`.
    pub label: String,
    pub value: String,
    pub fields: CauseFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseFields {
    pub cid: i64,
    pub emoji: Option<String>,
}
