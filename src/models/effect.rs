use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An effect: what happens to the project when a risk fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    pub id: i64,
    pub project: i64,
    pub text: String,
    pub impact: i64,
    pub created_at: DateTime<Utc>,
}

/// Autocomplete item for effect search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectItem {
    /// `"E{id}: {text}"`.
    pub label: String,
    pub value: String,
    pub fields: EffectFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectFields {
    pub eid: i64,
    pub impact: i64,
}
