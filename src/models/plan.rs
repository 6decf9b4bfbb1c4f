use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A plan: what to do about some part of a chain, on a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub project: i64,
    pub text: String,
    /// `weekly`, `biweekly`, `monthly`, a `DD-MM-YYYY` date, or free text.
    pub schedule: Option<String>,
    /// When the plan was last promoted into a task.
    pub promoted: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Autocomplete item for plan search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    /// `"P{id}: {text}"`.
    pub label: String,
    pub value: String,
    pub fields: PlanFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFields {
    pub pid: i64,
    pub schedule: Option<String>,
}
