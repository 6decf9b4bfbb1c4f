use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project owned by a single login.
///
/// Projects are the top-level organizational unit; causes, risks, effects
/// and plans all belong to exactly one project, and every query is scoped
/// to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    /// GitHub login of the owner, lowercased.
    pub login: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub title: String,
}
