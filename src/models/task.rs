use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The promoted form of a due plan.
///
/// Tasks are ephemeral: completing one deletes it and stamps the plan's
/// `promoted` time, so a recurring plan comes due again one schedule
/// period later. At most one open task exists per plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub plan: i64,
    /// The plan's text, denormalized for display.
    pub text: String,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
