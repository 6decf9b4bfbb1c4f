use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A risk: something that may happen because of a cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: i64,
    pub project: i64,
    pub text: String,
    /// 0–100 integer.
    pub probability: i64,
    /// Positive risks are opportunities, negative ones are threats.
    pub positive: bool,
    pub created_at: DateTime<Utc>,
}

/// Autocomplete item for risk search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    /// `"R{id}: {text}"`.
    pub label: String,
    pub value: String,
    pub fields: RiskFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFields {
    pub rid: i64,
    pub probability: i64,
    pub positive: bool,
}

/// A risk joined through its triples to effects, with the computed rank.
///
/// The invariant: `rank = probability × sum(impact)` over the effects
/// reachable from the risk through triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRisk {
    pub id: i64,
    pub text: String,
    pub probability: i64,
    pub positive: bool,
    /// Sum of linked effects' impact.
    pub impact: i64,
    pub rank: i64,
}

impl RankedRisk {
    /// CSS class used by the front-end: high ranks are red, low ones green.
    pub fn css_class(&self) -> &'static str {
        if self.rank >= 64 {
            "red"
        } else if self.rank <= 32 {
            "green"
        } else {
            ""
        }
    }
}
