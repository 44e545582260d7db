use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// Whether the election is accepting votes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Voting is allowed, subject to the scheduled dates.
    #[default]
    Active,
    /// Voting has closed.
    Ended,
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        let name = match status {
            ElectionStatus::Active => "active",
            ElectionStatus::Ended => "ended",
        };
        Bson::String(name.to_string())
    }
}
