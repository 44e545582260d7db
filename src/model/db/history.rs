use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Winner recorded for an archived election without any votes.
pub const NO_WINNER: &str = "None";

/// Summary of an archived election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCore {
    pub name: String,
    /// Archive date, `YYYY-MM-DD`.
    pub date: String,
    pub total_votes: u64,
    /// Name of the candidate with the most votes, or [`NO_WINNER`].
    pub winner: String,
}

impl HistoryCore {
    pub fn new(name: String, archived_at: DateTime<Utc>, total_votes: u64, winner: Option<String>) -> Self {
        Self {
            name,
            date: archived_at.format("%Y-%m-%d").to_string(),
            total_votes,
            winner: winner.unwrap_or_else(|| NO_WINNER.to_string()),
        }
    }

    /// Does this entry match a history search?
    /// The name is matched case-insensitively, the date as a plain substring.
    pub fn matches(&self, search: &str) -> bool {
        let search = search.trim();
        search.is_empty()
            || self.name.to_lowercase().contains(&search.to_lowercase())
            || self.date.contains(search)
    }
}

pub type NewHistoryEntry = HistoryCore;

/// An archived election from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub entry: HistoryCore,
}

impl Deref for HistoryEntry {
    type Target = HistoryCore;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry() -> HistoryCore {
        let archived_at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 0).unwrap();
        HistoryCore::new(
            "General Election 2024".to_string(),
            archived_at,
            42,
            Some("Candidate A".to_string()),
        )
    }

    #[test]
    fn date_is_formatted() {
        assert_eq!(entry().date, "2024-03-09");
    }

    #[test]
    fn no_votes_no_winner() {
        let empty = HistoryCore::new("Empty".to_string(), Utc::now(), 0, None);
        assert_eq!(empty.winner, NO_WINNER);
    }

    #[test]
    fn search() {
        let entry = entry();
        assert!(entry.matches(""));
        assert!(entry.matches("general"));
        assert!(entry.matches("ELECTION 2024"));
        assert!(entry.matches("2024-03"));
        assert!(!entry.matches("local"));
        assert!(!entry.matches("2023"));
    }
}
