use serde::{Deserialize, Serialize};

use crate::model::{
    db::history::HistoryEntry,
    mongodb::{serde_hex_id, Id},
};

/// Request to archive the current election under a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRequest {
    pub name: String,
}

/// An archived election as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub name: String,
    pub date: String,
    pub total_votes: u64,
    pub winner: String,
}

impl From<HistoryEntry> for HistoryDescription {
    fn from(entry: HistoryEntry) -> Self {
        let core = entry.entry;
        Self {
            id: entry.id,
            name: core.name,
            date: core.date,
            total_votes: core.total_votes,
            winner: core.winner,
        }
    }
}
