use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{national_id::NationalId, receipt::Receipt},
    db::vote::{Vote, VoteKey},
    mongodb::{serde_hex_id, Id},
};

/// A voter's choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(with = "serde_hex_id")]
    pub candidate_id: Id,
    /// The group the voter believes they are voting in, if given it must
    /// match the candidate's.
    #[serde(default, with = "serde_hex_id::option")]
    pub group_id: Option<Id>,
}

/// What a voter gets back after voting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteConfirmation {
    pub receipt: Receipt,
    #[serde(with = "serde_hex_id")]
    pub group_id: Id,
    pub candidate_name: String,
}

impl From<&Vote> for VoteConfirmation {
    fn from(vote: &Vote) -> Self {
        Self {
            receipt: vote.receipt(),
            group_id: vote.group_id,
            candidate_name: vote.candidate_name.clone(),
        }
    }
}

/// A receipt submitted for verification. Kept as a raw string so malformed
/// receipts are reported as such rather than as a deserialisation failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// A recorded vote, as exported to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDescription {
    pub id: VoteKey,
    #[serde(with = "serde_hex_id")]
    pub candidate_id: Id,
    pub candidate_name: String,
    #[serde(with = "serde_hex_id")]
    pub group_id: Id,
    pub national_id: NationalId,
    pub timestamp: DateTime<Utc>,
}

impl VoteDescription {
    /// The receipt that was handed out for this vote.
    pub fn receipt(&self) -> Receipt {
        Receipt::new(
            self.national_id.clone(),
            self.group_id,
            self.timestamp.timestamp_millis(),
        )
    }
}

impl From<Vote> for VoteDescription {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.key,
            candidate_id: vote.candidate_id,
            candidate_name: vote.candidate_name,
            group_id: vote.group_id,
            national_id: vote.national_id,
            timestamp: vote.timestamp.to_chrono(),
        }
    }
}
