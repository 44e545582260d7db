use std::fmt::{Display, Formatter};

use mongodb::{
    bson::{doc, from_document, DateTime, Document},
    error::Error as DbError,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{national_id::NationalId, receipt::Receipt},
    db::candidate::Candidate,
    mongodb::{Coll, Id},
};

/// The key of a vote document: `{nationalId}_{groupId}`.
///
/// Because it is derived from the voter and the group alone, a second vote by
/// the same voter in the same group collides with the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteKey(String);

impl VoteKey {
    pub fn new(national_id: &NationalId, group_id: Id) -> Self {
        Self(format!("{national_id}_{group_id}"))
    }

    /// A filter document matching this key.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": &self.0 }
    }

    /// Document path used when reporting permission errors.
    pub fn path(&self) -> String {
        format!("votes/{}", self.0)
    }
}

impl Display for VoteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    #[serde(rename = "_id")]
    pub key: VoteKey,
    pub candidate_id: Id,
    /// Denormalised so results survive the candidate being deleted.
    pub candidate_name: String,
    pub group_id: Id,
    pub national_id: NationalId,
    pub timestamp: DateTime,
}

impl Vote {
    /// A vote by the given voter for the given candidate, timestamped now.
    pub fn new(national_id: NationalId, candidate: &Candidate) -> Self {
        Self {
            key: VoteKey::new(&national_id, candidate.group_id),
            candidate_id: candidate.id,
            candidate_name: candidate.name.clone(),
            group_id: candidate.group_id,
            national_id,
            timestamp: DateTime::now(),
        }
    }

    /// The receipt handed back to the voter for this vote.
    pub fn receipt(&self) -> Receipt {
        Receipt::new(
            self.national_id.clone(),
            self.group_id,
            self.timestamp.timestamp_millis(),
        )
    }
}

/// Number of votes recorded for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCount {
    #[serde(rename = "_id")]
    pub candidate_id: Id,
    pub candidate_name: String,
    pub group_id: Id,
    pub votes: u64,
}

impl VoteCount {
    /// Count the recorded votes per candidate.
    pub async fn per_candidate(votes: &Coll<Vote>) -> Result<Vec<Self>, DbError> {
        let pipeline = [doc! {
            "$group": {
                "_id": "$candidateId",
                "candidateName": { "$first": "$candidateName" },
                "groupId": { "$first": "$groupId" },
                "votes": { "$sum": 1_i64 },
            }
        }];
        votes
            .aggregate(pipeline, None)
            .await?
            .and_then(|doc| async move { from_document(doc).map_err(DbError::from) })
            .try_collect()
            .await
    }
}
