use std::collections::{BTreeMap, HashMap, HashSet};

use mongodb::error::Error as DbError;
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{
        candidate::Candidate,
        group::Group,
        vote::{Vote, VoteCount},
    },
    mongodb::{serde_hex_id, Coll, Id},
};

use super::{settings::SettingsDescription, vote::VoteDescription};

/// Votes for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    #[serde(with = "serde_hex_id")]
    pub candidate_id: Id,
    pub name: String,
    pub votes: u64,
}

/// Votes within a single group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    #[serde(with = "serde_hex_id")]
    pub group_id: Id,
    /// Empty if the group has since been deleted.
    pub group_name: String,
    pub total_votes: u64,
    /// Most votes first.
    pub candidates: Vec<CandidateResult>,
}

/// The full tally across all groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total_votes: u64,
    pub groups: Vec<GroupResult>,
}

impl Tally {
    /// Combine the known groups and candidates with the per-candidate vote
    /// counts. Every known candidate appears, with zero votes if need be.
    /// Votes for candidates that no longer exist are still counted, under the
    /// name recorded with the vote.
    pub fn compute(groups: &[Group], candidates: &[Candidate], counts: &[VoteCount]) -> Self {
        let votes_for: HashMap<Id, u64> = counts
            .iter()
            .map(|count| (count.candidate_id, count.votes))
            .collect();

        let mut rows: Vec<(Id, CandidateResult)> = candidates
            .iter()
            .map(|candidate| {
                let result = CandidateResult {
                    candidate_id: candidate.id,
                    name: candidate.name.clone(),
                    votes: votes_for.get(&candidate.id).copied().unwrap_or(0),
                };
                (candidate.group_id, result)
            })
            .collect();
        let known: HashSet<Id> = candidates.iter().map(|candidate| candidate.id).collect();
        rows.extend(
            counts
                .iter()
                .filter(|count| !known.contains(&count.candidate_id))
                .map(|count| {
                    let result = CandidateResult {
                        candidate_id: count.candidate_id,
                        name: count.candidate_name.clone(),
                        votes: count.votes,
                    };
                    (count.group_id, result)
                }),
        );

        // Known groups first, in the given order, then any orphaned ones.
        let mut group_results: Vec<GroupResult> = groups
            .iter()
            .map(|group| GroupResult::empty(group.id, group.name.clone()))
            .collect();
        for (group_id, row) in rows {
            let index = match group_results.iter().position(|g| g.group_id == group_id) {
                Some(index) => index,
                None => {
                    group_results.push(GroupResult::empty(group_id, String::new()));
                    group_results.len() - 1
                }
            };
            let group = &mut group_results[index];
            group.total_votes += row.votes;
            group.candidates.push(row);
        }

        for group in &mut group_results {
            group.candidates.sort_by(|a, b| {
                b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name))
            });
        }

        Self {
            total_votes: group_results.iter().map(|group| group.total_votes).sum(),
            groups: group_results,
        }
    }

    /// Tally everything currently in the database.
    pub async fn load(
        groups: &Coll<Group>,
        candidates: &Coll<Candidate>,
        votes: &Coll<Vote>,
    ) -> Result<Self, DbError> {
        let groups: Vec<Group> = groups.find(None, None).await?.try_collect().await?;
        let candidates: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
        let counts = VoteCount::per_candidate(votes).await?;
        Ok(Self::compute(&groups, &candidates, &counts))
    }

    /// Tally an exported list of votes. Only the names recorded with the votes
    /// are known, so group names are empty and candidates without votes are
    /// missing.
    pub fn from_export(votes: &[VoteDescription]) -> Self {
        let mut counts: BTreeMap<(Id, Id), VoteCount> = BTreeMap::new();
        for vote in votes {
            counts
                .entry((vote.group_id, vote.candidate_id))
                .or_insert_with(|| VoteCount {
                    candidate_id: vote.candidate_id,
                    candidate_name: vote.candidate_name.clone(),
                    group_id: vote.group_id,
                    votes: 0,
                })
                .votes += 1;
        }
        let counts: Vec<VoteCount> = counts.into_values().collect();
        Self::compute(&[], &[], &counts)
    }

    /// The candidate with the most votes across all groups, ties broken by
    /// name. `None` if nobody has voted.
    pub fn winner(&self) -> Option<&CandidateResult> {
        self.groups
            .iter()
            .flat_map(|group| group.candidates.iter())
            .filter(|candidate| candidate.votes > 0)
            .min_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)))
    }
}

impl GroupResult {
    fn empty(group_id: Id, group_name: String) -> Self {
        Self {
            group_id,
            group_name,
            total_votes: 0,
            candidates: Vec::new(),
        }
    }
}

/// Results together with the election status they were computed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election: SettingsDescription,
    #[serde(flatten)]
    pub tally: Tally,
}

#[cfg(test)]
mod tests {
    use crate::model::db::group::GroupCore;

    use super::*;

    fn count(candidate: &Candidate, votes: u64) -> VoteCount {
        VoteCount {
            candidate_id: candidate.id,
            candidate_name: candidate.name.clone(),
            group_id: candidate.group_id,
            votes,
        }
    }

    fn group(core: GroupCore) -> Group {
        Group {
            id: Id::new(),
            group: core,
        }
    }

    #[test]
    fn zero_filled_and_grouped() {
        let presidential = group(GroupCore::example());
        let parliamentary = group(GroupCore::example2());
        let a = Candidate::example(presidential.id);
        let b = Candidate::example2(presidential.id);
        let c = Candidate::example(parliamentary.id);

        let tally = Tally::compute(
            &[presidential.clone(), parliamentary.clone()],
            &[a.clone(), b.clone(), c],
            &[count(&b, 3), count(&a, 1)],
        );

        assert_eq!(tally.total_votes, 4);
        assert_eq!(tally.groups.len(), 2);

        let first = &tally.groups[0];
        assert_eq!(first.group_id, presidential.id);
        assert_eq!(first.total_votes, 4);
        let names: Vec<_> = first.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Candidate B", "Candidate A"]);

        let second = &tally.groups[1];
        assert_eq!(second.group_name, "Parliamentary");
        assert_eq!(second.total_votes, 0);
        assert_eq!(second.candidates[0].votes, 0);

        assert_eq!(tally.winner().unwrap().name, "Candidate B");
    }

    #[test]
    fn deleted_candidates_and_groups_still_count() {
        let gone_group = Id::new();
        let gone = Candidate::example(gone_group);
        let tally = Tally::compute(&[], &[], &[count(&gone, 2)]);

        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.groups.len(), 1);
        assert_eq!(tally.groups[0].group_id, gone_group);
        assert_eq!(tally.groups[0].group_name, "");
        assert_eq!(tally.groups[0].candidates[0].name, "Candidate A");
    }

    #[test]
    fn winner_ties_broken_by_name() {
        let group = group(GroupCore::example());
        let a = Candidate::example(group.id);
        let b = Candidate::example2(group.id);
        let tally = Tally::compute(
            &[group],
            &[b.clone(), a.clone()],
            &[count(&b, 2), count(&a, 2)],
        );
        assert_eq!(tally.winner().unwrap().name, "Candidate A");
    }

    #[test]
    fn tally_of_export() {
        use crate::model::{common::national_id::NationalId, db::vote::Vote};

        let group = Id::new();
        let a = Candidate::example(group);
        let b = Candidate::example2(group);
        let exported: Vec<VoteDescription> = [
            Vote::new(NationalId::example(), &a),
            Vote::new(NationalId::example2(), &b),
            Vote::new("1198870098765432".parse().unwrap(), &b),
        ]
        .into_iter()
        .map(VoteDescription::from)
        .collect();

        let tally = Tally::from_export(&exported);
        assert_eq!(tally.total_votes, 3);
        assert_eq!(tally.groups.len(), 1);
        let candidates = &tally.groups[0].candidates;
        assert_eq!(candidates[0].name, "Candidate B");
        assert_eq!(candidates[0].votes, 2);
        assert_eq!(candidates[1].votes, 1);
    }

    #[test]
    fn no_votes_no_winner() {
        let group = group(GroupCore::example());
        let a = Candidate::example(group.id);
        let tally = Tally::compute(&[group], &[a], &[]);
        assert_eq!(tally.total_votes, 0);
        assert_eq!(tally.winner(), None);
    }
}
