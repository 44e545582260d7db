use chrono::Utc;
use mongodb::bson::doc;
use rocket::{
    futures::TryStreamExt,
    http::Status,
    serde::json::{serde_json, Json},
    Route,
};

use crate::{
    error::{Error, Operation, PermissionError, Result},
    model::{
        api::{
            auth::Voter,
            vote::{VoteConfirmation, VoteRequest},
        },
        db::{candidate::Candidate, settings::ElectionSettings, vote::Vote},
        mongodb::{is_duplicate_key_error, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, voted_groups]
}

#[post("/voter/vote", data = "<request>", format = "json")]
async fn cast_vote(
    voter: Voter,
    request: Json<VoteRequest>,
    settings: Coll<ElectionSettings>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<VoteConfirmation>> {
    let settings = ElectionSettings::load(&settings).await?;
    if !settings.is_open_at(Utc::now()) {
        return Err(Error::Status(
            Status::Forbidden,
            "The election is not open for voting.".to_string(),
        ));
    }

    let candidate = candidates
        .find_one(request.candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{}'", request.candidate_id)))?;

    if let Some(group_id) = request.group_id {
        if group_id != candidate.group_id {
            return Err(Error::bad_request(format!(
                "Candidate '{}' does not stand in group '{group_id}'.",
                candidate.id
            )));
        }
    }
    if let Some(active_group_id) = settings.active_group_id {
        if active_group_id != candidate.group_id {
            return Err(Error::Status(
                Status::Forbidden,
                "Voting is not open for this group.".to_string(),
            ));
        }
    }

    // The key is unique per voter and group, so a repeat vote fails to insert.
    let vote = Vote::new(voter.national_id, &candidate);
    if let Err(err) = votes.insert_one(&vote, None).await {
        if is_duplicate_key_error(&err) {
            warn!("Rejected repeat vote at {}", vote.key);
            let data = serde_json::to_value(&*request).ok();
            return Err(Error::Permission(PermissionError::new(
                vote.key.path(),
                Operation::Create,
                data,
            )));
        }
        return Err(err.into());
    }

    info!("Vote recorded in group {}", vote.group_id);
    Ok(Json(VoteConfirmation::from(&vote)))
}

/// IDs of the groups this voter has already voted in.
#[get("/voter/votes")]
async fn voted_groups(voter: Voter, votes: Coll<Vote>) -> Result<Json<Vec<String>>> {
    let filter = doc! { "nationalId": voter.national_id.as_str() };
    let voted: Vec<Vote> = votes.find(filter, None).await?.try_collect().await?;
    Ok(Json(
        voted
            .into_iter()
            .map(|vote| vote.group_id.to_string())
            .collect(),
    ))
}
