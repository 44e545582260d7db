use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            candidate::{CandidateDescription, CandidateSpec},
        },
        db::{
            admin::Admin,
            candidate::{Candidate, NewCandidate},
            group::Group,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_candidates, get_candidate, create_candidate, delete_candidate]
}

/// All candidates, or only those standing in the given group.
#[get("/candidates?<group_id>")]
async fn get_candidates(
    group_id: Option<Id>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let filter = group_id.map(|group_id| doc! { "groupId": group_id });
    let candidates: Vec<CandidateDescription> = candidates
        .find(filter, None)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(candidates))
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    Ok(Json(candidate.into()))
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    groups: Coll<Group>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let candidate: NewCandidate = spec.0.try_into()?;
    if groups
        .find_one(candidate.group_id.as_doc(), None)
        .await?
        .is_none()
    {
        return Err(Error::not_found(format!(
            "Group with ID '{}'",
            candidate.group_id
        )));
    }

    let new_id: Id = new_candidates
        .insert_one(&candidate, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Database returned a non-ObjectId key"))?
        .into();

    let candidate = candidates
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{new_id}'")))?;
    info!(
        "Created candidate '{}' ({}) in group {}",
        candidate.name, candidate.id, candidate.group_id
    );
    Ok(Json(candidate.into()))
}

/// Delete a candidate. Votes already cast for them are kept.
#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    let result = candidates.delete_one(candidate_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!(
            "Candidate with ID '{candidate_id}'"
        )));
    }
    info!("Deleted candidate {candidate_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };

    use crate::model::db::group::NewGroup;

    use super::*;

    async fn seed_group(db: &Database) -> Id {
        Coll::<NewGroup>::from_db(db)
            .insert_one(NewGroup::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    async fn post_candidate<'c>(client: &'c Client, spec: &CandidateSpec) -> LocalResponse<'c> {
        client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(serde_json::to_string(spec).unwrap())
            .dispatch()
            .await
    }

    async fn create(client: &Client, spec: &CandidateSpec) -> CandidateDescription {
        let response = post_candidate(client, spec).await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn list(client: &Client, group_id: Option<Id>) -> Vec<CandidateDescription> {
        let response = client
            .get(uri!(get_candidates(group_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test(admin)]
    async fn create_and_filter(client: Client, db: Database) {
        let first_group = seed_group(&db).await;
        let second_group = seed_group(&db).await;
        let a = create(&client, &CandidateSpec::example(first_group)).await;
        let b = create(&client, &CandidateSpec::example2(second_group)).await;
        assert_eq!(a.name, "Candidate A");
        assert_eq!(a.group_id, first_group);

        assert_eq!(list(&client, None).await, vec![a.clone(), b.clone()]);
        assert_eq!(list(&client, Some(first_group)).await, vec![a.clone()]);
        assert_eq!(list(&client, Some(second_group)).await, vec![b]);
        assert_eq!(list(&client, Some(Id::new())).await, vec![]);

        let response = client.get(uri!(get_candidate(a.id))).dispatch().await;
        let fetched: CandidateDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(fetched, a);
    }

    #[backend_test(admin)]
    async fn unknown_group_rejected(client: Client, candidates: Coll<Candidate>) {
        let response = post_candidate(&client, &CandidateSpec::example(Id::new())).await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(admin)]
    async fn invalid_candidate_rejected(client: Client, db: Database) {
        let group = seed_group(&db).await;
        let mut spec = CandidateSpec::example(group);
        spec.image_url = "javascript:alert(1)".to_string();
        let response = post_candidate(&client, &spec).await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn delete(client: Client, db: Database) {
        let group = seed_group(&db).await;
        let a = create(&client, &CandidateSpec::example(group)).await;

        let response = client
            .delete(uri!(delete_candidate(a.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(get_candidate(a.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .delete(uri!(delete_candidate(a.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn create_requires_admin(client: Client, db: Database) {
        let group = seed_group(&db).await;
        let response = post_candidate(&client, &CandidateSpec::example(group)).await;
        assert_eq!(Status::NotFound, response.status());
    }
}
