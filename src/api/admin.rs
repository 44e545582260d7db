use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    response::stream::{Event, EventStream},
    serde::json::{serde_json, Json},
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::{
    ai::{fraud, AiClient},
    error::{Error, ErrorEmitter, PermissionError, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminDescription},
            ai::{FraudAnalysis, FraudAnalysisRequest, FraudRecord},
            auth::AuthToken,
            history::{ArchiveRequest, HistoryDescription},
            results::{ElectionResults, Tally},
            settings::{SettingsDescription, SettingsSpec},
            vote::VoteDescription,
        },
        db::{
            admin::{Admin, NewAdmin},
            candidate::Candidate,
            closer::ElectionCloser,
            group::Group,
            history::{HistoryEntry, NewHistoryEntry},
            settings::ElectionSettings,
            vote::Vote,
        },
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_admins,
        create_admin,
        delete_admin,
        get_settings,
        put_settings,
        get_results,
        export_votes,
        reset_votes,
        archive_election,
        get_history,
        analyze_fraud,
        analyze_recorded_fraud,
        recent_errors,
        error_stream,
    ]
}

#[get("/admin/admins")]
async fn get_admins(
    _token: AuthToken<Admin>,
    admins: Coll<Admin>,
) -> Result<Json<Vec<AdminDescription>>> {
    let admin_list: Vec<AdminDescription> = admins
        .find(None, None)
        .await?
        .map_ok(AdminDescription::from)
        .try_collect()
        .await?;
    Ok(Json(admin_list))
}

#[post("/admin/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    _token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    admins: Coll<NewAdmin>,
) -> Result<()> {
    // Check username uniqueness.
    let filter = doc! {
        "username": &new_admin.username,
    };
    let existing = admins.find_one(filter, None).await?;
    if existing.is_some() {
        return Err(Error::bad_request(format!(
            "Admin username already in use: {}",
            new_admin.username
        )));
    }

    // Create and insert the admin.
    let admin: NewAdmin = new_admin.0.try_into()?;
    admins.insert_one(&admin, None).await?;
    info!("Created admin '{}'", admin.username);
    Ok(())
}

#[delete("/admin/admins/<username>")]
async fn delete_admin(
    _token: AuthToken<Admin>,
    username: &str,
    admins: Coll<Admin>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count == 1 {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "Cannot delete last admin!".to_string(),
        ));
    }

    let filter = doc! {
        "username": username,
    };
    let result = admins.delete_one(filter, None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Admin {username}")));
    }
    info!("Deleted admin '{username}'");
    Ok(())
}

#[get("/admin/election")]
async fn get_settings(
    _token: AuthToken<Admin>,
    settings: Coll<ElectionSettings>,
) -> Result<Json<SettingsDescription>> {
    let settings = ElectionSettings::load(&settings).await?;
    Ok(Json(SettingsDescription::from(&settings)))
}

/// Replace the election settings, and reschedule the automatic closing to
/// match them.
#[put("/admin/election", data = "<spec>", format = "json")]
async fn put_settings(
    _token: AuthToken<Admin>,
    spec: Json<SettingsSpec>,
    settings_coll: Coll<ElectionSettings>,
    groups: Coll<Group>,
    closer: &State<ElectionCloser>,
) -> Result<Json<SettingsDescription>> {
    let settings: ElectionSettings = spec.0.try_into()?;
    if let Some(group_id) = settings.active_group_id {
        if groups.find_one(group_id.as_doc(), None).await?.is_none() {
            return Err(Error::not_found(format!("Group with ID '{group_id}'")));
        }
    }

    closer.replace(&settings, settings_coll).await?;
    info!(
        "Election settings updated: status {:?}, start {:?}, end {:?}",
        settings.status,
        settings.start(),
        settings.end()
    );
    Ok(Json(SettingsDescription::from(&settings)))
}

/// Results are always available to admins, whatever the election status.
#[get("/admin/results")]
async fn get_results(
    _token: AuthToken<Admin>,
    settings: Coll<ElectionSettings>,
    groups: Coll<Group>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let settings = ElectionSettings::load(&settings).await?;
    let tally = Tally::load(&groups, &candidates, &votes).await?;
    Ok(Json(ElectionResults {
        election: SettingsDescription::from(&settings),
        tally,
    }))
}

#[get("/admin/votes")]
async fn export_votes(
    _token: AuthToken<Admin>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<VoteDescription>>> {
    let votes: Vec<VoteDescription> = votes
        .find(None, None)
        .await?
        .map_ok(VoteDescription::from)
        .try_collect()
        .await?;
    Ok(Json(votes))
}

/// Delete every recorded vote.
#[delete("/admin/votes")]
async fn reset_votes(_token: AuthToken<Admin>, votes: Coll<Vote>) -> Result<()> {
    let result = votes.delete_many(doc! {}, None).await?;
    warn!("Reset votes: {} deleted", result.deleted_count);
    Ok(())
}

/// End the election, record its results in the history, then clear the votes.
#[post("/admin/election/archive", data = "<request>", format = "json")]
async fn archive_election(
    _token: AuthToken<Admin>,
    request: Json<ArchiveRequest>,
    settings: Coll<ElectionSettings>,
    groups: Coll<Group>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    history: Coll<NewHistoryEntry>,
    closer: &State<ElectionCloser>,
) -> Result<Json<HistoryDescription>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(Error::bad_request("An archived election needs a name."));
    }

    // No vote is accepted once the election has ended, so the tally is final.
    closer.end_now(&settings).await?;

    let tally = Tally::load(&groups, &candidates, &votes).await?;
    let winner = tally.winner().map(|candidate| candidate.name.clone());
    let entry = NewHistoryEntry::new(name.to_string(), Utc::now(), tally.total_votes, winner);
    let new_id = history
        .insert_one(&entry, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::internal("Database returned a non-ObjectId key"))?;

    votes.delete_many(doc! {}, None).await?;

    info!(
        "Archived election '{}' with {} votes, winner {}",
        entry.name, entry.total_votes, entry.winner
    );
    Ok(Json(HistoryDescription::from(HistoryEntry {
        id: new_id.into(),
        entry,
    })))
}

/// Archived elections, newest first, optionally filtered.
#[get("/admin/history?<search>")]
async fn get_history(
    _token: AuthToken<Admin>,
    search: Option<&str>,
    history: Coll<HistoryEntry>,
) -> Result<Json<Vec<HistoryDescription>>> {
    let newest_first = FindOptions::builder().sort(doc! { "_id": -1 }).build();
    let search = search.unwrap_or_default();
    let entries: Vec<HistoryDescription> = history
        .find(None, newest_first)
        .await?
        .try_filter(|entry| std::future::ready(entry.matches(search)))
        .map_ok(HistoryDescription::from)
        .try_collect()
        .await?;
    Ok(Json(entries))
}

#[post("/admin/fraud/analyze", data = "<request>", format = "json")]
async fn analyze_fraud(
    _token: AuthToken<Admin>,
    request: Json<FraudAnalysisRequest>,
    ai: &State<AiClient>,
) -> Result<Json<FraudAnalysis>> {
    if serde_json::from_str::<serde_json::Value>(&request.voting_data).is_err() {
        return Err(Error::bad_request("Voting data must be valid JSON."));
    }
    let analysis = fraud::analyze(ai, &request.voting_data).await?;
    Ok(Json(analysis))
}

/// Fraud analysis over the votes currently recorded.
#[post("/admin/fraud/analyze-recorded")]
async fn analyze_recorded_fraud(
    _token: AuthToken<Admin>,
    votes: Coll<Vote>,
    ai: &State<AiClient>,
) -> Result<Json<FraudAnalysis>> {
    let votes: Vec<Vote> = votes.find(None, None).await?.try_collect().await?;
    let records: Vec<FraudRecord> = votes.iter().map(FraudRecord::from).collect();
    let voting_data = fraud::voting_data(&records)
        .map_err(|e| Error::internal(format!("Could not serialise votes: {e}")))?;
    debug!("Analysing {} recorded votes for fraud", records.len());
    let analysis = fraud::analyze(ai, &voting_data).await?;
    Ok(Json(analysis))
}

/// The most recent permission errors, oldest first.
#[get("/admin/errors")]
fn recent_errors(
    _token: AuthToken<Admin>,
    emitter: &State<ErrorEmitter>,
) -> Json<Vec<PermissionError>> {
    Json(emitter.recent())
}

/// Permission errors as they happen, as server-sent events.
#[get("/admin/errors/stream")]
fn error_stream(
    _token: AuthToken<Admin>,
    emitter: &State<ErrorEmitter>,
    mut shutdown: Shutdown,
) -> EventStream![] {
    let mut errors = emitter.subscribe();
    EventStream! {
        loop {
            let error = select! {
                received = errors.recv() => match received {
                    Ok(error) => error,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Error stream subscriber missed {missed} errors");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&error).event("permission-error");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::json,
        tokio::{io::AsyncReadExt, time::timeout},
    };

    use crate::{
        error::Operation,
        model::{
            common::{election::ElectionStatus, national_id::NationalId},
            db::{admin::DEFAULT_ADMIN_USERNAME, group::NewGroup, history::NO_WINNER},
            mongodb::Id,
        },
    };

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

    /// One vote for candidate A and two for candidate B, from distinct voters
    /// so none collide.
    async fn seed_votes(db: &Database) {
        let group = seed_group(db).await;
        let a = Candidate::example(group);
        let b = Candidate::example2(group);
        let candidates = Coll::<Candidate>::from_db(db);
        candidates.insert_one(&a, None).await.unwrap();
        candidates.insert_one(&b, None).await.unwrap();

        let votes = vec![
            Vote::new(NationalId::example(), &a),
            Vote::new(NationalId::example2(), &b),
            Vote::new("1198870098765432".parse().unwrap(), &b),
        ];
        Coll::<Vote>::from_db(db)
            .insert_many(votes, None)
            .await
            .unwrap();
    }

    async fn put_settings_json<'c>(client: &'c Client, body: String) -> LocalResponse<'c> {
        client
            .put(uri!(put_settings))
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await
    }

    async fn archive<'c>(client: &'c Client, name: &str) -> LocalResponse<'c> {
        client
            .post(uri!(archive_election))
            .header(ContentType::JSON)
            .body(json!({ "name": name }).to_string())
            .dispatch()
            .await
    }

    #[backend_test(admin)]
    async fn create_delete_admin(client: Client, admins: Coll<Admin>) {
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let created = admins
            .find_one(doc! { "username": "coordinator" }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(created.verify_password("password123"));

        // Same username again.
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client.get(uri!(get_admins)).dispatch().await;
        let listed: Vec<AdminDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let mut names: Vec<_> = listed.into_iter().map(|admin| admin.username).collect();
        names.sort();
        assert_eq!(names, [DEFAULT_ADMIN_USERNAME, "coordinator"]);

        let response = client
            .delete(uri!(delete_admin("coordinator")))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);

        // Only one admin is left, so nothing more can be deleted.
        let response = client
            .delete(uri!(delete_admin("coordinator")))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let response = client
            .delete(uri!(delete_admin(DEFAULT_ADMIN_USERNAME)))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[backend_test(admin)]
    async fn bad_create_admin(client: Client, admins: Coll<Admin>) {
        let response = client
            .post(uri!(create_admin))
            .header(ContentType::JSON)
            .body(json!({ "username": "eve", "password": "short" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn settings_roundtrip(client: Client, db: Database) {
        let group = seed_group(&db).await;
        let start = Utc::now() - Duration::hours(1);
        let end = Utc::now() + Duration::hours(1);
        let spec = SettingsSpec {
            status: ElectionStatus::Active,
            start_date: Some(start),
            end_date: Some(end),
            active_group_id: Some(group),
        };
        let response = put_settings_json(&client, serde_json::to_string(&spec).unwrap()).await;
        assert_eq!(Status::Ok, response.status());
        let stored: SettingsDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(stored.is_open);
        assert_eq!(stored.active_group_id, Some(group));

        let response = client.get(uri!(get_settings)).dispatch().await;
        let fetched: SettingsDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(fetched.active_group_id, Some(group));
        assert_eq!(
            fetched.end_date.map(|d| d.timestamp_millis()),
            Some(end.timestamp_millis())
        );

        // The closer now targets the new end date.
        let closer = client.rocket().state::<ElectionCloser>().unwrap();
        assert_eq!(
            closer.scheduled_for().await.map(|d| d.timestamp_millis()),
            Some(end.timestamp_millis())
        );
    }

    #[backend_test(admin)]
    async fn bad_settings_rejected(client: Client) {
        let now = Utc::now();
        let backwards = SettingsSpec {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..Default::default()
        };
        let response =
            put_settings_json(&client, serde_json::to_string(&backwards).unwrap()).await;
        assert_eq!(Status::BadRequest, response.status());

        let unknown_group = SettingsSpec {
            active_group_id: Some(Id::new()),
            ..Default::default()
        };
        let response =
            put_settings_json(&client, serde_json::to_string(&unknown_group).unwrap()).await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn results_export_and_reset(client: Client, db: Database) {
        seed_votes(&db).await;

        let response = client.get(uri!(get_results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(results.tally.total_votes, 3);
        assert!(results.election.is_open);
        assert_eq!(results.tally.winner().unwrap().name, "Candidate B");

        let response = client.get(uri!(export_votes)).dispatch().await;
        let exported: Vec<VoteDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(exported.len(), 3);

        let response = client.delete(uri!(reset_votes)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let remaining = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[backend_test(admin)]
    async fn archive_and_search(client: Client, db: Database) {
        seed_votes(&db).await;
        let open = SettingsSpec {
            status: ElectionStatus::Active,
            start_date: None,
            end_date: Some(Utc::now() + Duration::days(1)),
            active_group_id: None,
        };
        let response = put_settings_json(&client, serde_json::to_string(&open).unwrap()).await;
        assert_eq!(Status::Ok, response.status());

        let response = archive(&client, "  ").await;
        assert_eq!(Status::BadRequest, response.status());

        let response = archive(&client, "General Election").await;
        assert_eq!(Status::Ok, response.status());
        let archived: HistoryDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(archived.total_votes, 3);
        assert_eq!(archived.winner, "Candidate B");
        assert_eq!(archived.date, Utc::now().format("%Y-%m-%d").to_string());

        // Votes cleared and the election ended, with no closing left pending.
        let remaining = Coll::<Vote>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        let settings = ElectionSettings::load(&Coll::from_db(&db)).await.unwrap();
        assert_eq!(settings.status, ElectionStatus::Ended);
        assert!(!settings.is_open_at(Utc::now()));
        let closer = client.rocket().state::<ElectionCloser>().unwrap();
        assert_eq!(closer.scheduled_for().await, None);

        // Archiving with no votes has no winner.
        let response = archive(&client, "By-election").await;
        let empty: HistoryDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(empty.winner, NO_WINNER);

        let response = client.get(uri!(get_history(_))).dispatch().await;
        let all: Vec<HistoryDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(all, vec![empty.clone(), archived.clone()]);

        let response = client
            .get(uri!(get_history(Some("general"))))
            .dispatch()
            .await;
        let found: Vec<HistoryDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(found, vec![archived]);
    }

    #[backend_test(admin)]
    async fn fraud_analysis_needs_json(client: Client) {
        let response = client
            .post(uri!(analyze_fraud))
            .header(ContentType::JSON)
            .body(json!({ "votingData": "not json" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Valid data gets as far as the AI service, which the test config
        // does not have a key for.
        let response = client
            .post(uri!(analyze_fraud))
            .header(ContentType::JSON)
            .body(json!({ "votingData": "[]" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadGateway, response.status());
    }

    #[backend_test(admin)]
    async fn errors_start_empty(client: Client) {
        let response = client.get(uri!(recent_errors)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let errors: Vec<PermissionError> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(errors.is_empty());
    }

    #[backend_test(admin)]
    async fn errors_are_streamed(client: Client) {
        let response = client.get(uri!(error_stream)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(response.content_type(), Some(ContentType::EventStream));

        let emitter = client.rocket().state::<ErrorEmitter>().unwrap();
        emitter.emit(PermissionError::new("votes/1_2", Operation::Create, None));

        rocket::tokio::pin!(response);
        let mut received = String::new();
        let mut buffer = [0; 1024];
        while !received.contains("votes/1_2") {
            let read = timeout(StdDuration::from_secs(5), response.read(&mut buffer))
                .await
                .expect("no event within 5s")
                .unwrap();
            assert!(read > 0, "stream ended before the event arrived");
            received.push_str(std::str::from_utf8(&buffer[..read]).unwrap());
        }
        assert!(received.contains("permission-error"));
    }

    #[backend_test(voter)]
    async fn voters_are_not_admins(client: Client) {
        let response = client.get(uri!(get_results)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.delete(uri!(reset_votes)).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
