use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    ai::{nida, translation, AiClient},
    error::{Error, Result},
    model::{
        api::{
            ai::{NidaRequest, NidaVerification, Translation, TranslationRequest},
            results::{ElectionResults, Tally},
            settings::SettingsDescription,
            vote::{VerifyRequest, VerifyResponse},
        },
        common::receipt::Receipt,
        db::{candidate::Candidate, group::Group, settings::ElectionSettings, vote::Vote},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![election, results, verify_receipt, translate, verify_national_id]
}

#[get("/election")]
async fn election(settings: Coll<ElectionSettings>) -> Result<Json<SettingsDescription>> {
    let settings = ElectionSettings::load(&settings).await?;
    Ok(Json(SettingsDescription::from(&settings)))
}

/// Results are only public once voting has finished.
#[get("/results")]
async fn results(
    settings: Coll<ElectionSettings>,
    groups: Coll<Group>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let now = Utc::now();
    let settings = ElectionSettings::load(&settings).await?;
    if !settings.has_ended_at(now) {
        return Err(Error::not_found(
            "Results are published once the election has ended".to_string(),
        ));
    }

    let tally = Tally::load(&groups, &candidates, &votes).await?;
    Ok(Json(ElectionResults {
        election: SettingsDescription::at(&settings, now),
        tally,
    }))
}

#[post("/verify", data = "<request>", format = "json")]
async fn verify_receipt(
    request: Json<VerifyRequest>,
    votes: Coll<Vote>,
) -> Result<Json<VerifyResponse>> {
    let receipt: Receipt = request
        .receipt
        .parse()
        .map_err(|e| Error::bad_request(format!("{e}")))?;

    let key = receipt.vote_key();
    if votes.find_one(key.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("Vote for receipt {receipt}")));
    }
    Ok(Json(VerifyResponse { verified: true }))
}

#[post("/translate", data = "<request>", format = "json")]
async fn translate(
    request: Json<TranslationRequest>,
    ai: &State<AiClient>,
) -> Result<Json<Translation>> {
    if request.text.trim().is_empty() {
        return Err(Error::bad_request("Nothing to translate."));
    }
    let translation = translation::translate(ai, &request.text, request.language).await?;
    Ok(Json(translation))
}

#[post("/nida/verify", data = "<request>", format = "json")]
async fn verify_national_id(
    request: Json<NidaRequest>,
    ai: &State<AiClient>,
) -> Result<Json<NidaVerification>> {
    let verification = nida::verify(ai, &request).await?;
    if !verification.is_valid {
        info!(
            "National ID verification failed: {:?}",
            verification.reason
        );
        return Err(Error::Status(
            Status::Forbidden,
            "Invalid or unregistered National ID.".to_string(),
        ));
    }
    Ok(Json(verification))
}
