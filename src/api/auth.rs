use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::{AuthToken, Voter, VoterChallengeRequest, VoterVerifyRequest, AUTH_TOKEN_COOKIE},
            otp::{Challenge, CHALLENGE_COOKIE},
        },
        db::admin::Admin,
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate, challenge, verify, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No admin found with the provided username and password combination.".to_string(),
            )
        })?;

    info!("Admin '{}' logged in", admin.username);
    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config)?);

    Ok(())
}

#[post("/auth/voter/challenge", data = "<request>", format = "json")]
pub async fn challenge(
    request: Json<VoterChallengeRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    let challenge = Challenge::new(request.0.national_id, config);

    // There is no SMS gateway; the code only ever goes to the log.
    debug!(
        "OTP code for voter {} is {}",
        challenge.national_id, challenge.code
    );

    cookies.add_private(challenge.into_cookie(config)?);

    Ok(())
}

#[post("/auth/voter/verify", data = "<request>", format = "json")]
pub async fn verify(
    request: Json<VoterVerifyRequest>,
    challenge: Challenge,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    if challenge.code != request.code {
        // Submitted code is invalid and so the verification fails
        return Err(Error::Status(
            Status::Unauthorized,
            "Incorrect OTP code.".to_string(),
        ));
    }

    let voter = Voter {
        national_id: challenge.national_id,
    };
    let token = AuthToken::new(&voter);
    cookies.add(token.into_cookie(config)?);

    // We no longer need the OTP challenge
    cookies.remove_private(Cookie::named(CHALLENGE_COOKIE));

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
