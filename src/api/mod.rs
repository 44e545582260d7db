use rocket::{
    http::Status, response::status::Custom, serde::json::Json, Catcher, Request, Route,
};
use serde::Serialize;

mod admin;
pub(crate) mod auth;
mod candidate;
mod group;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(candidate::routes());
    routes.extend(group::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Body of responses produced by Rocket itself rather than a handler, e.g.
/// unmatched routes or unparseable JSON. Same shape as handler errors.
#[derive(Serialize)]
struct CaughtError {
    status: u16,
    message: String,
}

/// Routes requiring authentication forward when there is no valid token, so
/// an unauthenticated request ends up here as a 404.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> Custom<Json<CaughtError>> {
    let message = match status.code {
        401 => "Authentication required.".to_string(),
        404 => format!("No route for {} {}.", req.method(), req.uri().path()),
        422 => "The request body could not be understood.".to_string(),
        _ => status.reason_lossy().to_string(),
    };
    Custom(
        status,
        Json(CaughtError {
            status: status.code,
            message,
        }),
    )
}
