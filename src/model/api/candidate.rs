use rocket::http::uri::Absolute;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{
        db::candidate::{Candidate, NewCandidate},
        mongodb::{serde_hex_id, Id},
    },
};

use super::group::MIN_NAME_LENGTH;

/// A candidate as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    #[serde(with = "serde_hex_id")]
    pub group_id: Id,
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = Error;

    /// Validate the name and image URL. Whether the group exists is checked
    /// against the database by the caller.
    fn try_from(spec: CandidateSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_string();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(Error::bad_request(format!(
                "Candidate name must be at least {MIN_NAME_LENGTH} characters."
            )));
        }
        let image_url = spec.image_url.trim().to_string();
        if !is_web_url(&image_url) {
            return Err(Error::bad_request(
                "Candidate image URL must be an absolute http(s) URL.",
            ));
        }
        Ok(Self {
            name,
            description: spec.description.trim().to_string(),
            image_url,
            group_id: spec.group_id,
        })
    }
}

/// Is this an absolute `http` or `https` URL with a host?
fn is_web_url(url: &str) -> bool {
    match Absolute::parse(url) {
        Ok(uri) => {
            let scheme = uri.scheme().to_ascii_lowercase();
            (scheme == "http" || scheme == "https")
                && uri.authority().map_or(false, |auth| !auth.host().is_empty())
        }
        Err(_) => false,
    }
}

/// A candidate as shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub image_url: String,
    #[serde(with = "serde_hex_id")]
    pub group_id: Id,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id,
            name: core.name,
            description: core.description,
            image_url: core.image_url,
            group_id: core.group_id,
        }
    }
}
