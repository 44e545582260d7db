use std::fmt::Display;

use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request,
};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    error::Error,
    model::{common::national_id::NationalId, db::admin::Admin},
};

use super::token::AuthToken;

/// A user of our application, having defined rights.
pub trait User {
    /// The rights of this user type.
    const RIGHTS: Rights;
    /// What the auth token identifies this user by.
    fn subject(&self) -> String;
}

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// An authenticated voter. Voters are not stored; they are identified by
/// their national ID alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voter {
    pub national_id: NationalId,
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn subject(&self) -> String {
        self.national_id.to_string()
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn subject(&self) -> String {
        self.id.to_string()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Voter {
    type Error = Error;

    /// The voter named by a valid voter auth token.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken<Voter>>().await);
        match token.subject().parse() {
            Ok(national_id) => Outcome::Success(Self { national_id }),
            Err(e) => Outcome::Failure((
                Status::Unauthorized,
                Error::Status(Status::Unauthorized, format!("Bad voter token: {e}")),
            )),
        }
    }
}
