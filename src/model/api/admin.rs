use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{
        db::admin::{Admin, NewAdmin},
        mongodb::{serde_hex_id, Id},
    },
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Hash the password of a new admin account.
    /// The username must be non-empty and the password long enough.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.trim().is_empty() {
            return Err(Error::bad_request("Admin username must not be empty."));
        }
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request(format!(
                "Admin password must be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }
        Ok(NewAdmin::with_password(cred.username, &cred.password)?)
    }
}

/// An admin account as shown to other admins. Never includes the hash.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub username: String,
}

impl From<Admin> for AdminDescription {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            username: admin.admin.username,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        pub fn example() -> Self {
            Self {
                username: "coordinator".into(),
                password: "password123".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_admin_validation() {
        let admin = NewAdmin::try_from(AdminCredentials::example()).unwrap();
        assert_eq!(admin.username, "coordinator");
        assert!(admin.verify_password("password123"));

        assert!(NewAdmin::try_from(AdminCredentials::empty()).is_err());
        let short = AdminCredentials {
            username: "short".into(),
            password: "1234567".into(),
        };
        assert!(NewAdmin::try_from(short).is_err());
    }
}
