use std::ops::Deref;

use argon2::Config as Argon2Config;
use mongodb::{bson::doc, error::Error as DbError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{Coll, Id};

/// Username of the admin account created when none exists.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Create an admin, hashing the plaintext password with a fresh salt.
    pub fn with_password(username: String, password: &str) -> Result<Self, argon2::Error> {
        // 16 bytes is recommended for password hashing.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &Argon2Config::default())?;
        Ok(Self {
            username,
            password_hash,
        })
    }

    /// Check whether the given password is correct.
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

/// Create the default admin if there are no admins at all.
pub async fn ensure_admin_exists(
    admins: &Coll<NewAdmin>,
    default_password: &str,
) -> Result<(), DbError> {
    if admins.count_documents(None, None).await? > 0 {
        return Ok(());
    }
    let admin = match NewAdmin::with_password(DEFAULT_ADMIN_USERNAME.to_string(), default_password)
    {
        Ok(admin) => admin,
        Err(e) => {
            // Only reachable with an unusable argon2 configuration.
            error!("Could not hash default admin password: {e}");
            return Ok(());
        }
    };
    admins.insert_one(admin, None).await?;
    warn!("No admins found; created default admin '{DEFAULT_ADMIN_USERNAME}'");
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        pub fn example() -> Self {
            Self::with_password("coordinator".to_string(), "password123").unwrap()
        }
    }
}
