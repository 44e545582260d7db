use chrono::Duration;
use mongodb::{error::Error as DbError, Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    figment::Figment,
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::model::{
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Name of the production database.
const DATABASE_NAME: &str = "evote";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    otp_ttl: u32,
    auth_ttl: u32,
    #[serde(default)]
    mock_otp: Option<String>,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of OTP challenges.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Valid lifetime of auth token cookies.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Fixed OTP code handed out instead of a random one, for demo deployments
    /// without an SMS gateway.
    pub fn mock_otp(&self) -> Option<&str> {
        self.mock_otp.as_deref()
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// Extract one section of config from Rocket's figment, logging a readable
/// explanation on failure. `what` names the section in the log.
pub(crate) fn extract_config<T: DeserializeOwned>(figment: &Figment, what: &str) -> Option<T> {
    match figment.extract::<T>() {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Failed to load {what} config");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// Written out rather than using `AdHoc::config` so that every config section
/// fails ignition the same way.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match extract_config::<Config>(rocket.figment(), "application") {
            Some(config) => {
                if config.mock_otp().is_some() {
                    warn!("`mock_otp` is set; every voter receives the same OTP code");
                }
                Ok(rocket.manage(config))
            }
            None => Err(rocket),
        }
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    default_admin_password: String,
}

/// Connect to the database and bring it up to what the server expects:
/// indexes in place and at least one admin to log in as.
async fn connect(config: &DbConfig) -> Result<(MongoClient, Database), DbError> {
    let client = MongoClient::with_uri_str(&config.db_uri).await?;
    let db = client.database(DATABASE_NAME);
    ensure_indexes_exist(&db).await?;
    ensure_admin_exists(&Coll::from_db(&db), &config.default_admin_password).await?;
    Ok((client, db))
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match extract_config::<DbConfig>(rocket.figment(), "database") {
            Some(config) => config,
            None => return Err(rocket),
        };
        info!("Loaded database config, connecting...");
        match connect(&config).await {
            Ok((client, db)) => {
                info!("...database connection online!");
                Ok(rocket.manage(client).manage(db))
            }
            Err(e) => {
                error!("Failed to set up database: {e}");
                Err(rocket)
            }
        }
    }
}
