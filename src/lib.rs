#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;

pub use config::Config;

use crate::{
    ai::AiFairing,
    config::{ConfigFairing, DatabaseFairing},
    error::ErrorEmitter,
    logging::LoggerFairing,
    model::db::closer::ElectionCloserFairing,
};

/// Assemble the server: routes, catchers, and the fairings that load config,
/// connect to the database and the AI service, and arm the election closer.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(ErrorEmitter::new())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(AiFairing)
        .attach(ElectionCloserFairing)
}

/// Assemble the server around an existing database connection instead of
/// connecting via the `DatabaseFairing`.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    use crate::model::{
        db::admin::ensure_admin_exists,
        mongodb::{ensure_indexes_exist, Coll},
    };

    let db = client.database(db_name);
    ensure_indexes_exist(&db).await.unwrap();
    let rocket = rocket::build();
    let default_password = rocket
        .figment()
        .extract_inner::<String>("default_admin_password")
        .unwrap();
    ensure_admin_exists(&Coll::from_db(&db), &default_password)
        .await
        .unwrap();

    rocket
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(ErrorEmitter::new())
        .manage(client)
        .manage(db)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(AiFairing)
        .attach(ElectionCloserFairing)
}

/// Connect to the database named by the `db_uri` config key.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// Get a random database name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}
