#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use rocket::{Build, Rocket};

/// Assemble the server: all routes plus the ignite fairings that load the
/// application config, connect to the database, and build the mail client.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(logging::LoggerFairing)
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::MailFairing)
}

/// Connect to the test database server.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let figment = rocket::Config::figment();
    let db_uri: String = figment
        .extract_inner("db_uri")
        .expect("`db_uri` not set in test config");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to the test database server")
}

/// A random database name, so concurrently running tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    format!("test{}", rand::random::<u32>())
}

/// Build a server wired to the given scratch database instead of going
/// through the production fairings.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    rocket_with_figment(client, db_name, rocket::Config::figment()).await
}

/// As [`rocket_for_db`], but with a caller-supplied figment so tests can
/// override individual config values.
#[cfg(test)]
pub(crate) async fn rocket_with_figment(
    client: mongodb::Client,
    db_name: &str,
    figment: rocket::figment::Figment,
) -> Rocket<Build> {
    log4rs_test_utils::test_logging::init_logging_once_for(["ballotbox_backend"], None, None);

    let config: Config = figment.extract().expect("Invalid test config");
    let db = client.database(db_name);

    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes on the scratch database");
    model::db::election::ElectionState::ensure_exists(
        &model::mongodb::Coll::from_db(&db),
        config.election_starts_open(),
    )
    .await
    .expect("Failed to initialise the election state");

    let mailer = aws_sdk_sesv2::Client::new(&aws_config::load_from_env().await);

    rocket::build()
        .mount("/", api::routes())
        .manage(config)
        .manage(client)
        .manage(db)
        .manage(mailer)
}
