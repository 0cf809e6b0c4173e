use aws_config::SdkConfig;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sesv2::{Client as SesClient, Credentials, Region};
use chrono::{DateTime, Duration, Utc};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::{admin::ensure_admin_exists, election::ElectionState},
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    otp_ttl: u32,
    auth_ttl: u32,
    otp_sender: String,
    results_unlock: DateTime<Utc>,
    #[serde(default)]
    election_starts_open: bool,
    // secrets
    jwt_secret: String,
    default_admin_password: String,
}

impl Config {
    /// Valid lifetime of an OTP code in seconds.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// From-address for OTP delivery emails.
    pub fn otp_sender(&self) -> &str {
        &self.otp_sender
    }

    /// The fixed instant at which public results become visible.
    /// Deliberately independent of the open/closed toggle.
    pub fn results_unlock(&self) -> DateTime<Utc> {
        self.results_unlock
    }

    /// Are the public results visible at the given instant?
    pub fn results_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.results_unlock
    }

    /// Whether a freshly deployed election starts open for voting.
    pub fn election_starts_open(&self) -> bool {
        self.election_starts_open
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Password given to the seeded admin account on first launch.
    pub fn default_admin_password(&self) -> &str {
        &self.default_admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
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
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any required setup, and places both a `Client` and a `Database`
/// into managed state.
///
/// Must be attached after [`ConfigFairing`]: seeding the admin account and
/// the election state needs the application config.
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
        let db_config = match rocket.figment().extract::<DbConfig>() {
            Ok(db_config) => db_config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(db_config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }

        let config = rocket
            .state::<Config>()
            .expect("ConfigFairing must be attached before DatabaseFairing");

        // A fresh deployment needs an admin account and the election state
        // document before any request can do useful work.
        if let Err(e) =
            ensure_admin_exists(&Coll::from_db(&db), config.default_admin_password()).await
        {
            error!("Failed to seed the admin account: {e}");
            return Err(rocket);
        }
        if let Err(e) =
            ElectionState::ensure_exists(&Coll::from_db(&db), config.election_starts_open()).await
        {
            error!("Failed to initialise the election state: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "ballotbox".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Configuration for the AWS connection.
#[derive(Deserialize)]
struct AwsConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places an SES `Client` into
/// managed state for OTP delivery.
pub struct MailFairing;

#[rocket::async_trait]
impl Fairing for MailFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS SES",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<AwsConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load AWS config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let aws_config = SdkConfig::builder()
            .region(Region::new(config.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                config.aws_access_key_id,
                config.aws_secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .build();
        let client = SesClient::new(&aws_config);
        info!("Loaded Amazon SES config");

        Ok(rocket.manage(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_unlock(results_unlock: DateTime<Utc>) -> Config {
        Config {
            otp_ttl: 300,
            auth_ttl: 3600,
            otp_sender: "ballots@example.com".to_string(),
            results_unlock,
            election_starts_open: false,
            jwt_secret: "test secret".to_string(),
            default_admin_password: "test password".to_string(),
        }
    }

    #[test]
    fn results_gate_follows_the_unlock_instant_only() {
        let now = Utc::now();

        let locked = config_with_unlock(now + Duration::hours(1));
        assert!(!locked.results_unlocked(now));

        let unlocked = config_with_unlock(now - Duration::hours(1));
        assert!(unlocked.results_unlocked(now));

        // Unlocking is edge-inclusive.
        let boundary = config_with_unlock(now);
        assert!(boundary.results_unlocked(now));
    }
}
