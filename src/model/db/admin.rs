use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{api::admin::AdminCredentials, mongodb::{Coll, Id}};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // Unwrap safe because the only way to create an AdminCore is via
        // TryFrom<AdminCredentials>, so the hash is always well-formed.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap()
    }
}

impl TryFrom<AdminCredentials> for AdminCore {
    type Error = Error;

    /// Hash the credentials into a storable admin.
    /// Empty usernames or passwords are rejected.
    fn try_from(credentials: AdminCredentials) -> Result<Self, Self::Error> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(Error::BadRequest(
                "Admin username and password must be non-empty".to_string(),
            ));
        }
        let salt: [u8; 16] = rand::random();
        let password_hash = argon2::hash_encoded(
            credentials.password.as_bytes(),
            &salt,
            &argon2::Config::default(),
        )?;
        Ok(Self {
            username: credentials.username,
            password_hash,
        })
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Serialize, Deserialize)]
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

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Ensure there is at least one admin account, seeding the default one with
/// the configured password if the collection is empty.
pub async fn ensure_admin_exists(
    admins: &Coll<NewAdmin>,
    default_password: &str,
) -> Result<(), Error> {
    if admins.count_documents(None, None).await? > 0 {
        return Ok(());
    }
    let admin = AdminCredentials {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password: default_password.to_string(),
    }
    .try_into()?;
    admins.insert_one(&admin, None).await?;
    warn!("No admin accounts found, seeded default admin '{DEFAULT_ADMIN_USERNAME}'");
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        pub fn example() -> Self {
            AdminCredentials::example().try_into().unwrap()
        }
    }
}
