use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime},
    error::Error as DbError,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    mongodb::{Coll, Id},
    otp::Code,
};

/// A persisted one-time-passcode challenge.
///
/// Records are never deleted: consumed and expired codes stay behind as an
/// audit trail. A voter may hold several outstanding codes at once; issuing
/// a new one does not invalidate the others.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecordCore {
    /// The voter this code was issued to.
    pub voter: Id,
    pub code: Code,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl OtpRecordCore {
    /// Issue a fresh random code for the given voter.
    pub fn issue(voter: Id, ttl: Duration) -> Self {
        Self {
            voter,
            code: Code::random(),
            expires_at: Utc::now() + ttl,
            is_used: false,
        }
    }
}

/// An OTP record without an ID.
pub type NewOtpRecord = OtpRecordCore;

/// An OTP record from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct OtpRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub record: OtpRecordCore,
}

impl OtpRecord {
    /// Atomically consume a matching, unused, unexpired record, returning it
    /// if one existed.
    ///
    /// The conditional update is what makes codes one-time: once a record
    /// matches, `is_used` is permanently true and no retry with the same
    /// code can match again.
    pub async fn consume(
        otps: &Coll<OtpRecord>,
        voter: Id,
        code: Code,
    ) -> Result<Option<OtpRecord>, DbError> {
        let valid = doc! {
            "voter": voter,
            "code": code.to_string(),
            "is_used": false,
            "expires_at": { "$gt": BsonDateTime::from_chrono(Utc::now()) },
        };
        let mark_used = doc! { "$set": { "is_used": true } };
        otps.find_one_and_update(valid, mark_used, None).await
    }
}

impl Deref for OtpRecord {
    type Target = OtpRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl DerefMut for OtpRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}
