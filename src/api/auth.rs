use aws_sdk_sesv2::Client as SesClient;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::{ChallengeRequest, VerifyRequest},
            voter::RegistrationRequest,
        },
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            admin::Admin,
            otp::{NewOtpRecord, OtpRecord},
            voter::{NewVoter, Voter},
        },
        mongodb::{is_duplicate_key, Coll},
    },
    Config,
};

/// All authentication failures during the OTP exchange collapse to this one
/// message, so a caller cannot probe whether a given code ever existed or
/// merely expired.
const CODE_REJECTION: &str = "Invalid or expired code";

pub fn routes() -> Vec<Route> {
    routes![authenticate, register, challenge, verify, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username,
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No admin found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[post("/voter/register", data = "<registration>", format = "json")]
pub async fn register(
    registration: Json<RegistrationRequest>,
    voters: Coll<NewVoter>,
) -> Result<()> {
    let voter = NewVoter::from(registration.0);
    match voters.insert_one(&voter, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_key(&err) => Err(Error::BadRequest(format!(
            "Voter ID '{}' is already registered",
            voter.voter_id
        ))),
        Err(err) => Err(err.into()),
    }
}

#[cfg_attr(test, allow(unused_variables))]
#[post("/auth/voter/challenge", data = "<request>", format = "json")]
pub async fn challenge(
    request: Json<ChallengeRequest>,
    voters: Coll<Voter>,
    otps: Coll<NewOtpRecord>,
    config: &State<Config>,
    mailer: &State<SesClient>,
) -> Result<()> {
    let matching = doc! {
        "voter_id": &request.voter_id,
        "email": &request.email,
    };
    let voter = voters
        .find_one(matching, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter '{}'", request.voter_id)))?;

    // The record is committed before delivery is attempted; if delivery
    // fails the code simply expires unused.
    let record = NewOtpRecord::issue(voter.id, config.otp_ttl());
    otps.insert_one(&record, None).await?;
    info!("Issued security code for voter {}", voter.id);

    #[cfg(not(test))]
    send_code(mailer, config, &voter.email, record.code).await?;

    Ok(())
}

#[post("/auth/voter/verify", data = "<request>", format = "json")]
pub async fn verify(
    request: Json<VerifyRequest>,
    cookies: &CookieJar<'_>,
    voters: Coll<Voter>,
    otps: Coll<OtpRecord>,
    config: &State<Config>,
) -> Result<()> {
    let voter = voters
        .find_one(doc! { "voter_id": &request.voter_id }, None)
        .await?
        .ok_or_else(|| Error::Unauthorized(CODE_REJECTION.to_string()))?;

    // One-time consumption: the matching record is atomically marked used,
    // so resubmitting the same code can never succeed again.
    OtpRecord::consume(&otps, voter.id, request.code)
        .await?
        .ok_or_else(|| Error::Unauthorized(CODE_REJECTION.to_string()))?;

    let token = AuthToken::new(&voter);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

/// Hand the code to SES for delivery.
#[cfg(not(test))]
async fn send_code(
    mailer: &SesClient,
    config: &Config,
    email: &str,
    code: crate::model::otp::Code,
) -> Result<()> {
    use aws_sdk_sesv2::model::{Body, Content, Destination, EmailContent, Message};

    let message = Message::builder()
        .subject(Content::builder().data("Your voting security code").build())
        .body(
            Body::builder()
                .text(
                    Content::builder()
                        .data(format!(
                            "Your security code is {code}. It expires in {} minutes.",
                            config.otp_ttl().num_minutes()
                        ))
                        .build(),
                )
                .build(),
        )
        .build();

    mailer
        .send_email()
        .from_email_address(config.otp_sender())
        .destination(Destination::builder().to_addresses(email).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await
        .map_err(|err| Error::Delivery(err.to_string()))?;

    Ok(())
}
