use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use anyhow::Context;

use chrono::Duration;

use serde::{Deserialize, Serialize};

use sqlx::PgPool;

use url::Url;

use crate::app::BaseUrl;
use crate::client::{Email, EmailClient};
use crate::crypto::{SignedLink, SigningKey};
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::repo::SubscriberRepo;

/// How long an emailed confirmation link stays valid
const CONFIRMATION_TTL_HOURS: i64 = 24;

const INVALID_CONFIRM_LINK: &str = "This confirmation link is invalid or has expired.";
const INVALID_UNSUBSCRIBE_LINK: &str = "This unsubscribe link is invalid.";

/// Form deserialization wrapper for subscribe requests
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    email: String,
}

/// Query parameters of an emailed confirmation link
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    email: String,
    expires: i64,
    signature: String,
}

/// Query parameters of a permanent unsubscribe link
#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    email: String,
    signature: String,
}

/// Form deserialization wrapper for the self-service unsubscribe form
#[derive(Debug, Deserialize)]
pub struct UnsubscribeForm {
    email: String,
}

/// Uniform response payload for subscription state changes
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    success: bool,
    message: String,
}

impl ActionResponse {
    fn succeeded(message: &str) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Subscribe endpoint.
///
/// No state transition happens here beyond creating a pending row for new
/// addresses: both confirmation and resubscription of a previously
/// unsubscribed address wait for the emailed link to be clicked.
#[tracing::instrument(
    name = "Subscribe to the newsletter",
    skip(form, pool, signing_key, email_client, base_url),
    fields(subscriber_email = %form.email)
)]
#[post("/subscribe")]
async fn subscribe(
    form: web::Form<SubscribeForm>,
    pool: web::Data<PgPool>,
    signing_key: web::Data<SigningKey>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<BaseUrl>,
) -> RestResult<impl Responder> {
    let email: EmailAddress = form.0.email.parse().map_err(RestError::ParseError)?;

    let existing = SubscriberRepo::find_by_email(pool.get_ref(), &email).await?;
    if let Some(subscriber) = &existing {
        if subscriber.is_subscribed() {
            return Ok(HttpResponse::Ok().json(ActionResponse::succeeded(
                "You are already subscribed to the newsletter.",
            )));
        }
    }
    if existing.is_none() {
        SubscriberRepo::insert_pending(pool.get_ref(), &email).await?;
    }

    // Delivery failures are logged, not surfaced: the response reflects the
    // subscription state and the subscriber can always request a new link
    if let Err(error) =
        send_confirmation_email(&email_client, signing_key.get_ref(), &base_url.0, &email).await
    {
        tracing::error!(
            error.cause_chain = ?error,
            "Failed to send a confirmation email to {}", email
        );
    }

    Ok(HttpResponse::Ok().json(ActionResponse::succeeded(
        "Please check your inbox to confirm your subscription.",
    )))
}

/// Confirmation-link endpoint.
///
/// Rejected links soft-fail with a 200 payload; only an authentic,
/// unexpired signature touches the store.
#[tracing::instrument(
    name = "Confirm a subscription from a signed link",
    skip(query, pool, signing_key),
    fields(subscriber_email = %query.email)
)]
#[get("/confirm")]
async fn confirm(
    query: web::Query<ConfirmQuery>,
    pool: web::Data<PgPool>,
    signing_key: web::Data<SigningKey>,
) -> RestResult<impl Responder> {
    let link = SignedLink::from_query(&query.email, Some(query.expires));
    if let Err(error) = link.verify(signing_key.get_ref(), &query.signature) {
        tracing::info!("Rejected confirmation link: {}", error);
        return Ok(HttpResponse::Ok().json(ActionResponse::failed(INVALID_CONFIRM_LINK)));
    }

    // Only addresses validated at subscribe time get signed, so a parse
    // failure here means the link was not produced by us
    let email: EmailAddress = match query.email.parse() {
        Ok(email) => email,
        Err(_) => {
            return Ok(HttpResponse::Ok().json(ActionResponse::failed(INVALID_CONFIRM_LINK)))
        }
    };

    SubscriberRepo::confirm(pool.get_ref(), &email).await?;

    Ok(HttpResponse::Ok().json(ActionResponse::succeeded(
        "Your subscription is confirmed. Welcome aboard!",
    )))
}

/// Permanent unsubscribe-link endpoint.
///
/// Unknown addresses get the same success response as known ones: an
/// emailed link must not double as a membership oracle.
#[tracing::instrument(
    name = "Unsubscribe from a signed link",
    skip(query, pool, signing_key),
    fields(subscriber_email = %query.email)
)]
#[get("/unsubscribe")]
async fn unsubscribe_link(
    query: web::Query<UnsubscribeQuery>,
    pool: web::Data<PgPool>,
    signing_key: web::Data<SigningKey>,
) -> RestResult<impl Responder> {
    let link = SignedLink::from_query(&query.email, None);
    if let Err(error) = link.verify(signing_key.get_ref(), &query.signature) {
        tracing::info!("Rejected unsubscribe link: {}", error);
        return Ok(HttpResponse::Ok().json(ActionResponse::failed(INVALID_UNSUBSCRIBE_LINK)));
    }

    let email: EmailAddress = match query.email.parse() {
        Ok(email) => email,
        Err(_) => {
            return Ok(HttpResponse::Ok().json(ActionResponse::failed(INVALID_UNSUBSCRIBE_LINK)))
        }
    };

    SubscriberRepo::unsubscribe(pool.get_ref(), &email).await?;

    Ok(HttpResponse::Ok().json(ActionResponse::succeeded(
        "You have been unsubscribed from the newsletter.",
    )))
}

/// Self-service unsubscribe form.
///
/// Unlike the link path this one reports unknown addresses: whoever posts
/// the form already knows the address, so there is nothing to protect.
#[tracing::instrument(
    name = "Unsubscribe via the form",
    skip(form, pool),
    fields(subscriber_email = %form.email)
)]
#[post("/unsubscribe")]
async fn unsubscribe_form(
    form: web::Form<UnsubscribeForm>,
    pool: web::Data<PgPool>,
) -> RestResult<impl Responder> {
    let email: EmailAddress = form.0.email.parse().map_err(RestError::ParseError)?;

    let response = match SubscriberRepo::find_by_email(pool.get_ref(), &email).await? {
        None => ActionResponse::failed("Email address not found."),
        Some(subscriber) if !subscriber.is_subscribed() => {
            ActionResponse::failed("You are already unsubscribed.")
        }
        Some(_) => {
            SubscriberRepo::unsubscribe(pool.get_ref(), &email).await?;
            ActionResponse::succeeded("You have been unsubscribed from the newsletter.")
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

#[tracing::instrument(
    name = "Send a confirmation email",
    skip(email_client, signing_key, base_url)
)]
async fn send_confirmation_email(
    email_client: &EmailClient,
    signing_key: &SigningKey,
    base_url: &Url,
    email: &EmailAddress,
) -> anyhow::Result<()> {
    let confirm_url = SignedLink::new(email.as_ref())
        .expires_in(Duration::hours(CONFIRMATION_TTL_HOURS))
        .to_url(base_url, "newsletter/confirm", signing_key)
        .context("Failed to build confirmation URL")?;
    let unsubscribe_url = SignedLink::new(email.as_ref())
        .to_url(base_url, "newsletter/unsubscribe", signing_key)
        .context("Failed to build unsubscribe URL")?;

    let html_body = format!(
        "<h1>Welcome to the newsletter!</h1>\
         <p>Click <a href=\"{}\">here</a> to confirm your subscription. \
         The link is valid for 24 hours.</p>\
         <p><a href=\"{}\">Unsubscribe</a></p>",
        confirm_url, unsubscribe_url
    );
    let text_body = format!(
        "Welcome to the newsletter!\n\n\
         To confirm your subscription, visit: {}\n\
         The link is valid for 24 hours.\n\n\
         Unsubscribe: {}",
        confirm_url, unsubscribe_url
    );

    let email = Email {
        recipient: email.clone(),
        subject: "Confirm your subscription".into(),
        html_body,
        text_body,
    };

    email_client
        .send(email)
        .await
        .context("Email API rejected the send")
}

/// Subscription lifecycle endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/newsletter")
        .service(subscribe)
        .service(confirm)
        .service(unsubscribe_link)
        .service(unsubscribe_form)
}
