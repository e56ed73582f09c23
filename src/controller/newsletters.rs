use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};

use anyhow::anyhow;

use serde::Deserialize;

use sqlx::PgPool;

use url::Url;

use crate::app::BaseUrl;
use crate::auth::Administrator;
use crate::client::{Email, EmailClient};
use crate::crypto::{SignedLink, SigningKey};
use crate::domain::EmailAddress;
use crate::error::RestResult;
use crate::repo::SubscriberRepo;

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    title: String,
    content: PublishBodyContent,
}

#[derive(Debug, Deserialize)]
pub struct PublishBodyContent {
    text: String,
    html: String,
}

/// Deliver an issue to every confirmed, still-subscribed recipient, each
/// with their own permanent unsubscribe link appended.
#[tracing::instrument(
    name = "Publish a newsletter issue",
    skip(_admin, body, pool, signing_key, email_client, base_url)
)]
#[post("")]
async fn publish(
    _admin: Administrator,
    body: web::Json<PublishBody>,
    pool: web::Data<PgPool>,
    signing_key: web::Data<SigningKey>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<BaseUrl>,
) -> RestResult<impl Responder> {
    let body = body.0;

    for recipient in SubscriberRepo::fetch_all_active(pool.get_ref()).await? {
        let address: EmailAddress = match recipient.email.parse() {
            Ok(address) => address,
            Err(error) => {
                tracing::warn!(
                    "Skipping recipient with an invalid stored address (id: {}): {}",
                    recipient.id,
                    error
                );
                continue;
            }
        };

        let issue = build_issue_email(&body, address, signing_key.get_ref(), &base_url.0)?;

        // One bad mailbox must not abort the whole send
        if let Err(error) = email_client.send(issue).await {
            tracing::warn!(
                error.cause_chain = ?error,
                "Failed to deliver the issue to recipient {}", recipient.id
            );
        }
    }

    Ok(HttpResponse::Ok().finish())
}

/// Render the issue for one recipient, appending their unsubscribe link
fn build_issue_email(
    body: &PublishBody,
    recipient: EmailAddress,
    signing_key: &SigningKey,
    base_url: &Url,
) -> RestResult<Email> {
    let unsubscribe_url = SignedLink::new(recipient.as_ref())
        .to_url(base_url, "newsletter/unsubscribe", signing_key)
        .map_err(|e| anyhow!("Failed to build unsubscribe URL: {}", e))?;

    let html_body = format!(
        "{}<p><a href=\"{}\">Unsubscribe</a></p>",
        body.content.html, unsubscribe_url
    );
    let text_body = format!("{}\n\nUnsubscribe: {}", body.content.text, unsubscribe_url);

    Ok(Email {
        recipient,
        subject: body.title.clone(),
        html_body,
        text_body,
    })
}

/// Newsletter publishing endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/newsletters").service(publish)
}
