use std::future::Future;
use std::pin::Pin;

use actix_web::{dev, web, FromRequest, HttpRequest};

use argon2::{Argon2, PasswordHash, PasswordVerifier};

use anyhow::Context;

use secrecy::Secret;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Credentials;
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::repo::UsersRepo;
use crate::telemetry::spawn_blocking_with_tracing;

/// Extractor guarding publish endpoints: resolves Basic credentials against
/// the `users` table
#[derive(Debug)]
pub struct Administrator(Uuid);

impl FromRequest for Administrator {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let pool: &PgPool = req
                .app_data::<web::Data<PgPool>>()
                .expect("PgPool not registered for application");

            let creds = Credentials::from_headers(req.headers())
                .map_err(RestError::FailedToAuthenticate)?;

            let user_id = validate_credentials(pool, &creds).await?;

            Ok(Administrator(user_id))
        })
    }
}

impl AsRef<Uuid> for Administrator {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

#[tracing::instrument(name = "Validate credentials", skip(credentials, pool))]
async fn validate_credentials(pool: &PgPool, credentials: &Credentials) -> RestResult<Uuid> {
    let email: EmailAddress = credentials
        .username
        .parse()
        .map_err(RestError::ParseError)?;
    let password = credentials.password.clone();

    let user = UsersRepo::fetch_credentials_by_email(pool, &email)
        .await?
        .context("No user stored for email")
        .map_err(RestError::FailedToAuthenticate)?;

    spawn_blocking_with_tracing(move || verify_password_hash(password, user.password_hash))
        .await
        .context("Failed to spawn blocking task")??;

    Ok(user.id)
}

#[tracing::instrument(name = "Verify password hash", skip(password, password_hash))]
fn verify_password_hash(password: Secret<String>, password_hash: Secret<String>) -> RestResult<()> {
    use secrecy::ExposeSecret;

    let password_hash = PasswordHash::new(password_hash.expose_secret())
        .context("Failed to parse stored password hash")?;

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .context("Invalid password")
        .map_err(RestError::FailedToAuthenticate)?;

    Ok(())
}
