use std::net::TcpListener;

use anyhow::Context;

use sqlx::PgPool;

use newsletter::app;
use newsletter::client::EmailClient;
use newsletter::crypto::SigningKey;
use newsletter::settings::Settings;
use newsletter::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().expect("Failed to load settings");

    let pool = PgPool::connect_with(settings.database.with_db()).await?;

    let signing_key = SigningKey::new(settings.app.secret_key())?;

    let email_client = EmailClient::new(
        settings.email.sender(),
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
    )?;

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(
        listener,
        pool,
        signing_key,
        email_client,
        settings.app.base_url(),
    )?
    .await
    .context("Failed to run app")
}
