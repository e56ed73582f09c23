use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};

use sqlx::PgPool;

use tracing_actix_web::TracingLogger;

use url::Url;

use crate::client::EmailClient;
use crate::controller::{newsletters, subscriptions};
use crate::crypto::SigningKey;

/// Public base URL emailed links are rendered under, registered as app data
#[derive(Debug, Clone)]
pub struct BaseUrl(pub Url);

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok()
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    signing_key: SigningKey,
    email_client: EmailClient,
    base_url: Url,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let signing_key = web::Data::new(signing_key);
    let email_client = web::Data::new(email_client);
    let base_url = web::Data::new(BaseUrl(base_url));

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(pool.clone())
            .app_data(signing_key.clone())
            .app_data(email_client.clone())
            .app_data(base_url.clone())
            .service(health_check)
            .service(subscriptions::scope())
            .service(newsletters::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
