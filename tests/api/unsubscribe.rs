use reqwest::StatusCode;

use sqlx::PgPool;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{count_subscribers, subscriber_state, SubscribeBody, TestApp};

async fn create_confirmed_subscriber(app: &TestApp, email: &str) {
    let _mock_guard = Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .named("Create confirmed subscriber")
        .expect(1)
        .mount_as_scoped(&app.email_server)
        .await;

    app.subscribe(&SubscribeBody::with(email))
        .await
        .expect("Failed to create subscription");

    let link = app.confirmation_link().await;
    app.fetch(&link)
        .await
        .expect("Failed to follow confirmation link");
}

#[sqlx::test]
async fn unsubscribe_link_marks_the_subscriber_unsubscribed(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    let res = app
        .fetch(&app.unsubscribe_link_for("a@test.com"))
        .await
        .expect("Failed to follow unsubscribe link");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(true), body["success"].as_bool());

    let (confirmed_at, unsubscribed_at) = subscriber_state(&pool, "a@test.com")
        .await
        .expect("Record vanished");
    assert!(unsubscribed_at.is_some());
    // Unsubscribing leaves the confirmation timestamp untouched
    assert!(confirmed_at.is_some());

    Ok(())
}

#[sqlx::test]
async fn unsubscribe_link_is_idempotent(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    for _ in 0..2 {
        let res = app
            .fetch(&app.unsubscribe_link_for("a@test.com"))
            .await
            .expect("Failed to follow unsubscribe link");

        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(Some(true), body["success"].as_bool());
    }

    assert_eq!(1, count_subscribers(&pool).await);

    Ok(())
}

#[sqlx::test]
async fn unsubscribe_link_does_not_reveal_unknown_addresses(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .fetch(&app.unsubscribe_link_for("ghost@test.com"))
        .await
        .expect("Failed to follow unsubscribe link");

    // Same response as for a known address, and still no record
    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(true), body["success"].as_bool());

    assert_eq!(0, count_subscribers(&pool).await);

    Ok(())
}

#[sqlx::test]
async fn unsubscribe_link_with_a_bad_signature_is_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    let mut link = app.unsubscribe_link_for("a@test.com");
    link.set_query(Some("email=a%40test.com&signature=AAAA"));

    let res = app
        .fetch(&link)
        .await
        .expect("Failed to follow unsubscribe link");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(false), body["success"].as_bool());

    let (_, unsubscribed_at) = subscriber_state(&pool, "a@test.com")
        .await
        .expect("Record vanished");
    assert!(unsubscribed_at.is_none());

    Ok(())
}

#[sqlx::test]
async fn confirming_a_fresh_link_resubscribes(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    app.fetch(&app.unsubscribe_link_for("a@test.com"))
        .await
        .expect("Failed to follow unsubscribe link");

    // Subscribing again issues a fresh confirmation link; the state change
    // waits for the click
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.subscribe(&SubscribeBody::with("a@test.com"))
        .await
        .expect("Failed to execute request");

    let (_, unsubscribed_at) = subscriber_state(&pool, "a@test.com")
        .await
        .expect("Record vanished");
    assert!(unsubscribed_at.is_some());

    let link = app.confirmation_link().await;
    let res = app
        .fetch(&link)
        .await
        .expect("Failed to follow confirmation link");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(true), body["success"].as_bool());

    let (confirmed_at, unsubscribed_at) = subscriber_state(&pool, "a@test.com")
        .await
        .expect("Record vanished");
    assert!(confirmed_at.is_some());
    assert!(unsubscribed_at.is_none());
    assert_eq!(1, count_subscribers(&pool).await);

    Ok(())
}

#[sqlx::test]
async fn form_unsubscribe_reports_unknown_addresses(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .unsubscribe_form(&SubscribeBody::with("ghost@test.com"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(false), body["success"].as_bool());
    assert_eq!(Some("Email address not found."), body["message"].as_str());

    Ok(())
}

#[sqlx::test]
async fn form_unsubscribe_marks_the_subscriber_unsubscribed(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    let res = app
        .unsubscribe_form(&SubscribeBody::with("a@test.com"))
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(true), body["success"].as_bool());

    let (_, unsubscribed_at) = subscriber_state(&pool, "a@test.com")
        .await
        .expect("Record vanished");
    assert!(unsubscribed_at.is_some());

    Ok(())
}

#[sqlx::test]
async fn form_unsubscribe_twice_reports_already_unsubscribed(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    create_confirmed_subscriber(&app, "a@test.com").await;

    app.unsubscribe_form(&SubscribeBody::with("a@test.com"))
        .await
        .expect("Failed to execute request");
    let res = app
        .unsubscribe_form(&SubscribeBody::with("a@test.com"))
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(Some(false), body["success"].as_bool());
    assert_eq!(Some("You are already unsubscribed."), body["message"].as_str());

    Ok(())
}
