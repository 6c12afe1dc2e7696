mod common;

use common::TestApp;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn register_then_login_returns_a_token() {
    let app = TestApp::spawn().await;

    let response = app.register("ganesh_tent", "counter-top-42").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "ganesh_tent");
    assert_eq!(body["user"]["name"], "ganesh_tent");
    assert!(body["user"].get("password_hash").is_none());

    let response = app.login("ganesh_tent", "counter-top-42").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    assert_eq!(body["expires_in"], 3600);
}

#[tokio::test]
async fn register_uses_the_given_display_name() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/auth/register"))
        .json(&json!({ "username": "laxmi", "password": "secret-99", "name": "Laxmi Decorators" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Laxmi Decorators");
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let app = TestApp::spawn().await;

    assert_eq!(
        app.register("twice", "counter-top-42").await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        app.register("twice", "another-pass").await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let app = TestApp::spawn().await;

    let short_password = app.register("valid_name", "123").await;
    assert_eq!(short_password.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let short_username = app.register("ab", "counter-top-42").await;
    assert_eq!(short_username.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let blank_username = app.register("     ", "counter-top-42").await;
    assert_eq!(blank_username.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let padded_short_username = app.register(" ab ", "counter-top-42").await;
    assert_eq!(padded_short_username.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn usernames_are_stored_trimmed() {
    let app = TestApp::spawn().await;

    let response = app.register("  padded_shop  ", "counter-top-42").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], "padded_shop");

    let response = app.login("padded_shop", "counter-top-42").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::spawn().await;
    app.register("careful", "counter-top-42").await;

    let wrong = app.login("careful", "not-the-password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = wrong.json().await.unwrap();

    let unknown = app.login("nobody", "not-the-password").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body: Value = unknown.json().await.unwrap();

    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn bills_require_a_valid_token() {
    let app = TestApp::spawn().await;

    let missing = app.client.get(app.url("/bills")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .client
        .get(app.url("/bills"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    let body: Value = garbage.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");
}
