mod common;

use axum::http::StatusCode;
use quill::{
    auth::{hash_password, User},
    config::WebsiteConfig,
    service::StubService,
};

use common::{cookie_from, setup};

async fn user_with_password(app: &StubService, username: &str, password: &str) -> User {
    let hash = hash_password(password).unwrap();
    User::create(username, &hash, app.state().database())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_logs_the_user_in() {
    let app = setup().await;

    let response = app
        .post_form(
            "/auth/signup/",
            "username=new.user&password=long+enough+password".into(),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(StubService::location(&response), Some("/"));
    let cookie = cookie_from(&response, "session_id").unwrap();
    let user = User::find_by_username("new.user", app.state().database())
        .await
        .unwrap();
    assert!(user.is_some());

    let response = app.get("/create/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_rejects_taken_username() {
    let app = setup().await;
    app.create_user("leo").await;

    let response = app
        .post_form(
            "/auth/signup/",
            "username=leo&password=long+enough+password".into(),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = StubService::body_string(response).await;
    assert!(body.contains("A user with that username already exists."));
    assert!(body.contains("value=\"leo\""));
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let app = setup().await;

    let response = app
        .post_form("/auth/signup/", "username=leo&password=short".into(), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = StubService::body_string(response).await;
    assert!(body.contains("This password is too short."));
    assert!(User::find_by_username("leo", app.state().database())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_login_with_wrong_password_shows_form_again() {
    let app = setup().await;
    user_with_password(&app, "leo", "correct horse").await;

    let response = app
        .post_form(
            "/auth/login/",
            "username=leo&password=battery+staple".into(),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = StubService::body_string(response).await;
    assert!(body.contains("Please enter a correct username and password."));
    assert!(!body.contains("battery staple"));
}

#[tokio::test]
async fn test_login_redirects_to_next() {
    let app = setup().await;
    user_with_password(&app, "leo", "correct horse").await;

    let response = app
        .post_form(
            "/auth/login/?next=%2Fcreate%2F",
            "username=leo&password=correct+horse".into(),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(StubService::location(&response), Some("/create/"));
    let cookie = cookie_from(&response, "session_id").unwrap();
    let response = app.get("/create/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_ignores_foreign_next() {
    let app = setup().await;
    user_with_password(&app, "leo", "correct horse").await;

    let response = app
        .post_form(
            "/auth/login/?next=https%3A%2F%2Fevil.example",
            "username=leo&password=correct+horse".into(),
            None,
        )
        .await;

    assert_eq!(StubService::location(&response), Some("/"));
}

#[tokio::test]
async fn test_login_rotates_the_session() {
    let app = setup().await;
    user_with_password(&app, "leo", "correct horse").await;
    let anonymous = app.get("/", None).await;
    let before = cookie_from(&anonymous, "session_id").unwrap();

    let response = app
        .post_form(
            "/auth/login/",
            "username=leo&password=correct+horse".into(),
            Some(&before),
        )
        .await;

    let after = cookie_from(&response, "session_id").unwrap();
    assert_ne!(before, after);
    let response = app.get("/create/", Some(&before)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = setup().await;
    let user = app.create_user("leo").await;
    let cookie = app.force_login(&user).await;

    let response = app.get("/auth/logout/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(StubService::location(&response), Some("/"));
    let rotated = cookie_from(&response, "session_id").unwrap();

    for cookie in [cookie, rotated] {
        let response = app.get("/create/", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}

#[tokio::test]
async fn test_csrf_token_is_required_when_enabled() {
    let mut config = WebsiteConfig::stub();
    config.csrf_protection = true;
    let app = StubService::with_config(config).await;

    let response = app
        .post_form(
            "/auth/signup/",
            "username=leo&password=long+enough+password".into(),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let page = app.get("/auth/signup/", None).await;
    let session = cookie_from(&page, "session_id").unwrap();
    let csrf = cookie_from(&page, "csrf_token").unwrap();
    let token = csrf.trim_start_matches("csrf_token=");
    let body = StubService::body_string(page).await;
    assert!(body.contains(&format!("value=\"{token}\"")));

    let response = app
        .post_form(
            "/auth/signup/",
            format!("csrf_token={token}&username=leo&password=long+enough+password"),
            Some(&session),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
