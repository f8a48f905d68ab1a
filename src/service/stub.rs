use axum::{
    body::Body,
    http::{header::LOCATION, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt as _;

use crate::{
    auth::User,
    config::{SharedConfig, WebsiteConfig},
    state::{SharedState, WebsiteState},
};

use super::{normalize_paths, ServiceExt, WebsiteService};

/// A website wired to a fresh SQLite file and driven in process.
pub struct StubService(WebsiteService);

impl StubService {
    pub async fn new(service: WebsiteService) -> Self {
        Self::set_up(service.stub()).await
    }

    /// Keeps the given website config instead of the stub one.
    pub async fn with_config(config: WebsiteConfig) -> Self {
        Self::set_up(WebsiteService::with_config(config)).await
    }

    async fn set_up(mut service: WebsiteService) -> Self {
        let shared = SharedState::new(&SharedConfig::stub());
        shared.database().run_migrations().await;
        service.set_up(shared).await;
        Self(service)
    }

    pub fn state(&self) -> &WebsiteState {
        self.0.state().expect("stub service is set up")
    }

    fn router(&self) -> Router {
        self.0.router().cloned().expect("stub service is set up")
    }

    pub async fn request(&self, req: Request<Body>) -> Response<Body> {
        normalize_paths(self.router())
            .oneshot(req)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.request(builder.body(Body::empty()).expect("valid request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: String, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.request(builder.body(Body::from(body)).expect("valid request"))
            .await
    }

    pub async fn create_user(&self, username: &str) -> User {
        User::create(username, "!unusable", self.state().database())
            .await
            .expect("user is created")
    }

    /// Opens a session for `user` and returns the matching `Cookie` header.
    pub async fn force_login(&self, user: &User) -> String {
        let state = self.state();
        let config = state.config();
        let session = state
            .sessions()
            .create_session(Some(user.pk), config.session_expiration, &config.session_key)
            .await
            .expect("session is created");
        format!("{}={}", config.session_cookie_name, session.id().await)
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body is readable")
            .to_bytes();
        String::from_utf8_lossy(&body).into_owned()
    }

    pub fn location(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}
