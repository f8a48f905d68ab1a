use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::{headers::Cookie, TypedHeader};

use super::{models::User, services::set_session_cookies};
use crate::{errors::AppError, state::WebsiteState};

/// Whoever is looking at the page, if anyone is logged in.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// The authenticated caller of a login protected route.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub async fn sessions_middleware(
    state: State<WebsiteState>,
    cookie: Option<TypedHeader<Cookie>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let sessions = state.sessions();
    let config = state.config();

    let session_id = cookie
        .as_ref()
        .and_then(|TypedHeader(cookie)| cookie.get(&config.session_cookie_name));
    let current_session = match session_id {
        Some(session_id) => sessions.find_session(session_id).await?,
        None => None,
    };

    let session = match current_session {
        Some(session) => {
            sessions.touch(&session).await?;
            session
        }
        None => {
            sessions
                .create_session(None, config.session_expiration, &config.session_key)
                .await?
        }
    };

    let viewer = match session.user_pk().await {
        Some(pk) => User::find_by_pk(pk, state.database()).await?,
        None => None,
    };

    request.extensions_mut().insert(session.clone());
    request.extensions_mut().insert(Viewer(viewer));

    let mut resp = next.run(request).await;

    set_session_cookies(resp.headers_mut(), &session, config, state.secure_cookies()).await?;

    Ok(resp)
}

pub async fn login_required_middleware(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    mut request: Request,
    next: Next,
) -> Response {
    match viewer.0 {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        None => {
            let uri = request
                .uri()
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/");
            tracing::debug!(uri, "anonymous access to protected route");
            Redirect::to(&state.config().login_redirect(uri)).into_response()
        }
    }
}
