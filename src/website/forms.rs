use axum::{
    extract::{FromRequest, Request},
    Form,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{config::WebsiteConfig, errors::AppError, sessions::Session, state::WebsiteState};

#[derive(Deserialize)]
struct CsrfProtected<T> {
    #[serde(default)]
    csrf_token: String,
    #[serde(flatten)]
    data: T,
}

/// Url encoded form whose `csrf_token` field is checked against the session
/// before the payload reaches the handler.
pub struct SecureForm<T>(T);

impl<T> SecureForm<T> {
    pub fn data(self) -> T {
        self.0
    }
}

impl<T> FromRequest<WebsiteState> for SecureForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &WebsiteState) -> Result<Self, Self::Rejection> {
        let session = req.extensions().get::<Session>().cloned();
        let Form(input) = Form::<CsrfProtected<T>>::from_request(req, state).await?;
        verify_csrf(state.config(), session.as_ref(), &input.csrf_token).await?;
        Ok(Self(input.data))
    }
}

pub async fn verify_csrf(
    config: &WebsiteConfig,
    session: Option<&Session>,
    token: &str,
) -> Result<(), AppError> {
    if !config.csrf_protection {
        return Ok(());
    }
    match session {
        Some(session) if session.token_is_valid(token).await => Ok(()),
        _ => {
            tracing::warn!("csrf token mismatch");
            Err(AppError::CsrfMismatch)
        }
    }
}
