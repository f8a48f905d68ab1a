use askama::Template;
use axum::{
    extract::{multipart::MultipartError, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::website::{Error403, Error404, Error500, Meta};

#[macro_export]
macro_rules! log_and_wrap_custom_internal {
    ($e:expr) => {{
        tracing::error!(error = %$e, "internal error");
        $crate::errors::AppError::custom_internal(&$e.to_string())
    }};
}

#[derive(Debug)]
pub enum AppError {
    DoesNotExist,
    AuthorizationDenied,
    ConstraintViolation(String),
    CsrfMismatch,
    BadRequest(String),
    PayloadTooLarge,
    WrongPassword(argon2::password_hash::Error),
    ErrorHashingPassword(argon2::password_hash::Error),
    TemplateError(askama::Error),
    DatabaseError(sqlx::Error),
    IoError(std::io::Error),
    Custom(StatusCode, String),
}

impl AppError {
    pub fn custom_internal(message: &str) -> Self {
        Self::Custom(StatusCode::INTERNAL_SERVER_ERROR, message.to_owned())
    }

    pub fn custom_bad_request(message: &str) -> Self {
        Self::BadRequest(message.to_owned())
    }

    pub fn get_status_code_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::DoesNotExist => (StatusCode::NOT_FOUND, "Not found".into()),
            Self::AuthorizationDenied => (StatusCode::SEE_OTHER, "Not allowed".into()),
            Self::ConstraintViolation(m) => (StatusCode::CONFLICT, m.clone()),
            Self::CsrfMismatch => (StatusCode::FORBIDDEN, "CSRF verification failed".into()),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "The upload is too large".into(),
            ),
            Self::WrongPassword(_) => (
                StatusCode::UNAUTHORIZED,
                "Wrong username or password".into(),
            ),
            Self::ErrorHashingPassword(_)
            | Self::TemplateError(_)
            | Self::DatabaseError(_)
            | Self::IoError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".into(),
            ),
            Self::Custom(status, m) => (*status, m.clone()),
        }
    }

    fn render_page(status: StatusCode, message: String) -> Response {
        let rendered = match status {
            StatusCode::NOT_FOUND => Error404 {
                meta: Meta::titled("Page not found"),
                viewer: None,
            }
            .render(),
            StatusCode::FORBIDDEN => Error403 {
                meta: Meta::titled("Forbidden"),
                viewer: None,
                message,
            }
            .render(),
            _ => Error500 {
                meta: Meta::titled("Server error"),
                viewer: None,
                status: status.as_u16(),
                message,
            }
            .render(),
        };

        match rendered {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error page failed to render");
                status.into_response()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongPassword(e) | Self::ErrorHashingPassword(e) => write!(f, "{e}"),
            Self::TemplateError(e) => write!(f, "template: {e}"),
            Self::DatabaseError(e) => write!(f, "database: {e}"),
            Self::IoError(e) => write!(f, "io: {e}"),
            _ => write!(f, "{}", self.get_status_code_and_message().1),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            // Non-authors are bounced to the feed without an error page.
            Self::AuthorizationDenied => {
                tracing::debug!("authorization denied, redirecting home");
                return Redirect::to("/").into_response();
            }
            Self::TemplateError(_)
            | Self::DatabaseError(_)
            | Self::IoError(_)
            | Self::ErrorHashingPassword(_) => tracing::error!(error = %self, "request failed"),
            Self::ConstraintViolation(_) => tracing::warn!(error = %self, "constraint violation"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }
        let (status, message) = self.get_status_code_and_message();
        Self::render_page(status, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::DoesNotExist,
            sqlx::Error::Database(ref db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Self::ConstraintViolation(db.message().to_owned())
            }
            e => Self::DatabaseError(e),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(error: askama::Error) -> Self {
        Self::TemplateError(error)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(error.body_text())
    }
}

impl From<axum::extract::multipart::MultipartRejection> for AppError {
    fn from(rejection: axum::extract::multipart::MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
