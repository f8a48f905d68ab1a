use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use cookie::{time::Duration, SameSite};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

use crate::{
    config::WebsiteConfig, errors::AppError, log_and_wrap_custom_internal, sessions::Session,
    state::WebsiteState, website::html::FieldErrors,
};

use super::models::User;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("static regex"));

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME.is_match(username) {
        return Ok(());
    }
    Err(ValidationError::new("invalid_username").with_message(
        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
            .into(),
    ))
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Ensure this value has between 1 and 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    pub next: Option<String>,
}

impl NextParams {
    /// Only local paths are honoured so the login form cannot bounce users
    /// to another site.
    pub fn redirect_to<'a>(&'a self, config: &'a WebsiteConfig) -> &'a str {
        self.next
            .as_deref()
            .filter(|next| next.starts_with('/') && !next.starts_with("//"))
            .unwrap_or(&config.login_redirect_to)
    }
}

/// Checks the credentials and attaches the user to the current session.
pub async fn login(
    state: &WebsiteState,
    session: &Session,
    input: &LoginForm,
) -> Result<Result<User, FieldErrors>, AppError> {
    if let Err(errors) = input.validate() {
        return Ok(Err(errors.into()));
    }
    let Some(found) =
        User::find_by_username_with_password(&input.username, state.database()).await?
    else {
        return Ok(Err(wrong_credentials()));
    };
    match verify_password(&input.password, &found.password) {
        Ok(()) => {}
        Err(AppError::WrongPassword(_)) => return Ok(Err(wrong_credentials())),
        Err(e) => return Err(e),
    }
    let config = state.config();
    state
        .sessions()
        .reuse_current_as_new_one(session, Some(found.user.pk), &config.session_key)
        .await?;
    tracing::info!(user_pk = found.user.pk, "user logged in");
    Ok(Ok(found.user))
}

/// Creates the account and logs it in straight away.
pub async fn signup(
    state: &WebsiteState,
    session: &Session,
    input: &SignupForm,
) -> Result<Result<User, FieldErrors>, AppError> {
    let mut errors = match input.validate() {
        Ok(()) => FieldErrors::default(),
        Err(errors) => errors.into(),
    };
    if !errors.contains("username")
        && User::find_by_username(&input.username, state.database())
            .await?
            .is_some()
    {
        errors.add("username", "A user with that username already exists.");
    }
    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    let password = hash_password(&input.password)?;
    let user = User::create(&input.username, &password, state.database()).await?;
    let config = state.config();
    state
        .sessions()
        .reuse_current_as_new_one(session, Some(user.pk), &config.session_key)
        .await?;
    Ok(Ok(user))
}

pub async fn logout(state: &WebsiteState, session: &Session) -> Result<(), AppError> {
    let config = state.config();
    state
        .sessions()
        .reuse_current_as_new_one(session, None, &config.session_key)
        .await
}

fn wrong_credentials() -> FieldErrors {
    let mut errors = FieldErrors::default();
    errors.add(
        "__all__",
        "Please enter a correct username and password. Note that both fields may be case-sensitive.",
    );
    errors
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AppError::ErrorHashingPassword)?
        .to_string())
}

pub fn verify_password(raw_password: &str, db_password: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(db_password).map_err(AppError::ErrorHashingPassword)?;
    Argon2::default()
        .verify_password(raw_password.as_bytes(), &parsed_hash)
        .map_err(AppError::WrongPassword)
}

pub async fn set_session_cookies(
    headers: &mut HeaderMap<HeaderValue>,
    session: &Session,
    config: &WebsiteConfig,
    secure: bool,
) -> Result<(), AppError> {
    let max_age = Duration::days(config.session_expiration as i64);

    let cookie = cookie::Cookie::build((&config.csrf_cookie_name, session.csrf_token().await))
        .path("/")
        .max_age(max_age)
        .secure(secure)
        .http_only(false)
        .same_site(SameSite::Lax)
        .build();

    headers.append(
        SET_COOKIE,
        HeaderValue::from_bytes(cookie.encoded().to_string().as_bytes())
            .map_err(|e| log_and_wrap_custom_internal!(e))?,
    );

    let cookie = cookie::Cookie::build((&config.session_cookie_name, session.id().await))
        .path("/")
        .max_age(max_age)
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    headers.append(
        SET_COOKIE,
        HeaderValue::from_bytes(cookie.encoded().to_string().as_bytes())
            .map_err(|e| log_and_wrap_custom_internal!(e))?,
    );

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("frame-ancestors 'none'"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AppError::WrongPassword(_))
        ));
    }

    #[test]
    fn test_signup_form_rejects_bad_usernames() {
        let form = SignupForm {
            username: "has space".into(),
            password: "long enough".into(),
        };
        let errors = FieldErrors::from(form.validate().unwrap_err());
        assert!(errors.contains("username"));
        assert!(!errors.contains("password"));

        let form = SignupForm {
            username: "a.b@c+d-e_f".into(),
            password: "short".into(),
        };
        let errors = FieldErrors::from(form.validate().unwrap_err());
        assert!(!errors.contains("username"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn test_signup_form_limits_username_length() {
        let form = SignupForm {
            username: "a".repeat(151),
            password: "long enough".into(),
        };
        assert!(form.validate().is_err());
        let form = SignupForm {
            username: "a".repeat(150),
            password: "long enough".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_next_only_allows_local_paths() {
        let config = WebsiteConfig::stub();
        let params = NextParams {
            next: Some("/create/".into()),
        };
        assert_eq!(params.redirect_to(&config), "/create/");
        let params = NextParams {
            next: Some("https://evil.example".into()),
        };
        assert_eq!(params.redirect_to(&config), "/");
        let params = NextParams {
            next: Some("//evil.example".into()),
        };
        assert_eq!(params.redirect_to(&config), "/");
        assert_eq!(NextParams::default().redirect_to(&config), "/");
    }
}
