use std::borrow::Cow;

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Router,
};

use super::{
    middlewares::Viewer,
    models::User,
    services::{self, LoginForm, NextParams, SignupForm},
};
use crate::{
    errors::AppError,
    sessions::Session,
    state::WebsiteState,
    website::{
        html::{
            FieldErrors, FormTag, GeneralChildTag, GeneralParentTag, HtmlTag, InputTag, InputType,
            ToForm,
        },
        template_to_response, Meta, SecureForm,
    },
};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .route("/auth/login", get(login).post(post_login))
        .route("/auth/signup", get(signup).post(post_signup))
        .route("/auth/logout", get(logout))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    form: String,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
struct SignupTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    form: String,
}

fn non_field_errors<'a>(errors: &FieldErrors) -> impl Iterator<Item = HtmlTag<'a>> {
    errors
        .get("__all__")
        .to_vec()
        .into_iter()
        .map(|e| HtmlTag::ChildTag(GeneralChildTag::error(e)))
}

impl ToForm for LoginForm {
    fn form_button<'a>() -> HtmlTag<'a> {
        HtmlTag::ParentTag(GeneralParentTag::submit_button("Log in"))
    }

    fn raw_form<'a>(&'a self, action: Cow<'a, str>, errors: &FieldErrors) -> FormTag<'a> {
        let mut children: Vec<HtmlTag<'a>> = non_field_errors(errors).collect();
        children.push(HtmlTag::ParentTag(GeneralParentTag::field(
            "username",
            "Username",
            HtmlTag::Input(
                InputTag::new("username", InputType::Text)
                    .with_value(Some(self.username.clone()))
                    .required(true),
            ),
            errors,
        )));
        children.push(HtmlTag::ParentTag(GeneralParentTag::field(
            "password",
            "Password",
            HtmlTag::Input(InputTag::new("password", InputType::Password).required(true)),
            errors,
        )));
        FormTag::new(action, children)
    }
}

impl ToForm for SignupForm {
    fn form_button<'a>() -> HtmlTag<'a> {
        HtmlTag::ParentTag(GeneralParentTag::submit_button("Sign up"))
    }

    fn raw_form<'a>(&'a self, action: Cow<'a, str>, errors: &FieldErrors) -> FormTag<'a> {
        let children = vec![
            HtmlTag::ParentTag(GeneralParentTag::field(
                "username",
                "Username",
                HtmlTag::Input(
                    InputTag::new("username", InputType::Text)
                        .with_value(Some(self.username.clone()))
                        .required(true),
                ),
                errors,
            )),
            HtmlTag::ParentTag(GeneralParentTag::field(
                "password",
                "Password",
                HtmlTag::Input(InputTag::new("password", InputType::Password).required(true)),
                errors,
            )),
        ];
        FormTag::new(action, children)
    }
}

fn action_with_next(path: &str, params: &NextParams) -> String {
    match params.next.as_deref() {
        Some(next) => format!(
            "{path}?{}",
            serde_urlencoded::to_string([("next", next)]).unwrap_or_default()
        ),
        None => path.to_owned(),
    }
}

async fn render_login(
    viewer: Option<User>,
    session: &Session,
    params: &NextParams,
    input: &LoginForm,
    errors: &FieldErrors,
) -> Result<Response, AppError> {
    let action = action_with_next("/auth/login/", params);
    let form = input
        .to_form(action.into(), errors, session.csrf_token().await)
        .to_string();
    let template = LoginTemplate {
        meta: Meta::titled("Log in"),
        viewer,
        form,
    };
    Ok(template_to_response(&template)?.into_response())
}

async fn render_signup(
    viewer: Option<User>,
    session: &Session,
    input: &SignupForm,
    errors: &FieldErrors,
) -> Result<Response, AppError> {
    let form = input
        .to_form("/auth/signup/".into(), errors, session.csrf_token().await)
        .to_string();
    let template = SignupTemplate {
        meta: Meta::titled("Sign up"),
        viewer,
        form,
    };
    Ok(template_to_response(&template)?.into_response())
}

pub async fn login(
    Extension(viewer): Extension<Viewer>,
    Extension(session): Extension<Session>,
    Query(params): Query<NextParams>,
) -> Result<Response, AppError> {
    render_login(
        viewer.0,
        &session,
        &params,
        &LoginForm::default(),
        &FieldErrors::default(),
    )
    .await
}

pub async fn post_login(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Extension(session): Extension<Session>,
    Query(params): Query<NextParams>,
    input: SecureForm<LoginForm>,
) -> Result<Response, AppError> {
    let input = input.data();
    match services::login(&state, &session, &input).await? {
        Ok(_) => Ok(Redirect::to(params.redirect_to(state.config())).into_response()),
        Err(errors) => {
            let input = LoginForm {
                password: String::new(),
                ..input
            };
            render_login(viewer.0, &session, &params, &input, &errors).await
        }
    }
}

pub async fn signup(
    Extension(viewer): Extension<Viewer>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    render_signup(
        viewer.0,
        &session,
        &SignupForm::default(),
        &FieldErrors::default(),
    )
    .await
}

pub async fn post_signup(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Extension(session): Extension<Session>,
    input: SecureForm<SignupForm>,
) -> Result<Response, AppError> {
    let input = input.data();
    match services::signup(&state, &session, &input).await? {
        Ok(_) => Ok(Redirect::to(&state.config().login_redirect_to).into_response()),
        Err(errors) => {
            let input = SignupForm {
                password: String::new(),
                ..input
            };
            render_signup(viewer.0, &session, &input, &errors).await
        }
    }
}

pub async fn logout(
    state: State<WebsiteState>,
    Extension(session): Extension<Session>,
) -> Result<Redirect, AppError> {
    services::logout(&state, &session).await?;
    Ok(Redirect::to("/"))
}
