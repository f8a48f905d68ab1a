use askama::Template;
use axum::response::Html;

use crate::{auth::User, errors::AppError};

use super::Meta;

pub type HtmlResult = Result<Html<String>, AppError>;

pub fn template_to_response<T: Template>(tmpl: &T) -> HtmlResult {
    tmpl.render().map(Html).map_err(AppError::TemplateError)
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct Error404<'a> {
    pub meta: Meta<'a>,
    pub viewer: Option<User>,
}

#[derive(Template)]
#[template(path = "core/403.html")]
pub struct Error403<'a> {
    pub meta: Meta<'a>,
    pub viewer: Option<User>,
    pub message: String,
}

#[derive(Template)]
#[template(path = "core/500.html")]
pub struct Error500<'a> {
    pub meta: Meta<'a>,
    pub viewer: Option<User>,
    pub status: u16,
    pub message: String,
}
