use std::borrow::Cow;

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use bytes::Bytes;
use serde::Deserialize;
use validator::Validate;

use super::models::{Group, Post};
use crate::{
    database::Database,
    errors::AppError,
    log_and_wrap_custom_internal,
    media::ImageUpload,
    sessions::Session,
    state::WebsiteState,
    website::{
        html::{
            FieldErrors, FormTag, GeneralParentTag, HtmlTag, InputTag, InputType, SelectOption,
            SelectTag, TextareaTag, ToForm,
        },
        verify_csrf,
    },
};

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const EMPTY_FILE: &str = "The submitted file is empty.";

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    /// Raw group choice, empty for no group.
    #[serde(default)]
    pub group: String,
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_pk.map(|pk| pk.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
struct RawUpload {
    file_name: String,
    data: Bytes,
}

#[derive(Deserialize)]
struct UrlencodedPost {
    #[serde(default)]
    csrf_token: String,
    #[serde(flatten)]
    form: PostForm,
}

/// Body of the create and edit endpoints, sent either as multipart (with an
/// image) or url encoded.
#[derive(Debug)]
pub struct PostInput {
    form: PostForm,
    image: Option<RawUpload>,
}

/// A post submission that passed validation.
#[derive(Debug)]
pub struct CleanPost {
    pub text: String,
    pub group_pk: Option<i64>,
    pub image: Option<ImageUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

impl FromRequest<WebsiteState> for PostInput {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &WebsiteState) -> Result<Self, Self::Rejection> {
        let session = req.extensions().get::<Session>().cloned();

        if !is_multipart(&req) {
            let Form(input) = Form::<UrlencodedPost>::from_request(req, state).await?;
            verify_csrf(state.config(), session.as_ref(), &input.csrf_token).await?;
            return Ok(Self {
                form: input.form,
                image: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut csrf_token = String::new();
        let mut form = PostForm::default();
        let mut image = None;
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "csrf_token" => csrf_token = field.text().await?,
                "text" => form.text = field.text().await?,
                "group" => form.group = field.text().await?,
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let data = field.bytes().await?;
                    if !file_name.is_empty() || !data.is_empty() {
                        image = Some(RawUpload { file_name, data });
                    }
                }
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }
        verify_csrf(state.config(), session.as_ref(), &csrf_token).await?;
        Ok(Self { form, image })
    }
}

impl PostInput {
    /// Validates the submission. Invalid input comes back as the form to
    /// re-render along with its field errors.
    pub async fn clean(
        self,
        database: &Database,
    ) -> Result<Result<CleanPost, (PostForm, FieldErrors)>, AppError> {
        let mut form = self.form;
        form.text = form.text.trim().to_owned();

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::default(),
            Err(e) => e.into(),
        };

        let group_pk = match clean_group(&form.group, database).await? {
            Ok(pk) => pk,
            Err(message) => {
                errors.add("group", message);
                None
            }
        };

        let image = match self.image {
            None => None,
            Some(upload) if upload.data.is_empty() => {
                tracing::debug!(file = %upload.file_name, "empty upload");
                errors.add("image", EMPTY_FILE);
                None
            }
            Some(upload) => {
                let data = upload.data;
                let verified = tokio::task::spawn_blocking(move || ImageUpload::verify(data))
                    .await
                    .map_err(|e| log_and_wrap_custom_internal!(e))?;
                match verified {
                    Ok(image) => Some(image),
                    Err(rejection) => {
                        tracing::debug!(file = %upload.file_name, ?rejection, "upload rejected");
                        errors.add("image", INVALID_IMAGE);
                        None
                    }
                }
            }
        };

        if !errors.is_empty() {
            return Ok(Err((form, errors)));
        }
        Ok(Ok(CleanPost {
            text: form.text,
            group_pk,
            image,
        }))
    }
}

async fn clean_group(
    raw: &str,
    database: &Database,
) -> Result<Result<Option<i64>, &'static str>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Ok(None));
    }
    let Ok(pk) = raw.parse::<i64>() else {
        return Ok(Err(INVALID_CHOICE));
    };
    Ok(match Group::find_by_pk(pk, database).await? {
        Some(group) => Ok(Some(group.pk)),
        None => Err(INVALID_CHOICE),
    })
}

/// The post form together with the groups it can pick from.
pub struct PostEditor {
    pub form: PostForm,
    pub groups: Vec<Group>,
}

impl ToForm for PostEditor {
    fn raw_form<'a>(&'a self, action: Cow<'a, str>, errors: &FieldErrors) -> FormTag<'a> {
        let choices = self
            .groups
            .iter()
            .map(|g| SelectOption::new(g.pk.to_string(), g.title.clone()))
            .collect();
        let selected = Some(self.form.group.clone()).filter(|g| !g.is_empty());
        let children = vec![
            HtmlTag::ParentTag(GeneralParentTag::field(
                "text",
                "Text",
                HtmlTag::Textarea(TextareaTag::new("text", self.form.text.clone(), true)),
                errors,
            )),
            HtmlTag::ParentTag(GeneralParentTag::field(
                "group",
                "Group",
                HtmlTag::Select(SelectTag::new("group", choices, selected, false)),
                errors,
            )),
            HtmlTag::ParentTag(GeneralParentTag::field(
                "image",
                "Image",
                HtmlTag::Input(InputTag::new("image", InputType::File).accept("image/*")),
                errors,
            )),
        ];
        FormTag::new(action, children).multipart()
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    pub fn clean(mut self) -> Result<Self, FieldErrors> {
        self.text = self.text.trim().to_owned();
        self.validate().map_err(FieldErrors::from)?;
        Ok(self)
    }
}

impl ToForm for CommentForm {
    fn form_button<'a>() -> HtmlTag<'a> {
        HtmlTag::ParentTag(GeneralParentTag::submit_button("Send"))
    }

    fn raw_form<'a>(&'a self, action: Cow<'a, str>, errors: &FieldErrors) -> FormTag<'a> {
        FormTag::new(
            action,
            vec![HtmlTag::ParentTag(GeneralParentTag::field(
                "text",
                "Comment",
                HtmlTag::Textarea(TextareaTag::new("text", self.text.clone(), true)),
                errors,
            ))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_text_is_trimmed_and_required() {
        let form = CommentForm {
            text: "   ".into(),
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(errors.get("text"), ["This field is required.".to_owned()]);

        let form = CommentForm {
            text: "  hello ".into(),
        };
        assert_eq!(form.clean().unwrap().text, "hello");
    }

    #[test]
    fn test_post_editor_renders_required_text_and_optional_group() {
        let editor = PostEditor {
            form: PostForm {
                text: "Hello".into(),
                group: "2".into(),
            },
            groups: vec![
                Group {
                    pk: 1,
                    title: "Cats".into(),
                    slug: "cats".into(),
                    description: String::new(),
                },
                Group {
                    pk: 2,
                    title: "Dogs".into(),
                    slug: "dogs".into(),
                    description: String::new(),
                },
            ],
        };
        let html = editor
            .to_form("/create/".into(), &FieldErrors::default(), "tok".into())
            .to_string();
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("<textarea id=\"id_text\" name=\"text\" rows=\"10\" required>Hello</textarea>"));
        assert!(html.contains("<select id=\"id_group\" name=\"group\"><option value=\"\">---------</option>"));
        assert!(html.contains("<option value=\"2\" selected>Dogs</option>"));
        assert!(html.contains("<input id=\"id_image\" name=\"image\" type=\"file\" accept=\"image/*\">"));
    }

    #[test]
    fn test_post_form_from_post_keeps_group_choice() {
        let post = Post {
            pk: 7,
            text: "Body".into(),
            author_pk: 1,
            author_username: "leo".into(),
            group_pk: Some(3),
            group_slug: Some("g".into()),
            group_title: Some("G".into()),
            image: None,
            created: chrono::Utc::now().naive_utc(),
        };
        let form = PostForm::from(&post);
        assert_eq!(form.text, "Body");
        assert_eq!(form.group, "3");
    }
}
