#![allow(dead_code)]

use axum::{body::Body, http::Response};
use quill::{
    auth::User,
    config::WebsiteConfig,
    posts::{Group, NewGroup, NewPost, Post},
    service::StubService,
};

pub async fn setup() -> StubService {
    StubService::with_config(WebsiteConfig::stub()).await
}

pub async fn create_group(app: &StubService, title: &str, slug: &str) -> Group {
    Group::create(
        NewGroup {
            title: title.into(),
            slug: Some(slug.into()),
            description: "Test description".into(),
        },
        app.state().database(),
    )
    .await
    .unwrap()
}

pub async fn create_post(
    app: &StubService,
    author: &User,
    text: &str,
    group: Option<&Group>,
) -> Post {
    Post::create(
        NewPost {
            text: text.into(),
            author_pk: author.pk,
            group_pk: group.map(|g| g.pk),
            image: None,
        },
        app.state().database(),
    )
    .await
    .unwrap()
}

pub fn count_posts(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}

/// The `name=value` pair of a cookie set by the response.
pub fn cookie_from(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_owned)
}

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub const BOUNDARY: &str = "quill-test-boundary";

/// Builds a `multipart/form-data` body out of text fields and an optional file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
