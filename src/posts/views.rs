use askama::Template;
use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};

use super::{
    forms::{CommentForm, PostEditor, PostForm, PostInput},
    models::{Comment, Follow, Group, NewComment, NewPost, Post, PostChanges},
};
use crate::{
    auth::{CurrentUser, User, Viewer},
    errors::AppError,
    pagination::{Page, PageParams, Paginator},
    sessions::Session,
    state::WebsiteState,
    utils::profile_url,
    website::{html::FieldErrors, html::ToForm, template_to_response, HtmlResult, Meta, SecureForm},
};

#[derive(Template)]
#[template(path = "posts/index.html")]
struct IndexTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    page: Page<Post>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
struct GroupTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    group: Group,
    page: Page<Post>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
struct ProfileTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    author: User,
    page: Page<Post>,
    following: bool,
    can_follow: bool,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
struct PostDetailTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    post: Post,
    author_posts_count: u64,
    comments: Vec<Comment>,
    comment_form: Option<String>,
    can_edit: bool,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
struct PostFormTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    is_edit: bool,
    form: String,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
struct FollowTemplate<'a> {
    meta: Meta<'a>,
    viewer: Option<User>,
    page: Page<Post>,
}

/// Post ids that are not numbers name no post at all.
fn parse_post_pk(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::DoesNotExist)
}

fn post_url(pk: i64) -> String {
    format!("/posts/{pk}/")
}

/// One slot per viewer and resolved page, so `/`, `/?page=1` and
/// `/?page=abc` share an entry.
fn index_cache_key(viewer: &Viewer, page_number: u64) -> String {
    let viewer = match viewer.user() {
        Some(user) => user.pk.to_string(),
        None => "anonymous".into(),
    };
    format!("index:{viewer}:{page_number}")
}

pub async fn index(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<PageParams>,
) -> HtmlResult {
    let per_page = state.config().posts_per_page;
    let count = Post::count_all(state.database()).await?;
    let page_number = Paginator::new(count, per_page).validate_number(params.raw());
    let key = index_cache_key(&viewer, page_number);
    let body = state
        .page_cache()
        .get_or_render(key, || async {
            let params = PageParams::new(Some(&page_number.to_string()));
            let page = Post::page_all(&params, per_page, state.database()).await?;
            let template = IndexTemplate {
                meta: Meta::titled("Latest posts"),
                viewer: viewer.0.clone(),
                page,
            };
            Ok::<_, AppError>(template.render()?)
        })
        .await?;
    Ok(Html(body))
}

pub async fn group_posts(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> HtmlResult {
    let group = Group::get_by_slug(&slug, state.database()).await?;
    let page = Post::page_by_group(
        group.pk,
        &params,
        state.config().posts_per_page,
        state.database(),
    )
    .await?;
    let template = GroupTemplate {
        meta: Meta::titled(group.title.clone()).described(group.description.clone()),
        viewer: viewer.0,
        group,
        page,
    };
    template_to_response(&template)
}

pub async fn profile(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> HtmlResult {
    let database = state.database();
    let author = User::get_by_username(&username, database).await?;
    let page = Post::page_by_author(author.pk, &params, state.config().posts_per_page, database)
        .await?;
    let (following, can_follow) = match viewer.user() {
        Some(user) if user.pk != author.pk => {
            (Follow::exists(user.pk, author.pk, database).await?, true)
        }
        _ => (false, false),
    };
    let template = ProfileTemplate {
        meta: Meta::titled(format!("Posts by {}", author.username)),
        viewer: viewer.0,
        author,
        page,
        following,
        can_follow,
    };
    template_to_response(&template)
}

pub async fn post_detail(
    state: State<WebsiteState>,
    Extension(viewer): Extension<Viewer>,
    Extension(session): Extension<Session>,
    Path(post_id): Path<String>,
) -> HtmlResult {
    let database = state.database();
    let post = Post::get_by_pk(parse_post_pk(&post_id)?, database).await?;
    let author_posts_count = Post::count_by_author(post.author_pk, database).await?;
    let comments = Comment::list_for_post(post.pk, database).await?;
    let comment_form = match viewer.user() {
        Some(_) => Some(
            CommentForm::default()
                .to_form(
                    format!("/posts/{}/comment/", post.pk).into(),
                    &FieldErrors::default(),
                    session.csrf_token().await,
                )
                .to_string(),
        ),
        None => None,
    };
    let can_edit = viewer.user().is_some_and(|u| u.pk == post.author_pk);
    let template = PostDetailTemplate {
        meta: Meta::titled(post.title().to_owned()),
        viewer: viewer.0,
        post,
        author_posts_count,
        comments,
        comment_form,
        can_edit,
    };
    template_to_response(&template)
}

async fn render_post_form(
    state: &WebsiteState,
    user: User,
    session: &Session,
    action: String,
    form: PostForm,
    errors: &FieldErrors,
    is_edit: bool,
) -> Result<Response, AppError> {
    let editor = PostEditor {
        form,
        groups: Group::all(state.database()).await?,
    };
    let form = editor
        .to_form(action.into(), errors, session.csrf_token().await)
        .to_string();
    let template = PostFormTemplate {
        meta: Meta::titled(if is_edit { "Edit post" } else { "New post" }),
        viewer: Some(user),
        is_edit,
        form,
    };
    Ok(template_to_response(&template)?.into_response())
}

pub async fn post_create(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    render_post_form(
        &state,
        user,
        &session,
        "/create/".into(),
        PostForm::default(),
        &FieldErrors::default(),
        false,
    )
    .await
}

pub async fn post_create_submit(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(session): Extension<Session>,
    input: PostInput,
) -> Result<Response, AppError> {
    let clean = match input.clean(state.database()).await? {
        Ok(clean) => clean,
        Err((form, errors)) => {
            return render_post_form(&state, user, &session, "/create/".into(), form, &errors, false)
                .await;
        }
    };
    let image = match &clean.image {
        Some(image) => Some(state.media().save_post_image(image).await?),
        None => None,
    };
    Post::create(
        NewPost {
            text: clean.text,
            author_pk: user.pk,
            group_pk: clean.group_pk,
            image,
        },
        state.database(),
    )
    .await?;
    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// Loads the post and makes sure the caller wrote it.
async fn authored_post(
    state: &WebsiteState,
    user: &User,
    post_id: &str,
) -> Result<Post, AppError> {
    let post = Post::get_by_pk(parse_post_pk(post_id)?, state.database()).await?;
    if post.author_pk != user.pk {
        tracing::warn!(post_pk = post.pk, user_pk = user.pk, "edit attempt by non author");
        return Err(AppError::AuthorizationDenied);
    }
    Ok(post)
}

pub async fn post_edit(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(session): Extension<Session>,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post = authored_post(&state, &user, &post_id).await?;
    render_post_form(
        &state,
        user,
        &session,
        format!("/posts/{}/edit/", post.pk),
        PostForm::from(&post),
        &FieldErrors::default(),
        true,
    )
    .await
}

/// The ownership check runs before the body is read, so a non author is
/// redirected home whatever they sent.
pub async fn post_edit_submit(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(session): Extension<Session>,
    Path(post_id): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let post = authored_post(&state, &user, &post_id).await?;
    let input = PostInput::from_request(request, &state.0).await?;
    let clean = match input.clean(state.database()).await? {
        Ok(clean) => clean,
        Err((form, errors)) => {
            let action = format!("/posts/{}/edit/", post.pk);
            return render_post_form(&state, user, &session, action, form, &errors, true).await;
        }
    };
    let image = match &clean.image {
        Some(image) => Some(state.media().save_post_image(image).await?),
        None => None,
    };
    Post::update(
        post.pk,
        PostChanges {
            text: clean.text,
            group_pk: clean.group_pk,
            image,
        },
        state.database(),
    )
    .await?;
    Ok(Redirect::to(&post_url(post.pk)).into_response())
}

pub async fn add_comment(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(post_id): Path<String>,
    input: SecureForm<CommentForm>,
) -> Result<Redirect, AppError> {
    let post = Post::get_by_pk(parse_post_pk(&post_id)?, state.database()).await?;
    match input.data().clean() {
        Ok(form) => {
            Comment::create(
                NewComment {
                    post_pk: post.pk,
                    author_pk: user.pk,
                    text: form.text,
                },
                state.database(),
            )
            .await?;
        }
        Err(errors) => tracing::debug!(?errors, post_pk = post.pk, "invalid comment dropped"),
    }
    Ok(Redirect::to(&post_url(post.pk)))
}

pub async fn follow_index(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<PageParams>,
) -> HtmlResult {
    let page = Post::page_followed_by(
        user.pk,
        &params,
        state.config().posts_per_page,
        state.database(),
    )
    .await?;
    let template = FollowTemplate {
        meta: Meta::titled("Following"),
        viewer: Some(user),
        page,
    };
    template_to_response(&template)
}

pub async fn profile_follow(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = User::get_by_username(&username, state.database()).await?;
    if author.pk != user.pk {
        Follow::create_if_absent(user.pk, author.pk, state.database()).await?;
    }
    Ok(Redirect::to(&profile_url(&author.username)))
}

pub async fn profile_unfollow(
    state: State<WebsiteState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = User::get_by_username(&username, state.database()).await?;
    Follow::delete(user.pk, author.pk, state.database()).await?;
    Ok(Redirect::to(&profile_url(&author.username)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_post_id_is_not_found() {
        assert!(matches!(parse_post_pk("abc"), Err(AppError::DoesNotExist)));
        assert_eq!(parse_post_pk("12").unwrap(), 12);
    }

    #[test]
    fn test_index_cache_key_varies_by_viewer_and_page() {
        let anonymous = Viewer(None);
        let leo = Viewer(Some(User {
            pk: 4,
            username: "leo".into(),
        }));
        assert_eq!(index_cache_key(&anonymous, 1), "index:anonymous:1");
        assert_eq!(index_cache_key(&leo, 2), "index:4:2");
    }
}
