use std::fmt;

use chrono::{NaiveDateTime, Utc};
use sqlx::prelude::FromRow;

use crate::{
    database::Database,
    errors::AppError,
    media::media_url,
    pagination::{Page, PageParams, Paginator},
    utils::{is_valid_slug, slugify, truncate_chars},
};

const GROUP_TITLE_MAX_CHARS: usize = 200;
const POST_TITLE_CHARS: usize = 15;

const POST_SELECT: &str = "SELECT posts.pk, posts.text, posts.author_pk, users.username AS author_username,
        posts.group_pk, post_groups.slug AS group_slug, post_groups.title AS group_title,
        posts.image, posts.created
    FROM posts
    INNER JOIN users ON users.pk = posts.author_pk
    LEFT JOIN post_groups ON post_groups.pk = posts.group_pk";

const POST_ORDER: &str = "ORDER BY posts.created DESC, posts.pk DESC";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Group {
    pub pk: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub title: String,
    /// Derived from the title when missing.
    pub slug: Option<String>,
    pub description: String,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl Group {
    pub async fn create(group: NewGroup, database: &Database) -> Result<Self, AppError> {
        if group.title.chars().count() > GROUP_TITLE_MAX_CHARS {
            return Err(AppError::custom_bad_request(
                "Ensure the title has at most 200 characters.",
            ));
        }
        let slug = group.slug.unwrap_or_else(|| slugify(&group.title));
        if !is_valid_slug(&slug) {
            return Err(AppError::custom_bad_request("Enter a valid slug."));
        }
        let pk = sqlx::query(
            "INSERT INTO post_groups (title, slug, description) VALUES ($1, $2, $3);",
        )
        .bind(&group.title)
        .bind(&slug)
        .bind(&group.description)
        .execute(&**database)
        .await
        .map(|q| q.last_insert_rowid())?;
        tracing::info!(group_pk = pk, slug = %slug, "group created");
        Ok(Self {
            pk,
            title: group.title,
            slug,
            description: group.description,
        })
    }

    pub async fn find_by_slug(slug: &str, database: &Database) -> Result<Option<Self>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM post_groups WHERE slug = $1;")
            .bind(slug)
            .fetch_optional(&**database)
            .await?)
    }

    pub async fn get_by_slug(slug: &str, database: &Database) -> Result<Self, AppError> {
        Self::find_by_slug(slug, database)
            .await?
            .ok_or(AppError::DoesNotExist)
    }

    pub async fn find_by_pk(pk: i64, database: &Database) -> Result<Option<Self>, AppError> {
        Ok(sqlx::query_as("SELECT * FROM post_groups WHERE pk = $1;")
            .bind(pk)
            .fetch_optional(&**database)
            .await?)
    }

    pub async fn all(database: &Database) -> Result<Vec<Self>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM post_groups ORDER BY title, pk;")
                .fetch_all(&**database)
                .await?,
        )
    }

    /// Posts of the group survive without a group.
    pub async fn delete(self, database: &Database) -> Result<(), AppError> {
        sqlx::query("DELETE FROM post_groups WHERE pk = $1;")
            .bind(self.pk)
            .execute(&**database)
            .await?;
        tracing::info!(group_pk = self.pk, "group deleted");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Post {
    pub pk: i64,
    pub text: String,
    pub author_pk: i64,
    pub author_username: String,
    pub group_pk: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
    pub created: NaiveDateTime,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_pk: i64,
    pub group_pk: Option<i64>,
    pub image: Option<String>,
}

/// Edits applied to an existing post. A missing image keeps the current one.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_pk: Option<i64>,
    pub image: Option<String>,
}

/// The sets of posts a page can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    All,
    Group(i64),
    Author(i64),
    FollowedBy(i64),
}

impl Feed {
    fn filter(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::Group(_) => "WHERE posts.group_pk = $1",
            Self::Author(_) => "WHERE posts.author_pk = $1",
            Self::FollowedBy(_) => {
                "WHERE posts.author_pk IN (SELECT author_pk FROM follows WHERE user_pk = $1)"
            }
        }
    }

    fn key(&self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Group(pk) | Self::Author(pk) | Self::FollowedBy(pk) => Some(*pk),
        }
    }

    pub async fn count(&self, database: &Database) -> Result<u64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM posts {};", self.filter());
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(key) = self.key() {
            query = query.bind(key);
        }
        Ok(query.fetch_one(&**database).await?.max(0) as u64)
    }

    /// Loads only the requested window of the feed.
    pub async fn page(
        &self,
        params: &PageParams,
        per_page: u64,
        database: &Database,
    ) -> Result<Page<Post>, AppError> {
        let paginator = Paginator::new(self.count(database).await?, per_page);
        let window = paginator.window(params.raw());
        let sql = format!(
            "{POST_SELECT} {} {POST_ORDER} LIMIT {} OFFSET {};",
            self.filter(),
            window.limit,
            window.offset
        );
        let mut query = sqlx::query_as::<_, Post>(&sql);
        if let Some(key) = self.key() {
            query = query.bind(key);
        }
        let items = query.fetch_all(&**database).await?;
        Ok(paginator.page(window, items))
    }
}

impl Post {
    /// Short form used wherever a post is named rather than shown.
    pub fn title(&self) -> &str {
        truncate_chars(&self.text, POST_TITLE_CHARS)
    }

    pub fn image_url(&self) -> Option<String> {
        self.image.as_deref().map(media_url)
    }

    pub async fn create(post: NewPost, database: &Database) -> Result<Self, AppError> {
        let pk = sqlx::query(
            "INSERT INTO posts (text, author_pk, group_pk, image, created) VALUES ($1, $2, $3, $4, $5);",
        )
        .bind(&post.text)
        .bind(post.author_pk)
        .bind(post.group_pk)
        .bind(&post.image)
        .bind(Utc::now().naive_utc())
        .execute(&**database)
        .await
        .map(|q| q.last_insert_rowid())?;
        tracing::info!(post_pk = pk, author_pk = post.author_pk, "post created");
        Self::get_by_pk(pk, database).await
    }

    pub async fn find_by_pk(pk: i64, database: &Database) -> Result<Option<Self>, AppError> {
        let sql = format!("{POST_SELECT} WHERE posts.pk = $1;");
        Ok(sqlx::query_as(&sql)
            .bind(pk)
            .fetch_optional(&**database)
            .await?)
    }

    pub async fn get_by_pk(pk: i64, database: &Database) -> Result<Self, AppError> {
        Self::find_by_pk(pk, database)
            .await?
            .ok_or(AppError::DoesNotExist)
    }

    pub async fn update(
        pk: i64,
        changes: PostChanges,
        database: &Database,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE posts SET text = $1, group_pk = $2, image = COALESCE($3, image) WHERE pk = $4;",
        )
        .bind(&changes.text)
        .bind(changes.group_pk)
        .bind(&changes.image)
        .bind(pk)
        .execute(&**database)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::DoesNotExist);
        }
        tracing::info!(post_pk = pk, "post updated");
        Ok(())
    }

    pub async fn delete(pk: i64, database: &Database) -> Result<(), AppError> {
        sqlx::query("DELETE FROM posts WHERE pk = $1;")
            .bind(pk)
            .execute(&**database)
            .await?;
        tracing::info!(post_pk = pk, "post deleted");
        Ok(())
    }

    pub async fn count_all(database: &Database) -> Result<u64, AppError> {
        Feed::All.count(database).await
    }

    pub async fn count_by_author(author_pk: i64, database: &Database) -> Result<u64, AppError> {
        Feed::Author(author_pk).count(database).await
    }

    pub async fn count_by_group(group_pk: i64, database: &Database) -> Result<u64, AppError> {
        Feed::Group(group_pk).count(database).await
    }

    pub async fn count_followed_by(user_pk: i64, database: &Database) -> Result<u64, AppError> {
        Feed::FollowedBy(user_pk).count(database).await
    }

    pub async fn page_all(
        params: &PageParams,
        per_page: u64,
        database: &Database,
    ) -> Result<Page<Self>, AppError> {
        Feed::All.page(params, per_page, database).await
    }

    pub async fn page_by_group(
        group_pk: i64,
        params: &PageParams,
        per_page: u64,
        database: &Database,
    ) -> Result<Page<Self>, AppError> {
        Feed::Group(group_pk).page(params, per_page, database).await
    }

    pub async fn page_by_author(
        author_pk: i64,
        params: &PageParams,
        per_page: u64,
        database: &Database,
    ) -> Result<Page<Self>, AppError> {
        Feed::Author(author_pk).page(params, per_page, database).await
    }

    pub async fn page_followed_by(
        user_pk: i64,
        params: &PageParams,
        per_page: u64,
        database: &Database,
    ) -> Result<Page<Self>, AppError> {
        Feed::FollowedBy(user_pk)
            .page(params, per_page, database)
            .await
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Comment {
    pub pk: i64,
    pub post_pk: i64,
    pub author_pk: i64,
    pub author_username: String,
    pub text: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_pk: i64,
    pub author_pk: i64,
    pub text: String,
}

impl Comment {
    pub async fn create(comment: NewComment, database: &Database) -> Result<i64, AppError> {
        let pk = sqlx::query(
            "INSERT INTO comments (post_pk, author_pk, text, created) VALUES ($1, $2, $3, $4);",
        )
        .bind(comment.post_pk)
        .bind(comment.author_pk)
        .bind(&comment.text)
        .bind(Utc::now().naive_utc())
        .execute(&**database)
        .await
        .map(|q| q.last_insert_rowid())?;
        tracing::info!(comment_pk = pk, post_pk = comment.post_pk, "comment created");
        Ok(pk)
    }

    /// Oldest first.
    pub async fn list_for_post(post_pk: i64, database: &Database) -> Result<Vec<Self>, AppError> {
        Ok(sqlx::query_as(
            "SELECT comments.pk, comments.post_pk, comments.author_pk,
                users.username AS author_username, comments.text, comments.created
            FROM comments
            INNER JOIN users ON users.pk = comments.author_pk
            WHERE comments.post_pk = $1
            ORDER BY comments.created, comments.pk;",
        )
        .bind(post_pk)
        .fetch_all(&**database)
        .await?)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Follow {
    pub pk: i64,
    pub user_pk: i64,
    pub author_pk: i64,
    pub created: NaiveDateTime,
}

impl Follow {
    /// Returns whether a new follow was stored.
    pub async fn create_if_absent(
        user_pk: i64,
        author_pk: i64,
        database: &Database,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO follows (user_pk, author_pk, created) VALUES ($1, $2, $3)
                ON CONFLICT (author_pk, user_pk) DO NOTHING;",
        )
        .bind(user_pk)
        .bind(author_pk)
        .bind(Utc::now().naive_utc())
        .execute(&**database)
        .await?;
        let created = result.rows_affected() == 1;
        if created {
            tracing::info!(user_pk, author_pk, "follow created");
        }
        Ok(created)
    }

    pub async fn exists(
        user_pk: i64,
        author_pk: i64,
        database: &Database,
    ) -> Result<bool, AppError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_pk = $1 AND author_pk = $2);",
        )
        .bind(user_pk)
        .bind(author_pk)
        .fetch_one(&**database)
        .await?
            == 1)
    }

    /// Returns whether a follow was removed.
    pub async fn delete(
        user_pk: i64,
        author_pk: i64,
        database: &Database,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_pk = $1 AND author_pk = $2;")
            .bind(user_pk)
            .bind(author_pk)
            .execute(&**database)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(user_pk, author_pk, "follow deleted");
        }
        Ok(deleted)
    }

    pub async fn count(database: &Database) -> Result<u64, AppError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows;")
                .fetch_one(&**database)
                .await?
                .max(0) as u64,
        )
    }
}
