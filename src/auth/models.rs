use chrono::Utc;
use sqlx::prelude::FromRow;

use crate::{database::Database, errors::AppError};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub pk: i64,
    pub username: String,
}

#[derive(Debug, FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password: String,
}

impl User {
    pub async fn create(
        username: &str,
        password_hash: &str,
        database: &Database,
    ) -> Result<Self, AppError> {
        let pk = sqlx::query("INSERT INTO users (username, password, created) VALUES ($1, $2, $3);")
            .bind(username)
            .bind(password_hash)
            .bind(Utc::now().naive_utc())
            .execute(&**database)
            .await
            .map(|q| q.last_insert_rowid())?;
        tracing::info!(user_pk = pk, "user created");
        Ok(Self {
            pk,
            username: username.to_owned(),
        })
    }

    pub async fn find_by_pk(pk: i64, database: &Database) -> Result<Option<Self>, AppError> {
        Ok(sqlx::query_as("SELECT pk, username FROM users WHERE pk = $1;")
            .bind(pk)
            .fetch_optional(&**database)
            .await?)
    }

    pub async fn find_by_username(
        username: &str,
        database: &Database,
    ) -> Result<Option<Self>, AppError> {
        Ok(
            sqlx::query_as("SELECT pk, username FROM users WHERE username = $1;")
                .bind(username)
                .fetch_optional(&**database)
                .await?,
        )
    }

    /// Same as [`User::find_by_username`] but a missing user is a 404.
    pub async fn get_by_username(username: &str, database: &Database) -> Result<Self, AppError> {
        Self::find_by_username(username, database)
            .await?
            .ok_or(AppError::DoesNotExist)
    }

    pub async fn find_by_username_with_password(
        username: &str,
        database: &Database,
    ) -> Result<Option<UserWithPassword>, AppError> {
        Ok(
            sqlx::query_as("SELECT pk, username, password FROM users WHERE username = $1;")
                .bind(username)
                .fetch_optional(&**database)
                .await?,
        )
    }

    /// Removes the user together with their posts, comments, follows and sessions.
    pub async fn delete(self, database: &Database) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE pk = $1;")
            .bind(self.pk)
            .execute(&**database)
            .await?;
        tracing::info!(user_pk = self.pk, "user deleted");
        Ok(())
    }
}
