use chrono::{Days, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{database::Database, errors::AppError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct Session(Arc<RwLock<UserSession>>);

impl Session {
    pub async fn is_authenticated(&self) -> bool {
        self.0.read().await.user_pk.is_some()
    }

    pub async fn user_pk(&self) -> Option<i64> {
        self.0.read().await.user_pk
    }

    pub async fn id(&self) -> String {
        self.0.read().await.session_id.to_owned()
    }

    pub async fn csrf_token(&self) -> String {
        self.0.read().await.csrf_token.to_owned()
    }

    pub async fn token_is_valid(&self, token: &str) -> bool {
        let session = self.0.read().await;
        !token.is_empty() && session.csrf_token.eq(token)
    }
}

#[derive(Clone, Debug)]
pub struct Sessions(Database);

impl Sessions {
    pub fn new(database: Database) -> Self {
        Self(database)
    }

    pub async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session = UserSession::from_session_id(session_id, &self.0).await?;
        Ok(session
            .filter(|s| s.expiration > Utc::now().naive_utc())
            .map(|s| Session(Arc::new(RwLock::new(s)))))
    }

    pub async fn create_session(
        &self,
        user_pk: Option<i64>,
        session_expiration: u64,
        secret: &str,
    ) -> Result<Session, AppError> {
        let session = UserSession::new(user_pk, session_expiration, secret);
        session.save(&self.0).await?;
        Ok(Session(Arc::new(RwLock::new(session))))
    }

    pub async fn touch(&self, session: &Session) -> Result<(), AppError> {
        session
            .0
            .write()
            .await
            .update_last_accessed()
            .update(&self.0)
            .await
    }

    /// Logging in or out rotates the session id so a token handed out
    /// before the privilege change cannot be replayed.
    pub async fn reuse_current_as_new_one(
        &self,
        session: &Session,
        user_pk: Option<i64>,
        secret: &str,
    ) -> Result<(), AppError> {
        let mut storage = session.0.write().await;
        let old_id = storage.session_id.clone();
        storage
            .new_session_id()
            .update_user(user_pk)
            .update_csrf_token(secret)
            .save(&self.0)
            .await?;
        UserSession::delete(&old_id, &self.0).await
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM web_sessions WHERE expiration <= $1;")
            .bind(Utc::now().naive_utc())
            .execute(&*self.0)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct UserSession {
    session_id: String,
    user_pk: Option<i64>,
    csrf_token: String,
    last_accessed: NaiveDateTime,
    expiration: NaiveDateTime,
}

impl UserSession {
    fn new(user_pk: Option<i64>, session_expiration: u64, secret: &str) -> Self {
        let now = Utc::now().naive_utc();
        let mut session = Self {
            session_id: Uuid::now_v7().to_string(),
            user_pk,
            csrf_token: String::new(),
            last_accessed: now,
            expiration: now + Days::new(session_expiration),
        };
        session.update_csrf_token(secret);
        session
    }

    fn new_session_id(&mut self) -> &mut Self {
        self.session_id = Uuid::now_v7().to_string();
        self
    }

    fn update_user(&mut self, user_pk: Option<i64>) -> &mut Self {
        self.user_pk = user_pk;
        self
    }

    fn update_csrf_token(&mut self, secret: &str) -> &mut Self {
        self.csrf_token = generate_token(secret, &self.session_id);
        self
    }

    fn update_last_accessed(&mut self) -> &mut Self {
        self.last_accessed = Utc::now().naive_utc();
        self
    }

    async fn from_session_id(
        session_id: &str,
        database: &Database,
    ) -> Result<Option<Self>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM web_sessions WHERE session_id = $1;")
                .bind(session_id)
                .fetch_optional(&**database)
                .await?,
        )
    }

    async fn save(&self, database: &Database) -> Result<(), AppError> {
        sqlx::query("INSERT INTO web_sessions(session_id, user_pk, csrf_token, last_accessed, expiration) VALUES ($1, $2, $3, $4, $5);")
            .bind(&self.session_id)
            .bind(self.user_pk)
            .bind(&self.csrf_token)
            .bind(self.last_accessed)
            .bind(self.expiration)
            .execute(&**database)
            .await?;
        Ok(())
    }

    async fn update(&self, database: &Database) -> Result<(), AppError> {
        sqlx::query("UPDATE web_sessions SET last_accessed = $1 WHERE session_id = $2;")
            .bind(self.last_accessed)
            .bind(&self.session_id)
            .execute(&**database)
            .await?;
        Ok(())
    }

    async fn delete(session_id: &str, database: &Database) -> Result<(), AppError> {
        sqlx::query("DELETE FROM web_sessions WHERE session_id = $1;")
            .bind(session_id)
            .execute(&**database)
            .await?;
        Ok(())
    }
}

fn generate_token(secret: &str, data: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_depends_on_secret_and_data() {
        let token = generate_token("secret", "session");
        assert_eq!(token.len(), 64);
        assert_eq!(token, generate_token("secret", "session"));
        assert_ne!(token, generate_token("other", "session"));
        assert_ne!(token, generate_token("secret", "other"));
    }

    #[tokio::test]
    async fn test_new_session_carries_its_csrf_token() {
        let session = UserSession::new(None, 30, "secret");
        let token = generate_token("secret", &session.session_id);
        let session = Session(Arc::new(RwLock::new(session)));
        assert!(session.token_is_valid(&token).await);
        assert!(!session.token_is_valid("").await);
        assert!(!session.is_authenticated().await);
    }
}
