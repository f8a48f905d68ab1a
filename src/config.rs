use menva::FromEnv;
use std::{fmt, net::Ipv4Addr, str::FromStr, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub enum Env {
    Development,
    Production,
    Test,
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Env::Development),
            "production" => Ok(Env::Production),
            "test" => Ok(Env::Test),
            _ => Err(format!("Invalid value for enum Env: {}", s)),
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone, FromEnv)]
pub struct SharedConfig {
    pub env: Env,
    pub database_url: String,
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    sentry_token: String,
}

impl SharedConfig {
    pub fn stub() -> Self {
        let database = std::env::temp_dir().join(format!("quill-test-{}.sqlite", uuid::Uuid::now_v7()));
        Self {
            env: Env::Test,
            database_url: format!("sqlite://{}", database.display()),
            worker_threads: 1,
            max_blocking_threads: 1,
            sentry_token: String::new(),
        }
    }

    pub fn sentry_token(&self) -> Option<&str> {
        if self.sentry_token.is_empty() {
            None
        } else {
            Some(&self.sentry_token)
        }
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::stub()
    }
}

#[derive(Debug, Clone, FromEnv)]
pub struct WebsiteConfig {
    ip: Ipv4Addr,
    port: u16,
    domain: String,
    pub session_key: String,
    pub session_cookie_name: String,
    pub session_expiration: u64,
    pub csrf_cookie_name: String,
    pub csrf_protection: bool,
    pub login_url: String,
    pub login_redirect_to: String,
    pub media_root: String,
    pub max_upload_size: usize,
    index_cache_seconds: u64,
    pub posts_per_page: u64,
}

impl WebsiteConfig {
    pub fn stub() -> Self {
        let media = std::env::temp_dir().join(format!("quill-media-{}", uuid::Uuid::now_v7()));
        Self {
            ip: Ipv4Addr::new(0, 0, 0, 0),
            port: 8000,
            domain: "localhost".into(),
            session_key: "session_key".into(),
            session_cookie_name: "session_id".into(),
            session_expiration: 30,
            csrf_cookie_name: "csrf_token".into(),
            csrf_protection: false,
            login_url: "/auth/login/".into(),
            login_redirect_to: "/".into(),
            media_root: media.display().to_string(),
            max_upload_size: 10485760,
            index_cache_seconds: 20,
            posts_per_page: 10,
        }
    }

    pub fn socket_addr(&self) -> (Ipv4Addr, u16) {
        (self.ip, self.port)
    }

    pub fn index_cache_duration(&self) -> Duration {
        Duration::from_secs(self.index_cache_seconds)
    }

    pub fn login_redirect(&self, next: &str) -> String {
        let query = serde_urlencoded::to_string([("next", next)]).unwrap_or_default();
        format!("{}?{}", self.login_url, query)
    }

    pub fn print(&self) {
        tracing::info!(domain = %self.domain, "listening on http://{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_from_str_is_case_insensitive() {
        assert_eq!("Production".parse::<Env>().unwrap(), Env::Production);
        assert!("staging".parse::<Env>().is_err());
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        let config = WebsiteConfig::stub();
        assert_eq!(
            config.login_redirect("/create/"),
            "/auth/login/?next=%2Fcreate%2F"
        );
    }

    #[test]
    fn test_stub_databases_are_unique() {
        assert_ne!(SharedConfig::stub().database_url, SharedConfig::stub().database_url);
    }
}
