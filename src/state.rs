use axum::extract::FromRef;

use crate::{
    cache::PageCache,
    config::{Env, SharedConfig, WebsiteConfig},
    database::Database,
    media::MediaStorage,
    sessions::Sessions,
};

#[derive(Clone, Debug)]
pub struct SharedState {
    env: Env,
    database: Database,
}

impl SharedState {
    pub fn new(config: &SharedConfig) -> Self {
        Self {
            env: config.env.clone(),
            database: Database::new(&config.database_url),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn env(&self) -> &Env {
        &self.env
    }
}

#[derive(Clone, Debug)]
pub struct WebsiteState {
    config: WebsiteConfig,
    shared: SharedState,
    sessions: Sessions,
    page_cache: PageCache,
    media: MediaStorage,
}

impl WebsiteState {
    pub fn new(config: WebsiteConfig, shared: SharedState) -> Self {
        Self {
            sessions: Sessions::new(shared.database.clone()),
            page_cache: PageCache::new(config.index_cache_duration()),
            media: MediaStorage::new(&config.media_root),
            shared,
            config,
        }
    }

    pub fn config(&self) -> &WebsiteConfig {
        &self.config
    }

    /// Cookies only get the `Secure` flag where the site is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.shared.env == Env::Production
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn database(&self) -> &Database {
        &self.shared.database
    }

    pub fn page_cache(&self) -> &PageCache {
        &self.page_cache
    }

    pub fn media(&self) -> &MediaStorage {
        &self.media
    }
}

impl FromRef<WebsiteState> for Database {
    fn from_ref(app_state: &WebsiteState) -> Database {
        app_state.shared.database.clone()
    }
}

impl FromRef<WebsiteState> for WebsiteConfig {
    fn from_ref(app_state: &WebsiteState) -> WebsiteConfig {
        app_state.config.clone()
    }
}
