use axum::{extract::Request, Router};
use tokio::{net::TcpListener, signal};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::{
    config::WebsiteConfig,
    state::{SharedState, WebsiteState},
};

use super::router::{get_router, website_routes};

/// Trailing slashes are trimmed before the router matches, so `/create/`
/// and `/create` reach the same handler.
pub fn normalize_paths(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

pub struct WebsiteService {
    config: WebsiteConfig,
    state: Option<WebsiteState>,
    router: Option<Router>,
}

impl WebsiteService {
    pub fn new(env_prefix: &str) -> Self {
        Self::with_config(WebsiteConfig::from_env_with_prefix(env_prefix))
    }

    pub fn with_config(config: WebsiteConfig) -> Self {
        Self {
            config,
            state: None,
            router: None,
        }
    }

    pub fn router(&self) -> Option<&Router> {
        self.router.as_ref()
    }

    pub fn state(&self) -> Option<&WebsiteState> {
        self.state.as_ref()
    }
}

impl ServiceExt for WebsiteService {
    fn stub(self) -> Self {
        Self::with_config(WebsiteConfig::stub())
    }

    async fn set_up(&mut self, shared: SharedState) {
        let state = WebsiteState::new(self.config.clone(), shared);

        match state.sessions().purge_expired().await {
            Ok(purged) => tracing::info!(purged, "expired sessions removed"),
            Err(e) => tracing::warn!(error = %e, "could not purge expired sessions"),
        }
        if let Err(e) = tokio::fs::create_dir_all(state.media().root()).await {
            tracing::error!(error = %e, root = %state.media().root().display(), "media root unavailable");
        }

        let routes = website_routes(state.clone());
        self.router = Some(get_router(state.clone(), routes));
        self.state = Some(state);
    }

    async fn run(self) -> Result<(), std::io::Error> {
        let router = self
            .router
            .ok_or_else(|| std::io::Error::other("website service was not set up"))?;
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.config.print();
        axum::serve(
            listener,
            axum::ServiceExt::<Request>::into_make_service(normalize_paths(router)),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

pub trait ServiceExt {
    fn stub(self) -> Self;
    fn set_up(&mut self, _shared: SharedState) -> impl std::future::Future<Output = ()> {
        async {}
    }
    fn run(self) -> impl std::future::Future<Output = Result<(), std::io::Error>>;
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
        tracing::info!("shutdown gracefully from ctrl-c");
        },
        _ = terminate => {
        tracing::info!("shutdown gracefully from signal");
        },
    }
}
