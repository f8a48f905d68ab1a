use menva::read_default_file;
use tokio::task::JoinSet;

use crate::{
    config::SharedConfig,
    service::{ServiceExt, WebsiteService},
    state::SharedState,
};

use super::tracing::{init_tracing, TracingGuards};

#[derive(Default)]
pub struct ServicesOrquestrator {
    config: SharedConfig,
    services: Vec<WebsiteService>,
    run_migrations: bool,
    tracing: Option<TracingGuards>,
}

impl ServicesOrquestrator {
    /// Loads `.env` into the process environment, if there is one.
    pub fn load_environment_variables(self) -> Self {
        read_default_file();
        self
    }

    pub fn set_config_from_env(mut self) -> Self {
        self.config = SharedConfig::from_env();
        self
    }

    pub fn enable_migrations(mut self) -> Self {
        self.run_migrations = true;
        self
    }

    pub fn init_tracing(mut self) -> Self {
        self.tracing = Some(init_tracing(
            &self.config.env,
            self.config.sentry_token(),
        ));
        self
    }

    pub fn add_service(mut self, service: WebsiteService) -> Self {
        self.services.push(service);
        self
    }

    async fn start_services(self) -> Vec<Result<(), std::io::Error>> {
        let mut set = JoinSet::new();

        let state = SharedState::new(&self.config);
        tracing::info!(env = %state.env(), "starting services");

        if self.run_migrations {
            state.database().run_migrations().await;
        }

        for mut service in self.services {
            service.set_up(state.clone()).await;

            set.spawn(service.run());
        }

        set.join_all().await
    }

    pub fn run(self) -> Result<(), std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(self.config.worker_threads)
            .max_blocking_threads(self.config.max_blocking_threads)
            .build()?;

        let results = runtime.block_on(self.start_services());
        results.into_iter().collect()
    }
}
