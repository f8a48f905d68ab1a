use quill::{orquestrator::ServicesOrquestrator, service::WebsiteService};

fn main() -> Result<(), std::io::Error> {
    ServicesOrquestrator::default()
        .load_environment_variables()
        .set_config_from_env()
        .init_tracing()
        .enable_migrations()
        .add_service(WebsiteService::new("WEB_"))
        .run()
}
