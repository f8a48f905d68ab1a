mod router;
mod services;
mod stub;

pub use router::{get_router, website_routes};
pub use services::{normalize_paths, shutdown_signal, ServiceExt, WebsiteService};
pub use stub::StubService;
