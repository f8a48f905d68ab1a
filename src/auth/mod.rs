mod middlewares;
mod models;
mod routes;
mod services;

pub use middlewares::{login_required_middleware, sessions_middleware, CurrentUser, Viewer};
pub use models::{User, UserWithPassword};
pub use routes::routes;
pub use services::{hash_password, verify_password, LoginForm, NextParams, SignupForm};
