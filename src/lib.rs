pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod media;
pub mod orquestrator;
pub mod pagination;
pub mod posts;
pub mod service;
pub mod sessions;
pub mod state;
pub mod utils;
pub mod website;
