pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod services;

pub use handlers::{create_app, AppState};
