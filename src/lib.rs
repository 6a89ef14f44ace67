pub mod access;
pub mod agent;
pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod llm;
pub mod providers;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items
pub use access::{AccessFilter, AccessPolicy, Role};
pub use config::AppConfig;
pub use services::Services;
