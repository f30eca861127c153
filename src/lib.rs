pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod content;
pub mod dropzone;
pub mod images;
pub mod notes;
pub mod notify;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
