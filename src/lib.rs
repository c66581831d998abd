pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
#[cfg(feature = "db")]
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod repository;
pub mod server;
pub mod storage;
pub mod types;
pub mod validation;
