pub mod api;
pub mod config;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod service;
pub mod types;
