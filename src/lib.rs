pub mod auth;
pub mod config;
pub mod models;
pub mod routes;
pub mod session;
pub mod startup;
pub mod telemetry;
pub mod utils;
