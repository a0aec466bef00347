pub mod artifact;
pub mod common;
pub mod config;
pub mod observability;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
