/// Basic application code
pub mod app;
/// Request authorization
pub mod auth;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Signed-link cryptography
pub mod crypto;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Stored records
pub mod model;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
