//! # Service Transformer (S: Service)
//!
//! HTTP service for the financial instrument transformer.
//!
//! Loads the latest FactSet extract in the background and serves the joined
//! instruments from memory:
//!
//! - `GET /transformers/financial-instruments/__count`
//! - `GET /transformers/financial-instruments/__ids`
//! - `GET /transformers/financial-instruments/{id}`
//! - `GET /transformers/financial-instruments`
//! - `POST /transformers/financial-instruments/__reload`
//! - `GET /__health` and `GET /__gtg`
//!
//! Every instrument endpoint answers 503 until the first load completes.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod worker;

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
