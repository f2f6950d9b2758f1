//! APIScope: hosts OpenAPI documents with version history, share links and
//! SDK generation through an external generator service.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
