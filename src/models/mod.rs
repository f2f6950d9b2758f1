//! Core data models for the document hosting service.
//!
//! Documents and versions are persisted as JSON records in the key-value
//! store; generator models mirror the external SDK generator API.

pub mod document;
pub mod generator;
