//! Core services: validation, slugs, record store, file storage, the
//! document lifecycle and the SDK generator client.

pub mod document_service;
pub mod generator_client;
pub mod kv_store;
pub mod slug;
pub mod storage_service;
pub mod validator;
