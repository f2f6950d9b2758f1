//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        document_service::{DocumentPolicy, DocumentService},
        generator_client::GeneratorClient,
        kv_store::KeyValueStore,
        storage_service::StorageService,
    },
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn KeyValueStore>,
    pub documents: DocumentService,
    pub storage: StorageService,
    pub generator: GeneratorClient,
}

impl AppState {
    /// Wire the services together from configuration and an already opened
    /// record store.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>, generator: GeneratorClient) -> Self {
        let storage = StorageService::new(config.storage_dir.clone());
        let policy = DocumentPolicy {
            document_ttl: chrono::Duration::days(config.document_ttl_days),
            max_versions: config.max_versions,
        };
        let documents = DocumentService::new(store.clone(), storage.clone(), policy);
        Self {
            config: Arc::new(config),
            store,
            documents,
            storage,
            generator,
        }
    }
}
