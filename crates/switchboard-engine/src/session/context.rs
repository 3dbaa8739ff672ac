//! Process-wide engine context.
//!
//! Holds the shared store connection, the model handle pool, and the
//! integration registry. Built once at startup and passed into every
//! session; nothing here is a global.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use switchboard_common::{ConversationId, ModelError, Result};

use crate::integrations::IntegrationSet;
use crate::providers::{self, ProviderKind};
use crate::settings::{Settings, StoreBackend};
use crate::store::{ByteStore, MemoryStore, RedbStore};
use crate::ChatModel;

use super::manager::ChatSession;

/// Shared services for all conversations served by this process.
pub struct EngineContext {
    settings: Settings,
    store: Arc<dyn ByteStore>,
    models: ModelPool,
    integrations: Arc<IntegrationSet>,
}

impl EngineContext {
    /// Open the configured store backend and wrap it with an empty
    /// model pool and the given integration registry.
    pub fn new(settings: Settings, integrations: IntegrationSet) -> Result<Self> {
        let store: Arc<dyn ByteStore> = match settings.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redb => Arc::new(RedbStore::open(&settings.store_path()?)?),
        };
        Ok(Self::with_store(settings, integrations, store))
    }

    /// Build the context over an explicit store. Used by embedders and
    /// tests that bring their own backend.
    pub fn with_store(
        settings: Settings,
        integrations: IntegrationSet,
        store: Arc<dyn ByteStore>,
    ) -> Self {
        Self {
            settings,
            store,
            models: ModelPool::new(),
            integrations: Arc::new(integrations),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn ByteStore> {
        Arc::clone(&self.store)
    }

    pub fn integrations(&self) -> Arc<IntegrationSet> {
        Arc::clone(&self.integrations)
    }

    /// A session for one conversation, using the configured model
    /// roles.
    pub async fn session(self: &Arc<Self>, conversation: ConversationId) -> Result<ChatSession> {
        let options = self.settings.session_options(conversation);
        let session = ChatSession::new(Arc::clone(self), options).await?;
        Ok(session)
    }

    pub(crate) async fn model(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> std::result::Result<Arc<dyn ChatModel>, ModelError> {
        self.models.handle(provider, model).await
    }

    /// Seed a model handle instead of building one from the
    /// environment. Used by tests and embedders with custom models.
    pub async fn register_model(
        &self,
        provider: ProviderKind,
        model: &str,
        handle: Arc<dyn ChatModel>,
    ) {
        self.models.register(provider, model, handle).await;
    }
}

/// One shared handle per (provider, model) pair, built on first use.
pub struct ModelPool {
    handles: Mutex<HashMap<(ProviderKind, String), Arc<dyn ChatModel>>>,
}

impl ModelPool {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// The cached handle for this pair, building it from the
    /// environment on a miss.
    pub async fn handle(
        &self,
        provider: ProviderKind,
        model: &str,
    ) -> std::result::Result<Arc<dyn ChatModel>, ModelError> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(&(provider, model.to_string())) {
            return Ok(Arc::clone(handle));
        }
        debug!(provider = %provider, model, "building model handle");
        let handle = providers::build(provider, model)?;
        handles.insert((provider, model.to_string()), Arc::clone(&handle));
        Ok(handle)
    }

    pub async fn register(&self, provider: ProviderKind, model: &str, handle: Arc<dyn ChatModel>) {
        let mut handles = self.handles.lock().await;
        handles.insert((provider, model.to_string()), handle);
    }
}

impl Default for ModelPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::{ModelMessage, ModelReply, ToolSchema};

    struct NullModel;

    #[async_trait]
    impl ChatModel for NullModel {
        async fn invoke(
            &self,
            _messages: &[ModelMessage],
            _tools: &[ToolSchema],
        ) -> std::result::Result<ModelReply, ModelError> {
            Ok(ModelReply::text("ok"))
        }
    }

    #[tokio::test]
    async fn registered_handles_are_shared() {
        let pool = ModelPool::new();
        let handle: Arc<dyn ChatModel> = Arc::new(NullModel);
        pool.register(ProviderKind::Ollama, "llama3.1", Arc::clone(&handle))
            .await;

        let first = pool.handle(ProviderKind::Ollama, "llama3.1").await.unwrap();
        let second = pool.handle(ProviderKind::Ollama, "llama3.1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &handle));
    }

    #[tokio::test]
    async fn pairs_are_distinct() {
        let pool = ModelPool::new();
        pool.register(ProviderKind::Ollama, "llama3.1", Arc::new(NullModel))
            .await;
        pool.register(ProviderKind::Ollama, "llama3.2", Arc::new(NullModel))
            .await;

        let a = pool.handle(ProviderKind::Ollama, "llama3.1").await.unwrap();
        let b = pool.handle(ProviderKind::Ollama, "llama3.2").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn context_serves_store_and_integrations() {
        let context = EngineContext::with_store(
            Settings::default(),
            IntegrationSet::new(Vec::new()),
            Arc::new(MemoryStore::new()),
        );
        assert!(context.integrations().is_empty());
        assert_eq!(context.settings().models.model, "gpt-4o-mini");
    }
}
