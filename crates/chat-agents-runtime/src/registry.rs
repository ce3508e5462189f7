//! Resolves `<provider>:<model>` identifiers to language model instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use chat_agents_core::llm::LanguageModel;
use chat_agents_core::model::ModelId;

/// Builds a model for one provider given the parsed id.
pub trait ModelFactory: Send + Sync {
    fn create(&self, id: &ModelId) -> anyhow::Result<Arc<dyn LanguageModel>>;
}

impl<F> ModelFactory for F
where
    F: Fn(&ModelId) -> anyhow::Result<Arc<dyn LanguageModel>> + Send + Sync,
{
    fn create(&self, id: &ModelId) -> anyhow::Result<Arc<dyn LanguageModel>> {
        self(id)
    }
}

/// Provider name to factory.
#[derive(Default, Clone)]
pub struct ModelRegistry {
    factories: BTreeMap<String, Arc<dyn ModelFactory>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `provider`, replacing any previous one.
    pub fn register(mut self, provider: impl Into<String>, factory: impl ModelFactory + 'static) -> Self {
        self.factories.insert(provider.into(), Arc::new(factory));
        self
    }

    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Parses `model` as `<provider>:<model-name>` and builds it with the
    /// provider's factory.
    pub fn init_chat_model(&self, model: &str) -> anyhow::Result<Arc<dyn LanguageModel>> {
        let id: ModelId = model.parse()?;
        let factory = self.factories.get(id.provider()).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown model provider '{}' (registered: {})",
                id.provider(),
                self.providers().join(", ")
            )
        })?;
        tracing::debug!(model = %id, "initializing chat model");
        factory.create(&id)
    }
}
