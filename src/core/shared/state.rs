use crate::core::config::AppConfig;
use crate::core::store::IntakeStore;
use crate::intake::IntakePipeline;
use crate::llm::LLMProvider;
use std::sync::Arc;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn IntakeStore>,
    pub pipeline: IntakePipeline,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn IntakeStore>,
        llm_provider: Option<Arc<dyn LLMProvider>>,
    ) -> Self {
        let pipeline = IntakePipeline::new(Arc::clone(&store), config.intake.clone())
            .with_summarizer(llm_provider, config.llm.timeout());
        Self {
            config,
            store,
            pipeline,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.config.server)
            .field("intake", &self.config.intake)
            .finish()
    }
}
