//! Startup provisioning of the chat and recommendation assistants.

use std::path::Path;

use book_tools::function_definitions;
use chat_core::ServiceError;
use openai_client::{AssistantSpec, KnowledgeBase, OpenAiClient};
use orchestrator::prompts::{
    capture_function_definition, ASSISTANT_INSTRUCTIONS, ASSISTANT_NAME, RECOMMENDER_INSTRUCTIONS,
    RECOMMENDER_NAME,
};
use orchestrator::OrchestratorConfig;
use tracing::{info, warn};

/// Remote objects created at startup, removed again by [`Provisioned::teardown`].
#[derive(Debug, Default)]
pub struct Provisioned {
    assistants: Vec<String>,
    knowledge_base: Option<KnowledgeBase>,
}

impl Provisioned {
    /// Create whichever assistants `config` does not name yet.
    ///
    /// The recommendation assistant needs a catalog file to index; without
    /// one it is skipped. Created ids are written back into `config`.
    pub async fn ensure(
        client: &OpenAiClient,
        config: &mut OrchestratorConfig,
        catalog_path: Option<&Path>,
    ) -> Result<Self, ServiceError> {
        let mut provisioned = Self::default();

        if config.assistant_id.trim().is_empty() {
            let spec = AssistantSpec::new(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS)
                .with_tools(function_definitions());
            let id = client.create_assistant(spec).await?;
            info!("Provisioned chat assistant {}", id);
            config.assistant_id = id.clone();
            provisioned.assistants.push(id);
        }

        if config.recommendation_assistant_id.is_none() {
            match catalog_path {
                Some(path) => {
                    if let Err(e) = provisioned.add_recommender(client, config, path).await {
                        provisioned.teardown(client).await;
                        return Err(e);
                    }
                }
                None => warn!("No CATALOG_PATH; recommendation assistant not provisioned"),
            }
        }

        Ok(provisioned)
    }

    async fn add_recommender(
        &mut self,
        client: &OpenAiClient,
        config: &mut OrchestratorConfig,
        catalog_path: &Path,
    ) -> Result<(), ServiceError> {
        let knowledge_base = client.create_knowledge_base(catalog_path).await?;
        let vector_store_id = knowledge_base.vector_store_id.clone();
        self.knowledge_base = Some(knowledge_base);

        let spec = AssistantSpec::new(RECOMMENDER_NAME, RECOMMENDER_INSTRUCTIONS)
            .with_tools(vec![capture_function_definition()])
            .with_file_search(vector_store_id);
        let id = client.create_assistant(spec).await?;
        info!("Provisioned recommendation assistant {}", id);
        config.recommendation_assistant_id = Some(id.clone());
        self.assistants.push(id);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.assistants.is_empty() && self.knowledge_base.is_none()
    }

    /// Delete everything created by [`Provisioned::ensure`]. Failures are logged.
    pub async fn teardown(&mut self, client: &OpenAiClient) {
        for id in self.assistants.drain(..) {
            if let Err(e) = client.delete_assistant(&id).await {
                warn!("Failed to delete assistant {}: {}", id, e);
            }
        }
        if let Some(knowledge_base) = self.knowledge_base.take() {
            // Usually gone with its assistant already.
            if let Err(e) = client.delete_vector_store(&knowledge_base.vector_store_id).await {
                warn!("Vector store {} not deleted: {}", knowledge_base.vector_store_id, e);
            }
            if let Err(e) = client.delete_file(&knowledge_base.file_id).await {
                warn!("Failed to delete file {}: {}", knowledge_base.file_id, e);
            }
        }
    }
}
