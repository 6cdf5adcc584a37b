//! Assistant provisioning: assistants, uploaded files and vector stores.

use std::path::Path;
use std::time::Duration;

use chat_core::ServiceError;
use reqwest::multipart;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api_types::{
    AssistantObject, CreateAssistantRequest, CreateVectorStoreRequest, IdObject, VectorStoreObject,
};
use crate::client::OpenAiClient;

/// How often to check whether a vector store finished indexing.
const VECTOR_STORE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of indexing checks before giving up.
const VECTOR_STORE_MAX_POLLS: u32 = 120;

/// Everything needed to create an assistant.
#[derive(Debug, Clone)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    /// Tool definitions in the API's JSON format.
    pub tools: Vec<Value>,
    /// Vector stores to search with `file_search`.
    pub vector_store_ids: Vec<String>,
}

impl AssistantSpec {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
            vector_store_ids: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Enable `file_search` over the given vector store.
    pub fn with_file_search(mut self, vector_store_id: impl Into<String>) -> Self {
        if !self.tools.iter().any(|t| t["type"] == "file_search") {
            self.tools.insert(0, json!({ "type": "file_search" }));
        }
        self.vector_store_ids.push(vector_store_id.into());
        self
    }

    fn into_request(self, model: &str) -> CreateAssistantRequest {
        let tool_resources = if self.vector_store_ids.is_empty() {
            None
        } else {
            Some(json!({ "file_search": { "vector_store_ids": self.vector_store_ids } }))
        };
        CreateAssistantRequest {
            name: self.name,
            instructions: self.instructions,
            model: model.to_string(),
            tools: self.tools,
            tool_resources,
        }
    }
}

/// A vector store built from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub vector_store_id: String,
    pub file_id: String,
}

impl OpenAiClient {
    /// Create an assistant and return its id.
    pub async fn create_assistant(&self, spec: AssistantSpec) -> Result<String, ServiceError> {
        let name = spec.name.clone();
        let request = spec.into_request(&self.config.model);
        let assistant: IdObject = self
            .send_json(self.post("/assistants").json(&request))
            .await?;
        info!("Assistant '{}' created with ID: {}", name, assistant.id);
        Ok(assistant.id)
    }

    /// Vector stores attached to an assistant's `file_search` tool.
    pub async fn assistant_vector_stores(&self, assistant_id: &str) -> Result<Vec<String>, ServiceError> {
        let assistant: AssistantObject = self
            .send_json(self.get(&format!("/assistants/{}", assistant_id)))
            .await?;
        Ok(assistant.vector_store_ids())
    }

    /// Delete an assistant and the vector stores attached to it.
    ///
    /// Vector store deletion failures are logged and skipped.
    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<(), ServiceError> {
        let vector_stores = match self.assistant_vector_stores(assistant_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not inspect assistant {}: {}", assistant_id, e);
                Vec::new()
            }
        };

        for vector_store_id in &vector_stores {
            if let Err(e) = self.delete_vector_store(vector_store_id).await {
                warn!("Failed to delete vector store {}: {}", vector_store_id, e);
            }
        }

        self.send(self.delete(&format!("/assistants/{}", assistant_id)))
            .await?;
        info!("Assistant {} deleted", assistant_id);
        Ok(())
    }

    /// Upload a file for use with assistants.
    pub async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ServiceError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        let file: IdObject = self
            .send_json(self.post("/files").multipart(form))
            .await?;
        info!("Uploaded {} as file {}", filename, file.id);
        Ok(file.id)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), ServiceError> {
        self.send(self.delete(&format!("/files/{}", file_id))).await?;
        Ok(())
    }

    /// Create a vector store over already-uploaded files and wait until it
    /// finishes indexing.
    pub async fn create_vector_store(
        &self,
        name: &str,
        file_ids: Vec<String>,
    ) -> Result<String, ServiceError> {
        let request = CreateVectorStoreRequest { name, file_ids };
        let mut store: VectorStoreObject = self
            .send_json(self.post("/vector_stores").json(&request))
            .await?;

        let mut polls = 0;
        while store.status == "in_progress" {
            if polls >= VECTOR_STORE_MAX_POLLS {
                return Err(ServiceError::Network(format!(
                    "Vector store {} still indexing after {} checks",
                    store.id, polls
                )));
            }
            tokio::time::sleep(VECTOR_STORE_POLL_INTERVAL).await;
            store = self
                .send_json(self.get(&format!("/vector_stores/{}", store.id)))
                .await?;
            polls += 1;
        }

        if store.status != "completed" {
            return Err(ServiceError::api(
                500,
                format!("Vector store {} ended with status {}", store.id, store.status),
            ));
        }

        info!("Vector store {} ready", store.id);
        Ok(store.id)
    }

    pub async fn delete_vector_store(&self, vector_store_id: &str) -> Result<(), ServiceError> {
        self.send(self.delete(&format!("/vector_stores/{}", vector_store_id)))
            .await?;
        Ok(())
    }

    /// Upload a catalog file and index it in a new vector store.
    pub async fn create_knowledge_base(&self, path: &Path) -> Result<KnowledgeBase, ServiceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ServiceError::Storage(format!("{}: {}", path.display(), e)))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("library.jsonl");

        let file_id = self.upload_file(filename, bytes).await?;
        let vector_store_id = self
            .create_vector_store("Library Vector Store", vec![file_id.clone()])
            .await?;
        Ok(KnowledgeBase {
            vector_store_id,
            file_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_without_file_search() {
        let spec = AssistantSpec::new("Learning Assistant", "Be kind")
            .with_tools(vec![json!({"type": "function", "function": {"name": "f"}})]);
        let request = spec.into_request("gpt-4-turbo");
        assert_eq!(request.tools.len(), 1);
        assert!(request.tool_resources.is_none());
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tool_resources").is_none());
    }

    #[test]
    fn test_spec_with_file_search() {
        let spec = AssistantSpec::new("Book Recommendation Assistant", "Recommend")
            .with_tools(vec![json!({"type": "function", "function": {"name": "f"}})])
            .with_file_search("vs_1");
        let request = spec.into_request("gpt-4-turbo");
        assert_eq!(request.tools[0], json!({"type": "file_search"}));
        assert_eq!(request.tools.len(), 2);
        assert_eq!(
            request.tool_resources,
            Some(json!({"file_search": {"vector_store_ids": ["vs_1"]}}))
        );
    }
}
