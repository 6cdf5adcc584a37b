//! OpenAI API request and response types.

use chat_core::{MessageRole, RunSnapshot, RunStatus, ThreadMessage, ToolCall, ToolCallOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

/// Any object that only matters for its id.
#[derive(Debug, Deserialize)]
pub struct IdObject {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolCallOutput>,
}

/// A run object.
#[derive(Debug, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCallObject>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallObject {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    pub message: String,
}

impl From<RunObject> for RunSnapshot {
    fn from(run: RunObject) -> Self {
        let tool_calls = run
            .required_action
            .filter(|action| action.action_type == "submit_tool_outputs")
            .and_then(|action| action.submit_tool_outputs)
            .map(|outputs| {
                outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                    .collect()
            })
            .unwrap_or_default();

        RunSnapshot {
            id: run.id,
            thread_id: run.thread_id,
            status: run.status,
            tool_calls,
            last_error: run.last_error.map(|e| match e.code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub value: String,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        let text_segments = message
            .content
            .into_iter()
            .filter_map(|content| match content {
                MessageContent::Text { text } => Some(text.value),
                MessageContent::Other => None,
            })
            .collect();
        ThreadMessage {
            id: message.id,
            role: message.role,
            text_segments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModerationRequest<'a> {
    pub input: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResponse {
    pub results: Vec<ModerationEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationEntry {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeMap<String, Option<bool>>,
}

/// Chat completion request.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<chat_core::ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Assistant creation request.
#[derive(Debug, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantObject {
    pub id: String,
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
}

#[derive(Debug, Deserialize)]
pub struct ToolResources {
    #[serde(default)]
    pub file_search: Option<FileSearchResources>,
}

#[derive(Debug, Deserialize)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

impl AssistantObject {
    pub fn vector_store_ids(&self) -> Vec<String> {
        self.tool_resources
            .as_ref()
            .and_then(|r| r.file_search.as_ref())
            .map(|f| f.vector_store_ids.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct CreateVectorStoreRequest<'a> {
    pub name: &'a str,
    pub file_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VectorStoreObject {
    pub id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_required_action() {
        let json = r#"{
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "search_book_by_title", "arguments": "{\"title\":\"Moon\"}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "get_book_content", "arguments": "{\"book_id\":\"1\"}"}}
                    ]
                }
            },
            "last_error": null
        }"#;
        let run: RunObject = serde_json::from_str(json).unwrap();
        let snapshot = RunSnapshot::from(run);
        assert_eq!(snapshot.status, RunStatus::RequiresAction);
        assert_eq!(snapshot.tool_calls.len(), 2);
        assert_eq!(snapshot.tool_calls[0].id, "call_a");
        assert_eq!(snapshot.tool_calls[1].name, "get_book_content");
    }

    #[test]
    fn test_failed_run_keeps_error() {
        let json = r#"{"id": "run_1", "thread_id": "t", "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "slow down"}}"#;
        let snapshot = RunSnapshot::from(serde_json::from_str::<RunObject>(json).unwrap());
        assert_eq!(snapshot.status, RunStatus::Failed);
        assert_eq!(snapshot.last_error.as_deref(), Some("rate_limit_exceeded: slow down"));
    }

    #[test]
    fn test_message_drops_non_text_content() {
        let json = r#"{"id": "msg_1", "role": "assistant", "content": [
            {"type": "text", "text": {"value": "Hi【1:0†source】", "annotations": []}},
            {"type": "image_file", "image_file": {"file_id": "f"}},
            {"type": "text", "text": {"value": " there", "annotations": []}}
        ]}"#;
        let message = ThreadMessage::from(serde_json::from_str::<MessageObject>(json).unwrap());
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text_segments, vec!["Hi【1:0†source】", " there"]);
    }

    #[test]
    fn test_moderation_categories_allow_null() {
        let json = r#"{"results": [{"flagged": true, "categories": {"violence": true, "hate": false, "illicit": null}}]}"#;
        let response: ModerationResponse = serde_json::from_str(json).unwrap();
        assert!(response.results[0].flagged);
        assert_eq!(response.results[0].categories["illicit"], None);
    }

    #[test]
    fn test_assistant_vector_store_ids() {
        let json = r#"{"id": "asst_1", "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}}"#;
        let assistant: AssistantObject = serde_json::from_str(json).unwrap();
        assert_eq!(assistant.vector_store_ids(), vec!["vs_1".to_string()]);
    }
}
