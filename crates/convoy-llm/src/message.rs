use serde::{Deserialize, Serialize};

/// A role in the conversation thread (§3 Data Model — Message).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in the ordered conversation history. Mutations are append-only
/// within a single agent run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Present only on `Role::Tool` messages — the call_id the tool output
    /// answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), call_id: None }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            call_id: Some(call_id.into()),
        }
    }
}

/// One of {free text, JSON object, JSON schema} (§3 — ResponseFormat).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { name: String, schema: serde_json::Value },
}

/// Advisory tool-choice directive. The Runner forwards it to the provider
/// verbatim and never inspects it (§4.4 design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Named(String),
}

/// Declarative description of a callable tool, as exposed to the model
/// (§3 — ToolDef).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub kind: ToolDefKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolDefKind {
    #[default]
    Function,
    Custom,
}

/// Optional sampling knobs forwarded to the provider (§3, §4.4).
#[derive(Debug, Clone, Default)]
pub struct SamplingOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub parallel_tool_calls: bool,
    pub service_tier: Option<String>,
}

/// A single top-level ask: a message thread, callable tools, and an
/// optional structured-output schema (§3 — PromptRequest).
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDef>,
    pub response_format: Option<ResponseFormat>,
    pub tool_choice: Option<ToolChoice>,
    pub sampling: SamplingOptions,
}

impl PromptRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            response_format: None,
            tool_choice: None,
            sampling: SamplingOptions::default(),
        }
    }
}

/// The tuple (call_id, internal id, tool name, arguments-as-string, type
/// tag) (§3 — ToolCall). `call_id` is the opaque identifier the provider
/// issues and expects back on continuation; it is distinct from the
/// provider-internal `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub call_id: String,
    pub name: String,
    pub arguments: String,
    #[serde(rename = "type")]
    pub call_type: String,
}

/// Token usage counts, copied through as integers; absence is zero, never
/// missing (§4.3 — numeric semantics).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// A parsed slice of one LLM response (§3 — AssistantTurn).
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    /// Non-canonical raw content keyed by the parser (refusals, unknown
    /// item types) — see §4.3.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl AssistantTurn {
    pub fn is_done(&self) -> bool {
        self.tool_calls.is_empty()
    }
}
