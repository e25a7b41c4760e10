pub mod error;
pub mod message;
pub mod provider;
pub mod response;

pub use error::LlmError;
pub use message::{
    AssistantTurn, Message, PromptRequest, ResponseFormat, Role, SamplingOptions, TokenUsage,
    ToolCall, ToolChoice, ToolDef, ToolDefKind,
};
pub use provider::{is_reasoning_model, FunctionCallOutput, HttpProvider, HttpProviderConfig, Provider};
pub use response::{parse_response, ParsedResponse, RawResponse, RawUsage, WebSearchEvent, WEB_SEARCH_TOOL_NAME};
