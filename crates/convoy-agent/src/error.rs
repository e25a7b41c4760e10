use thiserror::Error;

use convoy_llm::LlmError;
use convoy_tools::ToolKey;

/// Error taxonomy for the synchronous agent path (§7). Tool failures and
/// the safety cap are fatal for the run; the partial conversation state is
/// discarded (§4.4 — error surfacing).
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model requested unregistered tool '{0}'")]
    NoSuchTool(String),

    #[error("tool '{0}' has no remaining call credits")]
    ToolExhausted(ToolKey),

    #[error("tool '{name}' failed: {source}")]
    ToolFailed {
        name: String,
        #[source]
        source: convoy_tools::ToolError,
    },

    #[error("agent loop exceeded max turns ({0})")]
    MaxTurnsExceeded(u32),

    #[error("validation error: {0}")]
    Validation(String),
}
