use async_trait::async_trait;
use thiserror::Error;

use crate::key::ToolKey;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' failed: {1}")]
    Failed(String, String),
}

/// The executable counterpart to a `ToolDef`: owns a stable `Key` and a
/// `Run(arguments) -> string` operation (§3 — Tool). The returned string is
/// the JSON (or plain text) shown back to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn key(&self) -> &ToolKey;

    async fn run(&self, arguments: &str) -> Result<String, ToolError>;
}
