use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One request destined for a batch job (§3 — BatchRequest). `custom_id` is
/// caller-chosen, must be unique within the job, and is the join key
/// between the input and the result/error artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: serde_json::Value,
}

impl BatchRequest {
    pub fn new(custom_id: impl Into<String>, url: impl Into<String>, body: serde_json::Value) -> Self {
        Self { custom_id: custom_id.into(), method: "POST".to_string(), url: url.into(), body }
    }
}

/// Lifecycle status of a `BatchJob` (§3). `Completed`, `Failed`, `Expired`,
/// and `Cancelled` are terminal; once reached a job does not transition
/// further.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Validating,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestCounts {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A batch job as tracked by the provider (§3 — BatchJob). Persists
/// remotely for up to 24 hours and is referenced by `id` thereafter; this
/// crate holds no local copy of a job's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: JobStatus,
    pub input_file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub request_counts: RequestCounts,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Per-item token usage extracted by the aggregator (§4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A normalized tool call extracted from a batch result line (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: serde_json::Value,
}

/// The outcome of aggregating a job's result and error artifacts, keyed by
/// `custom_id` (§3 — AggregatedResult, §4.7).
#[derive(Debug, Clone, Default)]
pub struct AggregatedResult {
    pub items: HashMap<String, serde_json::Value>,
    pub content: HashMap<String, String>,
    pub tool_calls: HashMap<String, Vec<BatchToolCall>>,
    pub usage: HashMap<String, ItemUsage>,
    pub errors: HashMap<String, String>,
}

impl AggregatedResult {
    pub fn successes(&self) -> usize {
        self.items.len()
    }

    pub fn failures(&self) -> usize {
        self.errors.len()
    }
}

/// `{estimated_cost, savings_vs_sync, tokens_in, tokens_out}` (§3 —
/// CostEstimate, §4.8). `savings_vs_sync` is the standing batch discount;
/// `estimated_cost` already reflects it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CostEstimate {
    pub estimated_cost: f64,
    pub savings_vs_sync: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

/// Options accepted by `Submit` (§4.9). `metadata` is forwarded verbatim to
/// the provider; it has no meaning to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub completion_window: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Cursor-based filter for `List` (§4.6). `limit` of zero is treated as
/// "provider default".
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub after: Option<String>,
    pub limit: Option<u32>,
}
