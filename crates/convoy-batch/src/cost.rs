//! Cost Optimizer (§4.8) — a stateless calculator over per-1,000-token
//! price tables. Grounded on the cost-per-token accounting pattern used
//! for synchronous-call instrumentation elsewhere in the retrieval corpus,
//! adapted here to batch request bodies rather than a live provider call.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::{BatchRequest, CostEstimate};

/// The provider's standing batch-submission discount relative to a
/// synchronous call of the same requests.
pub const BATCH_DISCOUNT: f64 = 0.5;

/// Per-1,000-token price tables keyed by model name, with a `"default"`
/// sentinel row. Lookup order: exact match, then longest substring match,
/// then `"default"`.
///
/// Open question resolved: the specification leaves the substring-match
/// tie-break unspecified. This implementation picks "longest substring
/// wins" so that a more specific alias (e.g. `"gpt-5.1-mini"`) is never
/// shadowed by a shorter one (e.g. `"gpt-5"`) when both appear in a table.
#[derive(Debug, Clone)]
pub struct PriceTable {
    input_per_1k: HashMap<String, f64>,
    output_per_1k: HashMap<String, f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut input_per_1k = HashMap::new();
        let mut output_per_1k = HashMap::new();
        input_per_1k.insert("default".to_string(), 0.0025);
        output_per_1k.insert("default".to_string(), 0.01);
        Self { input_per_1k, output_per_1k }
    }
}

impl PriceTable {
    pub fn new() -> Self {
        Self { input_per_1k: HashMap::new(), output_per_1k: HashMap::new() }
    }

    pub fn with_model(mut self, model: impl Into<String>, input_per_1k: f64, output_per_1k: f64) -> Self {
        let model = model.into();
        self.input_per_1k.insert(model.clone(), input_per_1k);
        self.output_per_1k.insert(model, output_per_1k);
        self
    }

    fn lookup(table: &HashMap<String, f64>, model: &str) -> f64 {
        if let Some(price) = table.get(model) {
            return *price;
        }
        table
            .iter()
            .filter(|(key, _)| key.as_str() != "default" && model.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, price)| *price)
            .or_else(|| table.get("default").copied())
            .unwrap_or(0.0)
    }

    pub fn input_price(&self, model: &str) -> f64 {
        Self::lookup(&self.input_per_1k, model)
    }

    pub fn output_price(&self, model: &str) -> f64 {
        Self::lookup(&self.output_per_1k, model)
    }
}

/// Coarse token estimate for one request body: `sum(ceil(len(content)/4))`
/// over string message contents, times 1.1 for framing overhead, clamped
/// to at least 10; bodies with no `messages` field are assumed to cost 100
/// input tokens.
fn estimate_input_tokens(body: &Value) -> u64 {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        return 100;
    };

    let raw: f64 = messages
        .iter()
        .filter_map(|m| m.get("content").and_then(Value::as_str))
        .map(|content| ((content.len() as f64) / 4.0).ceil().max(1.0))
        .sum();

    ((raw * 1.1).ceil() as u64).max(10)
}

/// `max_tokens` if the body specifies it, else 200.
fn estimate_output_tokens(body: &Value) -> u64 {
    body.get("max_tokens").and_then(Value::as_u64).unwrap_or(200)
}

/// Estimates the batch-discounted cost of submitting `requests` (§4.8).
/// Monotonic in the request set: adding requests never decreases the
/// estimate.
pub fn estimate_cost(requests: &[BatchRequest], prices: &PriceTable) -> CostEstimate {
    let mut tokens_in = 0u64;
    let mut tokens_out = 0u64;
    let mut cost = 0.0;

    for request in requests {
        let model = request
            .body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or("default");
        let input_tokens = estimate_input_tokens(&request.body);
        let output_tokens = estimate_output_tokens(&request.body);

        tokens_in += input_tokens;
        tokens_out += output_tokens;
        cost += (input_tokens as f64 * prices.input_price(model)
            + output_tokens as f64 * prices.output_price(model))
            / 1000.0
            * BATCH_DISCOUNT;
    }

    CostEstimate {
        estimated_cost: cost,
        savings_vs_sync: BATCH_DISCOUNT,
        tokens_in,
        tokens_out,
    }
}
