//! Result Aggregator (§4.7) — reads the result and error JSON-Lines
//! artifacts and produces one `AggregatedResult` keyed by `custom_id`.
//! Malformed lines are tolerated, not fatal: a single corrupt line must
//! not sink the aggregation (mirrors the lenient-line-skip pattern used
//! for transcript replay elsewhere in this codebase).

use std::io::BufRead;

use serde_json::Value;

use crate::model::{AggregatedResult, BatchToolCall, ItemUsage};

/// Streams `results` and `errors` line-by-line (bounded memory — one line
/// at a time, no pipelining) and merges them into one `AggregatedResult`.
/// A `custom_id` present in both streams is recorded in both maps; the
/// underlying artifacts are expected to be disjoint, but the aggregator
/// does not enforce it.
pub fn aggregate<R1: BufRead, R2: BufRead>(results: R1, errors: R2) -> AggregatedResult {
    let mut out = AggregatedResult::default();

    for line in results.lines() {
        let Ok(line) = line else { continue };
        if let Some((custom_id, value)) = parse_result_line(&line) {
            if let Some(content) = extract_content(&value) {
                out.content.insert(custom_id.clone(), content);
            }
            let tool_calls = extract_tool_calls(&value);
            if !tool_calls.is_empty() {
                out.tool_calls.insert(custom_id.clone(), tool_calls);
            }
            if let Some(usage) = extract_usage(&value) {
                out.usage.insert(custom_id.clone(), usage);
            }
            out.items.insert(custom_id, value);
        }
    }

    for line in errors.lines() {
        let Ok(line) = line else { continue };
        if let Some((custom_id, message)) = parse_error_line(&line) {
            out.errors.insert(custom_id, message);
        }
    }

    out
}

fn parse_result_line(line: &str) -> Option<(String, Value)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let custom_id = value.get("custom_id")?.as_str()?.to_string();
    Some((custom_id, value))
}

fn parse_error_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let custom_id = value.get("custom_id")?.as_str()?.to_string();
    let error = value.get("error")?;
    Some((custom_id, error.to_string()))
}

fn first_choice(value: &Value) -> Option<&Value> {
    value
        .pointer("/response/body/choices")?
        .as_array()?
        .first()
}

fn extract_content(value: &Value) -> Option<String> {
    let choice = first_choice(value)?;
    choice.pointer("/message/content")?.as_str().map(str::to_string)
}

fn extract_tool_calls(value: &Value) -> Vec<BatchToolCall> {
    let Some(choice) = first_choice(value) else { return Vec::new() };
    let Some(calls) = choice.pointer("/message/tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };

    calls
        .iter()
        .filter_map(|call| {
            let id = call.get("id")?.as_str()?.to_string();
            let call_type = call
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("function")
                .to_string();
            let function = call.get("function").cloned().unwrap_or(Value::Null);
            Some(BatchToolCall { id, call_type, function })
        })
        .collect()
}

fn extract_usage(value: &Value) -> Option<ItemUsage> {
    let usage = value.pointer("/response/body/usage")?;
    let total_tokens = usage.get("total_tokens")?.as_u64()?;
    if total_tokens == 0 {
        return None;
    }
    Some(ItemUsage {
        prompt_tokens: usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
        completion_tokens: usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0),
        total_tokens,
    })
}
