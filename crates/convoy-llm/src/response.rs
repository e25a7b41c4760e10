//! Decodes provider "Responses" output items into a typed [`AssistantTurn`]
//! (§4.3 Response Parser).

use serde::Deserialize;
use serde_json::Value;

use crate::error::LlmError;
use crate::message::{AssistantTurn, TokenUsage, ToolCall};

/// Function-call name reserved for the provider's built-in web-search tool.
/// A `function_call` item under this name is a side effect, never a
/// dispatchable [`ToolCall`].
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

/// The raw wire shape of a provider Response (§6). `output` is kept as
/// untyped JSON so unknown item types round-trip without loss.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    pub id: String,
    #[serde(default)]
    pub output: Vec<Value>,
    #[serde(default)]
    pub usage: Option<RawUsage>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl From<RawUsage> for TokenUsage {
    fn from(raw: RawUsage) -> Self {
        TokenUsage {
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            total_tokens: raw.total_tokens,
        }
    }
}

/// A side effect surfaced by a `web_search_call` item. Citation extraction
/// and bag bookkeeping are the caller's responsibility (out of scope here,
/// see design §9).
#[derive(Debug, Clone)]
pub struct WebSearchEvent {
    pub id: String,
    pub status: Option<String>,
}

/// Output of parsing one provider Response.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub turn: AssistantTurn,
    pub web_search_events: Vec<WebSearchEvent>,
}

/// Parse a [`RawResponse`] into a typed turn, walking `output` in order
/// (§4.3 — ordering guarantees).
pub fn parse_response(raw: &RawResponse) -> Result<ParsedResponse, LlmError> {
    let mut content_parts: Vec<String> = Vec::new();
    let mut tool_calls = Vec::new();
    let mut web_search_events = Vec::new();
    let mut raw_map = serde_json::Map::new();

    for (i, item) in raw.output.iter().enumerate() {
        let item_type = item.get("type").and_then(Value::as_str).unwrap_or("");
        match item_type {
            "message" => {
                let content = item
                    .get("content")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for (j, part) in content.iter().enumerate() {
                    let part_type = part.get("type").and_then(Value::as_str).unwrap_or("");
                    match part_type {
                        "output_text" => {
                            if let Some(text) = part.get("text").and_then(Value::as_str) {
                                content_parts.push(text.to_string());
                            }
                        }
                        "refusal" => {
                            insert_raw(&mut raw_map, &format!("refusal_{i}_{j}"), part)?;
                        }
                        _ => {
                            insert_raw(&mut raw_map, &format!("type_{i}_{j}"), part)?;
                        }
                    }
                }
            }
            "function_call" => {
                let name = item.get("name").and_then(Value::as_str).unwrap_or_default();
                if name == WEB_SEARCH_TOOL_NAME {
                    web_search_events.push(WebSearchEvent {
                        id: item.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                        status: item.get("status").and_then(Value::as_str).map(str::to_string),
                    });
                    continue;
                }
                tool_calls.push(ToolCall {
                    id: item.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    call_id: item.get("call_id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments: item.get("arguments").and_then(Value::as_str).unwrap_or_default().to_string(),
                    call_type: "function".to_string(),
                });
            }
            "custom_tool_call" => {
                tool_calls.push(ToolCall {
                    id: item.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    call_id: item.get("call_id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    name: item.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    arguments: item.get("input").and_then(Value::as_str).unwrap_or_default().to_string(),
                    call_type: "custom".to_string(),
                });
            }
            "web_search_call" => {
                web_search_events.push(WebSearchEvent {
                    id: item.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    status: item.get("status").and_then(Value::as_str).map(str::to_string),
                });
            }
            "reasoning" => {
                // Informational only; does not gate control flow.
            }
            _ => {
                insert_raw(&mut raw_map, &format!("item_{i}"), item)?;
            }
        }
    }

    let turn = AssistantTurn {
        content: content_parts.join(""),
        tool_calls,
        usage: Some(raw.usage.unwrap_or_default().into()),
        raw: raw_map,
    };

    Ok(ParsedResponse { turn, web_search_events })
}

fn insert_raw(map: &mut serde_json::Map<String, Value>, key: &str, value: &Value) -> Result<(), LlmError> {
    let encoded = serde_json::to_value(value)
        .map_err(|err| LlmError::Protocol(format!("failed to preserve raw item {key}: {err}")))?;
    map.insert(key.to_string(), encoded);
    Ok(())
}
