//! HTTP client for the provider's Responses endpoint (§4.4, §6).
//!
//! The Runner depends only on the [`Provider`] trait, not on this
//! implementation — a fake provider can be substituted in tests.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::message::{Message, PromptRequest, ResponseFormat, Role, ToolChoice, ToolDef, ToolDefKind};
use crate::response::RawResponse;

/// One `function_call_output` item sent on continuation (§6).
#[derive(Debug, Clone)]
pub struct FunctionCallOutput {
    pub call_id: String,
    pub output: String,
}

/// Reasoning-class models omit `temperature` from the create request
/// (§4.4). Prefix list mirrors `convoy_config::ProviderConfig::is_reasoning_model`.
pub fn is_reasoning_model(model: &str) -> bool {
    const REASONING_PREFIXES: &[&str] = &["o1", "o3", "o4", "gpt-5"];
    REASONING_PREFIXES.iter().any(|prefix| model.starts_with(prefix))
}

/// Narrow interface the Agent Runner depends on. Implementations own the
/// transport and response-chaining wire details; the Runner only threads
/// `previous_response_id` values.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create(&self, request: &PromptRequest) -> Result<RawResponse, LlmError>;

    async fn continue_response(
        &self,
        model: &str,
        previous_response_id: &str,
        outputs: &[FunctionCallOutput],
    ) -> Result<RawResponse, LlmError>;
}

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub max_retries: u32,
}

/// `reqwest`-backed implementation of [`Provider`]. Retries 429s with
/// exponential backoff and jitter before surfacing `LlmError::RateLimited`
/// (§7).
#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, config })
    }

    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut builder = self
            .client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json");
        if let Some(org) = &self.config.organization_id {
            builder = builder.header("OpenAI-Organization", org);
        }
        if let Some(project) = &self.config.project_id {
            builder = builder.header("OpenAI-Project", project);
        }
        builder
    }

    async fn send_with_retry(&self, body: Value) -> Result<RawResponse, LlmError> {
        let mut delay = Duration::from_millis(250);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .build_request(reqwest::Method::POST, "responses")
                .json(&body)
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.config.max_retries {
                    return Err(LlmError::RateLimited { attempts: attempt });
                }
                let jitter_ms = rand::thread_rng().gen_range(0..100);
                warn!(attempt, ?delay, "rate limited, backing off");
                tokio::time::sleep(delay + Duration::from_millis(jitter_ms)).await;
                delay = (delay * 2).min(Duration::from_secs(30));
                continue;
            }

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Protocol(format!("http {status}: {text}")));
            }

            let raw: RawResponse = response
                .json()
                .await
                .map_err(|err| LlmError::Protocol(format!("malformed response body: {err}")))?;
            debug!(response_id = %raw.id, "provider response received");
            return Ok(raw);
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn create(&self, request: &PromptRequest) -> Result<RawResponse, LlmError> {
        let mut body = json!({
            "model": request.model,
            "input": messages_to_input(&request.messages),
            "store": true,
        });
        let map = body.as_object_mut().expect("object literal");

        if !request.tools.is_empty() {
            map.insert("tools".to_string(), tools_to_json(&request.tools));
        }
        if let Some(format) = &request.response_format {
            map.insert("text".to_string(), response_format_to_json(format));
        }
        if let Some(choice) = &request.tool_choice {
            map.insert("tool_choice".to_string(), tool_choice_to_json(choice));
        }

        let sampling = &request.sampling;
        if sampling.max_output_tokens.unwrap_or(0) != 0 {
            map.insert("max_output_tokens".to_string(), json!(sampling.max_output_tokens));
        }
        if !is_reasoning_model(&request.model) {
            if let Some(temperature) = sampling.temperature {
                map.insert("temperature".to_string(), json!(temperature));
            }
        }
        if sampling.parallel_tool_calls {
            map.insert("parallel_tool_calls".to_string(), json!(true));
        }
        if let Some(tier) = &sampling.service_tier {
            if tier != "auto" {
                map.insert("service_tier".to_string(), json!(tier));
            }
        }

        self.send_with_retry(body).await
    }

    async fn continue_response(
        &self,
        model: &str,
        previous_response_id: &str,
        outputs: &[FunctionCallOutput],
    ) -> Result<RawResponse, LlmError> {
        let escaped_id = urlencoding::encode(previous_response_id).into_owned();
        let input: Vec<Value> = outputs
            .iter()
            .map(|o| {
                json!({
                    "type": "function_call_output",
                    "call_id": o.call_id,
                    "output": o.output,
                })
            })
            .collect();

        let body = json!({
            "model": model,
            "previous_response_id": escaped_id,
            "input": input,
        });

        self.send_with_retry(body).await
    }
}

fn messages_to_input(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                let mut obj = json!({ "role": role, "content": m.content });
                if let Some(call_id) = &m.call_id {
                    obj["call_id"] = json!(call_id);
                }
                obj
            })
            .collect(),
    )
}

fn tools_to_json(tools: &[ToolDef]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": match t.kind {
                        ToolDefKind::Function => "function",
                        ToolDefKind::Custom => "custom",
                    },
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect(),
    )
}

fn response_format_to_json(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({ "format": { "type": "text" } }),
        ResponseFormat::JsonObject => json!({ "format": { "type": "json_object" } }),
        ResponseFormat::JsonSchema { name, schema } => json!({
            "format": {
                "type": "json_schema",
                "name": name,
                "schema": schema,
            }
        }),
    }
}

fn tool_choice_to_json(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Named(name) => json!({ "type": "function", "name": name }),
    }
}
