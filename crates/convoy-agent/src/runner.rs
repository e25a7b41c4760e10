//! Drives the request/tool-call/continuation loop against the provider's
//! Responses endpoint (§4.4 — Agent Runner, the heart of the synchronous
//! path).
//!
//! State machine: `Start -> Create -> Inspect -> {Done, Tools -> Continue
//! -> Inspect}`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use convoy_llm::{
    parse_response, FunctionCallOutput, PromptRequest, Provider, RawResponse, TokenUsage,
};
use convoy_tools::{ToolBudget, ToolKey, ToolRegistry};

use crate::error::AgentError;

/// Default safety cap on `Inspect` cycles (§4.4). Callers driving
/// constrained engines may tighten this to 6.
pub const DEFAULT_MAX_TURNS: u32 = 32;

/// Outcome of a completed agent run: the model's final text plus the usage
/// counts from the response that produced it.
#[derive(Debug, Clone, Default)]
pub struct AgentRunResult {
    pub content: String,
    pub usage: TokenUsage,
}

/// Drives one top-to-bottom execution of the Runner for a single
/// `PromptRequest` (§4.4). Holds no per-session state itself — the Tool
/// Registry is an immutable collaborator (design §9) and the
/// `ToolBudget` is supplied fresh by the caller for each run.
pub struct AgentRunner {
    provider: Arc<dyn Provider>,
    max_turns: u32,
}

impl AgentRunner {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider, max_turns: DEFAULT_MAX_TURNS }
    }

    pub fn with_max_turns(provider: Arc<dyn Provider>, max_turns: u32) -> Self {
        Self { provider, max_turns }
    }

    pub async fn run(
        &self,
        request: &PromptRequest,
        registry: &ToolRegistry,
        budget: &mut ToolBudget,
    ) -> Result<AgentRunResult, AgentError> {
        if request.messages.is_empty() {
            return Err(AgentError::Validation("PromptRequest has no messages".to_string()));
        }

        let mut raw: RawResponse = self.provider.create(request).await?;
        let mut turns: u32 = 0;

        loop {
            turns += 1;
            if turns > self.max_turns {
                return Err(AgentError::MaxTurnsExceeded(self.max_turns));
            }

            let parsed = parse_response(&raw)?;
            debug!(turn = turns, tool_calls = parsed.turn.tool_calls.len(), "inspected response");

            if parsed.turn.is_done() {
                info!(turn = turns, "agent run complete");
                return Ok(AgentRunResult {
                    content: parsed.turn.content,
                    usage: parsed.turn.usage.unwrap_or_default(),
                });
            }

            // Tools are executed sequentially in the order the model
            // emitted them, even if `parallel_tool_calls` was requested —
            // parallelism, if ever introduced, belongs at the HTTP layer
            // (§4.4). Every output must exist before `Continue` is posted;
            // the provider rejects partial continuations.
            let mut outputs = Vec::with_capacity(parsed.turn.tool_calls.len());
            for call in &parsed.turn.tool_calls {
                let key = ToolKey::new(call.name.clone());

                let tool = registry
                    .get(&key)
                    .ok_or_else(|| AgentError::NoSuchTool(call.name.clone()))?;

                if !budget.has_credits(&key) {
                    warn!(tool = %key, "tool exhausted before dispatch");
                    return Err(AgentError::ToolExhausted(key));
                }

                let output = tool
                    .run(&call.arguments)
                    .await
                    .map_err(|source| AgentError::ToolFailed { name: call.name.clone(), source })?;

                budget.increment(&key);

                outputs.push(FunctionCallOutput { call_id: call.call_id.clone(), output });
            }

            raw = self
                .provider
                .continue_response(&request.model, &raw.id, &outputs)
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convoy_llm::{LlmError, Message};
    use convoy_tools::{Tool, ToolConstraints, ToolError, ToolLimit};
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<RawResponse>>,
        continue_calls: Mutex<Vec<(String, Vec<FunctionCallOutput>)>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<serde_json::Value>) -> Self {
            let parsed = responses
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect();
            Self { responses: Mutex::new(parsed), continue_calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn create(&self, _request: &PromptRequest) -> Result<RawResponse, LlmError> {
            Ok(self.responses.lock().unwrap().remove(0))
        }

        async fn continue_response(
            &self,
            _model: &str,
            previous_response_id: &str,
            outputs: &[FunctionCallOutput],
        ) -> Result<RawResponse, LlmError> {
            self.continue_calls
                .lock()
                .unwrap()
                .push((previous_response_id.to_string(), outputs.to_vec()));
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    struct WeatherTool {
        key: ToolKey,
    }

    #[async_trait]
    impl Tool for WeatherTool {
        fn key(&self) -> &ToolKey {
            &self.key
        }

        async fn run(&self, _arguments: &str) -> Result<String, ToolError> {
            Ok("{\"temp\":22}".to_string())
        }
    }

    fn text_response(id: &str, text: &str) -> serde_json::Value {
        json!({
            "id": id,
            "output": [{"type": "message", "content": [{"type": "output_text", "text": text}]}],
            "usage": {"input_tokens": 2, "output_tokens": 1, "total_tokens": 3}
        })
    }

    fn tool_call_response(id: &str, call_id: &str, name: &str, arguments: &str) -> serde_json::Value {
        json!({
            "id": id,
            "output": [{"type": "function_call", "id": "fc_internal", "call_id": call_id, "name": name, "arguments": arguments}]
        })
    }

    #[tokio::test]
    async fn single_turn_text_issues_zero_continue_calls() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("resp_1", "Hi")]));
        let runner = AgentRunner::new(provider.clone());
        let registry = ToolRegistry::new();
        let mut budget = ToolBudget::new(ToolConstraints::new());

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("Hello")]);
        let result = runner.run(&request, &registry, &mut budget).await.unwrap();

        assert_eq!(result.content, "Hi");
        assert_eq!(result.usage.total_tokens, 3);
        assert!(provider.continue_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_tool_call_then_final_preserves_call_id() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("resp_1", "c1", "weather", "{\"city\":\"Paris\"}"),
            text_response("resp_2", "22\u{b0}C in Paris."),
        ]));
        let runner = AgentRunner::new(provider.clone());

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(WeatherTool { key: ToolKey::new("weather") }));

        let constraints = ToolConstraints::new().with_limit(ToolKey::new("weather"), ToolLimit { min_calls: 0, max_calls: 0 });
        let mut budget = ToolBudget::new(constraints);

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("Weather in Paris?")]);
        let result = runner.run(&request, &registry, &mut budget).await.unwrap();

        assert_eq!(result.content, "22\u{b0}C in Paris.");

        let calls = provider.continue_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "resp_1");
        assert_eq!(calls[0].1[0].call_id, "c1");
        assert_eq!(calls[0].1[0].output, "{\"temp\":22}");
    }

    #[tokio::test]
    async fn unregistered_tool_fails_run() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("resp_1", "c1", "mystery", "{}"),
        ]));
        let runner = AgentRunner::new(provider);
        let registry = ToolRegistry::new();
        let mut budget = ToolBudget::new(ToolConstraints::new());

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("hi")]);
        let err = runner.run(&request, &registry, &mut budget).await.unwrap_err();
        assert!(matches!(err, AgentError::NoSuchTool(name) if name == "mystery"));
    }

    #[tokio::test]
    async fn exhausted_tool_fails_before_continue() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response("resp_1", "c1", "weather", "{}"),
        ]));
        let runner = AgentRunner::new(provider.clone());

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(WeatherTool { key: ToolKey::new("weather") }));

        let constraints = ToolConstraints::new().with_limit(ToolKey::new("weather"), ToolLimit { min_calls: 0, max_calls: 1 });
        let mut budget = ToolBudget::new(constraints);
        budget.increment(&ToolKey::new("weather")); // pre-increment to exhaustion

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("weather?")]);
        let err = runner.run(&request, &registry, &mut budget).await.unwrap_err();

        assert!(matches!(err, AgentError::ToolExhausted(key) if key == ToolKey::new("weather")));
        assert!(provider.continue_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn max_turns_exceeded_when_model_never_stops() {
        let mut scripted = Vec::new();
        for i in 0..5 {
            scripted.push(tool_call_response(&format!("resp_{i}"), &format!("c{i}"), "weather", "{}"));
        }
        let provider = Arc::new(ScriptedProvider::new(scripted));
        let runner = AgentRunner::with_max_turns(provider, 3);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(WeatherTool { key: ToolKey::new("weather") }));
        let mut budget = ToolBudget::new(ToolConstraints::new());

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("loop")]);
        let err = runner.run(&request, &registry, &mut budget).await.unwrap_err();
        assert!(matches!(err, AgentError::MaxTurnsExceeded(3)));
    }

    #[tokio::test]
    async fn response_chain_issues_n_plus_one_requests() {
        let n = 3;
        let mut scripted = Vec::new();
        for i in 0..n {
            scripted.push(tool_call_response(&format!("resp_{i}"), &format!("c{i}"), "weather", "{}"));
        }
        scripted.push(text_response(&format!("resp_{n}"), "done"));
        let provider = Arc::new(ScriptedProvider::new(scripted));
        let runner = AgentRunner::new(provider.clone());

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(WeatherTool { key: ToolKey::new("weather") }));
        let mut budget = ToolBudget::new(ToolConstraints::new());

        let request = PromptRequest::new("gpt-5.1", vec![Message::user("go")]);
        let result = runner.run(&request, &registry, &mut budget).await.unwrap();

        assert_eq!(result.content, "done");
        assert_eq!(provider.continue_calls.lock().unwrap().len(), n);
    }
}
