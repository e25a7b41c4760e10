use std::collections::HashMap;
use std::sync::Arc;

use crate::key::ToolKey;
use crate::tool::Tool;

/// Mapping from `ToolKey` to a `Tool` (§4.2). Registration is additive and
/// idempotent; the last registration under a key wins. Does not clone
/// tools — callers must treat tool instances as reusable across sessions.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolKey, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.key().clone(), tool);
    }

    pub fn get(&self, key: &ToolKey) -> Option<Arc<dyn Tool>> {
        self.tools.get(key).cloned()
    }

    pub fn contains(&self, key: &ToolKey) -> bool {
        self.tools.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ToolKey> {
        self.tools.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolError;
    use async_trait::async_trait;

    struct DummyTool {
        key: ToolKey,
        output: String,
    }

    #[async_trait]
    impl Tool for DummyTool {
        fn key(&self) -> &ToolKey {
            &self.key
        }

        async fn run(&self, _arguments: &str) -> Result<String, ToolError> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn empty_registry_has_no_tools() {
        let registry = ToolRegistry::new();
        assert!(registry.get(&ToolKey::new("anything")).is_none());
    }

    #[test]
    fn register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool { key: ToolKey::new("weather"), output: "ok".into() }));
        assert!(registry.get(&ToolKey::new("weather")).is_some());
        assert!(registry.get(&ToolKey::new("other")).is_none());
    }

    #[test]
    fn last_registration_under_a_key_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool { key: ToolKey::new("dup"), output: "first".into() }));
        registry.register(Arc::new(DummyTool { key: ToolKey::new("dup"), output: "second".into() }));

        let tool = registry.get(&ToolKey::new("dup")).unwrap();
        assert_eq!(tool.key().as_str(), "dup");
    }

    #[tokio::test]
    async fn run_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool { key: ToolKey::new("runner"), output: "ran runner".into() }));

        let tool = registry.get(&ToolKey::new("runner")).unwrap();
        let result = tool.run("{}").await.unwrap();
        assert_eq!(result, "ran runner");
    }
}
