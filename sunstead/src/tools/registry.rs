//! Explicit tool registry.
//!
//! Tools are typed callables keyed by name; agents receive a named subset
//! rather than inheriting methods. Failures are values, not errors, so a
//! reasoner can observe them and continue.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

/// Result of one tool call, rendered to the reasoner as
/// `{"ok":true,"value":...}` or `{"ok":false,"reason":"..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Ok(Value),
    Failed(String),
}

impl ToolOutcome {
    pub fn ok(value: Value) -> Self {
        Self::Ok(value)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Ok(value) => json!({ "ok": true, "value": value }),
            Self::Failed(reason) => json!({ "ok": false, "reason": reason }),
        }
    }

    /// Stable textual rendering handed to reasoners.
    pub fn render(&self) -> String {
        self.to_json().to_string()
    }
}

/// A typed callable with a stable name and a one-line description used in
/// reasoner prompts. Tools must be deterministic given identical inputs and
/// backing data.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn call(&self, args: &Value) -> ToolOutcome;
}

/// Name → tool mapping. BTreeMap keeps listings deterministic.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The subset an agent role is permitted to use. Unknown names are
    /// skipped; role definitions are validated by tests, not at runtime.
    pub fn subset(&self, names: &[&str]) -> ToolRegistry {
        let tools = names
            .iter()
            .filter_map(|name| self.tools.get(name).map(|t| (t.name(), t.clone())))
            .collect();
        ToolRegistry { tools }
    }

    /// Bullet list for the reasoner system prompt.
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn call(&self, name: &str, args: &Value) -> ToolOutcome {
        match self.tools.get(name) {
            Some(tool) => tool.call(args).await,
            None => ToolOutcome::failed(format!("Unknown tool '{name}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "Echoes its arguments"
        }
        async fn call(&self, args: &Value) -> ToolOutcome {
            ToolOutcome::ok(args.clone())
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let outcome = registry.call("echo", &json!({"a": 1})).await;
        assert_eq!(outcome, ToolOutcome::Ok(json!({"a": 1})));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failed_outcome_not_an_error() {
        let registry = ToolRegistry::new();
        let outcome = registry.call("nope", &json!({})).await;
        assert!(!outcome.is_ok());
        assert!(outcome.render().contains("Unknown tool"));
    }

    #[test]
    fn subset_keeps_only_named_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let subset = registry.subset(&["echo", "missing"]);
        assert_eq!(subset.names(), vec!["echo"]);
    }

    #[test]
    fn outcome_rendering_shapes() {
        let ok = ToolOutcome::ok(json!(42));
        assert_eq!(ok.to_json(), json!({"ok": true, "value": 42}));

        let failed = ToolOutcome::failed("no telemetry");
        assert_eq!(failed.to_json(), json!({"ok": false, "reason": "no telemetry"}));
    }
}
