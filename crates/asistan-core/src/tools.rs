//! Tool boundary.
//!
//! The core never talks to Calendar/Gmail itself. It sees tools through the
//! [`ToolRegistry`] trait: a flat namespace of dotted names and one `call`.
//!
//! Production hosts wrap their API clients in a registry. Tests and the replay
//! CLI use [`StaticToolRegistry`], which returns canned results and records
//! every call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    #[serde(default)]
    pub raw_result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ToolResult {
    pub fn ok(tool: impl Into<String>, raw_result: Value) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            raw_result,
            error: None,
            elapsed_ms: 0,
        }
    }

    pub fn failed(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            raw_result: Value::Null,
            error: Some(error.into()),
            elapsed_ms: 0,
        }
    }
}

/// External tool registry.
pub trait ToolRegistry: Send + Sync {
    /// Invoke a tool by dotted name. Failures are reported in the result.
    fn call(&self, name: &str, params: &Map<String, Value>) -> ToolResult;

    /// All callable tool names
    fn names(&self) -> Vec<String>;
}

/// Parameter filled from a registered entity (e.g. `event_id` <- calendar_event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityParam {
    pub param: String,
    pub entity_type: String,
}

/// What the core needs to know about a tool before calling it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Slots that must be present in params (entity param excluded)
    #[serde(default)]
    pub required_slots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_param: Option<EntityParam>,
    /// Write/destructive tool; needs an explicit "evet" before running
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl ToolSpec {
    pub fn read_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_slots: Vec::new(),
            entity_param: None,
            requires_confirmation: false,
            read_only: true,
        }
    }

    pub fn write(name: impl Into<String>, required: &[&str]) -> Self {
        Self {
            name: name.into(),
            required_slots: required.iter().map(|s| s.to_string()).collect(),
            entity_param: None,
            requires_confirmation: true,
            read_only: false,
        }
    }

    pub fn with_entity(mut self, param: &str, entity_type: &str) -> Self {
        self.entity_param = Some(EntityParam {
            param: param.to_string(),
            entity_type: entity_type.to_string(),
        });
        self
    }
}

/// Specs keyed by tool name. Serialized as a plain list (`[[tools]]` in TOML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCatalog {
    pub tools: Vec<ToolSpec>,
}

impl ToolCatalog {
    /// Calendar and Gmail tools of the assistant
    pub fn standard() -> Self {
        Self {
            tools: vec![
                ToolSpec::read_only("time.now"),
                ToolSpec::read_only("system.time"),
                ToolSpec::read_only("system.status"),
                ToolSpec::read_only("calendar.list_events"),
                ToolSpec::read_only("calendar.find_free_slots"),
                ToolSpec::write("calendar.create_event", &["title"]),
                ToolSpec::write("calendar.update_event", &[])
                    .with_entity("event_id", "calendar_event"),
                ToolSpec::write("calendar.delete_event", &[])
                    .with_entity("event_id", "calendar_event"),
                ToolSpec::read_only("gmail.list_messages"),
                ToolSpec::read_only("gmail.search"),
                ToolSpec::read_only("gmail.get_message").with_entity("message_id", "email"),
                ToolSpec::write("gmail.send", &["to", "body"]),
                ToolSpec::write("gmail.reply", &["body"]).with_entity("message_id", "email"),
                ToolSpec::write("gmail.forward", &["to"]).with_entity("message_id", "email"),
                ToolSpec::write("gmail.delete", &[]).with_entity("message_id", "email"),
                ToolSpec {
                    requires_confirmation: false,
                    ..ToolSpec::write("gmail.mark_read", &[]).with_entity("message_id", "email")
                },
                ToolSpec::read_only("wiki.search"),
            ],
        }
    }

    /// Look up a spec. Unknown tools get a read-only spec with no requirements.
    pub fn spec(&self, name: &str) -> ToolSpec {
        self.tools
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .unwrap_or_else(|| ToolSpec::read_only(name))
    }
}

/// One planned invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    pub tool: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl PlannedCall {
    pub fn new(tool: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            params,
        }
    }
}

/// Registry with canned results per tool. Records every call in order.
#[derive(Debug, Default)]
pub struct StaticToolRegistry {
    results: HashMap<String, ToolResult>,
    calls: Mutex<Vec<PlannedCall>>,
}

impl StaticToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool that succeeds with `raw_result`
    pub fn with_result(mut self, name: &str, raw_result: Value) -> Self {
        self.results
            .insert(name.to_string(), ToolResult::ok(name, raw_result));
        self
    }

    /// Register a tool that fails with `error`
    pub fn with_error(mut self, name: &str, error: &str) -> Self {
        self.results
            .insert(name.to_string(), ToolResult::failed(name, error));
        self
    }

    /// Calls made so far
    pub fn calls(&self) -> Vec<PlannedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Names of tools called so far, in order
    pub fn called_tools(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.tool).collect()
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn call(&self, name: &str, params: &Map<String, Value>) -> ToolResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(PlannedCall::new(name, params.clone()));
        }
        self.results
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResult::failed(name, format!("tool not found: {}", name)))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.results.keys().cloned().collect();
        names.sort();
        names
    }
}
