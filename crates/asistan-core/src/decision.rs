//! Typed router decision.
//!
//! Everything downstream of the validator works with these types only. Raw
//! router JSON never leaves `router_validator`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed value set of a router enum field.
pub trait RouterEnum: Sized + Copy + PartialEq + 'static {
    /// Field name in router JSON
    const FIELD: &'static str;
    /// Every member, in declaration order
    const ALL: &'static [Self];

    /// Wire label
    fn as_str(&self) -> &'static str;

    /// Value used when nothing reasonable can be recovered
    fn fallback() -> Self;

    /// Exact lookup by wire label
    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == label)
    }
}

/// Top-level intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Calendar,
    Gmail,
    System,
    Smalltalk,
    Wiki,
    Chat,
    Unknown,
}

impl RouterEnum for Route {
    const FIELD: &'static str = "route";
    const ALL: &'static [Self] = &[
        Route::Calendar,
        Route::Gmail,
        Route::System,
        Route::Smalltalk,
        Route::Wiki,
        Route::Chat,
        Route::Unknown,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Route::Calendar => "calendar",
            Route::Gmail => "gmail",
            Route::System => "system",
            Route::Smalltalk => "smalltalk",
            Route::Wiki => "wiki",
            Route::Chat => "chat",
            Route::Unknown => "unknown",
        }
    }

    fn fallback() -> Self {
        Route::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarIntent {
    Create,
    Modify,
    Cancel,
    Delete,
    Query,
    None,
}

impl RouterEnum for CalendarIntent {
    const FIELD: &'static str = "calendar_intent";
    const ALL: &'static [Self] = &[
        CalendarIntent::Create,
        CalendarIntent::Modify,
        CalendarIntent::Cancel,
        CalendarIntent::Delete,
        CalendarIntent::Query,
        CalendarIntent::None,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            CalendarIntent::Create => "create",
            CalendarIntent::Modify => "modify",
            CalendarIntent::Cancel => "cancel",
            CalendarIntent::Delete => "delete",
            CalendarIntent::Query => "query",
            CalendarIntent::None => "none",
        }
    }

    fn fallback() -> Self {
        CalendarIntent::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GmailIntent {
    List,
    Search,
    Read,
    Send,
    Reply,
    Forward,
    Delete,
    MarkRead,
    None,
}

impl RouterEnum for GmailIntent {
    const FIELD: &'static str = "gmail_intent";
    const ALL: &'static [Self] = &[
        GmailIntent::List,
        GmailIntent::Search,
        GmailIntent::Read,
        GmailIntent::Send,
        GmailIntent::Reply,
        GmailIntent::Forward,
        GmailIntent::Delete,
        GmailIntent::MarkRead,
        GmailIntent::None,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            GmailIntent::List => "list",
            GmailIntent::Search => "search",
            GmailIntent::Read => "read",
            GmailIntent::Send => "send",
            GmailIntent::Reply => "reply",
            GmailIntent::Forward => "forward",
            GmailIntent::Delete => "delete",
            GmailIntent::MarkRead => "mark_read",
            GmailIntent::None => "none",
        }
    }

    fn fallback() -> Self {
        GmailIntent::None
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for CalendarIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for GmailIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Repaired router output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterDecision {
    pub route: Route,
    pub calendar_intent: CalendarIntent,
    pub gmail_intent: GmailIntent,
    /// Slot values keyed by slot name (date, time, title, ...)
    #[serde(default)]
    pub slots: BTreeMap<String, serde_json::Value>,
    pub confidence: f64,
    /// Ordered tool names; always a list after repair
    #[serde(default)]
    pub tool_plan: Vec<String>,
    #[serde(default)]
    pub assistant_reply: String,
    #[serde(default)]
    pub ask_user: bool,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub confirmation_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_update: Option<String>,
    #[serde(default)]
    pub reasoning_summary: Vec<String>,
}

impl Default for RouterDecision {
    fn default() -> Self {
        Self {
            route: Route::Unknown,
            calendar_intent: CalendarIntent::None,
            gmail_intent: GmailIntent::None,
            slots: BTreeMap::new(),
            confidence: 0.0,
            tool_plan: Vec::new(),
            assistant_reply: String::new(),
            ask_user: false,
            question: String::new(),
            requires_confirmation: false,
            confirmation_prompt: String::new(),
            memory_update: None,
            reasoning_summary: Vec::new(),
        }
    }
}

impl RouterDecision {
    /// Intent label of the active domain ("create", "reply", ...), or "none".
    pub fn intent_label(&self) -> &'static str {
        match self.route {
            Route::Calendar => self.calendar_intent.as_str(),
            Route::Gmail => self.gmail_intent.as_str(),
            _ if self.calendar_intent != CalendarIntent::None => self.calendar_intent.as_str(),
            _ => self.gmail_intent.as_str(),
        }
    }

    /// Check whether a slot is present with a non-empty value
    pub fn has_slot(&self, name: &str) -> bool {
        match self.slots.get(name) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }
}

/// Outcome of a repair pass; `is_valid_before` is the router health signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid_before: bool,
    pub fields_repaired: Vec<String>,
    pub missing_required: Vec<String>,
}
