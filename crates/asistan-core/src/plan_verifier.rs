//! Plan verification before any tool runs.
//!
//! Pure and read-only. Every rule is evaluated independently so the caller sees
//! all problems at once; any violation means "ask, don't execute".

use crate::decision::{CalendarIntent, GmailIntent, Route, RouterDecision};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("static regex")
});

/// Slots that anchor a calendar write in time
const TEMPORAL_SLOTS: &[&str] = &["date", "time", "window_hint"];

/// Slots that name a mail recipient
const RECIPIENT_SLOTS: &[&str] = &["to", "recipient"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Tools a smalltalk turn may still use (clock/time)
    #[serde(default = "default_smalltalk_tools")]
    pub smalltalk_allowed_tools: Vec<String>,
}

fn default_smalltalk_tools() -> Vec<String> {
    vec!["time.now".to_string(), "system.time".to_string()]
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            smalltalk_allowed_tools: default_smalltalk_tools(),
        }
    }
}

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum PlanViolation {
    UnknownTool { name: String },
    SmalltalkWithTools,
    CalendarWriteNoTemporal,
    RouteIntentMismatch,
    GmailSendNoRecipient,
}

impl std::fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "unknown_tool:{}", name),
            Self::SmalltalkWithTools => write!(f, "smalltalk_with_tools"),
            Self::CalendarWriteNoTemporal => write!(f, "calendar_write_no_temporal"),
            Self::RouteIntentMismatch => write!(f, "route_intent_mismatch"),
            Self::GmailSendNoRecipient => write!(f, "gmail_send_no_recipient"),
        }
    }
}

impl PlanViolation {
    /// Turkish clarification question for this violation
    pub fn clarification(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => {
                "Bu isteği hangi işlemle yapacağımdan emin olamadım efendim. Biraz daha açar mısınız?"
            }
            Self::SmalltalkWithTools => {
                "Sohbet mi etmek istersiniz, yoksa bir işlem yapmamı mı istersiniz efendim?"
            }
            Self::CalendarWriteNoTemporal => {
                "Ne zaman için ayarlayayım efendim? Tarih ya da saat belirtir misiniz?"
            }
            Self::RouteIntentMismatch => {
                "Takvimle mi yoksa e-postalarla mı ilgili bir işlem istediğinizi netleştirir misiniz efendim?"
            }
            Self::GmailSendNoRecipient => "E-postayı kime göndereyim efendim?",
        }
    }
}

/// Verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanVerification {
    pub ok: bool,
    pub violations: Vec<PlanViolation>,
}

impl PlanVerification {
    /// String codes ("unknown_tool:x", "smalltalk_with_tools", ...)
    pub fn codes(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }

    pub fn has(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.to_string() == code)
    }
}

/// Verify a decision against the tool registry and semantic rules.
pub fn verify_plan(
    decision: &RouterDecision,
    user_text: &str,
    valid_tool_names: &[String],
) -> PlanVerification {
    verify_plan_with(decision, user_text, valid_tool_names, &PlanConfig::default())
}

/// [`verify_plan`] with an explicit config.
pub fn verify_plan_with(
    decision: &RouterDecision,
    user_text: &str,
    valid_tool_names: &[String],
    config: &PlanConfig,
) -> PlanVerification {
    let mut violations = Vec::new();

    for tool in &decision.tool_plan {
        if !valid_tool_names.iter().any(|n| n == tool) {
            violations.push(PlanViolation::UnknownTool { name: tool.clone() });
        }
    }

    if decision.route == Route::Smalltalk
        && decision
            .tool_plan
            .iter()
            .any(|t| !config.smalltalk_allowed_tools.iter().any(|a| a == t))
    {
        violations.push(PlanViolation::SmalltalkWithTools);
    }

    if matches!(decision.calendar_intent, CalendarIntent::Create | CalendarIntent::Modify)
        && !TEMPORAL_SLOTS.iter().any(|s| decision.has_slot(s))
    {
        violations.push(PlanViolation::CalendarWriteNoTemporal);
    }

    let mismatch = match decision.route {
        Route::Gmail => decision.calendar_intent != CalendarIntent::None,
        Route::Calendar => decision.gmail_intent != GmailIntent::None,
        _ => false,
    };
    if mismatch {
        violations.push(PlanViolation::RouteIntentMismatch);
    }

    if decision.gmail_intent == GmailIntent::Send
        && !RECIPIENT_SLOTS.iter().any(|s| decision.has_slot(s))
        && !EMAIL_ADDRESS.is_match(user_text)
    {
        violations.push(PlanViolation::GmailSendNoRecipient);
    }

    PlanVerification {
        ok: violations.is_empty(),
        violations,
    }
}
