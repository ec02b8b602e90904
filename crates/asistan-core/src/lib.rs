//! Turn orchestration core for a Turkish personal assistant.
//!
//! Takes raw router output, tool results and per-session dialog state and
//! turns them into one validated Turkish reply per turn. LLM backends and the
//! Calendar/Gmail tools live behind the [`LlmClient`] and [`ToolRegistry`]
//! traits.

pub mod config;
pub mod decision;
pub mod dialog;
pub mod entities;
pub mod error;
pub mod intent_rules;
pub mod llm;
pub mod orchestrator;
pub mod plan_verifier;
pub mod prompts;
pub mod redact;
pub mod router_validator;
pub mod sanitizer;
pub mod session;
pub mod text;
pub mod tier;
pub mod tools;

pub use config::CoreConfig;
pub use decision::{CalendarIntent, GmailIntent, Route, RouterDecision, ValidationReport};
pub use dialog::{DialogMode, DialogStateMachine, DisambiguationRequest, DisambiguationResult};
pub use entities::{EntitySlot, EntitySlotRegistry};
pub use error::{ConfigError, DialogError, LlmError, RouterError};
pub use llm::{ChatMessage, LlmClient, ScriptedLlmClient};
pub use orchestrator::{TurnKind, TurnOrchestrator, TurnOutcome};
pub use plan_verifier::{verify_plan, PlanVerification, PlanViolation};
pub use sanitizer::{FinalizationSanitizer, HeuristicLanguageGuard, LanguageGuard};
pub use session::{Session, SessionStats};
pub use tier::{decide_tier, score_writing_need, TierConfig, TierDecision, TierDecisionEngine, TierReason};
pub use tools::{StaticToolRegistry, ToolRegistry, ToolResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
