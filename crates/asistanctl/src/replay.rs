//! Scripted conversation replay.
//!
//! A script fixes everything outside the core: router and finalizer replies
//! in call order, canned tool results, and the user turns.
//!
//! ```json
//! {
//!   "router": [{"route": "calendar", "tool_plan": ["calendar.create_event"], "...": "..."}],
//!   "fast": ["Tamam efendim, etkinlik eklendi."],
//!   "tools": {"calendar.create_event": {"result": {"id": "e1", "summary": "Parti"}}},
//!   "turns": ["bu akşam sekize parti ekle", "evet"]
//! }
//! ```

use anyhow::{Context, Result};
use asistan_core::error::LlmError;
use asistan_core::llm::ScriptedLlmClient;
use asistan_core::orchestrator::{TurnOrchestrator, TurnOutcome};
use asistan_core::session::SessionStats;
use asistan_core::tools::StaticToolRegistry;
use asistan_core::CoreConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One scripted model reply
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    /// Raw text, returned as-is
    Text(String),
    /// Simulated client failure: "timeout", "connection" or anything else
    Failure { error: String },
    /// JSON value, returned serialized (router decisions)
    Json(Value),
}

impl ScriptedReply {
    fn into_response(self) -> Result<String, LlmError> {
        match self {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Json(value) => Ok(value.to_string()),
            ScriptedReply::Failure { error } => Err(match error.as_str() {
                "timeout" => LlmError::Timeout(0),
                "connection" => LlmError::Connection("scripted".to_string()),
                other => LlmError::InvalidResponse(other.to_string()),
            }),
        }
    }
}

/// Canned tool behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ToolFixture {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub router: Vec<ScriptedReply>,
    #[serde(default)]
    pub fast: Vec<ScriptedReply>,
    /// Enables the quality tier when present
    #[serde(default)]
    pub quality: Option<Vec<ScriptedReply>>,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolFixture>,
    pub turns: Vec<String>,
}

impl Script {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Invalid replay script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Everything a replay produced
#[derive(Debug, Serialize)]
pub struct Transcript {
    pub turns: Vec<ReplayTurn>,
    pub stats: SessionStats,
    pub tool_calls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplayTurn {
    pub user: String,
    pub mode_after: String,
    #[serde(flatten)]
    pub outcome: TurnOutcome,
}

fn scripted_client(name: &str, replies: Vec<ScriptedReply>) -> ScriptedLlmClient {
    let client = ScriptedLlmClient::new(name);
    for reply in replies {
        client.push(reply.into_response());
    }
    client
}

fn registry(fixtures: BTreeMap<String, ToolFixture>) -> StaticToolRegistry {
    fixtures
        .into_iter()
        .fold(StaticToolRegistry::new(), |registry, (name, fixture)| match fixture.error {
            Some(error) => registry.with_error(&name, &error),
            None => registry.with_result(&name, fixture.result),
        })
}

/// Run every turn of `script` through a fresh session.
pub fn replay(script: Script, config: CoreConfig) -> Transcript {
    let tools = Arc::new(registry(script.tools));
    let mut orchestrator = TurnOrchestrator::new(
        config,
        Arc::new(scripted_client("router", script.router)),
        Arc::new(scripted_client("fast", script.fast)),
        tools.clone(),
    );
    if let Some(quality) = script.quality {
        orchestrator = orchestrator.with_quality(Arc::new(scripted_client("quality", quality)));
    }

    let mut session = orchestrator.new_session();
    let mut turns = Vec::with_capacity(script.turns.len());
    for user in script.turns {
        let outcome = orchestrator.run_turn(&mut session, &user);
        turns.push(ReplayTurn {
            user,
            mode_after: session.dialog.mode().to_string(),
            outcome,
        });
    }

    info!(turns = turns.len(), calls = tools.calls().len(), "replay finished");
    Transcript {
        turns,
        stats: session.stats.clone(),
        tool_calls: tools.called_tools(),
    }
}

/// `asistanctl replay`
pub fn run(path: &Path, config: CoreConfig, json: bool) -> Result<()> {
    let script = Script::load(path)?;
    let transcript = replay(script, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    for turn in &transcript.turns {
        println!("> {}", turn.user);
        println!("< {}", turn.outcome.reply);
        let mut notes = vec![format!("{:?}", turn.outcome.kind), turn.mode_after.clone()];
        if let Some(tier) = &turn.outcome.tier {
            notes.push(format!("tier={}", tier.reason));
        }
        for result in &turn.outcome.tool_results {
            let status = if result.success { "ok" } else { "hata" };
            notes.push(format!("{}:{}", result.tool, status));
        }
        if !turn.outcome.plan_errors.is_empty() {
            notes.push(format!("plan={}", turn.outcome.plan_errors.join(",")));
        }
        println!("  [{}]", notes.join(" "));
        println!();
    }

    let stats = &transcript.stats;
    println!(
        "turns={} router_valid_before={:.0}% router_failures={} fast={} quality={}",
        stats.turns,
        stats.valid_before_rate() * 100.0,
        stats.router_failures,
        stats.tier.fast,
        stats.tier.quality
    );
    Ok(())
}
