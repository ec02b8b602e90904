//! Per-turn pipeline.
//!
//! ```text
//! turn++ / expire_stale
//!   ├─ pending dialog? ── resolve ──▶ run held action | re-ask | cancel
//!   └─ router LLM ─▶ repair ─▶ verify plan ─▶ slot check
//!        ─▶ tools (confirmation / disambiguation may park the plan)
//!        ─▶ tier ─▶ finalizer ─▶ language guard ─▶ reply
//! ```
//!
//! Every path ends in a Turkish reply. Only the host's own panics escape.

use crate::config::CoreConfig;
use crate::decision::{GmailIntent, Route, RouterDecision, ValidationReport};
use crate::dialog::{
    default_confirmation_prompt, ConfirmationOutcome, DialogMode, DisambiguationOutcome, HeldAction,
};
use crate::entities::{entity_type_for_tool, extract_entities, item_slots, EntitySlot};
use crate::error::{LlmError, RouterError};
use crate::intent_rules::detect_gmail_intent;
use crate::llm::{ChatMessage, LlmClient};
use crate::plan_verifier::verify_plan_with;
use crate::prompts::{build_finalizer_messages, build_repair_messages, build_router_messages};
use crate::router_validator::{repair_text, DEFAULT_CLARIFY_QUESTION};
use crate::sanitizer::{fallback_template, log_failure, FinalizationSanitizer, LanguageGuard};
use crate::session::Session;
use crate::tier::{TierDecision, TierDecisionEngine, TierStats};
use crate::tools::{PlannedCall, ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reply when no model could be reached
pub const SERVICE_UNAVAILABLE: &str =
    "Şu an isteğinizi işleyemiyorum efendim, lütfen birazdan tekrar deneyin.";

/// Turkish labels for slot names in missing-slot questions
const SLOT_LABELS: &[(&str, &str)] = &[
    ("title", "etkinlik başlığı"),
    ("date", "tarih"),
    ("time", "saat"),
    ("window_hint", "zaman aralığı"),
    ("duration", "süre"),
    ("location", "yer"),
    ("to", "alıcı"),
    ("recipient", "alıcı"),
    ("subject", "konu"),
    ("body", "mesaj içeriği"),
    ("query", "arama ifadesi"),
    ("event_id", "hangi etkinlik olduğu"),
    ("message_id", "hangi e-posta olduğu"),
];

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Answered,
    Clarification,
    ConfirmationRequested,
    DisambiguationRequested,
    Cancelled,
    Failed,
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub kind: TurnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierDecision>,
    pub tool_results: Vec<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub plan_errors: Vec<String>,
    pub turn: u64,
}

impl TurnOutcome {
    fn new(turn: u64, kind: TurnKind, reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            kind,
            tier: None,
            tool_results: Vec::new(),
            validation: None,
            plan_errors: Vec::new(),
            turn,
        }
    }

    fn with_results(mut self, tool_results: Vec<ToolResult>) -> Self {
        self.tool_results = tool_results;
        self
    }

    fn with_validation(mut self, validation: Option<ValidationReport>) -> Self {
        self.validation = validation;
        self
    }
}

/// A plan on its way through slot checks, confirmation and execution
struct PlanRun {
    route: Route,
    intent: String,
    user_text: String,
    steps: Vec<PlannedCall>,
    /// Tool names as planned, for tier scoring
    planned: Vec<String>,
    requires_confirmation: bool,
    confirmation_prompt: String,
    assistant_reply: String,
    /// User already said "evet" for these steps
    confirmed: bool,
    validation: Option<ValidationReport>,
    memory_update: Option<String>,
}

impl PlanRun {
    fn from_held(action: HeldAction, confirmed: bool) -> Self {
        Self {
            route: action.route,
            intent: action.intent,
            user_text: action.user_text,
            planned: action.steps.iter().map(|s| s.tool.clone()).collect(),
            steps: action.steps,
            requires_confirmation: confirmed,
            confirmation_prompt: String::new(),
            assistant_reply: String::new(),
            confirmed,
            validation: None,
            memory_update: action.memory_update,
        }
    }

    fn held(&self, steps: Vec<PlannedCall>, summary: String) -> HeldAction {
        HeldAction {
            steps,
            route: self.route,
            intent: self.intent.clone(),
            user_text: self.user_text.clone(),
            summary,
            memory_update: self.memory_update.clone(),
        }
    }
}

enum RouterFailure {
    Llm,
    Unusable(RouterError),
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct TurnOrchestrator {
    config: CoreConfig,
    router: Arc<dyn LlmClient>,
    fast: Arc<dyn LlmClient>,
    quality: Option<Arc<dyn LlmClient>>,
    tools: Arc<dyn ToolRegistry>,
    sanitizer: FinalizationSanitizer,
    tier: TierDecisionEngine,
}

impl TurnOrchestrator {
    pub fn new(
        config: CoreConfig,
        router: Arc<dyn LlmClient>,
        fast: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolRegistry>,
    ) -> Self {
        let sanitizer = FinalizationSanitizer::new(
            config.sanitizer.clone(),
            Arc::new(crate::sanitizer::HeuristicLanguageGuard),
        );
        let tier = TierDecisionEngine::new(config.tier.clone());
        Self {
            config,
            router,
            fast,
            quality: None,
            tools,
            sanitizer,
            tier,
        }
    }

    /// Add the quality-tier finalizer
    pub fn with_quality(mut self, quality: Arc<dyn LlmClient>) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Replace the default heuristic language guard
    pub fn with_language_guard(mut self, guard: Arc<dyn LanguageGuard>) -> Self {
        self.sanitizer = FinalizationSanitizer::new(self.config.sanitizer.clone(), guard);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn tier_stats(&self) -> TierStats {
        self.tier.stats()
    }

    /// Fresh session using this orchestrator's config
    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }

    /// Run one user turn against `session`.
    pub fn run_turn(&mut self, session: &mut Session, user_text: &str) -> TurnOutcome {
        let turn = session.advance_turn();
        let expired = session.entities.expire_stale(turn);
        info!(turn, expired, mode = %session.dialog.mode(), "turn started");

        let outcome = match session.dialog.mode() {
            DialogMode::PendingConfirmation => self.resume_confirmation(session, user_text, turn),
            DialogMode::PendingDisambiguation => self.resume_disambiguation(session, user_text, turn),
            DialogMode::Idle => self.route_turn(session, user_text, turn),
        };

        session.push_exchange(user_text, &outcome.reply, self.config.router.history_turns);
        info!(
            turn,
            kind = ?outcome.kind,
            tools = outcome.tool_results.len(),
            mode = %session.dialog.mode(),
            "turn finished"
        );
        outcome
    }

    // ------------------------------------------------------------------------
    // Pending dialog
    // ------------------------------------------------------------------------

    fn resume_confirmation(&mut self, session: &mut Session, user_text: &str, turn: u64) -> TurnOutcome {
        match session.dialog.handle_confirmation_reply(user_text) {
            ConfirmationOutcome::Confirmed(action) => {
                info!(turn, steps = action.steps.len(), "held action confirmed");
                self.run_plan(session, PlanRun::from_held(action, true), turn)
            }
            ConfirmationOutcome::Cancelled { message } => {
                info!(turn, "held action cancelled");
                TurnOutcome::new(turn, TurnKind::Cancelled, message)
            }
            ConfirmationOutcome::Reask { message } => {
                TurnOutcome::new(turn, TurnKind::ConfirmationRequested, message)
            }
            ConfirmationOutcome::Abandoned { message } => {
                warn!(turn, "confirmation abandoned after repeated unclear replies");
                TurnOutcome::new(turn, TurnKind::Cancelled, message)
            }
            ConfirmationOutcome::NotPending => self.route_turn(session, user_text, turn),
        }
    }

    fn resume_disambiguation(&mut self, session: &mut Session, user_text: &str, turn: u64) -> TurnOutcome {
        match session.dialog.handle_disambiguation_reply(user_text) {
            DisambiguationOutcome::Resolved { selected, request } => {
                info!(turn, entity_id = %selected.entity_id, "disambiguation resolved");

                let ttl = session.entities.config().ttl_for(&selected.entity_type);
                let mut chosen = EntitySlot::new(
                    selected.entity_type.clone(),
                    selected.entity_id.clone(),
                    request.source_tool.clone(),
                    turn,
                    ttl,
                );
                chosen.slots = item_slots(&selected.raw);
                session.entities.register(chosen);

                match request.follow_up {
                    Some(mut action) => {
                        for step in &mut action.steps {
                            let spec = self.config.tools.spec(&step.tool);
                            if let Some(param) = spec.entity_param {
                                if param.entity_type == selected.entity_type {
                                    step.params
                                        .insert(param.param, Value::String(selected.entity_id.clone()));
                                }
                            }
                        }
                        self.run_plan(session, PlanRun::from_held(action, false), turn)
                    }
                    None => TurnOutcome::new(
                        turn,
                        TurnKind::Answered,
                        format!("Tamam efendim, '{}' seçildi. Ne yapmamı istersiniz?", selected.label),
                    ),
                }
            }
            DisambiguationOutcome::Cancelled { message } | DisambiguationOutcome::Abandoned { message } => {
                TurnOutcome::new(turn, TurnKind::Cancelled, message)
            }
            DisambiguationOutcome::Reask { message } => {
                TurnOutcome::new(turn, TurnKind::DisambiguationRequested, message)
            }
            DisambiguationOutcome::NotPending => self.route_turn(session, user_text, turn),
        }
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    fn route_turn(&mut self, session: &mut Session, user_text: &str, turn: u64) -> TurnOutcome {
        let tool_names = self.tools.names();
        let history_len = self.config.router.history_turns * 2;
        let history: Vec<ChatMessage> = session
            .history
            .iter()
            .skip(session.history.len().saturating_sub(history_len))
            .cloned()
            .collect();
        let messages = build_router_messages(
            user_text,
            &tool_names,
            &session.entities.to_prompt_block(),
            &session.memory,
            &history,
        );

        let (mut decision, report) = match self.call_router(&messages) {
            Ok(parsed) => parsed,
            Err(RouterFailure::Llm) => {
                session.stats.router_failures += 1;
                return TurnOutcome::new(turn, TurnKind::Failed, SERVICE_UNAVAILABLE);
            }
            Err(RouterFailure::Unusable(err)) => {
                session.stats.router_failures += 1;
                let mut outcome = TurnOutcome::new(turn, TurnKind::Clarification, DEFAULT_CLARIFY_QUESTION);
                outcome.plan_errors.push(err.kind().to_string());
                return outcome;
            }
        };
        session.stats.record_validation(&report);

        if decision.route == Route::Gmail && decision.gmail_intent == GmailIntent::None {
            decision.gmail_intent = detect_gmail_intent(user_text);
            debug!(intent = %decision.gmail_intent, "gmail intent inferred from text");
        }

        let verification = verify_plan_with(&decision, user_text, &tool_names, &self.config.plan);
        if !verification.ok {
            let codes = verification.codes();
            warn!(turn, violations = ?codes, "plan rejected");
            let question = verification
                .violations
                .first()
                .map(|v| v.clarification())
                .unwrap_or(DEFAULT_CLARIFY_QUESTION);
            let mut outcome =
                TurnOutcome::new(turn, TurnKind::Clarification, question).with_validation(Some(report));
            outcome.plan_errors = codes;
            return outcome;
        }

        if decision.ask_user {
            return TurnOutcome::new(turn, TurnKind::Clarification, decision.question.clone())
                .with_validation(Some(report));
        }

        if !decision.tool_plan.is_empty() && decision.confidence < self.config.router.min_confidence {
            info!(turn, confidence = decision.confidence, "low confidence plan, asking instead");
            return TurnOutcome::new(turn, TurnKind::Clarification, DEFAULT_CLARIFY_QUESTION)
                .with_validation(Some(report));
        }

        let plan = plan_from_decision(&decision, user_text, report);
        self.run_plan(session, plan, turn)
    }

    /// Call the router, re-prompting on unusable output.
    fn call_router(
        &self,
        messages: &[ChatMessage],
    ) -> Result<(RouterDecision, ValidationReport), RouterFailure> {
        let settings = &self.config.router;
        let mut raw = self.router_chat(messages)?;
        let mut attempt = 0;

        loop {
            match repair_text(&raw) {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    warn!(kind = err.kind(), attempt, "router output unusable");
                    if attempt >= settings.repair_attempts {
                        return Err(RouterFailure::Unusable(err));
                    }
                    attempt += 1;
                    let cleaned = self.sanitizer.sanitize_raw_text(&raw);
                    raw = self.router_chat(&build_repair_messages(&cleaned, err.kind()))?;
                }
            }
        }
    }

    fn router_chat(&self, messages: &[ChatMessage]) -> Result<String, RouterFailure> {
        let settings = &self.config.router;
        self.router
            .chat(messages, settings.temperature, settings.max_tokens)
            .map_err(|err: LlmError| {
                log_failure("router", &err);
                RouterFailure::Llm
            })
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    fn run_plan(&mut self, session: &mut Session, plan: PlanRun, turn: u64) -> TurnOutcome {
        let missing = self.missing_params(session, &plan.steps);
        if !missing.is_empty() {
            info!(turn, missing = ?missing, "plan is missing slots");
            return TurnOutcome::new(turn, TurnKind::Clarification, missing_slot_question(&missing))
                .with_validation(plan.validation);
        }

        let mut results: Vec<ToolResult> = Vec::new();
        let mut pending: VecDeque<PlannedCall> = plan.steps.iter().cloned().collect();
        // entity types looked up by read-only steps of this plan, and what they found
        let mut looked_up: Vec<String> = Vec::new();
        let mut found: Vec<EntitySlot> = Vec::new();

        while let Some(mut call) = pending.pop_front() {
            let spec = self.config.tools.spec(&call.tool);

            if let Some(param) = &spec.entity_param {
                if !param_present(&call.params, &param.param) {
                    let entity_id = if looked_up.contains(&param.entity_type) {
                        // never fall back to older turns once this plan searched
                        found
                            .iter()
                            .rev()
                            .find(|e| e.entity_type == param.entity_type)
                            .map(|e| e.entity_id.clone())
                    } else {
                        session
                            .entities
                            .latest(&param.entity_type)
                            .map(|e| e.entity_id.clone())
                    };

                    match entity_id {
                        Some(id) => {
                            call.params.insert(param.param.clone(), Value::String(id));
                        }
                        None if looked_up.contains(&param.entity_type) => {
                            info!(turn, entity_type = %param.entity_type, "plan lookup found nothing");
                            return TurnOutcome::new(
                                turn,
                                TurnKind::Clarification,
                                entity_not_found_question(&param.entity_type),
                            )
                            .with_results(results)
                            .with_validation(plan.validation);
                        }
                        None => {
                            return TurnOutcome::new(
                                turn,
                                TurnKind::Clarification,
                                missing_slot_question(&[param.param.clone()]),
                            )
                            .with_results(results)
                            .with_validation(plan.validation);
                        }
                    }
                }
            }

            let needs_confirmation =
                spec.requires_confirmation || (plan.requires_confirmation && !spec.read_only);
            if needs_confirmation && !plan.confirmed {
                let summary = action_summary(&call, session);
                let prompt = if plan.confirmation_prompt.trim().is_empty() {
                    default_confirmation_prompt(&summary)
                } else {
                    plan.confirmation_prompt.clone()
                };
                let mut held = vec![call];
                held.extend(pending.drain(..));
                let action = plan.held(held, summary);

                return match session.dialog.begin_confirmation(action, prompt.clone()) {
                    Ok(()) => {
                        info!(turn, tool = %spec.name, "confirmation requested");
                        TurnOutcome::new(turn, TurnKind::ConfirmationRequested, prompt)
                            .with_results(results)
                            .with_validation(plan.validation)
                    }
                    Err(err) => {
                        log_failure("confirmation", &err);
                        TurnOutcome::new(turn, TurnKind::Failed, fallback_template(Some(plan.route)))
                            .with_results(results)
                            .with_validation(plan.validation)
                    }
                };
            }

            let (result, registered) = self.execute(&call, session, turn);
            if spec.read_only {
                looked_up.push(entity_type_for_tool(&call.tool));
            }
            found.extend(registered);
            let succeeded = result.success;
            results.push(result);

            if !succeeded {
                continue;
            }

            if let Some(mut request) = session.dialog.check_tool_results(&results, &plan.intent) {
                if let Some(next) = pending.front() {
                    request.entity_param = self.config.tools.spec(&next.tool).entity_param;
                    let rest: Vec<PlannedCall> = pending.drain(..).collect();
                    request.follow_up = Some(plan.held(rest, String::new()));
                }
                let question = request.question.clone();
                let candidates = request.items.len();
                return match session.dialog.begin_disambiguation(request) {
                    Ok(()) => {
                        info!(turn, candidates, "disambiguation requested");
                        TurnOutcome::new(turn, TurnKind::DisambiguationRequested, question)
                            .with_results(results)
                            .with_validation(plan.validation)
                    }
                    Err(err) => {
                        log_failure("disambiguation", &err);
                        TurnOutcome::new(turn, TurnKind::Failed, fallback_template(Some(plan.route)))
                            .with_results(results)
                            .with_validation(plan.validation)
                    }
                };
            }
        }

        self.finalize(session, plan, results, turn)
    }

    /// Call one tool, sanitize its error and register its entities.
    ///
    /// Returns the result and the entities registered from it.
    fn execute(&self, call: &PlannedCall, session: &mut Session, turn: u64) -> (ToolResult, Vec<EntitySlot>) {
        let started = Instant::now();
        let mut result = self.tools.call(&call.tool, &call.params);
        if result.elapsed_ms == 0 {
            result.elapsed_ms = started.elapsed().as_millis() as u64;
        }

        if !result.success {
            let safe = self.sanitizer.sanitize_tool_error(result.error.as_deref());
            warn!(tool = %call.tool, elapsed_ms = result.elapsed_ms, error = %safe, "tool failed");
            result.error = Some(safe);
            return (result, Vec::new());
        }

        let found = extract_entities(&result.tool, &result.raw_result, turn, session.entities.config());
        for entity in &found {
            session.entities.register(entity.clone());
        }
        debug!(tool = %call.tool, elapsed_ms = result.elapsed_ms, entities = found.len(), "tool succeeded");
        (result, found)
    }

    /// Required slots and entity params no step can supply.
    ///
    /// An entity param is satisfied by the params, by the registry, or by an
    /// earlier read-only step producing that entity type.
    fn missing_params(&self, session: &Session, steps: &[PlannedCall]) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for (i, call) in steps.iter().enumerate() {
            let spec = self.config.tools.spec(&call.tool);
            for slot in &spec.required_slots {
                if !param_present(&call.params, slot) && !missing.contains(slot) {
                    missing.push(slot.clone());
                }
            }
            if let Some(param) = &spec.entity_param {
                let available = param_present(&call.params, &param.param)
                    || session.entities.latest(&param.entity_type).is_some()
                    || steps[..i].iter().any(|earlier| {
                        entity_type_for_tool(&earlier.tool) == param.entity_type
                            && self.config.tools.spec(&earlier.tool).read_only
                    });
                if !available && !missing.contains(&param.param) {
                    missing.push(param.param.clone());
                }
            }
        }
        missing
    }

    // ------------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------------

    fn finalize(
        &mut self,
        session: &mut Session,
        plan: PlanRun,
        results: Vec<ToolResult>,
        turn: u64,
    ) -> TurnOutcome {
        let tier = self.tier.decide(
            plan.route,
            &plan.user_text,
            &plan.planned,
            plan.requires_confirmation,
        );
        session.stats.record_tier(&tier);

        if let Some(note) = &plan.memory_update {
            if session.remember(note, self.config.finalizer.max_memory_notes) {
                debug!(notes = session.memory.len(), "memory note stored");
            }
        }

        let draft = if !tier.use_quality && results.is_empty() && !plan.assistant_reply.trim().is_empty() {
            plan.assistant_reply.clone()
        } else {
            self.finalizer_reply(session, &plan, &results, tier.use_quality)
        };

        let reply = self
            .sanitizer
            .validate_reply_language(&draft, Some(plan.route), &results);

        let mut outcome = TurnOutcome::new(turn, TurnKind::Answered, reply)
            .with_results(results)
            .with_validation(plan.validation);
        outcome.tier = Some(tier);
        outcome
    }

    /// quality -> fast -> deterministic summary
    fn finalizer_reply(
        &self,
        session: &Session,
        plan: &PlanRun,
        results: &[ToolResult],
        use_quality: bool,
    ) -> String {
        let settings = &self.config.finalizer;
        let mut chain: Vec<(&Arc<dyn LlmClient>, u32, bool)> = Vec::new();
        if use_quality {
            if let Some(quality) = &self.quality {
                chain.push((quality, settings.quality_max_tokens, true));
            }
        }
        chain.push((&self.fast, settings.fast_max_tokens, false));

        for (client, max_tokens, quality) in chain {
            let messages = build_finalizer_messages(
                &plan.user_text,
                plan.route,
                results,
                &session.memory,
                quality,
                &self.sanitizer,
            );
            match client.chat(&messages, settings.temperature, max_tokens) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(client = client.name(), quality, "finalizer replied");
                    return self.sanitizer.sanitize_raw_text(text.trim());
                }
                Ok(_) => warn!(client = client.name(), "finalizer returned empty text"),
                Err(err) => log_failure("finalizer", &err),
            }
        }

        self.sanitizer
            .summarize_tool_results(results)
            .or_else(|| failure_reply(results))
            .unwrap_or_else(|| fallback_template(Some(plan.route)).to_string())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn plan_from_decision(decision: &RouterDecision, user_text: &str, report: ValidationReport) -> PlanRun {
    let params: Map<String, Value> = decision
        .slots
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    PlanRun {
        route: decision.route,
        intent: decision.intent_label().to_string(),
        user_text: user_text.to_string(),
        steps: decision
            .tool_plan
            .iter()
            .map(|tool| PlannedCall::new(tool.clone(), params.clone()))
            .collect(),
        planned: decision.tool_plan.clone(),
        requires_confirmation: decision.requires_confirmation,
        confirmation_prompt: decision.confirmation_prompt.clone(),
        assistant_reply: decision.assistant_reply.clone(),
        confirmed: false,
        validation: Some(report),
        memory_update: decision.memory_update.clone(),
    }
}

fn param_present(params: &Map<String, Value>, name: &str) -> bool {
    match params.get(name) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn slot_label(name: &str) -> &str {
    SLOT_LABELS
        .iter()
        .find(|(slot, _)| *slot == name)
        .map(|(_, label)| *label)
        .unwrap_or(name)
}

/// "Devam edebilmem için tarih ve saat bilgisini söyler misiniz efendim?"
pub fn missing_slot_question(missing: &[String]) -> String {
    let labels: Vec<&str> = missing.iter().map(|m| slot_label(m)).collect();
    let joined = match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} ve {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => "eksik".to_string(),
    };
    format!("Devam edebilmem için {} bilgisini söyler misiniz efendim?", joined)
}

/// Asked when this plan's own lookup matched nothing
pub fn entity_not_found_question(entity_type: &str) -> String {
    let noun = match entity_type {
        "calendar_event" => "etkinlik",
        "email" => "e-posta",
        _ => "kayıt",
    };
    format!(
        "Aradığınız {} bulunamadı efendim. Biraz daha tarif edebilir misiniz?",
        noun
    )
}

fn param_text<'a>(params: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| params.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// Turkish description of a call for its confirmation prompt
fn action_summary(call: &PlannedCall, session: &Session) -> String {
    let title = param_text(&call.params, &["title", "summary", "subject"]);
    let target = || -> Option<String> {
        let id = param_text(&call.params, &["event_id", "message_id"])?;
        session
            .entities
            .find(&entity_type_for_tool(&call.tool), id)
            .map(|e| e.label())
    };

    match call.tool.as_str() {
        "calendar.create_event" => match title {
            Some(t) => format!("'{}' etkinliğini oluşturmak", t),
            None => "yeni bir etkinlik oluşturmak".to_string(),
        },
        "calendar.update_event" => match target() {
            Some(label) => format!("'{}' etkinliğini güncellemek", label),
            None => "etkinliği güncellemek".to_string(),
        },
        "calendar.delete_event" => match target() {
            Some(label) => format!("'{}' etkinliğini silmek", label),
            None => "etkinliği silmek".to_string(),
        },
        "gmail.send" => match param_text(&call.params, &["to", "recipient"]) {
            Some(to) => format!("{} adresine e-posta göndermek", to),
            None => "e-posta göndermek".to_string(),
        },
        "gmail.reply" => "e-postayı yanıtlamak".to_string(),
        "gmail.forward" => match param_text(&call.params, &["to", "recipient"]) {
            Some(to) => format!("e-postayı {} adresine iletmek", to),
            None => "e-postayı iletmek".to_string(),
        },
        "gmail.delete" => match target() {
            Some(label) => format!("'{}' e-postasını silmek", label),
            None => "e-postayı silmek".to_string(),
        },
        other => format!("'{}' işlemini yapmak", other),
    }
}

fn failure_reply(results: &[ToolResult]) -> Option<String> {
    let error = results.iter().find(|r| !r.success)?.error.as_deref()?;
    Some(format!("Üzgünüm efendim, işlem tamamlanamadı: {}.", error))
}
