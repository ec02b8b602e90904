//! Tests for orchestrator.rs

use asistan_core::config::CoreConfig;
use asistan_core::dialog::DialogMode;
use asistan_core::entities::EntitySlot;
use asistan_core::error::LlmError;
use asistan_core::llm::ScriptedLlmClient;
use asistan_core::orchestrator::{TurnKind, TurnOrchestrator, SERVICE_UNAVAILABLE};
use asistan_core::router_validator::DEFAULT_CLARIFY_QUESTION;
use asistan_core::tier::TierReason;
use asistan_core::tools::StaticToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;

const PARTY_PROMPT: &str = "Bu akşam 20:00'de 'Parti' etkinliğini ekleyeyim mi efendim?";

fn router_json(overrides: Value) -> String {
    let mut base = json!({
        "route": "calendar",
        "calendar_intent": "create",
        "gmail_intent": "none",
        "slots": {"date": "2025-03-01", "time": "20:00", "title": "Parti"},
        "confidence": 0.92,
        "tool_plan": ["calendar.create_event"],
        "assistant_reply": "",
        "ask_user": false,
        "question": "",
        "requires_confirmation": true,
        "confirmation_prompt": PARTY_PROMPT,
        "reasoning_summary": ["takvim isteği"]
    });
    if let (Some(target), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    base.to_string()
}

fn calendar_tools() -> StaticToolRegistry {
    StaticToolRegistry::new()
        .with_result("time.now", json!({"time": "2025-03-01T18:00:00"}))
        .with_result(
            "calendar.create_event",
            json!({"id": "e9", "summary": "Parti", "start": {"dateTime": "2025-03-01T20:00:00"}}),
        )
        .with_result(
            "calendar.list_events",
            json!({"events": [
                {"id": "e1", "summary": "Toplantı", "start": {"dateTime": "2025-03-03T10:00:00"}},
                {"id": "e2", "summary": "Toplantı", "start": {"dateTime": "2025-03-04T14:00:00"}}
            ]}),
        )
        .with_result("calendar.delete_event", json!({"deleted": true}))
}

struct Harness {
    router: Arc<ScriptedLlmClient>,
    fast: Arc<ScriptedLlmClient>,
    tools: Arc<StaticToolRegistry>,
    orchestrator: TurnOrchestrator,
}

fn harness(router: ScriptedLlmClient, fast: ScriptedLlmClient, tools: StaticToolRegistry) -> Harness {
    let router = Arc::new(router);
    let fast = Arc::new(fast);
    let tools = Arc::new(tools);
    let orchestrator = TurnOrchestrator::new(
        CoreConfig::default(),
        router.clone(),
        fast.clone(),
        tools.clone(),
    );
    Harness {
        router,
        fast,
        tools,
        orchestrator,
    }
}

// ============================================================================
// Confirmation
// ============================================================================

#[test]
fn test_party_confirmed_with_evet() {
    let mut h = harness(
        ScriptedLlmClient::new("router").respond(router_json(json!({}))),
        ScriptedLlmClient::new("fast")
            .respond("Tamam efendim, 'Parti' etkinliği bu akşam 20:00 için takviminize eklendi."),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    let first = h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    assert_eq!(first.kind, TurnKind::ConfirmationRequested);
    assert_eq!(first.reply, PARTY_PROMPT);
    assert!(first.tool_results.is_empty());
    assert!(h.tools.calls().is_empty());
    assert_eq!(session.dialog.mode(), DialogMode::PendingConfirmation);

    let second = h.orchestrator.run_turn(&mut session, "evet");
    assert_eq!(second.kind, TurnKind::Answered);
    assert_eq!(h.tools.called_tools(), vec!["calendar.create_event"]);
    assert_eq!(h.tools.calls()[0].params["title"], "Parti");
    assert!(second.reply.contains("efendim"));
    assert!(second.reply.contains("Parti"));
    assert_eq!(session.dialog.mode(), DialogMode::Idle);
    assert_eq!(h.router.call_count(), 1);
    assert_eq!(h.fast.call_count(), 1);
    assert_eq!(session.entities.latest("calendar_event").unwrap().entity_id, "e9");
}

#[test]
fn test_party_cancelled_with_hayir() {
    let mut h = harness(
        ScriptedLlmClient::new("router").respond(router_json(json!({}))),
        ScriptedLlmClient::new("fast"),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    let outcome = h.orchestrator.run_turn(&mut session, "hayır");
    assert_eq!(outcome.kind, TurnKind::Cancelled);
    assert!(outcome.reply.contains("iptal"));
    assert!(outcome.reply.contains("efendim"));
    assert!(h.tools.calls().is_empty());
    assert_eq!(session.dialog.mode(), DialogMode::Idle);
}

#[test]
fn test_party_ambiguous_reply_reasks() {
    let mut h = harness(
        ScriptedLlmClient::new("router").respond(router_json(json!({}))),
        ScriptedLlmClient::new("fast").respond("Tamam efendim, etkinlik eklendi."),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    let outcome = h.orchestrator.run_turn(&mut session, "belki");
    assert_eq!(outcome.kind, TurnKind::ConfirmationRequested);
    assert!(outcome.reply.contains("evet"));
    assert!(outcome.reply.contains("hayır"));
    assert_eq!(session.dialog.mode(), DialogMode::PendingConfirmation);
    assert!(h.tools.calls().is_empty());

    let outcome = h.orchestrator.run_turn(&mut session, "Evet, ekle");
    assert_eq!(outcome.kind, TurnKind::Answered);
    assert_eq!(h.tools.called_tools(), vec!["calendar.create_event"]);
    assert_eq!(h.router.call_count(), 1);
}

#[test]
fn test_repeated_unclear_replies_abandon() {
    let mut h = harness(
        ScriptedLlmClient::new("router").respond(router_json(json!({}))),
        ScriptedLlmClient::new("fast"),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    h.orchestrator.run_turn(&mut session, "belki");
    h.orchestrator.run_turn(&mut session, "bilmiyorum");
    let outcome = h.orchestrator.run_turn(&mut session, "hmm");
    assert_eq!(outcome.kind, TurnKind::Cancelled);
    assert!(session.dialog.is_idle());
    assert!(h.tools.calls().is_empty());
}

// ============================================================================
// Disambiguation
// ============================================================================

#[test]
fn test_delete_with_two_matches_asks_which_then_confirms() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "delete",
        "slots": {"title": "Toplantı"},
        "tool_plan": ["calendar.list_events", "calendar.delete_event"],
        "requires_confirmation": false,
        "confirmation_prompt": ""
    })));
    let mut h = harness(
        router,
        ScriptedLlmClient::new("fast").respond("Tamam efendim, toplantı silindi."),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    let first = h.orchestrator.run_turn(&mut session, "toplantıyı sil");
    assert_eq!(first.kind, TurnKind::DisambiguationRequested);
    assert!(first.reply.contains("#1"));
    assert!(first.reply.contains("#2"));
    assert!(first.reply.contains("efendim"));
    assert_eq!(session.dialog.mode(), DialogMode::PendingDisambiguation);
    assert_eq!(h.tools.called_tools(), vec!["calendar.list_events"]);

    let second = h.orchestrator.run_turn(&mut session, "ikincisi");
    assert_eq!(second.kind, TurnKind::ConfirmationRequested);
    assert!(second.reply.contains("efendim"));
    // the chosen event is named in the prompt
    assert!(second.reply.contains("'Toplantı"));
    assert_eq!(session.dialog.mode(), DialogMode::PendingConfirmation);
    assert_eq!(session.entities.latest("calendar_event").unwrap().entity_id, "e2");
    assert_eq!(h.tools.called_tools(), vec!["calendar.list_events"]);

    let third = h.orchestrator.run_turn(&mut session, "evet");
    assert_eq!(third.kind, TurnKind::Answered);
    let calls = h.tools.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].tool, "calendar.delete_event");
    assert_eq!(calls[1].params["event_id"], "e2");
    assert!(session.dialog.is_idle());
    assert_eq!(h.router.call_count(), 1);
}

#[test]
fn test_empty_lookup_never_targets_older_entity() {
    let tools = StaticToolRegistry::new()
        .with_result("calendar.list_events", json!({"events": []}))
        .with_result("calendar.delete_event", json!({"deleted": true}));
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "delete",
        "slots": {"title": "Dişçi"},
        "tool_plan": ["calendar.list_events", "calendar.delete_event"],
        "requires_confirmation": false,
        "confirmation_prompt": ""
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), tools);
    let mut session = h.orchestrator.new_session();
    // left over from an earlier listing
    session
        .entities
        .register(EntitySlot::new("calendar_event", "e1", "calendar.list_events", 0, 3));

    let outcome = h.orchestrator.run_turn(&mut session, "dişçi randevusunu sil");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert!(outcome.reply.contains("bulunamadı"));
    assert!(outcome.reply.contains("efendim"));
    assert!(session.dialog.is_idle());
    assert_eq!(h.tools.called_tools(), vec!["calendar.list_events"]);
}

#[test]
fn test_single_lookup_match_wins_over_older_entity() {
    let tools = StaticToolRegistry::new()
        .with_result("calendar.list_events", json!({"events": [{"id": "e7", "summary": "Dişçi"}]}))
        .with_result("calendar.delete_event", json!({"deleted": true}));
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "delete",
        "slots": {"title": "Dişçi"},
        "tool_plan": ["calendar.list_events", "calendar.delete_event"],
        "requires_confirmation": true,
        "confirmation_prompt": "Dişçi randevusunu sileyim mi efendim?"
    })));
    let mut h = harness(
        router,
        ScriptedLlmClient::new("fast").respond("Tamam efendim, randevu silindi."),
        tools,
    );
    let mut session = h.orchestrator.new_session();
    session
        .entities
        .register(EntitySlot::new("calendar_event", "e1", "calendar.list_events", 0, 3));

    let first = h.orchestrator.run_turn(&mut session, "dişçi randevusunu sil");
    assert_eq!(first.kind, TurnKind::ConfirmationRequested);

    h.orchestrator.run_turn(&mut session, "evet");
    let calls = h.tools.calls();
    assert_eq!(calls[1].tool, "calendar.delete_event");
    assert_eq!(calls[1].params["event_id"], "e7");
}

#[test]
fn test_disambiguation_cancel() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "delete",
        "slots": {},
        "tool_plan": ["calendar.list_events", "calendar.delete_event"],
        "requires_confirmation": false,
        "confirmation_prompt": ""
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "toplantıyı sil");
    let outcome = h.orchestrator.run_turn(&mut session, "iptal");
    assert_eq!(outcome.kind, TurnKind::Cancelled);
    assert!(session.dialog.is_idle());
    assert_eq!(h.tools.called_tools(), vec!["calendar.list_events"]);
}

// ============================================================================
// Router output
// ============================================================================

#[test]
fn test_unparseable_router_output_is_reprompted_once() {
    let greeting = json!({
        "route": "smalltalk",
        "calendar_intent": "none",
        "gmail_intent": "none",
        "slots": {},
        "confidence": 0.95,
        "tool_plan": [],
        "assistant_reply": "Merhaba efendim, size nasıl yardımcı olabilirim?",
        "ask_user": false,
        "question": "",
        "requires_confirmation": false,
        "confirmation_prompt": ""
    });
    let router = ScriptedLlmClient::new("router")
        .respond("<|im_start|>Tabii, işte cevap: route smalltalk")
        .respond(greeting.to_string());
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "merhaba");
    assert_eq!(outcome.kind, TurnKind::Answered);
    assert_eq!(outcome.reply, "Merhaba efendim, size nasıl yardımcı olabilirim?");
    assert_eq!(outcome.tier.unwrap().reason, TierReason::SimpleGreeting);
    assert_eq!(h.router.call_count(), 2);
    let repair_prompt = &h.router.prompts()[1];
    assert!(repair_prompt.contains("parse_error"));
    assert!(!repair_prompt.contains("<|im_start|>"));
    assert_eq!(h.fast.call_count(), 0);
    assert!(h.tools.calls().is_empty());
    assert_eq!(h.orchestrator.tier_stats().greeting_short_circuits, 1);
}

#[test]
fn test_router_garbage_twice_asks_to_rephrase() {
    let router = ScriptedLlmClient::new("router")
        .respond("hiç json yok")
        .respond("yine yok");
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "bir şey yap");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert_eq!(outcome.reply, DEFAULT_CLARIFY_QUESTION);
    assert_eq!(outcome.plan_errors, vec!["parse_error"]);
    assert_eq!(session.stats.router_failures, 1);
    assert!(h.tools.calls().is_empty());
}

#[test]
fn test_router_unreachable_replies_in_turkish() {
    let router = ScriptedLlmClient::new("router").fail(LlmError::Timeout(30_000));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "takvimime bak");
    assert_eq!(outcome.kind, TurnKind::Failed);
    assert_eq!(outcome.reply, SERVICE_UNAVAILABLE);
    assert_eq!(session.history.len(), 2);
}

#[test]
fn test_missing_confirmation_prompt_is_not_executed() {
    let router = ScriptedLlmClient::new("router")
        .respond(router_json(json!({"confirmation_prompt": ""})))
        .respond(router_json(json!({"confirmation_prompt": ""})));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert_eq!(outcome.plan_errors, vec!["missing_confirmation_prompt"]);
    assert!(h.tools.calls().is_empty());
    assert!(session.dialog.is_idle());
}

#[test]
fn test_memory_update_reaches_next_router_prompt() {
    let router = ScriptedLlmClient::new("router")
        .respond(router_json(json!({
            "route": "smalltalk",
            "calendar_intent": "none",
            "slots": {},
            "tool_plan": [],
            "requires_confirmation": false,
            "confirmation_prompt": "",
            "assistant_reply": "Not aldım efendim.",
            "memory_update": "Kahveyi şekersiz içer"
        })))
        .respond("geçersiz");
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "kahvemi şekersiz içerim, unutma");
    assert_eq!(session.memory, vec!["Kahveyi şekersiz içer"]);

    h.orchestrator.run_turn(&mut session, "ne biliyorsun");
    let prompt = &h.router.prompts()[1];
    assert!(prompt.contains("MEMORY:"));
    assert!(prompt.contains("Kahveyi şekersiz içer"));
}

#[test]
fn test_memory_update_of_rejected_plan_not_stored() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "tool_plan": ["calendar.teleport"],
        "memory_update": "Partileri sever"
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "beni partiye ışınla");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert!(session.memory.is_empty());
}

#[test]
fn test_memory_update_waits_for_confirmation() {
    let mut h = harness(
        ScriptedLlmClient::new("router").respond(router_json(json!({"memory_update": "Partileri sever"}))),
        ScriptedLlmClient::new("fast").respond("Tamam efendim, parti eklendi."),
        calendar_tools(),
    );
    let mut session = h.orchestrator.new_session();

    h.orchestrator.run_turn(&mut session, "bu akşam sekize parti ekle");
    assert!(session.memory.is_empty());

    h.orchestrator.run_turn(&mut session, "evet");
    assert_eq!(session.memory, vec!["Partileri sever"]);
}

// ============================================================================
// Plan checks
// ============================================================================

#[test]
fn test_unknown_tool_rejected_before_execution() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "tool_plan": ["calendar.teleport"]
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "beni partiye ışınla");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert_eq!(outcome.plan_errors, vec!["unknown_tool:calendar.teleport"]);
    assert!(outcome.reply.contains("efendim"));
    assert!(h.tools.calls().is_empty());
    assert!(session.dialog.is_idle());
}

#[test]
fn test_calendar_write_without_time_asks_when() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "slots": {"title": "Parti"}
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "parti ekle");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert!(outcome.plan_errors.contains(&"calendar_write_no_temporal".to_string()));
    assert!(outcome.reply.contains("Ne zaman"));
    assert!(h.tools.calls().is_empty());
}

#[test]
fn test_missing_required_slot_asks_in_turkish() {
    let tools = StaticToolRegistry::new().with_result("gmail.send", json!({"id": "m1"}));
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "route": "gmail",
        "calendar_intent": "none",
        "gmail_intent": "send",
        "slots": {"to": "ali@example.com"},
        "tool_plan": ["gmail.send"],
        "confirmation_prompt": "Ali'ye e-posta göndereyim mi efendim?"
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), tools);
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "ali'ye mail at");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert!(outcome.reply.contains("mesaj içeriği"));
    assert!(outcome.reply.contains("efendim"));
    assert!(session.dialog.is_idle());
    assert!(h.tools.calls().is_empty());
}

#[test]
fn test_low_confidence_plan_not_executed() {
    let router = ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "query",
        "tool_plan": ["calendar.list_events"],
        "requires_confirmation": false,
        "confirmation_prompt": "",
        "confidence": 0.1
    })));
    let mut h = harness(router, ScriptedLlmClient::new("fast"), calendar_tools());
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "şey");
    assert_eq!(outcome.kind, TurnKind::Clarification);
    assert_eq!(outcome.reply, DEFAULT_CLARIFY_QUESTION);
    assert!(h.tools.calls().is_empty());
}

// ============================================================================
// Finalization
// ============================================================================

fn query_router() -> ScriptedLlmClient {
    ScriptedLlmClient::new("router").respond(router_json(json!({
        "calendar_intent": "query",
        "slots": {"date": "2025-03-03"},
        "tool_plan": ["calendar.list_events"],
        "requires_confirmation": false,
        "confirmation_prompt": ""
    })))
}

#[test]
fn test_english_finalizer_reply_replaced_by_summary() {
    let tools = StaticToolRegistry::new().with_result(
        "calendar.list_events",
        json!({"events": [{"id": "e5", "summary": "Doktor"}]}),
    );
    let fast = ScriptedLlmClient::new("fast").respond("Sure, you have one event with the doctor.");
    let mut h = harness(query_router(), fast, tools);
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "pazartesi ne var");
    assert_eq!(outcome.kind, TurnKind::Answered);
    assert_eq!(outcome.reply, "Tamam efendim. 1 sonuç bulundu: Doktor.");
}

#[test]
fn test_english_reply_without_stop_words_replaced() {
    let tools = StaticToolRegistry::new().with_result(
        "calendar.list_events",
        json!({"events": [{"id": "e5", "summary": "Doktor"}]}),
    );
    let fast = ScriptedLlmClient::new("fast").respond("Sure! One meeting tomorrow at 10:00.");
    let mut h = harness(query_router(), fast, tools);
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "yarın ne var");
    assert_eq!(outcome.reply, "Tamam efendim. 1 sonuç bulundu: Doktor.");
}

#[test]
fn test_tool_failure_is_sanitized() {
    let tools = StaticToolRegistry::new().with_error(
        "calendar.list_events",
        "Request timed out after 30s\n  File \"/srv/app/gcal.py\", line 12, in list",
    );
    let fast = ScriptedLlmClient::new("fast").fail(LlmError::Connection("refused".into()));
    let mut h = harness(query_router(), fast, tools);
    let mut session = h.orchestrator.new_session();

    let outcome = h.orchestrator.run_turn(&mut session, "pazartesi ne var");
    assert_eq!(outcome.kind, TurnKind::Answered);
    assert_eq!(outcome.tool_results[0].error.as_deref(), Some("İşlem zaman aşımına uğradı"));
    assert!(!outcome.reply.contains("/srv/app"));
    assert!(!outcome.reply.contains("File"));
    assert!(outcome.reply.contains("efendim"));
    assert!(outcome.reply.contains("zaman aşımına"));
}

#[test]
fn test_quality_tier_used_for_writing() {
    let router = Arc::new(ScriptedLlmClient::new("router").respond(router_json(json!({
        "route": "chat",
        "calendar_intent": "none",
        "slots": {},
        "tool_plan": [],
        "requires_confirmation": false,
        "confirmation_prompt": "",
        "assistant_reply": "Tabii efendim."
    }))));
    let fast = Arc::new(ScriptedLlmClient::new("fast"));
    let quality = Arc::new(
        ScriptedLlmClient::new("quality").respond("Elbette efendim, işte LinkedIn gönderiniz için bir taslak."),
    );
    let mut orchestrator = TurnOrchestrator::new(
        CoreConfig::default(),
        router,
        fast.clone(),
        Arc::new(StaticToolRegistry::new()),
    )
    .with_quality(quality.clone());
    let mut session = orchestrator.new_session();

    let outcome = orchestrator.run_turn(&mut session, "linkedin a post yaz");
    assert!(outcome.tier.as_ref().unwrap().use_quality);
    assert_eq!(quality.call_count(), 1);
    assert_eq!(fast.call_count(), 0);
    assert!(outcome.reply.starts_with("Elbette efendim"));
    assert_eq!(session.stats.tier.quality, 1);
}
