//! Tests for dialog.rs

use asistan_core::decision::Route;
use asistan_core::dialog::{
    resolve_response, ConfirmationOutcome, DialogConfig, DialogMode, DialogStateMachine,
    DisambiguationOutcome, HeldAction,
};
use asistan_core::error::DialogError;
use asistan_core::tools::{PlannedCall, ToolResult};
use serde_json::{json, Map};

fn events(n: usize) -> ToolResult {
    let items: Vec<_> = (1..=n)
        .map(|i| json!({"id": format!("e{}", i), "summary": format!("Toplantı {}", i), "start": format!("2025-03-0{}T10:00", i)}))
        .collect();
    ToolResult::ok("calendar.list_events", json!({ "events": items }))
}

fn held() -> HeldAction {
    HeldAction {
        steps: vec![PlannedCall::new("calendar.create_event", Map::new())],
        route: Route::Calendar,
        intent: "create".into(),
        user_text: "parti ekle".into(),
        summary: "'Parti' etkinliğini oluşturmak".into(),
        memory_update: None,
    }
}

#[test]
fn test_single_candidate_never_triggers() {
    let dialog = DialogStateMachine::default();
    assert!(dialog.check_tool_results(&[events(1)], "delete").is_none());
    assert!(dialog.check_tool_results(&[events(0)], "delete").is_none());
}

#[test]
fn test_two_candidates_trigger_for_eligible_intent() {
    let dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    assert_eq!(request.items.len(), 2);
    assert_eq!(request.items[0].index, 1);
    assert_eq!(request.items[1].entity_id, "e2");
    assert!(request.question.contains("#1 Toplantı 1"));
    assert!(request.question.contains("#2 Toplantı 2"));
    assert!(request.question.contains("efendim"));
    assert_eq!(request.source_tool, "calendar.list_events");
}

#[test]
fn test_ineligible_intent_does_not_trigger() {
    let dialog = DialogStateMachine::default();
    assert!(dialog.check_tool_results(&[events(3)], "query").is_none());
    assert!(dialog.check_tool_results(&[events(3)], "create").is_none());
}

#[test]
fn test_failed_results_ignored() {
    let dialog = DialogStateMachine::default();
    let results = vec![events(3), ToolResult::failed("calendar.list_events", "timeout")];
    assert!(dialog.check_tool_results(&results, "modify").is_some());
    assert!(dialog
        .check_tool_results(&[ToolResult::failed("calendar.list_events", "timeout")], "modify")
        .is_none());
}

#[test]
fn test_listed_items_capped() {
    let dialog = DialogStateMachine::new(DialogConfig {
        max_listed_items: 3,
        ..Default::default()
    });
    let request = dialog.check_tool_results(&[events(6)], "read").unwrap();
    assert_eq!(request.items.len(), 3);
}

#[test]
fn test_resolve_response_forms() {
    let dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(3)], "delete").unwrap();

    let r = resolve_response("#1", Some(&request));
    assert!(r.resolved);
    assert_eq!(r.selected.unwrap().entity_id, "e1");

    assert_eq!(resolve_response("2", Some(&request)).selected.unwrap().entity_id, "e2");
    assert_eq!(resolve_response("ikincisini sil", Some(&request)).selected.unwrap().entity_id, "e2");
    assert_eq!(resolve_response("sonuncusu", Some(&request)).selected.unwrap().entity_id, "e3");

    let r = resolve_response("99", Some(&request));
    assert!(!r.resolved);
    assert!(r.selected.is_none());
    assert!(r.message.contains("efendim"));

    let r = resolve_response("#1", None);
    assert!(!r.resolved);
    assert!(r.message.contains("efendim"));

    assert!(!resolve_response("", Some(&request)).resolved);
    assert!(!resolve_response("#", Some(&request)).resolved);
    assert!(!resolve_response("99999999999999999999999", Some(&request)).resolved);
}

#[test]
fn test_confirmation_affirmative() {
    let mut dialog = DialogStateMachine::default();
    dialog.begin_confirmation(held(), "Ekleyeyim mi efendim?".into()).unwrap();
    assert_eq!(dialog.mode(), DialogMode::PendingConfirmation);
    assert_eq!(dialog.pending_prompt(), Some("Ekleyeyim mi efendim?"));

    match dialog.handle_confirmation_reply("Evet, ekle") {
        ConfirmationOutcome::Confirmed(action) => assert_eq!(action.steps.len(), 1),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(dialog.mode(), DialogMode::Idle);
}

#[test]
fn test_confirmation_negative() {
    let mut dialog = DialogStateMachine::default();
    dialog.begin_confirmation(held(), "Ekleyeyim mi efendim?".into()).unwrap();
    match dialog.handle_confirmation_reply("hayır") {
        ConfirmationOutcome::Cancelled { message } => assert!(message.contains("iptal")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dialog.is_idle());
}

#[test]
fn test_confirmation_ambiguous_reasks_then_abandons() {
    let mut dialog = DialogStateMachine::default();
    dialog.begin_confirmation(held(), "Ekleyeyim mi efendim?".into()).unwrap();

    for _ in 0..2 {
        match dialog.handle_confirmation_reply("belki") {
            ConfirmationOutcome::Reask { message } => {
                assert!(message.contains("evet"));
                assert!(message.contains("hayır"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(dialog.mode(), DialogMode::PendingConfirmation);
    }

    match dialog.handle_confirmation_reply("bilmem") {
        ConfirmationOutcome::Abandoned { message } => assert!(message.contains("iptal")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dialog.is_idle());
}

#[test]
fn test_transition_guard() {
    let mut dialog = DialogStateMachine::default();
    dialog.begin_confirmation(held(), "Onaylıyor musunuz efendim?".into()).unwrap();
    let request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    assert_eq!(
        dialog.begin_disambiguation(request),
        Err(DialogError::AlreadyPending {
            current: "PENDING_CONFIRMATION",
            requested: "PENDING_DISAMBIGUATION",
        })
    );
    assert!(dialog
        .begin_confirmation(held(), "Tekrar efendim?".into())
        .is_err());
    assert_eq!(dialog.mode(), DialogMode::PendingConfirmation);

    dialog.reset();
    assert!(dialog.is_idle());
    assert!(dialog.state().pending.is_none());
}

#[test]
fn test_disambiguation_needs_two_candidates() {
    let mut dialog = DialogStateMachine::default();
    let mut request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    request.items.truncate(1);
    assert_eq!(dialog.begin_disambiguation(request), Err(DialogError::NotEnoughCandidates));
    assert!(dialog.is_idle());
}

#[test]
fn test_disambiguation_flow() {
    let mut dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    dialog.begin_disambiguation(request).unwrap();
    assert_eq!(dialog.mode(), DialogMode::PendingDisambiguation);

    match dialog.handle_disambiguation_reply("99") {
        DisambiguationOutcome::Reask { message } => {
            assert!(message.contains("efendim"));
            assert!(message.contains("#1"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(dialog.mode(), DialogMode::PendingDisambiguation);

    match dialog.handle_disambiguation_reply("#2") {
        DisambiguationOutcome::Resolved { selected, request } => {
            assert_eq!(selected.entity_id, "e2");
            assert_eq!(request.items.len(), 2);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(dialog.is_idle());
}

#[test]
fn test_disambiguation_cancel() {
    let mut dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(2)], "read").unwrap();
    dialog.begin_disambiguation(request).unwrap();
    match dialog.handle_disambiguation_reply("vazgeç") {
        DisambiguationOutcome::Cancelled { message } => assert!(message.contains("iptal")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dialog.is_idle());
}

#[test]
fn test_negative_reply_with_ordinal_cancels() {
    let mut dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    dialog.begin_disambiguation(request).unwrap();
    match dialog.handle_disambiguation_reply("hayır, ilk değil") {
        DisambiguationOutcome::Cancelled { message } => assert!(message.contains("iptal")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dialog.is_idle());
}

#[test]
fn test_word_starting_with_ordinal_is_not_a_choice() {
    let dialog = DialogStateMachine::default();
    let request = dialog.check_tool_results(&[events(2)], "delete").unwrap();
    assert!(!resolve_response("ilkbahar", Some(&request)).resolved);
    assert_eq!(resolve_response("ilki", Some(&request)).selected.unwrap().entity_id, "e1");
}

#[test]
fn test_reply_when_idle_is_not_pending() {
    let mut dialog = DialogStateMachine::default();
    assert_eq!(dialog.handle_confirmation_reply("evet"), ConfirmationOutcome::NotPending);
    assert_eq!(dialog.handle_disambiguation_reply("#1"), DisambiguationOutcome::NotPending);
}
