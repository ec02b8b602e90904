//! Tests for plan_verifier.rs

use asistan_core::decision::{CalendarIntent, GmailIntent, Route, RouterDecision};
use asistan_core::plan_verifier::{verify_plan, verify_plan_with, PlanConfig, PlanViolation};
use serde_json::json;

fn tools() -> Vec<String> {
    [
        "time.now",
        "calendar.list_events",
        "calendar.create_event",
        "gmail.search",
        "gmail.send",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn decision(route: Route, plan: &[&str]) -> RouterDecision {
    RouterDecision {
        route,
        tool_plan: plan.iter().map(|s| s.to_string()).collect(),
        confidence: 0.9,
        ..Default::default()
    }
}

#[test]
fn test_unknown_tool_flagged() {
    let d = decision(Route::Calendar, &["nonexistent.tool"]);
    let result = verify_plan(&d, "bir şey yap", &tools());
    assert!(!result.ok);
    assert_eq!(result.codes(), vec!["unknown_tool:nonexistent.tool"]);
}

#[test]
fn test_smalltalk_with_tools() {
    let d = decision(Route::Smalltalk, &["calendar.list_events"]);
    let result = verify_plan(&d, "naber", &tools());
    assert!(result.has("smalltalk_with_tools"));

    let d = decision(Route::Smalltalk, &["time.now"]);
    assert!(verify_plan(&d, "saat kaç", &tools()).ok);
}

#[test]
fn test_smalltalk_allow_list_is_configurable() {
    let config = PlanConfig {
        smalltalk_allowed_tools: vec![],
    };
    let d = decision(Route::Smalltalk, &["time.now"]);
    assert!(verify_plan_with(&d, "saat kaç", &tools(), &config).has("smalltalk_with_tools"));
}

#[test]
fn test_calendar_write_needs_temporal_slot() {
    let mut d = decision(Route::Calendar, &["calendar.create_event"]);
    d.calendar_intent = CalendarIntent::Create;
    d.slots.insert("title".into(), json!("Parti"));
    let result = verify_plan(&d, "parti ekle", &tools());
    assert!(result.has("calendar_write_no_temporal"));

    d.slots.insert("date".into(), json!("2025-03-01"));
    assert!(verify_plan(&d, "parti ekle", &tools()).ok);
}

#[test]
fn test_empty_temporal_slot_does_not_count() {
    let mut d = decision(Route::Calendar, &[]);
    d.calendar_intent = CalendarIntent::Modify;
    d.slots.insert("time".into(), json!("  "));
    assert!(verify_plan(&d, "toplantıyı değiştir", &tools()).has("calendar_write_no_temporal"));
}

#[test]
fn test_query_and_delete_exempt_from_temporal_rule() {
    for intent in [CalendarIntent::Query, CalendarIntent::Cancel, CalendarIntent::Delete] {
        let mut d = decision(Route::Calendar, &["calendar.list_events"]);
        d.calendar_intent = intent;
        assert!(verify_plan(&d, "takvimim", &tools()).ok, "{:?}", intent);
    }
}

#[test]
fn test_route_intent_mismatch() {
    let mut d = decision(Route::Gmail, &["gmail.search"]);
    d.calendar_intent = CalendarIntent::Query;
    assert!(verify_plan(&d, "mail ara", &tools()).has("route_intent_mismatch"));

    let mut d = decision(Route::Calendar, &["calendar.list_events"]);
    d.gmail_intent = GmailIntent::Search;
    assert!(verify_plan(&d, "takvim", &tools()).has("route_intent_mismatch"));
}

#[test]
fn test_rules_evaluated_independently() {
    let mut d = decision(Route::Gmail, &["nope.tool", "gmail.search"]);
    d.calendar_intent = CalendarIntent::Create;
    let result = verify_plan(&d, "karışık", &tools());
    assert_eq!(
        result.violations,
        vec![
            PlanViolation::UnknownTool {
                name: "nope.tool".into()
            },
            PlanViolation::CalendarWriteNoTemporal,
            PlanViolation::RouteIntentMismatch,
        ]
    );
}

#[test]
fn test_send_recipient_slot() {
    let mut d = decision(Route::Gmail, &["gmail.send"]);
    d.gmail_intent = GmailIntent::Send;
    assert!(verify_plan(&d, "mail gönder", &tools()).has("gmail_send_no_recipient"));
    d.slots.insert("to".into(), json!("ali@example.com"));
    assert!(verify_plan(&d, "mail gönder", &tools()).ok);
}
