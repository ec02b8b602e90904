//! Router output validation and repair.
//!
//! The routing model is small and its JSON is frequently broken: enum values
//! with typos, `tool_plan` given as a bare string, missing fields, Python
//! literals. This module is the single place that deals with that. It turns raw
//! text into a [`RouterDecision`] whose enum fields are always members of their
//! closed sets, and reports what it had to fix.
//!
//! # Enum repair order
//!
//! 1. exact match after trim/lowercase/`-`→`_`
//! 2. alias table (Turkish and English synonyms the router tends to emit)
//! 3. closest member by edit distance (≤ 2 and less than half the member length)
//! 4. the field's fallback (`unknown` for route, `none` for intents)
//!
//! Anything beyond step 1 with an unchanged label counts as a repair.

use crate::decision::{
    CalendarIntent, GmailIntent, Route, RouterDecision, RouterEnum, ValidationReport,
};
use crate::error::RouterError;
use crate::text::turkish_lower;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

/// Question used when the router sets `ask_user` without a question.
pub const DEFAULT_CLARIFY_QUESTION: &str =
    "Tam olarak ne yapmamı istediğinizi biraz daha açar mısınız efendim?";

/// Fields whose absence is reported in `missing_required`.
const SCHEMA_FIELDS: &[&str] = &["route", "calendar_intent", "gmail_intent", "confidence", "tool_plan"];

/// Fields that, when all absent, make the payload unusable.
const CORE_FIELDS: &[&str] = &["route", "confidence", "tool_plan"];

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("static regex"));
static PY_TRUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bTrue\b").expect("static regex"));
static PY_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bFalse\b").expect("static regex"));
static PY_NONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bNone\b").expect("static regex"));

const ROUTE_ALIASES: &[(&str, Route)] = &[
    ("takvim", Route::Calendar),
    ("event", Route::Calendar),
    ("events", Route::Calendar),
    ("schedule", Route::Calendar),
    ("mail", Route::Gmail),
    ("email", Route::Gmail),
    ("e_mail", Route::Gmail),
    ("eposta", Route::Gmail),
    ("e_posta", Route::Gmail),
    ("inbox", Route::Gmail),
    ("sistem", Route::System),
    ("device", Route::System),
    ("os", Route::System),
    ("greeting", Route::Smalltalk),
    ("sohbet", Route::Smalltalk),
    ("small_talk", Route::Smalltalk),
    ("wikipedia", Route::Wiki),
    ("ansiklopedi", Route::Wiki),
    ("knowledge", Route::Wiki),
    ("general", Route::Chat),
    ("genel", Route::Chat),
    ("conversation", Route::Chat),
];

const CALENDAR_ALIASES: &[(&str, CalendarIntent)] = &[
    ("add", CalendarIntent::Create),
    ("new", CalendarIntent::Create),
    ("ekle", CalendarIntent::Create),
    ("oluştur", CalendarIntent::Create),
    ("schedule", CalendarIntent::Create),
    ("update", CalendarIntent::Modify),
    ("edit", CalendarIntent::Modify),
    ("move", CalendarIntent::Modify),
    ("change", CalendarIntent::Modify),
    ("reschedule", CalendarIntent::Modify),
    ("güncelle", CalendarIntent::Modify),
    ("remove", CalendarIntent::Delete),
    ("sil", CalendarIntent::Delete),
    ("iptal", CalendarIntent::Cancel),
    ("list", CalendarIntent::Query),
    ("search", CalendarIntent::Query),
    ("show", CalendarIntent::Query),
    ("get", CalendarIntent::Query),
    ("listele", CalendarIntent::Query),
    ("null", CalendarIntent::None),
    ("n/a", CalendarIntent::None),
    ("no", CalendarIntent::None),
];

const GMAIL_ALIASES: &[(&str, GmailIntent)] = &[
    ("check", GmailIntent::List),
    ("inbox", GmailIntent::List),
    ("unread", GmailIntent::List),
    ("listele", GmailIntent::List),
    ("find", GmailIntent::Search),
    ("query", GmailIntent::Search),
    ("ara", GmailIntent::Search),
    ("open", GmailIntent::Read),
    ("show", GmailIntent::Read),
    ("oku", GmailIntent::Read),
    ("compose", GmailIntent::Send),
    ("write", GmailIntent::Send),
    ("draft", GmailIntent::Send),
    ("gönder", GmailIntent::Send),
    ("respond", GmailIntent::Reply),
    ("answer", GmailIntent::Reply),
    ("yanıtla", GmailIntent::Reply),
    ("cevapla", GmailIntent::Reply),
    ("fwd", GmailIntent::Forward),
    ("ilet", GmailIntent::Forward),
    ("remove", GmailIntent::Delete),
    ("trash", GmailIntent::Delete),
    ("sil", GmailIntent::Delete),
    ("mark_as_read", GmailIntent::MarkRead),
    ("markread", GmailIntent::MarkRead),
    ("okundu", GmailIntent::MarkRead),
    ("null", GmailIntent::None),
    ("n/a", GmailIntent::None),
    ("no", GmailIntent::None),
];

/// Extract and parse the JSON object from raw router text.
///
/// Handles markdown fences, prose around the object, trailing commas and
/// Python-style literals. Does not validate the schema.
pub fn parse_router_output(text: &str) -> Result<Value, RouterError> {
    let body = extract_json_object(text)?;

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(value);
    }

    let without_commas = TRAILING_COMMA.replace_all(body, "$1");
    if let Ok(value) = serde_json::from_str::<Value>(&without_commas) {
        return Ok(value);
    }

    let literals = PY_TRUE.replace_all(&without_commas, "true");
    let literals = PY_FALSE.replace_all(&literals, "false");
    let literals = PY_NONE.replace_all(&literals, "null");
    serde_json::from_str::<Value>(&literals).map_err(|e| RouterError::Parse(e.to_string()))
}

/// Locate the first balanced `{...}` span, respecting string literals.
fn extract_json_object(text: &str) -> Result<&str, RouterError> {
    let start = text
        .find('{')
        .ok_or_else(|| RouterError::Parse("no JSON object found".to_string()))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(RouterError::Parse("unterminated JSON object".to_string()))
}

/// Check raw router JSON without modifying it.
///
/// Returns `(ok, errors)`; `ok` is true only when the payload needs no repair
/// and is usable as-is.
pub fn validate(raw: &Value) -> (bool, Vec<String>) {
    let Some(obj) = raw.as_object() else {
        return (false, vec!["payload: expected a JSON object".to_string()]);
    };

    let mut errors = Vec::new();

    check_enum_field::<Route>(obj, &mut errors);
    check_enum_field::<CalendarIntent>(obj, &mut errors);
    check_enum_field::<GmailIntent>(obj, &mut errors);

    match obj.get("confidence") {
        None => errors.push("confidence: missing".to_string()),
        Some(Value::Number(n)) => {
            let c = n.as_f64().unwrap_or(-1.0);
            if !(0.0..=1.0).contains(&c) {
                errors.push(format!("confidence: {} outside 0..1", c));
            }
        }
        Some(other) => errors.push(format!("confidence: expected number, got {}", type_name(other))),
    }

    match obj.get("tool_plan") {
        None => errors.push("tool_plan: missing".to_string()),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => {}
                    _ => errors.push(format!("tool_plan[{}]: expected non-empty tool name", i)),
                }
            }
        }
        Some(other) => errors.push(format!("tool_plan: expected list, got {}", type_name(other))),
    }

    if let Some(slots) = obj.get("slots") {
        if !slots.is_object() && !slots.is_null() {
            errors.push(format!("slots: expected object, got {}", type_name(slots)));
        }
    }

    for field in ["ask_user", "requires_confirmation"] {
        if let Some(v) = obj.get(field) {
            if !v.is_boolean() && !v.is_null() {
                errors.push(format!("{}: expected bool, got {}", field, type_name(v)));
            }
        }
    }

    let requires_confirmation = obj
        .get("requires_confirmation")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let prompt_empty = obj
        .get("confirmation_prompt")
        .and_then(Value::as_str)
        .map(|s| s.trim().is_empty())
        .unwrap_or(true);
    if requires_confirmation && prompt_empty {
        errors.push("confirmation_prompt: required when requires_confirmation is true".to_string());
    }

    let ask_user = obj.get("ask_user").and_then(Value::as_bool).unwrap_or(false);
    let question_empty = obj
        .get("question")
        .and_then(Value::as_str)
        .map(|s| s.trim().is_empty())
        .unwrap_or(true);
    if ask_user && question_empty {
        errors.push("question: required when ask_user is true".to_string());
    }

    (errors.is_empty(), errors)
}

fn check_enum_field<E: RouterEnum>(obj: &Map<String, Value>, errors: &mut Vec<String>) {
    match obj.get(E::FIELD) {
        None => errors.push(format!("{}: missing", E::FIELD)),
        Some(Value::String(s)) if E::from_label(s).is_some() => {}
        Some(Value::String(s)) => errors.push(format!("{}: invalid value '{}'", E::FIELD, s)),
        Some(other) => errors.push(format!(
            "{}: expected string, got {}",
            E::FIELD,
            type_name(other)
        )),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Repair raw router JSON into a typed decision.
///
/// Fails with [`RouterError::Schema`] when the payload is not an object or has
/// none of route/confidence/tool_plan, and with
/// [`RouterError::MissingConfirmationPrompt`] when a confirmation is requested
/// without text to show.
pub fn repair(raw: &Value) -> Result<(RouterDecision, ValidationReport), RouterError> {
    let Some(obj) = raw.as_object() else {
        return Err(RouterError::Schema {
            missing: CORE_FIELDS.iter().map(|s| s.to_string()).collect(),
        });
    };

    if CORE_FIELDS.iter().all(|f| !obj.contains_key(*f)) {
        return Err(RouterError::Schema {
            missing: CORE_FIELDS.iter().map(|s| s.to_string()).collect(),
        });
    }

    let mut report = ValidationReport::default();
    for field in SCHEMA_FIELDS {
        if !obj.contains_key(*field) {
            report.missing_required.push(field.to_string());
        }
    }

    let mut repairer = Repairer { report: &mut report };

    let route = repairer.enum_field::<Route>(obj, ROUTE_ALIASES);
    let calendar_intent = repairer.enum_field::<CalendarIntent>(obj, CALENDAR_ALIASES);
    let gmail_intent = repairer.enum_field::<GmailIntent>(obj, GMAIL_ALIASES);
    let confidence = repairer.confidence(obj.get("confidence"));
    let tool_plan = repairer.tool_plan(obj.get("tool_plan"));
    let slots = repairer.slots(obj.get("slots"));
    let assistant_reply = repairer.text("assistant_reply", obj.get("assistant_reply"));
    let ask_user = repairer.boolean("ask_user", obj.get("ask_user"));
    let mut question = repairer.text("question", obj.get("question"));
    let requires_confirmation =
        repairer.boolean("requires_confirmation", obj.get("requires_confirmation"));
    let confirmation_prompt = repairer.text("confirmation_prompt", obj.get("confirmation_prompt"));
    let memory_update = repairer.memory_update(obj.get("memory_update"));
    let reasoning_summary = repairer.reasoning(obj.get("reasoning_summary"));

    if requires_confirmation && confirmation_prompt.is_empty() {
        return Err(RouterError::MissingConfirmationPrompt);
    }

    if ask_user && question.is_empty() {
        question = DEFAULT_CLARIFY_QUESTION.to_string();
        repairer.mark("question");
    }

    report.is_valid_before = report.fields_repaired.is_empty() && report.missing_required.is_empty();

    if !report.is_valid_before {
        debug!(
            repaired = ?report.fields_repaired,
            missing = ?report.missing_required,
            "router output repaired"
        );
    }

    let decision = RouterDecision {
        route,
        calendar_intent,
        gmail_intent,
        slots,
        confidence,
        tool_plan,
        assistant_reply,
        ask_user,
        question,
        requires_confirmation,
        confirmation_prompt,
        memory_update,
        reasoning_summary,
    };

    Ok((decision, report))
}

/// Parse raw text and repair it in one step.
pub fn repair_text(text: &str) -> Result<(RouterDecision, ValidationReport), RouterError> {
    let value = parse_router_output(text)?;
    repair(&value)
}

/// Closest member of `E` to `label`, if close enough to trust.
pub fn closest_match<E: RouterEnum>(label: &str) -> Option<E> {
    let mut best: Option<(usize, E)> = None;
    for candidate in E::ALL {
        let distance = strsim::levenshtein(label, candidate.as_str());
        let better = match best {
            None => true,
            Some((d, _)) => distance < d,
        };
        if better {
            best = Some((distance, *candidate));
        }
    }

    best.and_then(|(distance, candidate)| {
        let len = candidate.as_str().chars().count();
        (distance <= 2 && distance * 2 < len).then_some(candidate)
    })
}

fn normalize_label(label: &str) -> String {
    turkish_lower(label.trim()).replace(['-', ' '], "_")
}

/// Accumulates repaired field names into a report.
struct Repairer<'a> {
    report: &'a mut ValidationReport,
}

impl Repairer<'_> {
    fn mark(&mut self, field: &str) {
        if !self.report.fields_repaired.iter().any(|f| f == field) {
            self.report.fields_repaired.push(field.to_string());
        }
    }

    fn enum_field<E: RouterEnum>(&mut self, obj: &Map<String, Value>, aliases: &[(&str, E)]) -> E {
        let Some(Value::String(raw)) = obj.get(E::FIELD) else {
            self.mark(E::FIELD);
            return E::fallback();
        };

        if let Some(exact) = E::from_label(raw) {
            return exact;
        }

        self.mark(E::FIELD);
        let label = normalize_label(raw);

        if let Some(v) = E::from_label(&label) {
            return v;
        }
        if let Some((_, v)) = aliases.iter().find(|(alias, _)| *alias == label) {
            return *v;
        }
        if let Some(v) = closest_match::<E>(&label) {
            debug!(field = E::FIELD, from = %raw, to = v.as_str(), "fuzzy enum repair");
            return v;
        }
        E::fallback()
    }

    fn confidence(&mut self, value: Option<&Value>) -> f64 {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => {
                self.mark("confidence");
                s.trim().trim_end_matches('%').parse::<f64>().ok()
            }
            _ => None,
        };

        let Some(c) = parsed else {
            self.mark("confidence");
            return 0.0;
        };

        if (0.0..=1.0).contains(&c) {
            return c;
        }

        self.mark("confidence");
        if c > 1.0 && c <= 100.0 {
            c / 100.0
        } else {
            c.clamp(0.0, 1.0)
        }
    }

    fn tool_plan(&mut self, value: Option<&Value>) -> Vec<String> {
        match value {
            Some(Value::Array(items)) => {
                let mut plan = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if !s.trim().is_empty() => {
                            if s.trim() != s {
                                self.mark("tool_plan");
                            }
                            plan.push(s.trim().to_string());
                        }
                        Value::Object(o) => {
                            self.mark("tool_plan");
                            if let Some(name) = o
                                .get("name")
                                .or_else(|| o.get("tool"))
                                .and_then(Value::as_str)
                                .filter(|s| !s.trim().is_empty())
                            {
                                plan.push(name.trim().to_string());
                            }
                        }
                        _ => self.mark("tool_plan"),
                    }
                }
                plan
            }
            Some(Value::String(s)) => {
                self.mark("tool_plan");
                let name = s.trim();
                if name.is_empty() {
                    Vec::new()
                } else {
                    vec![name.to_string()]
                }
            }
            _ => {
                self.mark("tool_plan");
                Vec::new()
            }
        }
    }

    fn slots(&mut self, value: Option<&Value>) -> BTreeMap<String, Value> {
        match value {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None | Some(Value::Null) => BTreeMap::new(),
            Some(_) => {
                self.mark("slots");
                BTreeMap::new()
            }
        }
    }

    fn text(&mut self, field: &str, value: Option<&Value>) -> String {
        match value {
            Some(Value::String(s)) => s.trim().to_string(),
            None | Some(Value::Null) => String::new(),
            Some(Value::Number(n)) => {
                self.mark(field);
                n.to_string()
            }
            Some(_) => {
                self.mark(field);
                String::new()
            }
        }
    }

    fn boolean(&mut self, field: &str, value: Option<&Value>) -> bool {
        match value {
            Some(Value::Bool(b)) => *b,
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => {
                self.mark(field);
                matches!(
                    turkish_lower(s.trim()).as_str(),
                    "true" | "yes" | "evet" | "1"
                )
            }
            Some(Value::Number(n)) => {
                self.mark(field);
                n.as_f64().map(|f| f != 0.0).unwrap_or(false)
            }
            Some(_) => {
                self.mark(field);
                false
            }
        }
    }

    fn memory_update(&mut self, value: Option<&Value>) -> Option<String> {
        match value {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            None | Some(Value::Null) | Some(Value::String(_)) => None,
            Some(other) => {
                self.mark("memory_update");
                Some(other.to_string())
            }
        }
    }

    fn reasoning(&mut self, value: Option<&Value>) -> Vec<String> {
        match value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => {
                        self.mark("reasoning_summary");
                        Some(other.to_string())
                    }
                })
                .collect(),
            Some(Value::String(s)) => {
                self.mark("reasoning_summary");
                if s.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![s.trim().to_string()]
                }
            }
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                self.mark("reasoning_summary");
                Vec::new()
            }
        }
    }
}
