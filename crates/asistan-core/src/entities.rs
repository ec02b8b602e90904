//! Short-term entity memory.
//!
//! Tool results that name something identifiable (an event, a message) are kept
//! for a few turns so the user can refer back to them ("onu sil", "ikinciyi
//! oku"). Entries decay by turn count, not wall clock.
//!
//! `age` is stamped by [`EntitySlotRegistry::expire_stale`]. Between
//! compactions it reads as of the last pass, and a never-compacted entity has
//! age 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Keys that may hold a list of candidate objects in a tool result
const LIST_KEYS: &[&str] = &["items", "events", "messages", "results", "candidates", "threads"];

/// Keys that may hold an entity id
const ID_KEYS: &[&str] = &["id", "event_id", "message_id", "thread_id"];

/// Keys used to label an item, most descriptive first
const LABEL_KEYS: &[&str] = &["title", "summary", "subject", "name", "snippet"];

/// Keys used to qualify a label (when / who)
const QUALIFIER_KEYS: &[&str] = &["start", "date", "time", "from"];

/// Prompt-block key order; unlisted keys follow alphabetically
const KEY_PRIORITY: &[&str] = &[
    "title", "summary", "subject", "name", "date", "time", "start", "end", "from", "to",
    "location", "snippet",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// TTL in turns for types without an override
    #[serde(default = "default_ttl")]
    pub default_ttl: u64,
    #[serde(default)]
    pub ttl_overrides: BTreeMap<String, u64>,
    /// Hard cap for `to_prompt_block`, in characters
    #[serde(default = "default_prompt_budget")]
    pub prompt_budget_chars: usize,
    /// Cap for a single value inside the block
    #[serde(default = "default_value_cap")]
    pub value_cap_chars: usize,
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,
}

fn default_ttl() -> u64 {
    3
}

fn default_prompt_budget() -> usize {
    400
}

fn default_value_cap() -> usize {
    80
}

fn default_max_entities() -> usize {
    16
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            ttl_overrides: BTreeMap::new(),
            prompt_budget_chars: default_prompt_budget(),
            value_cap_chars: default_value_cap(),
            max_entities: default_max_entities(),
        }
    }
}

impl EntityConfig {
    pub fn ttl_for(&self, entity_type: &str) -> u64 {
        self.ttl_overrides
            .get(entity_type)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

/// An entity extracted from a tool result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySlot {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
    pub source_tool: String,
    pub created_at_turn: u64,
    /// Turns this entity stays live
    pub ttl: u64,
    /// Stamped by the registry's decay pass
    #[serde(default)]
    age: u64,
}

impl EntitySlot {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        source_tool: impl Into<String>,
        created_at_turn: u64,
        ttl: u64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            slots: BTreeMap::new(),
            source_tool: source_tool.into(),
            created_at_turn,
            ttl,
            age: 0,
        }
    }

    pub fn with_slot(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(key.into(), value.into());
        self
    }

    /// Age in turns as of the last `expire_stale` pass
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Human-readable label ("Parti (2025-03-01 20:00)")
    pub fn label(&self) -> String {
        let base = LABEL_KEYS
            .iter()
            .find_map(|k| self.slots.get(*k))
            .cloned()
            .unwrap_or_else(|| self.entity_id.clone());
        match QUALIFIER_KEYS.iter().find_map(|k| self.slots.get(*k)) {
            Some(q) => format!("{} ({})", base, q),
            None => base,
        }
    }
}

/// Session-owned short-term memory of entities
#[derive(Debug, Clone, Default)]
pub struct EntitySlotRegistry {
    entries: Vec<EntitySlot>,
    config: EntityConfig,
    last_compaction_turn: Option<u64>,
}

impl EntitySlotRegistry {
    pub fn new(config: EntityConfig) -> Self {
        Self {
            entries: Vec::new(),
            config,
            last_compaction_turn: None,
        }
    }

    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Add an entity. Same (type, id) replaces the older entry.
    pub fn register(&mut self, mut entity: EntitySlot) {
        self.entries.retain(|e| {
            !(e.entity_type == entity.entity_type && e.entity_id == entity.entity_id)
        });
        entity.age = 0;
        self.entries.push(entity);
        while self.entries.len() > self.config.max_entities.max(1) {
            self.entries.remove(0);
        }
    }

    /// Stamp ages for `current_turn` and evict entities past their TTL.
    /// Returns the number evicted.
    pub fn expire_stale(&mut self, current_turn: u64) -> usize {
        let before = self.entries.len();
        for entity in &mut self.entries {
            entity.age = current_turn.saturating_sub(entity.created_at_turn);
        }
        self.entries.retain(|e| e.age <= e.ttl);
        self.last_compaction_turn = Some(current_turn);
        before - self.entries.len()
    }

    pub fn last_compaction_turn(&self) -> Option<u64> {
        self.last_compaction_turn
    }

    /// Most recently registered entity of a type
    pub fn latest(&self, entity_type: &str) -> Option<&EntitySlot> {
        self.entries.iter().rev().find(|e| e.entity_type == entity_type)
    }

    pub fn find(&self, entity_type: &str, entity_id: &str) -> Option<&EntitySlot> {
        self.entries
            .iter()
            .find(|e| e.entity_type == entity_type && e.entity_id == entity_id)
    }

    pub fn entries(&self) -> &[EntitySlot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize live entities as a compact JSON array within the char budget.
    ///
    /// Newest entity first. Long values are cut inside their string; when over
    /// budget, slot keys are dropped lowest priority first (oldest entity
    /// first), then whole entities from the oldest end. The output is always a
    /// complete JSON array or empty.
    pub fn to_prompt_block(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let cap = self.config.value_cap_chars.max(8);
        let mut rows: Vec<Vec<(String, String)>> = self
            .entries
            .iter()
            .rev()
            .map(|e| entity_pairs(e, cap))
            .collect();

        let budget = self.config.prompt_budget_chars;
        loop {
            let rendered = render_rows(&rows);
            if rendered.chars().count() <= budget {
                return rendered;
            }
            // type and id are the first two pairs and are never dropped alone
            if let Some(row) = rows.iter_mut().rev().find(|r| r.len() > 2) {
                row.pop();
                continue;
            }
            rows.pop();
            if rows.is_empty() {
                return String::new();
            }
        }
    }
}

fn entity_pairs(entity: &EntitySlot, cap: usize) -> Vec<(String, String)> {
    let mut keys: Vec<&String> = entity.slots.keys().collect();
    keys.sort_by_key(|k| {
        let rank = KEY_PRIORITY
            .iter()
            .position(|p| *p == k.as_str())
            .unwrap_or(KEY_PRIORITY.len());
        (rank, (*k).clone())
    });

    let mut pairs = vec![
        ("type".to_string(), clip(&entity.entity_type, cap)),
        ("id".to_string(), clip(&entity.entity_id, cap)),
    ];
    for key in keys {
        pairs.push((key.clone(), clip(&entity.slots[key], cap)));
    }
    pairs
}

fn clip(value: &str, cap: usize) -> String {
    crate::text::truncate_chars(value, cap, "…")
}

fn render_rows(rows: &[Vec<(String, String)>]) -> String {
    let objects: Vec<String> = rows
        .iter()
        .map(|row| {
            let fields: Vec<String> = row
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        Value::String(v.clone())
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        })
        .collect();
    format!("[{}]", objects.join(","))
}

/// Candidate objects in a tool result: a list under a known key, or a bare list.
pub fn candidate_items(raw: &Value) -> Vec<&Value> {
    let list = match raw {
        Value::Array(items) => Some(items),
        Value::Object(obj) => LIST_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|items| items.iter().filter(|v| v.is_object()).collect())
        .unwrap_or_default()
}

/// Id of an item, if it has one
pub fn item_id(item: &Value) -> Option<String> {
    ID_KEYS.iter().find_map(|k| match item.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Flatten scalar fields of an item into slot strings.
///
/// Nested `{"dateTime": ..}` / `{"date": ..}` objects (calendar style) are
/// reduced to their value; other nested values are skipped.
pub fn item_slots(item: &Value) -> BTreeMap<String, String> {
    let mut slots = BTreeMap::new();
    let Some(obj) = item.as_object() else {
        return slots;
    };
    for (key, value) in obj {
        if ID_KEYS.contains(&key.as_str()) {
            continue;
        }
        let flat = match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Object(inner) => inner
                .get("dateTime")
                .or_else(|| inner.get("date"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        if let Some(flat) = flat {
            slots.insert(key.clone(), flat);
        }
    }
    slots
}

/// Entity type produced by a tool namespace
pub fn entity_type_for_tool(tool: &str) -> String {
    let namespace = tool.split('.').next().unwrap_or(tool);
    match namespace {
        "calendar" => "calendar_event".to_string(),
        "gmail" => "email".to_string(),
        other => other.to_string(),
    }
}

/// Build entities from a tool result.
pub fn extract_entities(
    tool: &str,
    raw_result: &Value,
    turn: u64,
    config: &EntityConfig,
) -> Vec<EntitySlot> {
    let entity_type = entity_type_for_tool(tool);
    let ttl = config.ttl_for(&entity_type);

    let mut items = candidate_items(raw_result);
    if items.is_empty() && raw_result.is_object() {
        items.push(raw_result);
    }

    items
        .into_iter()
        .filter_map(|item| {
            let id = item_id(item)?;
            let mut entity = EntitySlot::new(entity_type.clone(), id, tool, turn, ttl);
            entity.slots = item_slots(item);
            Some(entity)
        })
        .collect()
}
