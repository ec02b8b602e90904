//! Per-conversation state.
//!
//! A `Session` is owned by the host and passed as `&mut Session` into every
//! turn, so one session only ever has a single writer.

use crate::config::CoreConfig;
use crate::decision::ValidationReport;
use crate::dialog::DialogStateMachine;
use crate::entities::EntitySlotRegistry;
use crate::llm::ChatMessage;
use crate::tier::{TierDecision, TierReason, TierStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Router health and tier counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub turns: u64,
    /// Router outputs that reached the validator
    pub router_outputs: u64,
    /// Outputs that needed no repair
    pub router_valid_before: u64,
    /// Turns where the router output could not be used at all
    pub router_failures: u64,
    /// Repair count per field name
    pub repaired_fields: BTreeMap<String, u64>,
    pub tier: TierStats,
}

impl SessionStats {
    pub fn record_validation(&mut self, report: &ValidationReport) {
        self.router_outputs += 1;
        if report.is_valid_before {
            self.router_valid_before += 1;
        }
        for field in &report.fields_repaired {
            *self.repaired_fields.entry(field.clone()).or_insert(0) += 1;
        }
    }

    pub fn record_tier(&mut self, decision: &TierDecision) {
        if decision.use_quality {
            self.tier.quality += 1;
        } else {
            self.tier.fast += 1;
        }
        if decision.reason == TierReason::SimpleGreeting {
            self.tier.greeting_short_circuits += 1;
        }
    }

    /// Share of router outputs that were valid without repair
    pub fn valid_before_rate(&self) -> f64 {
        if self.router_outputs == 0 {
            return 1.0;
        }
        self.router_valid_before as f64 / self.router_outputs as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Turn counter, 1 on the first turn
    pub turn: u64,
    pub dialog: DialogStateMachine,
    pub entities: EntitySlotRegistry,
    /// Persisted `memory_update` notes, oldest first
    pub memory: Vec<String>,
    /// Recent user/assistant messages, oldest first
    pub history: Vec<ChatMessage>,
    pub stats: SessionStats,
}

impl Session {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            turn: 0,
            dialog: DialogStateMachine::new(config.dialog.clone()),
            entities: EntitySlotRegistry::new(config.entities.clone()),
            memory: Vec::new(),
            history: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    /// Advance the turn counter and return the new turn
    pub fn advance_turn(&mut self) -> u64 {
        self.turn += 1;
        self.stats.turns += 1;
        self.turn
    }

    /// Store a memory note. Duplicates are ignored, the oldest note is dropped
    /// past `max_notes`. Returns true when the note was new.
    pub fn remember(&mut self, note: &str, max_notes: usize) -> bool {
        let note = note.trim();
        if note.is_empty() || max_notes == 0 {
            return false;
        }
        if self.memory.iter().any(|n| n.eq_ignore_ascii_case(note)) {
            return false;
        }
        self.memory.push(note.to_string());
        if self.memory.len() > max_notes {
            let excess = self.memory.len() - max_notes;
            self.memory.drain(..excess);
        }
        true
    }

    /// Append one exchange, keeping the last `max_turns` exchanges
    pub fn push_exchange(&mut self, user_text: &str, reply: &str, max_turns: usize) {
        self.history.push(ChatMessage::user(user_text));
        self.history.push(ChatMessage::assistant(reply));
        let cap = max_turns * 2;
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
    }
}
