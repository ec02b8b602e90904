//! Confirmation and disambiguation dialog state.
//!
//! Three states, mutually exclusive:
//!
//! ```text
//! IDLE ──trigger──▶ PENDING_CONFIRMATION   ──resolution──▶ IDLE
//! IDLE ──trigger──▶ PENDING_DISAMBIGUATION ──resolution──▶ IDLE
//! ```
//!
//! A pending state can only be entered from IDLE. Resolution covers a clear
//! answer, an explicit cancel, and abandonment after `max_reprompts`
//! unanswerable replies. The machine holds the parked tool calls; it never
//! executes them itself.

use crate::decision::Route;
use crate::entities::{candidate_items, entity_type_for_tool, item_id, item_slots, EntitySlot};
use crate::error::DialogError;
use crate::text::tokens;
use crate::tools::{EntityParam, PlannedCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const AFFIRMATIVE: &[&str] = &[
    "evet", "e", "tamam", "olur", "onay", "onayla", "onaylıyorum", "peki", "aynen", "kesinlikle",
    "tabii", "tabi", "elbette", "doğru", "yap", "ekle", "gönder", "ok", "okey", "yes",
];

const NEGATIVE: &[&str] = &[
    "hayır", "hayir", "yok", "iptal", "vazgeç", "vazgeçtim", "istemiyorum", "yapma", "ekleme",
    "gönderme", "dur", "boşver", "olmaz", "no",
];

/// Ordinal stems and their 1-based index
const ORDINALS: &[(&str, usize)] = &[
    ("ilk", 1),
    ("birinci", 1),
    ("ikinci", 2),
    ("üçüncü", 3),
    ("dördüncü", 4),
    ("beşinci", 5),
    ("altıncı", 6),
];

/// Words meaning "the last one"
/// Case endings accepted after an ordinal stem ("ikincisi", "ilkini", "ikinciyi")
const ORDINAL_SUFFIXES: &[&str] = &[
    "", "i", "ı", "u", "ü", "e", "a", "si", "sı", "su", "sü", "sini", "sını", "sunu", "sünü",
    "sine", "sına", "ini", "ını", "unu", "ünü", "ine", "ına", "yi", "yı", "yu", "yü", "ye", "ya",
];

const LAST_WORDS: &[&str] = &["son", "sonuncu", "sonuncusu", "sonuncuyu", "sonuncusunu"];

pub const CANCEL_MESSAGE: &str = "Peki efendim, işlemi iptal ettim.";
pub const REASK_MESSAGE: &str =
    "Anlayamadım efendim. Onaylıyorsanız 'evet', vazgeçmek için 'hayır' deyin.";
pub const ABANDON_MESSAGE: &str =
    "Yanıtınızı anlayamadığım için bekleyen işlemi iptal ettim efendim.";
pub const NO_PENDING_MESSAGE: &str = "Şu an seçim bekleyen bir işlem yok efendim.";
pub const UNPARSED_CHOICE_MESSAGE: &str =
    "Hangi seçeneği kastettiğinizi anlayamadım efendim. Lütfen numarasını söyleyin (örneğin #1).";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Intents for which multiple matches trigger a "which one?" question
    #[serde(default = "default_disambiguation_intents")]
    pub disambiguation_intents: Vec<String>,
    /// Unanswerable replies tolerated before a pending state is dropped
    #[serde(default = "default_max_reprompts")]
    pub max_reprompts: u32,
    /// Candidates listed in a disambiguation question
    #[serde(default = "default_max_listed_items")]
    pub max_listed_items: usize,
}

fn default_disambiguation_intents() -> Vec<String> {
    ["modify", "cancel", "delete", "read", "reply", "forward", "mark_read"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_reprompts() -> u32 {
    3
}

fn default_max_listed_items() -> usize {
    5
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            disambiguation_intents: default_disambiguation_intents(),
            max_reprompts: default_max_reprompts(),
            max_listed_items: default_max_listed_items(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogMode {
    Idle,
    PendingConfirmation,
    PendingDisambiguation,
}

impl DialogMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogMode::Idle => "IDLE",
            DialogMode::PendingConfirmation => "PENDING_CONFIRMATION",
            DialogMode::PendingDisambiguation => "PENDING_DISAMBIGUATION",
        }
    }
}

impl std::fmt::Display for DialogMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool calls parked until the user answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldAction {
    pub steps: Vec<PlannedCall>,
    pub route: Route,
    pub intent: String,
    /// Utterance that produced the plan, used for finalization
    pub user_text: String,
    /// Short Turkish description ("'Parti' etkinliğini oluşturmak")
    pub summary: String,
    /// Router `memory_update`, stored once the plan is finalized
    #[serde(default)]
    pub memory_update: Option<String>,
}

/// One choice in a disambiguation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// 1-based, as shown to the user
    pub index: usize,
    pub entity_id: String,
    pub entity_type: String,
    pub label: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisambiguationRequest {
    pub question: String,
    pub items: Vec<CandidateItem>,
    pub source_tool: String,
    pub intent: String,
    /// Calls to run with the chosen entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<HeldAction>,
    /// Parameter of the follow-up that receives the chosen id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_param: Option<EntityParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisambiguationResult {
    pub resolved: bool,
    pub selected: Option<CandidateItem>,
    pub message: String,
}

/// Payload held while a pending state is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingPayload {
    Confirmation { action: HeldAction, prompt: String },
    Disambiguation(DisambiguationRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub mode: DialogMode,
    pub pending: Option<PendingPayload>,
    /// Unanswerable replies since entering the pending state
    pub reprompts: u32,
}

impl Default for DialogState {
    fn default() -> Self {
        Self {
            mode: DialogMode::Idle,
            pending: None,
            reprompts: 0,
        }
    }
}

/// Classified yes/no reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    /// Run the held action; state is IDLE
    Confirmed(HeldAction),
    Cancelled { message: String },
    /// Still pending
    Reask { message: String },
    Abandoned { message: String },
    NotPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisambiguationOutcome {
    /// State is IDLE; run `request.follow_up` with `selected`
    Resolved {
        selected: CandidateItem,
        request: DisambiguationRequest,
    },
    Cancelled { message: String },
    /// Still pending
    Reask { message: String },
    Abandoned { message: String },
    NotPending,
}

/// Classify a reply to a yes/no question.
///
/// A reply carrying both an affirmative and a negative word is ambiguous.
pub fn classify_confirmation(reply: &str) -> ConfirmationReply {
    let words = tokens(reply);
    let yes = words.iter().any(|w| AFFIRMATIVE.contains(&w.as_str()));
    let no = words.iter().any(|w| NEGATIVE.contains(&w.as_str()));
    match (yes, no) {
        (true, false) => ConfirmationReply::Affirmative,
        (false, true) => ConfirmationReply::Negative,
        _ => ConfirmationReply::Ambiguous,
    }
}

/// Which choice a reply points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Index(usize),
    Last,
}

fn parse_choice(reply: &str) -> Option<Choice> {
    for word in tokens(reply) {
        let digits = word.strip_prefix('#').unwrap_or(word.as_str());
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            // overlong digit strings are out of range anyway
            return Some(Choice::Index(digits.parse().unwrap_or(usize::MAX)));
        }
        if LAST_WORDS.contains(&word.as_str()) {
            return Some(Choice::Last);
        }
        let ordinal = ORDINALS.iter().find(|(stem, _)| {
            word.strip_prefix(*stem)
                .is_some_and(|rest| ORDINAL_SUFFIXES.contains(&rest))
        });
        if let Some((_, n)) = ordinal {
            return Some(Choice::Index(*n));
        }
    }
    None
}

/// Resolve a reply against a pending disambiguation. Never panics.
pub fn resolve_response(
    user_reply: &str,
    pending: Option<&DisambiguationRequest>,
) -> DisambiguationResult {
    let unresolved = |message: String| DisambiguationResult {
        resolved: false,
        selected: None,
        message,
    };

    let Some(request) = pending else {
        return unresolved(NO_PENDING_MESSAGE.to_string());
    };

    let Some(choice) = parse_choice(user_reply) else {
        return unresolved(UNPARSED_CHOICE_MESSAGE.to_string());
    };

    let count = request.items.len();
    let index = match choice {
        Choice::Index(n) => n,
        Choice::Last => count,
    };

    match request.items.iter().find(|item| item.index == index) {
        Some(item) => DisambiguationResult {
            resolved: true,
            selected: Some(item.clone()),
            message: format!("Tamam efendim, '{}' seçildi.", item.label),
        },
        None => unresolved(format!(
            "Listede {} numaralı bir seçenek yok efendim. Lütfen 1 ile {} arasında bir numara söyleyin.",
            index, count
        )),
    }
}

/// Turkish question listing candidates as #1, #2, ...
pub fn disambiguation_question(items: &[CandidateItem]) -> String {
    let mut lines = vec!["Birden fazla eşleşme buldum efendim, hangisini kastettiniz?".to_string()];
    for item in items {
        lines.push(format!("#{} {}", item.index, item.label));
    }
    lines.push("Numarasını söylemeniz yeterli (örneğin #1).".to_string());
    lines.join("\n")
}

/// Confirmation prompt used when the router did not supply one
pub fn default_confirmation_prompt(summary: &str) -> String {
    format!(
        "{} istiyorsunuz, onaylıyor musunuz efendim? Lütfen 'evet' ya da 'hayır' deyin.",
        summary
    )
}

/// Dialog state machine, one per session
#[derive(Debug, Clone, Default)]
pub struct DialogStateMachine {
    state: DialogState,
    config: DialogConfig,
}

impl DialogStateMachine {
    pub fn new(config: DialogConfig) -> Self {
        Self {
            state: DialogState::default(),
            config,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn mode(&self) -> DialogMode {
        self.state.mode
    }

    pub fn is_idle(&self) -> bool {
        self.state.mode == DialogMode::Idle
    }

    /// Question or prompt currently shown to the user, if pending
    pub fn pending_prompt(&self) -> Option<&str> {
        match &self.state.pending {
            Some(PendingPayload::Confirmation { prompt, .. }) => Some(prompt),
            Some(PendingPayload::Disambiguation(req)) => Some(&req.question),
            None => None,
        }
    }

    pub fn pending_disambiguation(&self) -> Option<&DisambiguationRequest> {
        match &self.state.pending {
            Some(PendingPayload::Disambiguation(req)) => Some(req),
            _ => None,
        }
    }

    /// Build a disambiguation request when an eligible intent produced two or
    /// more candidates. The last successful result with a candidate list is
    /// the relevant one.
    pub fn check_tool_results(
        &self,
        tool_results: &[ToolResult],
        intent: &str,
    ) -> Option<DisambiguationRequest> {
        if !self.config.disambiguation_intents.iter().any(|i| i == intent) {
            return None;
        }

        let (result, items) = tool_results.iter().rev().find_map(|r| {
            if !r.success {
                return None;
            }
            let items: Vec<&Value> = candidate_items(&r.raw_result)
                .into_iter()
                .filter(|item| item_id(item).is_some())
                .collect();
            (!items.is_empty()).then_some((r, items))
        })?;

        if items.len() < 2 {
            return None;
        }

        let entity_type = entity_type_for_tool(&result.tool);
        let candidates: Vec<CandidateItem> = items
            .into_iter()
            .take(self.config.max_listed_items.max(2))
            .enumerate()
            .filter_map(|(i, item)| {
                let entity_id = item_id(item)?;
                let mut slot = EntitySlot::new(entity_type.clone(), entity_id.clone(), &result.tool, 0, 0);
                slot.slots = item_slots(item);
                Some(CandidateItem {
                    index: i + 1,
                    entity_id,
                    entity_type: entity_type.clone(),
                    label: slot.label(),
                    raw: item.clone(),
                })
            })
            .collect();

        Some(DisambiguationRequest {
            question: disambiguation_question(&candidates),
            items: candidates,
            source_tool: result.tool.clone(),
            intent: intent.to_string(),
            follow_up: None,
            entity_param: None,
        })
    }

    /// IDLE -> PENDING_CONFIRMATION
    pub fn begin_confirmation(&mut self, action: HeldAction, prompt: String) -> Result<(), DialogError> {
        self.ensure_idle("PENDING_CONFIRMATION")?;
        self.state = DialogState {
            mode: DialogMode::PendingConfirmation,
            pending: Some(PendingPayload::Confirmation { action, prompt }),
            reprompts: 0,
        };
        Ok(())
    }

    /// IDLE -> PENDING_DISAMBIGUATION
    pub fn begin_disambiguation(&mut self, request: DisambiguationRequest) -> Result<(), DialogError> {
        self.ensure_idle("PENDING_DISAMBIGUATION")?;
        if request.items.len() < 2 {
            return Err(DialogError::NotEnoughCandidates);
        }
        self.state = DialogState {
            mode: DialogMode::PendingDisambiguation,
            pending: Some(PendingPayload::Disambiguation(request)),
            reprompts: 0,
        };
        Ok(())
    }

    fn ensure_idle(&self, requested: &'static str) -> Result<(), DialogError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(DialogError::AlreadyPending {
                current: self.state.mode.as_str(),
                requested,
            })
        }
    }

    /// Handle a reply while PENDING_CONFIRMATION.
    pub fn handle_confirmation_reply(&mut self, reply: &str) -> ConfirmationOutcome {
        if self.state.mode != DialogMode::PendingConfirmation {
            return ConfirmationOutcome::NotPending;
        }

        match classify_confirmation(reply) {
            ConfirmationReply::Affirmative => match self.take_pending() {
                Some(PendingPayload::Confirmation { action, .. }) => ConfirmationOutcome::Confirmed(action),
                _ => ConfirmationOutcome::NotPending,
            },
            ConfirmationReply::Negative => {
                self.reset();
                ConfirmationOutcome::Cancelled {
                    message: CANCEL_MESSAGE.to_string(),
                }
            }
            ConfirmationReply::Ambiguous => {
                if self.bump_reprompts() {
                    ConfirmationOutcome::Abandoned {
                        message: ABANDON_MESSAGE.to_string(),
                    }
                } else {
                    ConfirmationOutcome::Reask {
                        message: REASK_MESSAGE.to_string(),
                    }
                }
            }
        }
    }

    /// Handle a reply while PENDING_DISAMBIGUATION.
    pub fn handle_disambiguation_reply(&mut self, reply: &str) -> DisambiguationOutcome {
        if self.state.mode != DialogMode::PendingDisambiguation {
            return DisambiguationOutcome::NotPending;
        }

        // "hayır, ilk değil" cancels rather than picking #1
        if classify_confirmation(reply) == ConfirmationReply::Negative {
            self.reset();
            return DisambiguationOutcome::Cancelled {
                message: "Peki efendim, seçimi iptal ettim.".to_string(),
            };
        }

        let result = resolve_response(reply, self.pending_disambiguation());
        if result.resolved {
            if let (Some(selected), Some(PendingPayload::Disambiguation(request))) =
                (result.selected, self.take_pending())
            {
                return DisambiguationOutcome::Resolved { selected, request };
            }
            return DisambiguationOutcome::NotPending;
        }

        let question = self.pending_prompt().unwrap_or_default().to_string();
        if self.bump_reprompts() {
            return DisambiguationOutcome::Abandoned {
                message: ABANDON_MESSAGE.to_string(),
            };
        }
        DisambiguationOutcome::Reask {
            message: format!("{}\n{}", result.message, question),
        }
    }

    /// Count an unanswerable reply; resets and returns true once the cap is hit.
    fn bump_reprompts(&mut self) -> bool {
        self.state.reprompts += 1;
        if self.state.reprompts >= self.config.max_reprompts.max(1) {
            self.reset();
            true
        } else {
            false
        }
    }

    fn take_pending(&mut self) -> Option<PendingPayload> {
        let pending = self.state.pending.take();
        self.reset();
        pending
    }

    /// Back to IDLE, dropping any pending payload
    pub fn reset(&mut self) {
        self.state = DialogState::default();
    }
}
