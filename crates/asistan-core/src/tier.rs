//! Fast vs quality finalizer selection.
//!
//! Decision order:
//! 1. tiering disabled in config -> fast, `tiering_disabled`
//! 2. forced tier in config -> that tier, `forced_fast` / `forced_quality`
//! 3. smalltalk greeting -> fast, `simple_greeting`
//! 4. writing-need score above threshold -> quality, `writing_need`
//! 5. many planned tools -> quality, `multi_tool_synthesis`
//! 6. otherwise fast, `default_fast`

use crate::decision::Route;
use crate::text::normalize_utterance;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Write-intent verbs
static WRITE_RULES: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\byaz\w*").expect("static regex"), 4),
        (Regex::new(r"(?i)\boluştur\w*").expect("static regex"), 4),
        (Regex::new(r"(?i)\btasla[kğ]\w*").expect("static regex"), 4),
        (Regex::new(r"(?i)\bhazırla\w*").expect("static regex"), 4),
        (Regex::new(r"(?i)\bkaleme\s+al\w*").expect("static regex"), 4),
    ]
});

/// Domain nouns that usually mean composing text
static DOMAIN_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:e-?posta\w*|mail\w*|linkedin\w*|mesaj\w*|post\w*|rapor\w*|blog\w*|makale\w*)")
        .expect("static regex")
});

/// Read-only verbs; a domain noun next to one of these is a lookup
static READ_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ara(?:r|yın|yin|sana|t)?|bul\w*|getir\w*|tara(?:r|yın|sana)?|sorgula\w*|listele\w*|göster\w*)\b",
    )
    .expect("static regex")
});

/// Short-answer markers
static DAMPENER_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\bkısaca\b|\btl;?dr\b|\bözetle\b)").expect("static regex"));

const WRITE_WEIGHT_DOMAIN: u32 = 3;
const WRITE_WEIGHT_DOMAIN_READ: u32 = 1;
const DAMPENER_PENALTY: u32 = 2;

/// Whole-utterance greetings and farewells
const GREETINGS: &[&str] = &[
    "merhaba",
    "merhabalar",
    "selam",
    "selamlar",
    "günaydın",
    "iyi günler",
    "iyi akşamlar",
    "iyi geceler",
    "nasılsın",
    "naber",
    "hey",
    "alo",
    "hoşça kal",
    "görüşürüz",
    "teşekkürler",
    "teşekkür ederim",
    "sağ ol",
    "sağol",
];

/// Planned tools that produce user-facing prose
const WRITING_TOOLS: &[&str] = &["gmail.send", "gmail.reply", "gmail.forward", "gmail.draft"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierForce {
    Fast,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// `None` means unconfigured, which is on
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub force: Option<TierForce>,
    /// Turn score strictly above this selects quality
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: u32,
    /// Planned tool count at or above this selects quality
    #[serde(default = "default_multi_tool_threshold")]
    pub multi_tool_threshold: usize,
}

fn default_quality_threshold() -> u32 {
    3
}

fn default_multi_tool_threshold() -> usize {
    3
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            force: None,
            quality_threshold: default_quality_threshold(),
            multi_tool_threshold: default_multi_tool_threshold(),
        }
    }
}

impl TierConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierReason {
    TieringDisabled,
    ForcedFast,
    ForcedQuality,
    SimpleGreeting,
    WritingNeed,
    MultiToolSynthesis,
    DefaultFast,
}

impl TierReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierReason::TieringDisabled => "tiering_disabled",
            TierReason::ForcedFast => "forced_fast",
            TierReason::ForcedQuality => "forced_quality",
            TierReason::SimpleGreeting => "simple_greeting",
            TierReason::WritingNeed => "writing_need",
            TierReason::MultiToolSynthesis => "multi_tool_synthesis",
            TierReason::DefaultFast => "default_fast",
        }
    }
}

impl std::fmt::Display for TierReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDecision {
    pub use_quality: bool,
    pub reason: TierReason,
    pub score: u32,
}

impl TierDecision {
    fn fast(reason: TierReason, score: u32) -> Self {
        Self {
            use_quality: false,
            reason,
            score,
        }
    }

    fn quality(reason: TierReason, score: u32) -> Self {
        Self {
            use_quality: true,
            reason,
            score,
        }
    }
}

/// True for a short standalone greeting or farewell
pub fn is_simple_greeting(user_text: &str) -> bool {
    let normalized = normalize_utterance(user_text);
    GREETINGS.contains(&normalized.as_str())
}

/// Deterministic writing-need score of an utterance.
pub fn score_writing_need(user_text: &str) -> u32 {
    let write = WRITE_RULES
        .iter()
        .filter(|(rule, _)| rule.is_match(user_text))
        .map(|(_, weight)| *weight)
        .max()
        .unwrap_or(0);

    let domain = if DOMAIN_RULE.is_match(user_text) {
        if READ_RULE.is_match(user_text) {
            WRITE_WEIGHT_DOMAIN_READ
        } else {
            WRITE_WEIGHT_DOMAIN
        }
    } else {
        0
    };

    let score = write.max(domain);
    if DAMPENER_RULE.is_match(user_text) {
        score.saturating_sub(DAMPENER_PENALTY)
    } else {
        score
    }
}

/// Pick the finalizer tier for a turn.
pub fn decide_tier(
    route: Route,
    user_text: &str,
    tool_names: &[String],
    requires_confirmation: bool,
    config: &TierConfig,
) -> TierDecision {
    if !config.is_enabled() {
        return TierDecision::fast(TierReason::TieringDisabled, 0);
    }

    match config.force {
        Some(TierForce::Fast) => return TierDecision::fast(TierReason::ForcedFast, 0),
        Some(TierForce::Quality) => return TierDecision::quality(TierReason::ForcedQuality, 0),
        None => {}
    }

    if route == Route::Smalltalk && is_simple_greeting(user_text) {
        return TierDecision::fast(TierReason::SimpleGreeting, 0);
    }

    let writing_tools = tool_names
        .iter()
        .filter(|t| WRITING_TOOLS.contains(&t.as_str()))
        .count() as u32;
    let score = score_writing_need(user_text) + u32::from(requires_confirmation) + writing_tools;

    if score > config.quality_threshold {
        TierDecision::quality(TierReason::WritingNeed, score)
    } else if tool_names.len() >= config.multi_tool_threshold {
        TierDecision::quality(TierReason::MultiToolSynthesis, score)
    } else {
        TierDecision::fast(TierReason::DefaultFast, score)
    }
}

/// Counters kept across turns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub fast: u64,
    pub quality: u64,
    /// Turns where the greeting short-circuit skipped scoring (cost savings)
    pub greeting_short_circuits: u64,
}

/// Config plus counters
#[derive(Debug, Clone, Default)]
pub struct TierDecisionEngine {
    config: TierConfig,
    stats: TierStats,
}

impl TierDecisionEngine {
    pub fn new(config: TierConfig) -> Self {
        Self {
            config,
            stats: TierStats::default(),
        }
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn stats(&self) -> TierStats {
        self.stats
    }

    pub fn decide(
        &mut self,
        route: Route,
        user_text: &str,
        tool_names: &[String],
        requires_confirmation: bool,
    ) -> TierDecision {
        let decision = decide_tier(route, user_text, tool_names, requires_confirmation, &self.config);
        if decision.use_quality {
            self.stats.quality += 1;
        } else {
            self.stats.fast += 1;
        }
        if decision.reason == TierReason::SimpleGreeting {
            self.stats.greeting_short_circuits += 1;
        }
        debug!(
            route = %route,
            reason = %decision.reason,
            score = decision.score,
            use_quality = decision.use_quality,
            "tier decided"
        );
        decision
    }
}
