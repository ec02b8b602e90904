//! Output sanitization before anything reaches the user or is re-ingested.
//!
//! - replies that fail the language guard are replaced by a tool summary or a
//!   route template
//! - tool errors are mapped to safe Turkish categories, never raw traces
//! - raw model text loses chat-template control tokens before a re-prompt

use crate::decision::Route;
use crate::entities::{candidate_items, item_slots};
use crate::redact::{redact, strip_paths};
use crate::text::{tokens, truncate_chars};
use crate::tools::ToolResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::warn;

pub const UNKNOWN_ERROR: &str = "Bilinmeyen hata";
pub const UNEXPECTED_ERROR: &str = "Beklenmeyen bir hata oluştu";
pub const TRUNCATION_MARKER: &str = "…[kısaltıldı]";

pub const CALENDAR_FALLBACK: &str =
    "Takvim işleminizi şu an tamamlayamadım efendim, birazdan tekrar deneyebilir miyiz?";
pub const GMAIL_FALLBACK: &str =
    "E-posta işleminizi şu an tamamlayamadım efendim, birazdan tekrar deneyelim mi?";
pub const SYSTEM_FALLBACK: &str = "Sistem bilgisine şu an ulaşamadım efendim.";
pub const SMALLTALK_FALLBACK: &str = "Buradayım efendim, size nasıl yardımcı olabilirim?";
pub const WIKI_FALLBACK: &str =
    "Aradığınız bilgiye şu an ulaşamadım efendim, soruyu biraz farklı sorar mısınız?";
pub const CHAT_FALLBACK: &str =
    "Bu konuda şu an yanıt veremedim efendim, başka nasıl yardımcı olabilirim?";
pub const GENERIC_FALLBACK: &str =
    "Üzgünüm efendim, bir sorun oluştu. İsteğinizi tekrar eder misiniz?";

/// Error keyword categories, first match wins
static ERROR_CATEGORIES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let rule = |pattern: &str, message| (Regex::new(pattern).expect("static regex"), message);
    vec![
        rule(
            r"(?i)(timed?\s*out|timeout|deadline exceeded|zaman aşımı)",
            "İşlem zaman aşımına uğradı",
        ),
        rule(
            r"(?i)(rate.?limit|\b429\b|too many requests|quota)",
            "Çok fazla istek gönderildi, biraz sonra tekrar deneyin",
        ),
        rule(
            r"(?i)(\b401\b|unauthori[sz]ed|unauthenticated|invalid.?(grant|token|credentials)|\bauth)",
            "Yetkilendirme hatası, hesabın yeniden bağlanması gerekebilir",
        ),
        rule(
            r"(?i)(\b403\b|forbidden|permission|access denied|insufficient)",
            "Bu işlem için izin yok",
        ),
        rule(r"(?i)(\b404\b|not.?found|bulunamadı)", "İstenen kayıt bulunamadı"),
        rule(
            r"(?i)(connection|connect|network|unreachable|refused|reset by peer|dns|bağlantı)",
            "Bağlantı hatası oluştu",
        ),
    ]
});

/// Stack-trace markers
static TRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(Traceback \(most recent call last\)|^\s*File ".*", line \d+|^\s+at \S+\(|panicked at)"#)
        .expect("static regex")
});

/// Chat-template control tokens
static CONTROL_TOKENS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<\|[a-z_]+\|>",
        r"(?i)\[/?INST\]",
        r"(?i)<</?SYS>>",
        r"(?i)</?s>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

const TURKISH_WORDS: &[&str] = &[
    "ve", "bir", "bu", "şu", "için", "ile", "da", "de", "mi", "mı", "ne", "çok", "var", "yok",
    "ama", "gibi", "olarak", "efendim", "daha", "size", "sizin", "tamam", "evet", "hayır",
    "merhaba", "tabii", "elbette", "yarın", "bugün", "saat", "etkinlik", "toplantı", "oldu",
    "eklendi", "silindi", "sonuç", "ben", "sen", "siz", "iyi", "hangi", "nasıl", "neden",
];

const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "is", "are", "you", "your", "to", "of", "for", "with", "this", "that", "have",
    "has", "will", "it", "be", "was", "please", "sorry", "i", "can", "here", "sure", "one",
    "my", "we", "there", "event", "meeting", "tomorrow", "today", "done", "okay",
];

/// Oracle deciding whether a reply is Turkish
pub trait LanguageGuard: Send + Sync {
    fn is_turkish(&self, text: &str) -> bool;
}

/// Stop-word and letter heuristic.
///
/// Text with letters needs positive Turkish evidence: a Turkish stop-word or a
/// Turkish-only letter (worth two). That evidence must also outweigh any
/// English stop-words. Letter-free text ("20:00", "#1") passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicLanguageGuard;

impl LanguageGuard for HeuristicLanguageGuard {
    fn is_turkish(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if !text.chars().any(char::is_alphabetic) {
            return true;
        }
        // plain lowercasing so English "I" stays "i"
        let english = tokens(&text.to_lowercase())
            .iter()
            .filter(|w| ENGLISH_WORDS.contains(&w.as_str()))
            .count();
        let mut turkish = tokens(text)
            .iter()
            .filter(|w| TURKISH_WORDS.contains(&w.as_str()))
            .count();
        if text.chars().any(|c| "çğıöşüÇĞİÖŞÜ".contains(c)) {
            turkish += 2;
        }
        turkish > 0 && turkish > english
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Cap for raw model/tool text re-ingested into a prompt
    #[serde(default = "default_max_raw_chars")]
    pub max_raw_chars: usize,
    /// Cap for unmatched tool error lines
    #[serde(default = "default_max_error_chars")]
    pub max_error_chars: usize,
    /// Labels listed per tool in a summary
    #[serde(default = "default_summary_items")]
    pub summary_items: usize,
}

fn default_max_raw_chars() -> usize {
    2000
}

fn default_max_error_chars() -> usize {
    150
}

fn default_summary_items() -> usize {
    3
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_raw_chars: default_max_raw_chars(),
            max_error_chars: default_max_error_chars(),
            summary_items: default_summary_items(),
        }
    }
}

/// Static Turkish fallback for a route
pub fn fallback_template(route: Option<Route>) -> &'static str {
    match route {
        Some(Route::Calendar) => CALENDAR_FALLBACK,
        Some(Route::Gmail) => GMAIL_FALLBACK,
        Some(Route::System) => SYSTEM_FALLBACK,
        Some(Route::Smalltalk) => SMALLTALK_FALLBACK,
        Some(Route::Wiki) => WIKI_FALLBACK,
        Some(Route::Chat) => CHAT_FALLBACK,
        Some(Route::Unknown) | None => GENERIC_FALLBACK,
    }
}

/// Map a raw tool error to a safe Turkish message.
pub fn sanitize_tool_error(raw_error: Option<&str>) -> String {
    sanitize_tool_error_with(raw_error, default_max_error_chars())
}

/// [`sanitize_tool_error`] for arbitrary JSON; anything but a string is unknown.
pub fn sanitize_tool_error_value(raw_error: &Value) -> String {
    match raw_error {
        Value::String(s) => sanitize_tool_error(Some(s)),
        _ => UNKNOWN_ERROR.to_string(),
    }
}

fn sanitize_tool_error_with(raw_error: Option<&str>, max_chars: usize) -> String {
    let Some(raw) = raw_error.map(str::trim).filter(|s| !s.is_empty()) else {
        return UNKNOWN_ERROR.to_string();
    };

    if let Some((_, message)) = ERROR_CATEGORIES.iter().find(|(p, _)| p.is_match(raw)) {
        return message.to_string();
    }

    if TRACE_PATTERN.is_match(raw) {
        return UNEXPECTED_ERROR.to_string();
    }

    let first_line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or(raw).trim();
    let cleaned = strip_paths(&redact(first_line));
    truncate_chars(&cleaned, max_chars, "…")
}

/// Strip control tokens and cap length of raw model text.
pub fn sanitize_raw_text(text: &str, max_chars: usize) -> String {
    let mut cleaned = text.to_string();
    for pattern in CONTROL_TOKENS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").to_string();
    }
    truncate_chars(&cleaned, max_chars, TRUNCATION_MARKER)
}

/// Log a failed stage without the error message, which may carry secrets.
pub fn log_failure<E: std::error::Error + ?Sized>(stage: &str, _error: &E) {
    warn!(stage, error_type = std::any::type_name::<E>(), "stage failed");
}

fn result_label(item: &Value) -> Option<String> {
    let slots = item_slots(item);
    ["title", "summary", "subject", "name", "snippet"]
        .iter()
        .find_map(|k| slots.get(*k).cloned())
}

/// Guard, templates and tool summaries
#[derive(Clone)]
pub struct FinalizationSanitizer {
    guard: Arc<dyn LanguageGuard>,
    config: SanitizerConfig,
}

impl Default for FinalizationSanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default(), Arc::new(HeuristicLanguageGuard))
    }
}

impl FinalizationSanitizer {
    pub fn new(config: SanitizerConfig, guard: Arc<dyn LanguageGuard>) -> Self {
        Self { guard, config }
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn is_turkish(&self, text: &str) -> bool {
        self.guard.is_turkish(text)
    }

    /// Return `text` if the guard accepts it, else a tool summary or template.
    pub fn validate_reply_language(
        &self,
        text: &str,
        route: Option<Route>,
        tool_results: &[ToolResult],
    ) -> String {
        if self.guard.is_turkish(text) {
            return text.to_string();
        }
        warn!(route = ?route, chars = text.chars().count(), "reply rejected by language guard");
        self.summarize_tool_results(tool_results)
            .unwrap_or_else(|| fallback_template(route).to_string())
    }

    /// Deterministic Turkish summary of successful tool results.
    pub fn summarize_tool_results(&self, tool_results: &[ToolResult]) -> Option<String> {
        let lines: Vec<String> = tool_results
            .iter()
            .filter(|r| r.success)
            .map(|r| self.summarize_one(r))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(format!("Tamam efendim. {}.", lines.join(". ")))
        }
    }

    fn summarize_one(&self, result: &ToolResult) -> String {
        let action = result.tool.rsplit('.').next().unwrap_or(&result.tool);
        let label = result_label(&result.raw_result);
        let quoted = |verb: &str| match &label {
            Some(l) => format!("'{}' {}", l, verb),
            None => format!("İşlem {}", verb),
        };

        if action.starts_with("create") {
            quoted("oluşturuldu")
        } else if action.starts_with("update") || action.starts_with("modify") {
            quoted("güncellendi")
        } else if action.starts_with("delete") || action.starts_with("cancel") {
            quoted("silindi")
        } else if matches!(action, "send" | "reply" | "forward") {
            "E-posta gönderildi".to_string()
        } else if action.starts_with("list") || action.starts_with("search") || action.starts_with("find")
        {
            let items = candidate_items(&result.raw_result);
            if items.is_empty() {
                return "Sonuç bulunamadı".to_string();
            }
            let labels: Vec<String> = items
                .iter()
                .filter_map(|i| result_label(i))
                .take(self.config.summary_items)
                .collect();
            if labels.is_empty() {
                format!("{} sonuç bulundu", items.len())
            } else {
                format!("{} sonuç bulundu: {}", items.len(), labels.join(", "))
            }
        } else {
            "İşlem tamamlandı".to_string()
        }
    }

    pub fn sanitize_tool_error(&self, raw_error: Option<&str>) -> String {
        sanitize_tool_error_with(raw_error, self.config.max_error_chars)
    }

    pub fn sanitize_raw_text(&self, text: &str) -> String {
        sanitize_raw_text(text, self.config.max_raw_chars)
    }
}
