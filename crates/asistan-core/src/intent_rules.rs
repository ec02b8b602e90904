//! Gmail intent inference from the user's own words.
//!
//! Used when the router picked `route=gmail` but left `gmail_intent` at
//! `none`. Rules are checked in order and the first match wins, so the more
//! specific phrasings ("okundu olarak işaretle", "cevap yaz") sit above the
//! generic ones ("oku", "yaz").

use crate::decision::GmailIntent;
use crate::text::turkish_lower;
use regex::Regex;
use std::sync::LazyLock;

/// Ordered (pattern, intent) table over Turkish-lowercased text
static GMAIL_INTENT_RULES: LazyLock<Vec<(Regex, GmailIntent)>> = LazyLock::new(|| {
    let rule = |pattern: &str, intent| (Regex::new(pattern).expect("static regex"), intent);
    vec![
        rule(r"okundu\w*\s+(?:olarak\s+)?(?:işaretle|yap)\w*", GmailIntent::MarkRead),
        rule(r"\b(?:yanıtla\w*|cevapla\w*|cevap\s+(?:ver|yaz|gönder)\w*)", GmailIntent::Reply),
        rule(r"\b(?:ilet\w*|yönlendir\w*|forward)", GmailIntent::Forward),
        rule(r"\b(?:sil\w*|çöpe\s+at\w*|kaldır\w*)", GmailIntent::Delete),
        rule(
            r"\b(?:gönder\w*|yolla\w*|(?:mail|e-?posta|mesaj)\w*\s+(?:at|yaz)\w*)",
            GmailIntent::Send,
        ),
        rule(r"\b(?:ara(?:r|yın|sana)?|bul\w*|var\s+mı)\b", GmailIntent::Search),
        rule(r"\b(?:oku\w*|aç\w*|içeriğ\w*|ne\s+yazıyor)", GmailIntent::Read),
        rule(
            r"\b(?:listele\w*|göster\w*|gelen\s+kutu\w*|son\s+(?:mail|e-?posta|mesaj)\w*|neler\s+var)",
            GmailIntent::List,
        ),
    ]
});

/// Infer a Gmail intent, `GmailIntent::None` when no rule matches.
pub fn detect_gmail_intent(user_text: &str) -> GmailIntent {
    let lowered = turkish_lower(user_text);
    GMAIL_INTENT_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lowered))
        .map(|(_, intent)| *intent)
        .unwrap_or(GmailIntent::None)
}
