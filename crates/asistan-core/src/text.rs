//! Turkish-aware text normalization shared by the rule tables.
//!
//! `str::to_lowercase` maps `I` to `i` and `İ` to `i̇`, which breaks keyword
//! matching for Turkish input. Everything that compares user text against a
//! keyword table goes through [`turkish_lower`] first.

/// Lowercase with Turkish dotted/dotless I rules.
pub fn turkish_lower(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Lowercase, trim, collapse whitespace and drop trailing punctuation.
///
/// Used for whole-utterance matches such as greetings ("Merhaba!" == "merhaba").
pub fn normalize_utterance(text: &str) -> String {
    let lowered = turkish_lower(text);
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| matches!(c, '!' | '.' | '?' | ',' | '…' | ';' | ':'))
        .trim()
        .to_string()
}

/// Split into lowercase word tokens, stripping surrounding punctuation.
///
/// Apostrophe suffixes are cut off ("2'yi" -> "2", "Ali'ye" -> "ali").
pub fn tokens(text: &str) -> Vec<String> {
    turkish_lower(text)
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '!' | '?'))
        .filter_map(|raw| {
            let head = raw.split(['\'', '’']).next().unwrap_or(raw);
            let word = head.trim_matches(|c: char| !c.is_alphanumeric() && c != '#');
            if word.is_empty() {
                None
            } else {
                Some(word.to_string())
            }
        })
        .collect()
}

/// Truncate to at most `max_chars` characters, appending `marker` when cut.
///
/// The marker counts against the budget so the result never exceeds it.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker_len = marker.chars().count();
    let keep = max_chars.saturating_sub(marker_len);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}
