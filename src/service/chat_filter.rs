//! Detection and redaction of off-platform contact details in chat messages.
//!
//! Every pass runs over the original text. Phone numbers, e-mail addresses,
//! social handles and long digit runs are always redacted; URLs are redacted
//! only until the project's escrow is funded. Keywords are flagged but left in
//! place. Before funding, any flag blocks the message outright.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::chatmodel::FlagType;

pub const REDACTION_TOKEN: &str = "[REDACTED]";

const NUMBER_WORDS: &str = "zero|one|two|three|four|five|six|seven|eight|nine|\
    nol|kosong|satu|dua|tiga|empat|lima|enam|tujuh|delapan|sembilan";

const BLACKLISTED_KEYWORDS: &[&str] = &[
    "whatsapp",
    "wa.me",
    "telegram",
    "t.me/",
    "line id",
    "skype",
    "contact me outside",
    "outside the platform",
    "outside this platform",
    "off platform",
    "off-platform",
    "pay outside",
    "direct payment",
    "direct transfer",
    "transfer directly",
    "call me",
    "text me",
    "dm me",
    "my number",
    "phone number",
    "hubungi saya",
    "nomor hp",
    "nomor wa",
    "chat wa",
    "di luar platform",
    "transfer langsung",
    "bayar langsung",
    "rekening pribadi",
];

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // +62 812-3456-7890, +1 (555) 123-4567
        compile(r"\+\d{1,3}[\s.\-]?\(?\d{1,4}\)?(?:[\s.\-]?\d{2,5}){2,4}"),
        // 0812-3456-789, 021 555 1234
        compile(r"\b0\d{2,4}[\s.\-]?\d{3,4}[\s.\-]?\d{3,5}\b"),
        // "nol delapan satu dua ..." / "zero eight one two ..."
        compile(&format!(
            r"(?i)\b(?:{words})(?:[\s,.\-]+(?:{words})){{6,}}\b",
            words = NUMBER_WORDS
        )),
    ]
});

static EMAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}"),
        // foo [at] bar [dot] com
        compile(
            r"(?i)\b[a-z0-9._%+\-]+\s*[\[\(\{]\s*(?:at|@)\s*[\]\)\}]\s*[a-z0-9\-]+\s*[\[\(\{]\s*(?:dot|\.)\s*[\]\)\}]\s*[a-z]{2,}\b",
        ),
    ]
});

static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r#"(?i)\bhttps?://[^\s<>"']+"#),
        compile(r#"(?i)\bwww\.[^\s<>"']+"#),
        compile(
            r#"(?i)\b[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?)*\.(?:com|net|org|io|id|co|me|info|biz|xyz|app|dev|ly|gg|link|site|online|store)\b(?:/[^\s<>"']*)?"#,
        ),
    ]
});

// The leading group stands in for a lookbehind so e-mail local parts don't match.
static SOCIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:^|[^\w@])(@\w{3,})"));

static KEYWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = BLACKLISTED_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    compile(&format!("(?i)(?:{})", alternation))
});

static DIGIT_RUN_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(r"\d(?:[\s.\-]*\d){7,}"));

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants covered by the tests below.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid chat filter pattern {pattern}: {e}"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedFlag {
    pub flag_type: FlagType,
    pub matched: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    pub is_blocked: bool,
    pub flags: Vec<DetectedFlag>,
    pub sanitized_content: String,
}

impl FilterResult {
    pub fn has_flag(&self, flag_type: FlagType) -> bool {
        self.flags.iter().any(|f| f.flag_type == flag_type)
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

pub fn filter(content: &str, escrow_active: bool) -> FilterResult {
    let phones = find_all(&PHONE_PATTERNS, content);
    let emails = find_all(&EMAIL_PATTERNS, content);
    let urls: Vec<Range<usize>> = find_all(&URL_PATTERNS, content)
        .into_iter()
        .filter(|span| !overlaps_any(span, &emails))
        .collect();
    let handles: Vec<Range<usize>> = SOCIAL_PATTERN
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.range()))
        .filter(|span| !overlaps_any(span, &emails) && !overlaps_any(span, &urls))
        .collect();
    let keywords: Vec<Range<usize>> = KEYWORD_PATTERN.find_iter(content).map(|m| m.range()).collect();
    let digit_runs: Vec<Range<usize>> = DIGIT_RUN_PATTERN
        .find_iter(content)
        .map(|m| m.range())
        .filter(|span| !overlaps_any(span, &phones))
        .collect();

    let mut flags = Vec::new();
    let mut push = |flag_type: FlagType, spans: &[Range<usize>]| {
        for span in spans {
            flags.push(DetectedFlag {
                flag_type,
                matched: content[span.clone()].to_string(),
            });
        }
    };
    push(FlagType::Phone, &phones);
    push(FlagType::Email, &emails);
    push(FlagType::Url, &urls);
    push(FlagType::SocialMedia, &handles);
    push(FlagType::Keyword, &keywords);
    push(FlagType::Phone, &digit_runs);

    if !escrow_active && !flags.is_empty() {
        return FilterResult {
            is_blocked: true,
            flags,
            sanitized_content: String::new(),
        };
    }

    let mut redact: Vec<Range<usize>> = phones
        .into_iter()
        .chain(emails)
        .chain(handles)
        .chain(digit_runs)
        .collect();
    if !escrow_active {
        redact.extend(urls);
    }

    FilterResult {
        is_blocked: false,
        flags,
        sanitized_content: redact_spans(content, redact),
    }
}

/// Leftmost-first matches of every pattern, deduplicated by position.
fn find_all(patterns: &[Regex], content: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    for pattern in patterns {
        for m in pattern.find_iter(content) {
            let span = m.range();
            if !overlaps_any(&span, &spans) {
                spans.push(span);
            }
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

fn overlaps_any(span: &Range<usize>, others: &[Range<usize>]) -> bool {
    others.iter().any(|o| span.start < o.end && o.start < span.end)
}

fn redact_spans(content: &str, mut spans: Vec<Range<usize>>) -> String {
    if spans.is_empty() {
        return content.to_string();
    }
    spans.sort_by_key(|s| s.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for span in merged {
        out.push_str(&content[cursor..span.start]);
        out.push_str(REDACTION_TOKEN);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(result: &FilterResult, flag_type: FlagType) -> Vec<&str> {
        result
            .flags
            .iter()
            .filter(|f| f.flag_type == flag_type)
            .map(|f| f.matched.as_str())
            .collect()
    }

    #[test]
    fn test_patterns_compile() {
        assert_eq!(PHONE_PATTERNS.len(), 3);
        assert_eq!(EMAIL_PATTERNS.len(), 2);
        assert_eq!(URL_PATTERNS.len(), 3);
        assert!(KEYWORD_PATTERN.is_match("WhatsApp"));
        assert!(SOCIAL_PATTERN.is_match("@handle"));
        assert!(DIGIT_RUN_PATTERN.is_match("12345678"));
    }

    #[test]
    fn test_blocks_contact_details_before_funding() {
        let result = filter("contact me at 08123456789 or foo@bar.com", false);
        assert!(result.is_blocked);
        assert!(result.has_flag(FlagType::Phone));
        assert!(result.has_flag(FlagType::Email));
        assert_eq!(result.sanitized_content, "");
    }

    #[test]
    fn test_redacts_but_delivers_after_funding() {
        let result = filter("contact me at 08123456789 or foo@bar.com", true);
        assert!(!result.is_blocked);
        assert!(result.has_flag(FlagType::Phone));
        assert!(result.has_flag(FlagType::Email));
        assert_eq!(
            result.sanitized_content,
            "contact me at [REDACTED] or [REDACTED]"
        );
    }

    #[test]
    fn test_email_domain_is_not_a_url() {
        let result = filter("mail foo@bar.com", true);
        assert_eq!(matched(&result, FlagType::Email), vec!["foo@bar.com"]);
        assert!(!result.has_flag(FlagType::Url));
        assert!(!result.has_flag(FlagType::SocialMedia));
    }

    #[test]
    fn test_clean_message_passes_untouched() {
        for escrow_active in [false, true] {
            let result = filter("Draft logo is ready, I'll send revisions by Friday.", escrow_active);
            assert!(!result.is_blocked);
            assert!(result.flags.is_empty());
            assert_eq!(
                result.sanitized_content,
                "Draft logo is ready, I'll send revisions by Friday."
            );
        }
    }

    #[test]
    fn test_international_phone_formats() {
        let result = filter("ring +62 812-3456-7890 tonight", true);
        assert_eq!(matched(&result, FlagType::Phone), vec!["+62 812-3456-7890"]);
        assert_eq!(result.sanitized_content, "ring [REDACTED] tonight");

        let result = filter("US office +1 (555) 123-4567", true);
        assert_eq!(matched(&result, FlagType::Phone), vec!["+1 (555) 123-4567"]);
    }

    #[test]
    fn test_spelled_out_digits() {
        let result = filter(
            "nomornya nol delapan satu dua tiga empat lima enam tujuh",
            true,
        );
        assert!(result.has_flag(FlagType::Phone));
        assert!(result.sanitized_content.starts_with("nomornya "));
        assert!(result.sanitized_content.ends_with(REDACTION_TOKEN));

        let result = filter("zero eight one two three four five six seven eight", false);
        assert!(result.is_blocked);
        assert!(result.has_flag(FlagType::Phone));
    }

    #[test]
    fn test_short_number_word_sequences_are_ignored() {
        let result = filter("one two three revisions included", true);
        assert!(!result.has_flag(FlagType::Phone));
    }

    #[test]
    fn test_obfuscated_email() {
        let result = filter("reach budi [at] gmail [dot] com", true);
        assert!(result.has_flag(FlagType::Email));
        assert_eq!(result.sanitized_content, "reach [REDACTED]");
    }

    #[test]
    fn test_urls_allowed_after_funding() {
        let content = "portfolio at https://dribbble.com/shots/123 and www.behance.net/me";
        let before = filter(content, false);
        assert!(before.is_blocked);
        assert_eq!(matched(&before, FlagType::Url).len(), 2);

        let after = filter(content, true);
        assert!(!after.is_blocked);
        assert!(after.has_flag(FlagType::Url));
        assert_eq!(after.sanitized_content, content);
    }

    #[test]
    fn test_bare_domain_detection() {
        let result = filter("see mysite.io for samples", true);
        assert_eq!(matched(&result, FlagType::Url), vec!["mysite.io"]);

        let result = filter("e.g. this is fine", true);
        assert!(!result.has_flag(FlagType::Url));
    }

    #[test]
    fn test_phone_inside_url_still_redacted_after_funding() {
        let result = filter("https://example.com/call/081234567890", true);
        assert!(result.has_flag(FlagType::Url));
        assert!(result.has_flag(FlagType::Phone));
        assert_eq!(result.sanitized_content, "https://example.com/call/[REDACTED]");
    }

    #[test]
    fn test_social_handles() {
        let result = filter("follow @budi_design on there", true);
        assert_eq!(matched(&result, FlagType::SocialMedia), vec!["@budi_design"]);
        assert_eq!(result.sanitized_content, "follow [REDACTED] on there");

        let result = filter("@ab is too short", true);
        assert!(!result.has_flag(FlagType::SocialMedia));
    }

    #[test]
    fn test_keywords_flag_without_redaction() {
        let result = filter("Let's move to WhatsApp later", true);
        assert_eq!(matched(&result, FlagType::Keyword), vec!["WhatsApp"]);
        assert!(!result.is_blocked);
        assert_eq!(result.sanitized_content, "Let's move to WhatsApp later");
    }

    #[test]
    fn test_keyword_alone_blocks_before_funding() {
        let result = filter("bisa transfer langsung saja?", false);
        assert!(result.is_blocked);
        assert_eq!(result.flags.len(), 1);
        assert_eq!(result.flags[0].flag_type, FlagType::Keyword);
    }

    #[test]
    fn test_long_digit_runs() {
        let result = filter("acct 1234 5678 90 please", true);
        assert_eq!(matched(&result, FlagType::Phone), vec!["1234 5678 90"]);
        assert_eq!(result.sanitized_content, "acct [REDACTED] please");

        let result = filter("budget is 1500000 rupiah", true);
        assert!(!result.has_flag(FlagType::Phone));
        assert_eq!(result.sanitized_content, "budget is 1500000 rupiah");
    }

    #[test]
    fn test_digit_run_not_double_counted_with_phone() {
        let result = filter("08123456789", true);
        assert_eq!(matched(&result, FlagType::Phone), vec!["08123456789"]);
    }

    #[test]
    fn test_adjacent_redactions_merge() {
        assert_eq!(redact_spans("abcdef", vec![1..3, 2..4]), "a[REDACTED]ef");
        assert_eq!(redact_spans("abcdef", vec![4..6, 0..1]), "[REDACTED]bcd[REDACTED]");
        assert_eq!(redact_spans("abc", vec![]), "abc");
    }
}
