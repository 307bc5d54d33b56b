//! Per-field salvage extractors.
//!
//! Each extractor is an ordered list of label patterns plus a decoder. It
//! scans the whole text on its own and does not care whether the rest of the
//! record is well-formed. When several candidates exist, the first one in
//! document order that decodes wins.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rag_audit_core::{ConversationTurn, RawRecord, RecoveryFailure, RecoveryMode};
use regex::Regex;

use crate::values::{normalize_text, parse_timestamp, synthesize_turn_id, unescape};

/// Double- or single-quoted literal. The closing quote is optional so a
/// truncated value still yields its prefix.
pub const QUOTED: &str = r#"(?:"(?P<value>(?:[^"\\]|\\.)*)"?|'(?P<alt>(?:[^'\\]|\\.)*)'?)"#;
pub const QUOTED_OR_BARE: &str =
    r#"(?:"(?P<value>(?:[^"\\]|\\.)*)"?|'(?P<alt>(?:[^'\\]|\\.)*)'?|(?P<bare>[A-Za-z0-9_.:/\-]+))"#;
pub const QUOTED_OR_NUMBER: &str = r#"(?:"(?P<value>[^"]*)"?|'(?P<alt>[^']*)'?|(?P<bare>\d+))"#;
pub const NUMBER: &str = r#"["']?(?P<value>\d+)"#;
pub const LIST_OR_QUOTED: &str = r#"(?P<value>[\["'].*)"#;

static OBJECT_TEXT: Lazy<Regex> = Lazy::new(|| labelled("text|content|page_content", QUOTED));

static BUILTIN: Lazy<SalvageExtractors> = Lazy::new(SalvageExtractors::builtin);

/// Builds `label: value` with tolerant quoting around the label and either
/// `:` or `=` as separator. `labels` is a `|`-separated alternation.
pub fn label_pattern(labels: &str, value: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r#"(?is)["']?\b(?:{labels})\b["']?\s*[:=]\s*{value}"#))
}

fn labelled(labels: &str, value: &str) -> Regex {
    label_pattern(labels, value).expect("salvage pattern must compile")
}

fn role_message(roles: &str) -> Regex {
    let pattern = format!(
        r#"(?is)["']?\brole\b["']?\s*:\s*["'](?:{roles})["']\s*,\s*["']?\b(?:content|text)\b["']?\s*:\s*{QUOTED}"#
    );
    Regex::new(&pattern).expect("salvage pattern must compile")
}

fn nested_text(speakers: &str) -> Regex {
    let pattern = format!(
        r#"(?is)["']?\b(?:{speakers})\b["']?\s*:\s*\{{\s*["']?\b(?:text|content)\b["']?\s*:\s*{QUOTED}"#
    );
    Regex::new(&pattern).expect("salvage pattern must compile")
}

/// Locates one field anywhere in a text blob.
#[derive(Clone)]
pub struct FieldExtractor<T> {
    field: &'static str,
    patterns: Vec<Regex>,
    decode: fn(&str) -> Option<T>,
}

impl<T> std::fmt::Debug for FieldExtractor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtractor")
            .field("field", &self.field)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

impl<T> FieldExtractor<T> {
    pub fn new(field: &'static str, decode: fn(&str) -> Option<T>) -> Self {
        Self {
            field,
            patterns: Vec::new(),
            decode,
        }
    }

    /// Patterns must capture the value in a group named `value`, `alt` or
    /// `bare`; the first group that participated is used.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn extract(&self, text: &str) -> Option<T> {
        let mut candidates: Vec<(usize, &str)> = self
            .patterns
            .iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let value = ["value", "alt", "bare"].iter().find_map(|g| caps.name(g))?;
                Some((start, value.as_str()))
            })
            .collect();

        candidates.sort_by_key(|(start, _)| *start);
        candidates.into_iter().find_map(|(_, value)| (self.decode)(value))
    }
}

fn decode_text(body: &str) -> Option<String> {
    normalize_text(Some(unescape(body)))
}

/// Like [`decode_text`] but rejects JSON-ish null literals, for values that
/// may appear unquoted.
fn decode_token(body: &str) -> Option<String> {
    decode_text(body).filter(|v| !matches!(v.to_ascii_lowercase().as_str(), "null" | "none"))
}

fn decode_count(body: &str) -> Option<u64> {
    body.parse().ok()
}

fn decode_timestamp(body: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(body)
}

/// Splits a quoted literal off the front of `s`, which starts with `quote`.
/// Returns the literal body and the text after it.
fn take_quoted(s: &str, quote: char) -> (&str, &str) {
    let mut escaped = false;
    for (idx, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            c if c == quote => return (&s[1..idx], &s[idx + 1..]),
            _ => {}
        }
    }
    (&s[1..], "")
}

/// Splits a brace-balanced object off the front of `s`.
fn take_object(s: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (&s[..=idx], &s[idx + 1..]);
                }
            }
            _ => {}
        }
    }
    (s, "")
}

/// Reads string or `{text: ...}` items from a possibly truncated list, or a
/// single quoted string. Stops at the first `]` or unrecognised token.
fn decode_snippets(body: &str) -> Option<Vec<String>> {
    let body = body.trim_start();
    let (mut rest, is_list) = match body.strip_prefix('[') {
        Some(inner) => (inner, true),
        None => (body, false),
    };

    let mut snippets = Vec::new();
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        let Some(first) = rest.chars().next() else {
            break;
        };

        match first {
            '"' | '\'' => {
                let (literal, remainder) = take_quoted(rest, first);
                snippets.extend(decode_text(literal));
                rest = remainder;
            }
            '{' => {
                let (object, remainder) = take_object(rest);
                let text = OBJECT_TEXT
                    .captures(object)
                    .and_then(|caps| caps.name("value").or_else(|| caps.name("alt")))
                    .and_then(|m| decode_text(m.as_str()));
                snippets.extend(text);
                rest = remainder;
            }
            _ => break,
        }

        if !is_list {
            break;
        }
    }

    if snippets.is_empty() {
        None
    } else {
        Some(snippets)
    }
}

/// The full set of field extractors used by the salvage path.
#[derive(Debug, Clone)]
pub struct SalvageExtractors {
    pub turn_id: FieldExtractor<String>,
    pub user_query: FieldExtractor<String>,
    pub ai_response: FieldExtractor<String>,
    pub context_snippets: FieldExtractor<Vec<String>>,
    pub request_timestamp: FieldExtractor<DateTime<Utc>>,
    pub response_timestamp: FieldExtractor<DateTime<Utc>>,
    pub token_count: FieldExtractor<u64>,
    pub model_name: FieldExtractor<String>,
}

impl Default for SalvageExtractors {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl SalvageExtractors {
    fn builtin() -> Self {
        Self {
            turn_id: FieldExtractor::new("turn_id", decode_token)
                .with_pattern(labelled("turn_id|id", QUOTED_OR_BARE)),
            user_query: FieldExtractor::new("user_query", decode_text)
                .with_pattern(labelled("user_query|query|question|user_message", QUOTED))
                .with_pattern(role_message("user|human"))
                .with_pattern(nested_text("user|human")),
            ai_response: FieldExtractor::new("ai_response", decode_text)
                .with_pattern(labelled(
                    "ai_response|response|answer|assistant_response|completion",
                    QUOTED,
                ))
                .with_pattern(role_message("assistant|ai|bot"))
                .with_pattern(nested_text("assistant|ai|bot")),
            context_snippets: FieldExtractor::new("context_snippets", decode_snippets).with_pattern(
                labelled(
                    "context_snippets|contexts|context|retrieved_context|documents",
                    LIST_OR_QUOTED,
                ),
            ),
            request_timestamp: FieldExtractor::new("request_timestamp", decode_timestamp)
                .with_pattern(labelled(
                    "request_timestamp|request_ts|request_time|requested_at",
                    QUOTED_OR_NUMBER,
                )),
            response_timestamp: FieldExtractor::new("response_timestamp", decode_timestamp)
                .with_pattern(labelled(
                    "response_timestamp|response_ts|response_time|responded_at",
                    QUOTED_OR_NUMBER,
                )),
            token_count: FieldExtractor::new("token_count", decode_count)
                .with_pattern(labelled("token_count|tokens|total_tokens|num_tokens", NUMBER)),
            model_name: FieldExtractor::new("model_name", decode_token)
                .with_pattern(labelled("model_name|model", QUOTED_OR_BARE)),
        }
    }

    /// Runs every extractor over the record's text. Fails only when neither
    /// essential field was found; the failure keeps any id that was.
    pub fn salvage(&self, raw: &RawRecord) -> Result<ConversationTurn, RecoveryFailure> {
        let text = raw.as_text();

        let found_id = self.turn_id.extract(&text);
        let turn_id = found_id
            .clone()
            .unwrap_or_else(|| synthesize_turn_id(raw));

        ConversationTurn::builder(turn_id)
            .user_query(self.user_query.extract(&text))
            .ai_response(self.ai_response.extract(&text))
            .context_snippets(self.context_snippets.extract(&text).unwrap_or_default())
            .request_timestamp(self.request_timestamp.extract(&text))
            .response_timestamp(self.response_timestamp.extract(&text))
            .token_count(self.token_count.extract(&text))
            .model_name(self.model_name.extract(&text))
            .recovery(RecoveryMode::Salvaged)
            .build()
            .map_err(|failure| failure.with_turn_id(found_id))
    }
}
