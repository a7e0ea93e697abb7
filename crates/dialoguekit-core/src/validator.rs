//! Conversation response validation
//!
//! Turns the raw text a model returned into `ConversationItem`s. Only the
//! top level is strict: the text must parse as a JSON array. Individual
//! elements with the wrong shape are dropped, and everything softer (theme
//! label drift, odd turn counts, unknown speaker tags) is logged and kept.

use std::ops::RangeInclusive;
use std::sync::OnceLock;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use crate::error::{GenerationError, GenerationResult};
use crate::state::{ConversationItem, PersonaConfig};
use crate::themes::Theme;

/// Expected number of turns per conversation (3-6 per participant)
pub const TURN_BAND: RangeInclusive<usize> = 6..=12;

/// Speaker tag older prompts used for the participant
const LEGACY_PARTICIPANT_TAG: &str = "user";
/// Speaker tag of the original default assistant
const LEGACY_ASSISTANT_TAG: &str = "iris";

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[\w+-]*[ \t]*\n?(.*?)\n?\s*```$").expect("fence pattern is valid")
    })
}

/// Items that survived validation plus counts for diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub items: Vec<ConversationItem>,
    /// Elements dropped for structural defects
    pub rejected: usize,
    /// Kept items whose turn count fell outside `TURN_BAND`
    pub off_band: usize,
}

/// Strip surrounding whitespace and, if present, a fenced code block wrapper
pub fn unwrap_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match fence_regex().captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Case-insensitive prefix strip that is safe for non-ASCII names
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut text_chars = text.char_indices();
    for p in prefix.chars() {
        let (_, t) = text_chars.next()?;
        if !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    let end = text_chars.next().map(|(i, _)| i).unwrap_or(text.len());
    Some(&text[end..])
}

/// Rewrite a recognised speaker tag to the configured name
///
/// Checked in order: legacy "user:", legacy "iris:", the assistant name,
/// the participant name. The remainder after the colon is kept verbatim.
/// Unrecognised turns come back unchanged.
pub fn normalize_turn(turn: &str, persona: &PersonaConfig) -> String {
    let user = persona.participant_name.as_str();
    let ai = persona.assistant_name.as_str();
    let candidates = [
        (LEGACY_PARTICIPANT_TAG, user),
        (LEGACY_ASSISTANT_TAG, ai),
        (ai, ai),
        (user, user),
    ];

    for (tag, canonical) in candidates {
        if tag.is_empty() {
            continue;
        }
        if let Some(rest) = strip_prefix_ci(turn, tag).and_then(|r| r.strip_prefix(':')) {
            return format!("{canonical}:{rest}");
        }
    }
    turn.to_string()
}

/// Validate one raw model response for `theme`
///
/// Fails only when the unwrapped text is not JSON or not an array.
pub fn validate_response(
    raw: &str,
    theme: &Theme,
    persona: &PersonaConfig,
) -> GenerationResult<ValidationReport> {
    let text = unwrap_fence(raw);

    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| GenerationError::MalformedPayload(e.to_string()))?;

    let elements = match parsed {
        Value::Array(elements) => elements,
        other => {
            warn!(theme = %theme, "response is not a JSON array");
            return Err(GenerationError::NotAnArray(json_kind(&other)));
        }
    };

    let mut report = ValidationReport::default();
    for (index, element) in elements.into_iter().enumerate() {
        match validate_item(index, element, theme, persona) {
            Some(item) => {
                if !TURN_BAND.contains(&item.turns.len()) {
                    warn!(
                        theme = %theme,
                        index,
                        turns = item.turns.len(),
                        "conversation outside the expected 6-12 turns, keeping it"
                    );
                    report.off_band += 1;
                }
                report.items.push(item);
            }
            None => report.rejected += 1,
        }
    }

    debug!(
        theme = %theme,
        kept = report.items.len(),
        rejected = report.rejected,
        "validated response"
    );
    Ok(report)
}

fn validate_item(
    index: usize,
    element: Value,
    theme: &Theme,
    persona: &PersonaConfig,
) -> Option<ConversationItem> {
    let Value::Object(mut fields) = element else {
        warn!(theme = %theme, index, "element is not an object, skipping");
        return None;
    };

    let item_theme = match fields.get("theme") {
        Some(Value::String(label)) => label.clone(),
        _ => {
            warn!(theme = %theme, index, "missing or non-string 'theme', skipping");
            return None;
        }
    };

    let raw_turns = match fields.remove("conversation") {
        Some(Value::Array(turns)) if !turns.is_empty() => turns,
        _ => {
            warn!(theme = %theme, index, "missing, empty or non-array 'conversation', skipping");
            return None;
        }
    };

    let mut turns = Vec::with_capacity(raw_turns.len());
    for turn in raw_turns {
        match turn {
            Value::String(text) => turns.push(normalize_turn(&text, persona)),
            _ => {
                warn!(theme = %theme, index, "conversation has a non-string turn, skipping");
                return None;
            }
        }
    }

    if item_theme != theme.as_str() {
        warn!(
            requested = %theme,
            received = %item_theme,
            index,
            "theme mismatch, correcting"
        );
    }

    Some(ConversationItem {
        theme: theme.clone(),
        turns,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            participant_name: "Alex".to_string(),
            assistant_name: "Nova".to_string(),
            personality: String::new(),
            style_notes: String::new(),
            active_themes: vec![],
        }
    }

    fn theme() -> Theme {
        Theme::new("A")
    }

    #[test]
    fn test_unwrap_fence_variants() {
        assert_eq!(unwrap_fence("  [1]  "), "[1]");
        assert_eq!(unwrap_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(unwrap_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(unwrap_fence("```JSON\n  [1, 2]  \n```"), "[1, 2]");
        assert_eq!(unwrap_fence("```[1]```"), "[1]");
        assert_eq!(unwrap_fence("text ```json\n[1]\n```"), "text ```json\n[1]\n```");
    }

    #[test]
    fn test_fenced_and_plain_give_same_items() {
        let inner = r#"[{"theme":"A","conversation":["user: hi","iris: hello"]}]"#;
        let fenced = format!("```json\n{inner}\n```");
        let a = validate_response(inner, &theme(), &persona()).unwrap();
        let b = validate_response(&fenced, &theme(), &persona()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.items.len(), 1);
    }

    #[test]
    fn test_normalize_turn_prefixes() {
        let p = persona();
        assert_eq!(normalize_turn("user: hello", &p), "Alex: hello");
        assert_eq!(normalize_turn("iris: hi", &p), "Nova: hi");
        assert_eq!(normalize_turn("NOVA:hey", &p), "Nova:hey");
        assert_eq!(normalize_turn("alex:  spaced ", &p), "Alex:  spaced ");
        assert_eq!(normalize_turn("Bob: hi", &p), "Bob: hi");
        assert_eq!(normalize_turn("username: x", &p), "username: x");
        assert_eq!(normalize_turn("", &p), "");
    }

    // The legacy assistant tag is checked before the configured names, so a
    // participant actually called "Iris" is relabelled as the assistant.
    #[test]
    fn test_legacy_iris_tag_wins_over_participant_name() {
        let p = PersonaConfig {
            participant_name: "Iris".to_string(),
            ..persona()
        };
        assert_eq!(normalize_turn("Iris: hello", &p), "Nova: hello");
        assert_eq!(normalize_turn("user: hello", &p), "Iris: hello");
    }

    #[test]
    fn test_normalize_non_ascii_name() {
        let p = PersonaConfig {
            participant_name: "Ümit".to_string(),
            ..persona()
        };
        assert_eq!(normalize_turn("ümit: merhaba", &p), "Ümit: merhaba");
    }

    #[test]
    fn test_non_string_turn_drops_only_that_item() {
        let raw = r#"[
            {"theme":"A","conversation":["Alex: a","Nova: b"]},
            {"theme":"A","conversation":["Alex: a", 42]},
            {"theme":"A","conversation":["Alex: c","Nova: d"]}
        ]"#;
        let report = validate_response(raw, &theme(), &persona()).unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.items[1].turns, vec!["Alex: c", "Nova: d"]);
    }

    #[test]
    fn test_structural_rejections() {
        let raw = r#"[
            "just a string",
            {"conversation":["Alex: a"]},
            {"theme":3,"conversation":["Alex: a"]},
            {"theme":"A","conversation":"Alex: a"},
            {"theme":"A"}
        ]"#;
        let report = validate_response(raw, &theme(), &persona()).unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.rejected, 5);
    }

    #[test]
    fn test_theme_mismatch_is_corrected() {
        let raw = r#"[{"theme":"Something Else","conversation":["Alex: a"]}]"#;
        let report = validate_response(raw, &theme(), &persona()).unwrap();
        assert_eq!(report.items[0].theme, theme());
        assert_eq!(report.off_band, 1);
    }

    #[test]
    fn test_empty_conversation_array_is_rejected() {
        let raw = r#"[{"theme":"A","conversation":[]}]"#;
        let report = validate_response(raw, &theme(), &persona()).unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn test_top_level_errors() {
        assert!(matches!(
            validate_response("not json", &theme(), &persona()),
            Err(GenerationError::MalformedPayload(_))
        ));
        assert_eq!(
            validate_response(r#"{"theme":"A"}"#, &theme(), &persona()),
            Err(GenerationError::NotAnArray("object"))
        );
        assert_eq!(
            validate_response("[]", &theme(), &persona()).unwrap().items.len(),
            0
        );
    }
}
