//! Verdict parser
//!
//! Recovers a structured verdict from free-form model output in two stages:
//! strip one leading and one trailing code fence, then take the span from the
//! first `{` to the last `}` as the JSON candidate. Unparseable candidates
//! produce `AppError::VerdictParse` carrying the raw text. Labels outside the
//! allowed vocabulary fall back to `Unverifiable`.

use newsverify_common::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Reasoning used when the response has none
pub const DEFAULT_REASONING: &str = "No reasoning provided.";

/// Truthfulness classification of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictLabel {
    Real,
    Fake,
    Unverifiable,
}

impl VerdictLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Real => "Real",
            VerdictLabel::Fake => "Fake",
            VerdictLabel::Unverifiable => "Unverifiable",
        }
    }

    fn from_normalized(value: &str) -> Option<Self> {
        match value {
            "Real" => Some(VerdictLabel::Real),
            "Fake" => Some(VerdictLabel::Fake),
            "Unverifiable" => Some(VerdictLabel::Unverifiable),
            _ => None,
        }
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict for one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    pub reasoning: String,
}

/// How the label of a parsed response was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelResolution {
    /// One of the allowed labels, after normalisation
    Recognised(VerdictLabel),
    /// The `verdict` key was absent, blank or not a string
    Missing,
    /// A label outside the allowed vocabulary; carries the normalised value
    Unrecognised(String),
}

impl LabelResolution {
    pub fn label(&self) -> VerdictLabel {
        match self {
            LabelResolution::Recognised(label) => *label,
            LabelResolution::Missing | LabelResolution::Unrecognised(_) => {
                VerdictLabel::Unverifiable
            }
        }
    }
}

/// Trim, then upper-case the first character and lower-case the rest
fn capitalize(value: &str) -> String {
    let mut chars = value.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Normalise a raw `verdict` value and decide which label it denotes
pub fn resolve_label(raw: Option<&str>) -> LabelResolution {
    let normalized = capitalize(raw.unwrap_or_default());
    if normalized.is_empty() {
        return LabelResolution::Missing;
    }
    match VerdictLabel::from_normalized(&normalized) {
        Some(label) => LabelResolution::Recognised(label),
        None => LabelResolution::Unrecognised(normalized),
    }
}

fn leading_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^```(?:json)?").expect("valid fence pattern"))
}

fn trailing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```$").expect("valid fence pattern"))
}

/// Stage one: drop a single leading (optionally `json`-tagged) fence and a
/// single trailing fence
pub fn strip_fences(text: &str) -> String {
    let text = leading_fence().replace(text.trim(), "");
    let text = trailing_fence().replace(text.trim(), "");
    text.trim().to_string()
}

/// Stage two: the span from the first `{` to the last `}`, or the whole text
pub fn extract_candidate(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].trim(),
        _ => text.trim(),
    }
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Parser for reasoning-model responses
#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictParser;

impl VerdictParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw response into a verdict and report how its label was resolved
    pub fn parse_detailed(&self, raw: &str) -> Result<(Verdict, LabelResolution)> {
        let stripped = strip_fences(raw);
        let candidate = extract_candidate(&stripped);

        let parse_error = |message: String| AppError::VerdictParse {
            message,
            raw: raw.to_string(),
        };

        let value: Value =
            serde_json::from_str(candidate).map_err(|e| parse_error(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| parse_error("response is not a JSON object".to_string()))?;

        let resolution = resolve_label(string_field(object, "verdict"));
        match &resolution {
            LabelResolution::Recognised(_) => {}
            LabelResolution::Missing => {
                warn!("Verdict label absent, defaulting to Unverifiable");
            }
            LabelResolution::Unrecognised(value) => {
                warn!(label = %value, "Unrecognised verdict label, falling back to Unverifiable");
            }
        }

        let reasoning = string_field(object, "reasoning")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASONING)
            .to_string();

        Ok((
            Verdict {
                label: resolution.label(),
                reasoning,
            },
            resolution,
        ))
    }

    /// Parse a raw response into a verdict
    pub fn parse(&self, raw: &str) -> Result<Verdict> {
        self.parse_detailed(raw).map(|(verdict, _)| verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Verdict> {
        VerdictParser::new().parse(raw)
    }

    #[test]
    fn test_fenced_json_lowercase_label() {
        let verdict = parse("```json\n{\"verdict\":\"real\",\"reasoning\":\"x\"}\n```").unwrap();
        assert_eq!(
            verdict,
            Verdict {
                label: VerdictLabel::Real,
                reasoning: "x".into()
            }
        );
    }

    #[test]
    fn test_untagged_and_uppercase_fence() {
        let verdict = parse("```JSON\n{\"verdict\":\"FAKE\",\"reasoning\":\"y\"}```").unwrap();
        assert_eq!(verdict.label, VerdictLabel::Fake);

        let verdict = parse("```\n{\"verdict\":\"Fake\",\"reasoning\":\"y\"}\n```").unwrap();
        assert_eq!(verdict.label, VerdictLabel::Fake);
    }

    #[test]
    fn test_surrounding_prose_is_ignored() {
        let raw = "Here is my analysis:\n{\"verdict\": \" unverifiable \", \"reasoning\": \"  Sparse coverage. \"}\nHope this helps!";
        let verdict = parse(raw).unwrap();
        assert_eq!(verdict.label, VerdictLabel::Unverifiable);
        assert_eq!(verdict.reasoning, "Sparse coverage.");
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let (verdict, resolution) = VerdictParser::new()
            .parse_detailed(r#"{"verdict":"Maybe","reasoning":"y"}"#)
            .unwrap();
        assert_eq!(verdict.label, VerdictLabel::Unverifiable);
        assert_eq!(verdict.reasoning, "y");
        assert_eq!(resolution, LabelResolution::Unrecognised("Maybe".into()));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let (verdict, resolution) = VerdictParser::new().parse_detailed("{}").unwrap();
        assert_eq!(verdict.label, VerdictLabel::Unverifiable);
        assert_eq!(verdict.reasoning, DEFAULT_REASONING);
        assert_eq!(resolution, LabelResolution::Missing);

        let verdict = parse(r#"{"verdict":"   ","reasoning":""}"#).unwrap();
        assert_eq!(verdict.label, VerdictLabel::Unverifiable);
        assert_eq!(verdict.reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn test_non_string_label_treated_as_missing() {
        let (_, resolution) = VerdictParser::new()
            .parse_detailed(r#"{"verdict": 1, "reasoning": "n"}"#)
            .unwrap();
        assert_eq!(resolution, LabelResolution::Missing);
    }

    #[test]
    fn test_unparseable_text_keeps_raw() {
        let raw = "I cannot determine this claim.";
        match parse(raw) {
            Err(AppError::VerdictParse { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected VerdictParse, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_json_span_fails() {
        let raw = "```json\n{\"verdict\": \"Real\", \"reasoning\": }\n```";
        assert!(matches!(parse(raw), Err(AppError::VerdictParse { .. })));
    }

    #[test]
    fn test_non_object_json_fails() {
        assert!(matches!(parse("[1, 2, 3]"), Err(AppError::VerdictParse { .. })));
        assert!(matches!(parse("\"Real\""), Err(AppError::VerdictParse { .. })));
    }

    #[test]
    fn test_greedy_span_between_braces() {
        let raw = "{\"verdict\":\"Real\",\"reasoning\":\"uses {braces} inside\"} trailing";
        let verdict = parse(raw).unwrap();
        assert_eq!(verdict.reasoning, "uses {braces} inside");
    }

    #[test]
    fn test_strip_fences_only_once() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("no fences"), "no fences");
    }

    #[test]
    fn test_resolve_label_normalization() {
        assert_eq!(
            resolve_label(Some("rEaL")),
            LabelResolution::Recognised(VerdictLabel::Real)
        );
        assert_eq!(resolve_label(None), LabelResolution::Missing);
        assert_eq!(
            resolve_label(Some("partly true")),
            LabelResolution::Unrecognised("Partly true".into())
        );
    }
}
