use serde::Deserialize;
use serde_json::Value;

use systemcraft_core::scoring::DEFAULT_REASONING_SCORE;
use systemcraft_core::ReasoningEvaluation;

use crate::ReasonError;

/// The evaluator's answer as it arrives; every field may be missing or mistyped.
#[derive(Deserialize)]
struct LlmReview {
    #[serde(default)]
    score: Value,
    #[serde(default)]
    strengths: Value,
    #[serde(default)]
    weaknesses: Value,
    #[serde(default)]
    suggestions: Value,
}

/// Parse raw LLM output into a normalized [`ReasoningEvaluation`].
pub fn parse_llm_output(raw: &str) -> Result<ReasoningEvaluation, ReasonError> {
    let cleaned = strip_fences(raw);
    let json_str = extract_json_object(cleaned)
        .ok_or_else(|| ReasonError::Parse("no JSON object in response".to_string()))?;

    let review: LlmReview =
        serde_json::from_str(json_str).map_err(|e| ReasonError::Parse(e.to_string()))?;
    Ok(review.into_evaluation())
}

/// Same coercion as [`parse_llm_output`] for a review that is already JSON.
pub fn review_from_value(value: Value) -> Result<ReasoningEvaluation, ReasonError> {
    let review: LlmReview =
        serde_json::from_value(value).map_err(|e| ReasonError::Parse(e.to_string()))?;
    Ok(review.into_evaluation())
}

impl LlmReview {
    fn into_evaluation(self) -> ReasoningEvaluation {
        ReasoningEvaluation {
            score: self.score.as_f64().unwrap_or(DEFAULT_REASONING_SCORE),
            strengths: string_list(self.strengths),
            weaknesses: string_list(self.weaknesses),
            suggestions: string_list(self.suggestions),
        }
        .normalized()
    }
}

/// Drop a leading ```json (or bare ```) fence and a trailing ``` fence.
fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
        if s.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            s = &s[4..];
        }
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Outermost `{ ... }` in the text.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Arrays keep their string items; a lone string becomes a one-item list;
/// anything else is treated as absent.
fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let r = parse_llm_output(
            r#"{"score": 82, "strengths": ["Clear tiers"], "weaknesses": ["No queue"], "suggestions": ["Add Kafka"]}"#,
        )
        .unwrap();
        assert_eq!(r.score, 82.0);
        assert_eq!(r.strengths, vec!["Clear tiers"]);
        assert_eq!(r.suggestions, vec!["Add Kafka"]);
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"score\": 64, \"strengths\": [], \"weaknesses\": [], \"suggestions\": []}\n```";
        assert_eq!(parse_llm_output(raw).unwrap().score, 64.0);
        let raw = "```JSON\n{\"score\": 12}\n```\n";
        assert_eq!(parse_llm_output(raw).unwrap().score, 12.0);
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let raw = "Here is my review:\n{\"score\": 70, \"strengths\": [\"ok\"]}\nThanks!";
        let r = parse_llm_output(raw).unwrap();
        assert_eq!(r.strengths, vec!["ok"]);
        assert!(r.weaknesses.is_empty());
    }

    #[test]
    fn non_numeric_score_defaults() {
        let r = parse_llm_output(r#"{"score": "great", "strengths": []}"#).unwrap();
        assert_eq!(r.score, DEFAULT_REASONING_SCORE);
        let r = parse_llm_output(r#"{"strengths": ["x"]}"#).unwrap();
        assert_eq!(r.score, DEFAULT_REASONING_SCORE);
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        assert_eq!(parse_llm_output(r#"{"score": 140}"#).unwrap().score, 100.0);
        assert_eq!(parse_llm_output(r#"{"score": -5}"#).unwrap().score, 0.0);
    }

    #[test]
    fn mistyped_lists_are_coerced() {
        let r = parse_llm_output(
            r#"{"score": 50, "strengths": "Simple", "weaknesses": null, "suggestions": [1, "Add cache", ""]}"#,
        )
        .unwrap();
        assert_eq!(r.strengths, vec!["Simple"]);
        assert!(r.weaknesses.is_empty());
        assert_eq!(r.suggestions, vec!["Add cache"]);
    }

    #[test]
    fn json_value_reviews_are_coerced() {
        let r = review_from_value(serde_json::json!({"score": "n/a", "strengths": "Solid"}))
            .unwrap();
        assert_eq!(r.score, DEFAULT_REASONING_SCORE);
        assert_eq!(r.strengths, vec!["Solid"]);
        let r = review_from_value(serde_json::json!({})).unwrap();
        assert_eq!(r.score, DEFAULT_REASONING_SCORE);
        assert!(matches!(
            review_from_value(serde_json::json!("great design")),
            Err(ReasonError::Parse(_))
        ));
    }

    #[test]
    fn missing_object_is_an_error() {
        assert!(matches!(parse_llm_output("I cannot help"), Err(ReasonError::Parse(_))));
        assert!(matches!(parse_llm_output("} {"), Err(ReasonError::Parse(_))));
        assert!(matches!(parse_llm_output("{score: 1}"), Err(ReasonError::Parse(_))));
    }
}
