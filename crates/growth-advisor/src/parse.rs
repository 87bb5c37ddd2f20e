//! Extraction and validation of the growth estimate embedded in a model reply.

use analysis_core::{GrowthConfidence, GrowthEstimate, DEFAULT_GROWTH_RATE};
use serde_json::{Map, Value};

use crate::error::{AdvisorError, AdvisorResult};

/// Percent bounds applied to whatever the model returns.
pub const MIN_RATE_PERCENT: f64 = -20.0;
pub const MAX_RATE_PERCENT: f64 = 4.0;

pub const DEFAULT_SOURCES: [&str; 2] = ["Industry averages", "Historical performance"];

/// First well-formed JSON object in `text`. Tolerates prose or code fences around it.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            if let Ok(Value::Object(map)) = serde_json::from_str(&text[open..=close]) {
                return Some(map);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the brace closing the one at `open`, skipping braces inside strings.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rate in percent. Numbers and numeric strings ("5", "5.5%") are accepted;
/// anything else yields the 3% default.
fn rate_percent(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|r| r.is_finite())
        .unwrap_or(DEFAULT_GROWTH_RATE * 100.0)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply the validation rules in order: numeric rate (else 3%), clamp to
/// [-20, 4] percent, confidence default medium, sources default placeholder.
pub fn validate_estimate(object: &Map<String, Value>) -> GrowthEstimate {
    let rate = rate_percent(object.get("growthRate").or_else(|| object.get("rate")))
        .clamp(MIN_RATE_PERCENT, MAX_RATE_PERCENT)
        / 100.0;

    let confidence = object
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<GrowthConfidence>().ok())
        .unwrap_or(GrowthConfidence::Medium);

    let mut sources = string_list(object.get("sources"));
    if sources.is_empty() {
        sources = DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect();
    }

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "No reasoning provided".to_string());

    let caveats = string_list(object.get("caveats"));

    GrowthEstimate {
        rate,
        confidence,
        sources,
        reasoning,
        caveats: if caveats.is_empty() { None } else { Some(caveats) },
    }
}

pub fn parse_growth_response(text: &str) -> AdvisorResult<GrowthEstimate> {
    extract_json_object(text)
        .map(|object| validate_estimate(&object))
        .ok_or_else(|| AdvisorError::InvalidResponse("no JSON object in reply".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_extracts_object_from_prose_and_fences() {
        let reply = "Sure! Here is the estimate:\n```json\n{\"growthRate\": 2.5, \"reasoning\": \"uses {braces}\"}\n```\nLet me know.";
        let obj = extract_json_object(reply).unwrap();
        assert_eq!(obj["growthRate"], 2.5);
        assert_eq!(obj["reasoning"], "uses {braces}");
    }

    #[test]
    fn test_skips_malformed_candidates() {
        let reply = "{not json} then {\"rate\": 1}";
        let obj = extract_json_object(reply).unwrap();
        assert_eq!(obj["rate"], 1);
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("{\"open\": ").is_none());
    }

    #[test]
    fn test_rate_is_clamped_and_converted() {
        let est = parse_growth_response(r#"{"growthRate": 12, "confidence": "high", "sources": ["10-K"]}"#).unwrap();
        assert_relative_eq!(est.rate, 0.04);
        assert_eq!(est.confidence, GrowthConfidence::High);
        assert_eq!(est.sources, vec!["10-K".to_string()]);

        let est = parse_growth_response(r#"{"growthRate": -45}"#).unwrap();
        assert_relative_eq!(est.rate, -0.20);
    }

    #[test]
    fn test_non_numeric_rate_defaults_to_three_percent() {
        let est = parse_growth_response(r#"{"growthRate": "fast"}"#).unwrap();
        assert_relative_eq!(est.rate, 0.03);

        let est = parse_growth_response(r#"{"growthRate": "2.5%"}"#).unwrap();
        assert_relative_eq!(est.rate, 0.025);

        let est = parse_growth_response(r#"{"rate": 1.5}"#).unwrap();
        assert_relative_eq!(est.rate, 0.015);
    }

    #[test]
    fn test_defaults_for_confidence_and_sources() {
        let est = parse_growth_response(r#"{"growthRate": 2, "confidence": "certain", "sources": []}"#).unwrap();
        assert_eq!(est.confidence, GrowthConfidence::Medium);
        assert_eq!(est.sources, vec!["Industry averages", "Historical performance"]);
        assert_eq!(est.reasoning, "No reasoning provided");
        assert_eq!(est.caveats, None);

        let est = parse_growth_response(r#"{"growthRate": 2, "sources": "analysts", "caveats": ["cyclical"]}"#).unwrap();
        assert_eq!(est.sources.len(), 2);
        assert_eq!(est.caveats, Some(vec!["cyclical".to_string()]));
    }

    #[test]
    fn test_reply_without_json_is_invalid() {
        let err = parse_growth_response("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidResponse(_)));
    }
}
