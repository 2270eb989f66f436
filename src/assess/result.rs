//! Assessment result parsing.
//!
//! The scoring service is not consistent about payload shape across
//! deployments: scores may sit at the top level or nested under a
//! `result` object, individual fields may be missing, and word detail is
//! optional.  [`AssessmentResult::from_payload`] treats a payload as
//! usable when *at least one* of the four recognised score fields is a
//! number; anything else is "no usable result" and the caller falls back
//! to batch scoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// WordScore / AssessmentResult
// ---------------------------------------------------------------------------

/// Per-word pronunciation detail, when the service provides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub score: f64,
}

/// A pronunciation assessment score set.  Missing fields default to 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub accuracy: f64,
    pub fluency: f64,
    pub completeness: f64,
    pub pronunciation: f64,
    /// Per-word detail; empty when the service returned none.
    pub words: Vec<WordScore>,
}

impl AssessmentResult {
    /// Parse a service payload, accepting both flat and `result`-nested
    /// shapes.  Returns `None` when no recognisable score field is present.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let scores = match payload.get("result") {
            Some(nested) if nested.is_object() => nested,
            _ => payload,
        };

        let accuracy = score_field(scores, "accuracy");
        let fluency = score_field(scores, "fluency");
        let completeness = score_field(scores, "completeness");
        let pronunciation = score_field(scores, "pronunciation");

        // Usability gate: at least one recognised score must be numeric.
        if [accuracy, fluency, completeness, pronunciation]
            .iter()
            .all(Option::is_none)
        {
            return None;
        }

        let words = scores
            .get("words")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(word_entry).collect())
            .unwrap_or_default();

        Some(Self {
            accuracy: accuracy.unwrap_or(0.0),
            fluency: fluency.unwrap_or(0.0),
            completeness: completeness.unwrap_or(0.0),
            pronunciation: pronunciation.unwrap_or(0.0),
            words,
        })
    }
}

/// Read one score field, tolerating the `…Score` suffix variant.
fn score_field(scores: &Value, name: &str) -> Option<f64> {
    scores
        .get(name)
        .or_else(|| scores.get(format!("{name}Score")))
        .and_then(Value::as_f64)
}

fn word_entry(entry: &Value) -> Option<WordScore> {
    Some(WordScore {
        word: entry.get("word")?.as_str()?.to_string(),
        score: entry
            .get("score")
            .or_else(|| entry.get("accuracyScore"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
