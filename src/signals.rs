//! Trait signals and sentiment produced by turn analysis.
//!
//! Analysis output is untrusted. `RawTraitSignal` mirrors the wire shape
//! loosely (every field optional) and `sanitize_signals` turns it into
//! in-range `TraitSignal`s without ever failing.

use crate::ocean::OceanTrait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Unknown or missing values default to neutral.
    pub fn parse_lenient(s: Option<&str>) -> Sentiment {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

/// One piece of evidence for a trait reading. Indices are char offsets into
/// the analyzed dialogue, `[start_index, end_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitSignal {
    #[serde(rename = "trait")]
    pub ocean_trait: OceanTrait,
    pub start_index: usize,
    pub end_index: usize,
    /// -1 (evidence of low trait) to 1 (evidence of high trait)
    pub value: f64,
    pub confidence: f64,
    pub rationale: String,
}

impl TraitSignal {
    pub fn span_len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn overlaps(&self, other: &TraitSignal) -> bool {
        self.start_index < other.end_index && other.start_index < self.end_index
    }

    /// The highlighted slice of `dialogue`, by char offsets.
    pub fn excerpt(&self, dialogue: &str) -> String {
        dialogue
            .chars()
            .skip(self.start_index)
            .take(self.span_len())
            .collect()
    }

    /// Pull indices into `[0, dialogue_len]` with `start <= end`, `value` into
    /// [-1, 1] and `confidence` into [0, 1].
    pub fn clamped(mut self, dialogue_len: usize) -> TraitSignal {
        self.start_index = self.start_index.min(dialogue_len);
        self.end_index = self.end_index.min(dialogue_len).max(self.start_index);
        self.value = clamp_unit(Some(self.value), -1.0, 1.0, 0.0);
        self.confidence = clamp_unit(Some(self.confidence), 0.0, 1.0, 0.5);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTraitSignal {
    #[serde(rename = "trait")]
    pub ocean_trait: Option<String>,
    pub start_index: Option<f64>,
    pub end_index: Option<f64>,
    pub value: Option<f64>,
    pub confidence: Option<f64>,
    pub rationale: Option<String>,
}

fn clamp_unit(value: Option<f64>, min: f64, max: f64, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(min, max),
        Some(v) if v == f64::INFINITY => max,
        Some(v) if v == f64::NEG_INFINITY => min,
        _ => fallback,
    }
}

fn clamp_index(value: Option<f64>, len: usize, fallback: usize) -> usize {
    match value {
        Some(v) if v.is_nan() => fallback,
        Some(v) if v <= 0.0 => 0,
        Some(v) => (v.floor() as usize).min(len),
        None => fallback,
    }
}

/// Clamp indices to the dialogue, `value` to [-1, 1], `confidence` to [0, 1].
/// Signals naming an unknown trait are dropped. `start <= end` holds on output.
pub fn sanitize_signals(raw: &[RawTraitSignal], dialogue: &str) -> Vec<TraitSignal> {
    let len = dialogue.chars().count();
    raw.iter()
        .filter_map(|s| {
            let ocean_trait = OceanTrait::from_str(s.ocean_trait.as_deref()?)?;
            let signal = TraitSignal {
                ocean_trait,
                start_index: clamp_index(s.start_index, len, 0),
                end_index: clamp_index(s.end_index, len, len),
                value: clamp_unit(s.value, -1.0, 1.0, 0.0),
                confidence: clamp_unit(s.confidence, 0.0, 1.0, 0.5),
                rationale: s.rationale.clone().unwrap_or_default(),
            };
            Some(signal.clamped(len))
        })
        .collect()
}

/// Pick a non-overlapping set of signals for highlighting.
///
/// Earliest start wins. When two signals share a start, the longer span
/// wins (then canonical trait order). Zero-length spans are dropped.
pub fn resolve_overlaps(signals: &[TraitSignal]) -> Vec<TraitSignal> {
    let mut sorted: Vec<&TraitSignal> = signals.iter().filter(|s| s.span_len() > 0).collect();
    sorted.sort_by(|a, b| {
        a.start_index
            .cmp(&b.start_index)
            .then(b.span_len().cmp(&a.span_len()))
            .then(a.ocean_trait.cmp(&b.ocean_trait))
    });

    let mut kept: Vec<TraitSignal> = Vec::new();
    for signal in sorted {
        match kept.last() {
            Some(prev) if signal.start_index < prev.end_index => continue,
            _ => kept.push(signal.clone()),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(t: &str, start: f64, end: f64, value: f64, confidence: f64) -> RawTraitSignal {
        RawTraitSignal {
            ocean_trait: Some(t.to_string()),
            start_index: Some(start),
            end_index: Some(end),
            value: Some(value),
            confidence: Some(confidence),
            rationale: None,
        }
    }

    fn signal(t: OceanTrait, start: usize, end: usize) -> TraitSignal {
        TraitSignal {
            ocean_trait: t,
            start_index: start,
            end_index: end,
            value: 0.5,
            confidence: 0.5,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_sanitize_clamps_everything() {
        let dialogue = "I'm worried about this.";
        let out = sanitize_signals(
            &[
                raw("neuroticism", -5.0, 400.0, 3.0, 1.7),
                raw("agreeableness", 10.0, 4.0, -9.0, -0.2),
            ],
            dialogue,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start_index, 0);
        assert_eq!(out[0].end_index, dialogue.chars().count());
        assert_eq!(out[0].value, 1.0);
        assert_eq!(out[0].confidence, 1.0);
        assert!(out[1].start_index <= out[1].end_index);
        assert_eq!(out[1].value, -1.0);
        assert_eq!(out[1].confidence, 0.0);
        assert_eq!(out[1].rationale, "");
    }

    #[test]
    fn test_sanitize_drops_unknown_traits() {
        let out = sanitize_signals(
            &[raw("charisma", 0.0, 2.0, 0.1, 0.9), RawTraitSignal::default()],
            "hello",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_sentiment_defaults_to_neutral() {
        assert_eq!(Sentiment::parse_lenient(Some("Negative")), Sentiment::Negative);
        assert_eq!(Sentiment::parse_lenient(Some("ecstatic")), Sentiment::Neutral);
        assert_eq!(Sentiment::parse_lenient(None), Sentiment::Neutral);
    }

    #[test]
    fn test_resolve_overlaps_earliest_then_longest() {
        let signals = vec![
            signal(OceanTrait::Openness, 5, 9),
            signal(OceanTrait::Neuroticism, 0, 3),
            signal(OceanTrait::Agreeableness, 0, 6),
            signal(OceanTrait::Extraversion, 12, 12),
            signal(OceanTrait::Conscientiousness, 6, 10),
        ];
        let kept = resolve_overlaps(&signals);
        let traits: Vec<_> = kept.iter().map(|s| s.ocean_trait).collect();
        assert_eq!(
            traits,
            vec![OceanTrait::Agreeableness, OceanTrait::Conscientiousness]
        );
    }

    #[test]
    fn test_excerpt_uses_char_offsets() {
        let s = signal(OceanTrait::Openness, 2, 5);
        assert_eq!(s.excerpt("héllo wörld"), "llo");
    }

    #[test]
    fn test_clamped_pulls_signal_into_range() {
        let s = TraitSignal {
            ocean_trait: OceanTrait::Extraversion,
            start_index: 40,
            end_index: 999,
            value: 9.0,
            confidence: 7.0,
            rationale: String::new(),
        }
        .clamped(5);
        assert_eq!((s.start_index, s.end_index), (5, 5));
        assert_eq!(s.value, 1.0);
        assert_eq!(s.confidence, 1.0);

        let s = TraitSignal { value: f64::NAN, confidence: -2.0, ..signal(OceanTrait::Openness, 3, 1) }.clamped(10);
        assert_eq!((s.start_index, s.end_index), (3, 3));
        assert_eq!(s.value, 0.0);
        assert_eq!(s.confidence, 0.0);
    }
}
