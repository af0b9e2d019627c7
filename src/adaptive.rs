//! Adaptive cue engine
//!
//! A pure function of (turn history, settings): take a sliding window of
//! turns, compare the cumulative trajectory at the window's endpoints, and if
//! the largest trait shift clears the sensitivity threshold, map it through
//! the active strategy's rule table into a scaled stance adjustment plus
//! instruction/avoid guidance.

use crate::conversation::ConversationTurn;
use crate::ocean::{OceanTrait, TraitDelta};
use crate::signals::Sentiment;
use crate::strategies::{AdaptiveStrategy, StanceAdjustments, StrategyTable};
use serde::{Deserialize, Serialize};

/// Delta magnitude at which stance adjustments reach full strength.
pub const SCALE_SATURATION: f64 = 10.0;
/// Delta magnitude at which the magnitude half of confidence saturates.
pub const CONFIDENCE_SATURATION: f64 = 15.0;
/// Mean signal confidence assumed when the window has no signals for the trait.
pub const DEFAULT_SIGNAL_CONFIDENCE: f64 = 0.5;

const MAGNITUDE_WEIGHT: f64 = 0.6;
const SIGNAL_WEIGHT: f64 = 0.4;

// ============ Settings ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// Number of trailing turns inspected.
    pub fn window_size(&self) -> usize {
        match self {
            Sensitivity::Low => 4,
            Sensitivity::Medium => 3,
            Sensitivity::High => 2,
        }
    }

    /// Minimum |delta| (0-100 scale) that counts as significant.
    pub fn threshold(&self) -> f64 {
        match self {
            Sensitivity::High => 3.0,
            Sensitivity::Medium => 5.0,
            Sensitivity::Low => 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveSettings {
    pub enabled: bool,
    pub strategy: AdaptiveStrategy,
    pub sensitivity: Sensitivity,
    #[serde(default)]
    pub show_cues_in_transcript: bool,
}

// ============ Cue ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveTrigger {
    pub detected_trait: OceanTrait,
    /// Raw signed delta over the window
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Window size actually used (may be shorter than configured)
    pub window_turns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveCue {
    pub stance_adjustments: StanceAdjustments,
    pub instructions: Vec<String>,
    pub do_not_do: Vec<String>,
    pub rationale: String,
    pub confidence: f64,
    pub trigger: AdaptiveTrigger,
}

// ============ Engine ============

/// Compute a cue with the built-in strategy table. `turns` are one speaker's
/// turns.
pub fn compute_adaptive_cue(
    turns: &[ConversationTurn],
    settings: &AdaptiveSettings,
) -> Option<AdaptiveCue> {
    compute_adaptive_cue_with(turns, settings, StrategyTable::builtin())
}

/// Compute a cue against an injected strategy table. `turns` are one
/// speaker's turns in order (see `ConversationState::turns_by`); the window
/// is taken from their tail. Returns `None` when adaptive mode is off, fewer
/// than two turns exist, no trait moved enough, or the table has no rows for
/// the active strategy.
pub fn compute_adaptive_cue_with(
    turns: &[ConversationTurn],
    settings: &AdaptiveSettings,
    table: &StrategyTable,
) -> Option<AdaptiveCue> {
    if !settings.enabled || turns.len() < 2 {
        return None;
    }

    let window = window_of(turns, settings.sensitivity);
    let deltas = detect_trait_deltas(window);
    let significant = find_significant_delta(&deltas, settings.sensitivity)?;
    let rules = table.get(&settings.strategy)?;

    let high = significant.delta > 0.0;
    let (stance_adjustments, instructions, do_not_do) = match rules.response(significant.ocean_trait) {
        Some(response) => {
            let branch = response.branch(high);
            (
                branch.stance.scaled(stance_scale(significant.delta)),
                branch.instructions.to_vec(),
                branch.avoid.to_vec(),
            )
        }
        None => (StanceAdjustments::default(), Vec::new(), Vec::new()),
    };

    Some(AdaptiveCue {
        stance_adjustments,
        instructions,
        do_not_do,
        rationale: generate_rationale(&significant, &rules.label),
        confidence: calculate_confidence(&significant, window),
        trigger: AdaptiveTrigger {
            detected_trait: significant.ocean_trait,
            delta: significant.delta,
            sentiment: window.last().map(|t| t.sentiment),
            window_turns: window.len(),
        },
    })
}

/// The trailing `window_size` turns, or all of them if history is shorter.
pub fn window_of(turns: &[ConversationTurn], sensitivity: Sensitivity) -> &[ConversationTurn] {
    let size = sensitivity.window_size().min(turns.len());
    &turns[turns.len() - size..]
}

/// Endpoint deltas for all five traits, in canonical order.
pub fn detect_trait_deltas(window: &[ConversationTurn]) -> Vec<TraitDelta> {
    match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => TraitDelta::all_between(
            &first.cumulative_trajectory,
            &last.cumulative_trajectory,
        ),
        _ => Vec::new(),
    }
}

/// The largest |delta| if it reaches the threshold (inclusive). Equal
/// magnitudes keep canonical trait order.
pub fn find_significant_delta(deltas: &[TraitDelta], sensitivity: Sensitivity) -> Option<TraitDelta> {
    let mut ranked = deltas.to_vec();
    ranked.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));
    ranked
        .into_iter()
        .next()
        .filter(|d| d.magnitude() >= sensitivity.threshold())
}

/// `min(|delta| / 10, 1)`
pub fn stance_scale(delta: f64) -> f64 {
    (delta.abs() / SCALE_SATURATION).min(1.0)
}

/// Blend of shift magnitude (60%) and mean per-signal confidence for the
/// trait across the window (40%), rounded to two decimals.
pub fn calculate_confidence(delta: &TraitDelta, window: &[ConversationTurn]) -> f64 {
    let magnitude_confidence = (delta.magnitude() / CONFIDENCE_SATURATION).min(1.0);

    let confidences: Vec<f64> = window
        .iter()
        .flat_map(|t| t.trait_signals.iter())
        .filter(|s| s.ocean_trait == delta.ocean_trait)
        .map(|s| s.confidence)
        .collect();
    let avg_confidence = if confidences.is_empty() {
        DEFAULT_SIGNAL_CONFIDENCE
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    ((magnitude_confidence * MAGNITUDE_WEIGHT + avg_confidence * SIGNAL_WEIGHT) * 100.0).round() / 100.0
}

pub fn generate_rationale(delta: &TraitDelta, strategy_label: &str) -> String {
    let direction = if delta.delta > 0.0 { "increased" } else { "decreased" };
    format!(
        "{} has {} by {:.1} points. Using {} approach to adjust listener stance accordingly.",
        delta.ocean_trait.label(),
        direction,
        delta.magnitude(),
        strategy_label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationTurn, ParticipantId};
    use crate::ocean::{OceanProfile, TrendDirection};
    use crate::signals::TraitSignal;

    fn turn(n: usize, neuroticism: f64) -> ConversationTurn {
        ConversationTurn::new(
            n,
            ParticipantId::A,
            format!("turn {}", n),
            Vec::new(),
            Vec::new(),
            Sentiment::Neutral,
            OceanProfile::uniform(50.0).with(OceanTrait::Neuroticism, neuroticism),
        )
    }

    fn history(values: &[f64]) -> Vec<ConversationTurn> {
        values.iter().enumerate().map(|(i, v)| turn(i + 1, *v)).collect()
    }

    fn enabled(sensitivity: Sensitivity) -> AdaptiveSettings {
        AdaptiveSettings {
            enabled: true,
            strategy: AdaptiveStrategy::ClinicalEmpathy,
            sensitivity,
            show_cues_in_transcript: false,
        }
    }

    fn with_signals(mut t: ConversationTurn, confidences: &[f64]) -> ConversationTurn {
        t.trait_signals = confidences
            .iter()
            .map(|c| TraitSignal {
                ocean_trait: OceanTrait::Neuroticism,
                start_index: 0,
                end_index: 1,
                value: 0.6,
                confidence: *c,
                rationale: String::new(),
            })
            .collect();
        t
    }

    #[test]
    fn test_none_when_disabled_or_short() {
        let turns = history(&[30.0, 60.0]);
        let mut settings = enabled(Sensitivity::High);
        settings.enabled = false;
        assert!(compute_adaptive_cue(&turns, &settings).is_none());

        for s in [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High] {
            assert!(compute_adaptive_cue(&turns[..1], &enabled(s)).is_none());
            assert!(compute_adaptive_cue(&[], &enabled(s)).is_none());
        }
    }

    #[test]
    fn test_neuroticism_spike_emits_full_high_branch() {
        let turns = history(&[30.0, 34.0, 42.0]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).unwrap();

        let rules = StrategyTable::builtin()
            .rules_for(&AdaptiveStrategy::ClinicalEmpathy)
            .unwrap();
        let response = rules.response(OceanTrait::Neuroticism).unwrap();

        assert_eq!(cue.trigger.detected_trait, OceanTrait::Neuroticism);
        assert_eq!(cue.trigger.delta, 12.0);
        assert_eq!(cue.trigger.window_turns, 3);
        let stance = cue.stance_adjustments;
        assert_eq!(stance.warmth, 1.0);
        assert!((stance.structure - 2.0 / 3.0).abs() < 1e-9);
        assert!((stance.pace - (-1.0 / 3.0)).abs() < 1e-9);
        assert!((stance.autonomy - 1.0 / 3.0).abs() < 1e-9);
        assert!((stance.directness - (-1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(cue.instructions, response.instructions_when_high);
        assert_eq!(cue.do_not_do, response.avoid_when_high);
        assert_eq!(
            cue.rationale,
            "Neuroticism has increased by 12.0 points. Using Clinical Empathy approach to adjust listener stance accordingly."
        );
    }

    #[test]
    fn test_small_drift_is_ignored() {
        let turns = history(&[30.0, 31.0, 33.0]);
        assert!(compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).is_none());
        // High sensitivity only compares the last two turns
        assert!(compute_adaptive_cue(&turns, &enabled(Sensitivity::High)).is_none());
        let turns = history(&[30.0, 33.0]);
        assert!(compute_adaptive_cue(&turns, &enabled(Sensitivity::High)).is_some());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let turns = history(&[40.0, 42.0, 45.0]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).unwrap();
        assert_eq!(cue.trigger.delta, 5.0);

        // scale 0.5 on whenHigh (1, 0.7, -0.5, 0.3, -0.3), rounded to thirds
        let s = cue.stance_adjustments;
        assert!((s.warmth - 2.0 / 3.0).abs() < 1e-9);
        assert!((s.structure - 1.0 / 3.0).abs() < 1e-9);
        assert!((s.pace + 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.autonomy, 0.0);
        assert_eq!(s.directness, 0.0);
    }

    #[test]
    fn test_decrease_selects_low_branch() {
        let turns = history(&[60.0, 55.0, 48.0]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).unwrap();
        let response = StrategyTable::builtin()
            .rules_for(&AdaptiveStrategy::ClinicalEmpathy)
            .unwrap()
            .response(OceanTrait::Neuroticism)
            .unwrap();
        assert_eq!(cue.trigger.delta, -12.0);
        assert_eq!(cue.instructions, response.instructions_when_low);
        assert_eq!(cue.do_not_do, response.avoid_when_low);
        assert!(cue.rationale.contains("decreased by 12.0"));
    }

    #[test]
    fn test_window_uses_only_endpoints_of_trailing_turns() {
        // Low sensitivity: window 4 -> 50 vs 58 -> delta 8 >= 8
        let turns = history(&[10.0, 50.0, 90.0, 20.0, 58.0]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Low)).unwrap();
        assert_eq!(cue.trigger.delta, 8.0);
        assert_eq!(cue.trigger.window_turns, 4);

        // Short history shrinks the window
        let short = history(&[30.0, 40.0]);
        let cue = compute_adaptive_cue(&short, &enabled(Sensitivity::Low)).unwrap();
        assert_eq!(cue.trigger.window_turns, 2);
    }

    #[test]
    fn test_ties_follow_canonical_trait_order() {
        let start = OceanProfile::uniform(50.0);
        let end = start
            .with(OceanTrait::Neuroticism, 60.0)
            .with(OceanTrait::Extraversion, 40.0);
        let deltas = TraitDelta::all_between(&start, &end);
        let winner = find_significant_delta(&deltas, Sensitivity::Medium).unwrap();
        assert_eq!(winner.ocean_trait, OceanTrait::Extraversion);
        assert_eq!(winner.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_confidence_blend() {
        let mut turns = history(&[30.0, 37.0, 45.0]);
        turns[1] = with_signals(turns[1].clone(), &[0.7, 0.9]);
        turns[2] = with_signals(turns[2].clone(), &[0.8]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).unwrap();
        assert_eq!(cue.trigger.delta, 15.0);
        assert_eq!(cue.confidence, 0.92);
    }

    #[test]
    fn test_confidence_without_signals_defaults() {
        let turns = history(&[30.0, 34.0, 42.0]);
        let cue = compute_adaptive_cue(&turns, &enabled(Sensitivity::Medium)).unwrap();
        // 0.6 * 12/15 + 0.4 * 0.5
        assert_eq!(cue.confidence, 0.68);
    }

    #[test]
    fn test_injected_table_without_rows_yields_none() {
        let turns = history(&[30.0, 34.0, 42.0]);
        let empty = StrategyTable::new();
        assert!(compute_adaptive_cue_with(&turns, &enabled(Sensitivity::Medium), &empty).is_none());
    }
}
