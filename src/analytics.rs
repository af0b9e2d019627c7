//! Read-only derivations over a conversation for chart and panel consumers.

use crate::adaptive::AdaptiveCue;
use crate::conversation::{ConversationState, ConversationTurn, ParticipantId};
use crate::ocean::{OceanProfile, OceanTrait, TraitDelta, TrendDirection};
use crate::signals::resolve_overlaps;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub turn_number: usize,
    pub turn_id: String,
    pub speaker: ParticipantId,
    pub trajectory: OceanProfile,
}

/// One point per turn, in turn order.
pub fn trajectory_series(state: &ConversationState) -> Vec<TrajectoryPoint> {
    state
        .turns
        .iter()
        .map(|t| TrajectoryPoint {
            turn_number: t.turn_number,
            turn_id: t.id.clone(),
            speaker: t.speaker,
            trajectory: t.cumulative_trajectory,
        })
        .collect()
}

/// (turn number, value) pairs of one trait for one speaker.
pub fn trait_series(state: &ConversationState, speaker: ParticipantId, ocean_trait: OceanTrait) -> Vec<(usize, f64)> {
    state
        .turns
        .iter()
        .filter(|t| t.speaker == speaker)
        .map(|t| (t.turn_number, t.cumulative_trajectory.get(ocean_trait)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineDrift {
    #[serde(rename = "trait")]
    pub ocean_trait: OceanTrait,
    pub baseline: f64,
    pub current: f64,
    pub delta: f64,
    pub direction: TrendDirection,
}

/// Speaker baseline vs. their trajectory at `turn_id`.
pub fn baseline_drift(state: &ConversationState, turn_id: &str) -> Option<Vec<BaselineDrift>> {
    let turn = state.turns.iter().find(|t| t.id == turn_id)?;
    let baseline = state.participant(turn.speaker).ocean;
    Some(
        TraitDelta::all_between(&baseline, &turn.cumulative_trajectory)
            .into_iter()
            .map(|d| BaselineDrift {
                ocean_trait: d.ocean_trait,
                baseline: baseline.get(d.ocean_trait),
                current: turn.cumulative_trajectory.get(d.ocean_trait),
                delta: d.delta,
                direction: d.direction,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CueRecord<'a> {
    pub turn_number: usize,
    /// Participant whose generation the cue shaped
    pub listener: ParticipantId,
    pub cue: &'a AdaptiveCue,
}

pub fn cue_history(state: &ConversationState) -> Vec<CueRecord<'_>> {
    state
        .turns
        .iter()
        .filter_map(|t| {
            t.adaptation.as_ref().map(|cue| CueRecord {
                turn_number: t.turn_number,
                listener: t.speaker,
                cue,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSpan {
    #[serde(rename = "trait")]
    pub ocean_trait: OceanTrait,
    pub start_index: usize,
    pub end_index: usize,
    pub text: String,
    pub value: f64,
    pub rationale: String,
}

/// Non-overlapping trait highlights for a turn's dialogue.
pub fn highlight_spans(turn: &ConversationTurn) -> Vec<HighlightSpan> {
    resolve_overlaps(&turn.trait_signals)
        .into_iter()
        .map(|s| HighlightSpan {
            text: s.excerpt(&turn.dialogue),
            ocean_trait: s.ocean_trait,
            start_index: s.start_index,
            end_index: s.end_index,
            value: s.value,
            rationale: s.rationale,
        })
        .collect()
}
