//! Conversation aggregate: participants, scenario, turns, status machine
//!
//! `ConversationState` is the single owner of the turn list and the
//! per-speaker trajectory histories. The orchestrator is its only writer
//! while a run is active; edits to participants, scenario and settings are
//! only accepted while idle.

use crate::adaptive::{compute_adaptive_cue_with, AdaptiveCue, AdaptiveSettings};
use crate::error::{DuetError, Result};
use crate::ocean::OceanProfile;
use crate::signals::{Sentiment, TraitSignal};
use crate::strategies::StrategyTable;
use crate::vector_store::{Document, RetrievalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Version tag written into every export snapshot.
pub const EXPORT_VERSION: &str = "1.0";

// ============ Participants ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticipantId {
    A,
    B,
}

impl ParticipantId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantId::A => "A",
            ParticipantId::B => "B",
        }
    }

    pub fn from_str(s: &str) -> Option<ParticipantId> {
        match s.trim() {
            "A" | "a" => Some(ParticipantId::A),
            "B" | "b" => Some(ParticipantId::B),
            _ => None,
        }
    }

    pub fn other(&self) -> ParticipantId {
        match self {
            ParticipantId::A => ParticipantId::B,
            ParticipantId::B => ParticipantId::A,
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: String,
    pub persona: String,
    /// Fixed baseline profile
    pub ocean: OceanProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaking_style: Option<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: &str, role: &str, persona: &str, ocean: OceanProfile) -> Self {
        Self {
            id,
            name: name.to_string(),
            role: role.to_string(),
            persona: persona.to_string(),
            ocean: ocean.clamped(),
            speaking_style: None,
            documents: Vec::new(),
        }
    }

    pub fn default_a() -> Self {
        Self::new(
            ParticipantId::A,
            "Dr. Sarah Chen",
            "Doctor",
            "A compassionate oncologist with 15 years of experience. Known for her direct but empathetic communication style. Values patient autonomy and shared decision-making.",
            OceanProfile::new(65.0, 80.0, 55.0, 75.0, 30.0),
        )
    }

    pub fn default_b() -> Self {
        Self::new(
            ParticipantId::B,
            "Michael Torres",
            "Patient",
            "A 52-year-old engineer recently diagnosed with early-stage prostate cancer. Analytical by nature, he researches extensively but struggles with uncertainty. First major health crisis.",
            OceanProfile::new(45.0, 70.0, 40.0, 60.0, 65.0),
        )
    }
}

// ============ Scenario ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    #[default]
    Professional,
    Tense,
    Friendly,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Professional => "professional",
            Tone::Tense => "tense",
            Tone::Friendly => "friendly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantObjective {
    pub participant_id: ParticipantId,
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub topic: String,
    pub background: String,
    pub tone: Tone,
    pub max_turns: usize,
    #[serde(default)]
    pub objectives: Vec<ParticipantObjective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_boundaries: Option<String>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            topic: "Treatment Options Discussion".to_string(),
            background: "Follow-up appointment to discuss treatment options after recent diagnosis. The patient has researched various options online and comes prepared with questions.".to_string(),
            tone: Tone::Professional,
            max_turns: 12,
            objectives: vec![
                ParticipantObjective {
                    participant_id: ParticipantId::A,
                    objective: "Explain treatment options clearly, address concerns, and support informed decision-making".to_string(),
                },
                ParticipantObjective {
                    participant_id: ParticipantId::B,
                    objective: "Understand all options, voice concerns, and feel confident about next steps".to_string(),
                },
            ],
            safety_boundaries: None,
        }
    }
}

impl Scenario {
    pub fn objective_for(&self, id: ParticipantId) -> Option<&str> {
        self.objectives
            .iter()
            .find(|o| o.participant_id == id)
            .map(|o| o.objective.as_str())
    }
}

// ============ Turns ============

/// One committed exchange. Built once by the orchestrator after both
/// generation and analysis succeed and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: String,
    pub turn_number: usize,
    pub speaker: ParticipantId,
    pub dialogue: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub trait_signals: Vec<TraitSignal>,
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Speaker's cumulative profile as of this turn
    pub cumulative_trajectory: OceanProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_docs: Option<Vec<RetrievalResult>>,
    /// Cue that was active when this turn was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptation: Option<AdaptiveCue>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        turn_number: usize,
        speaker: ParticipantId,
        dialogue: String,
        actions: Vec<String>,
        trait_signals: Vec<TraitSignal>,
        sentiment: Sentiment,
        cumulative_trajectory: OceanProfile,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turn_number,
            speaker,
            dialogue,
            actions,
            trait_signals,
            sentiment,
            cumulative_trajectory: cumulative_trajectory.clamped(),
            retrieved_docs: None,
            adaptation: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_retrieved_docs(mut self, docs: Vec<RetrievalResult>) -> Self {
        self.retrieved_docs = if docs.is_empty() { None } else { Some(docs) };
        self
    }

    pub fn with_adaptation(mut self, cue: Option<AdaptiveCue>) -> Self {
        self.adaptation = cue;
        self
    }
}

// ============ Status machine ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Start,
    Pause,
    Resume,
    Complete,
    Reset,
}

impl StatusEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEvent::Start => "start",
            StatusEvent::Pause => "pause",
            StatusEvent::Resume => "resume",
            StatusEvent::Complete => "complete",
            StatusEvent::Reset => "reset",
        }
    }
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Idle => "idle",
            ConversationStatus::Running => "running",
            ConversationStatus::Paused => "paused",
            ConversationStatus::Completed => "completed",
        }
    }

    /// idle -> running <-> paused -> completed; reset from anywhere.
    pub fn transition(self, event: StatusEvent) -> Result<ConversationStatus> {
        use ConversationStatus::*;
        match (self, event) {
            (_, StatusEvent::Reset) => Ok(Idle),
            (Idle, StatusEvent::Start) => Ok(Running),
            (Running, StatusEvent::Pause) => Ok(Paused),
            (Paused, StatusEvent::Resume) => Ok(Running),
            (Running, StatusEvent::Complete) | (Paused, StatusEvent::Complete) => Ok(Completed),
            (from, event) => Err(DuetError::InvalidTransition {
                from: from.as_str().to_string(),
                event: event.as_str().to_string(),
            }),
        }
    }
}

// ============ State ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub id: String,
    pub participant_a: Participant,
    pub participant_b: Participant,
    pub scenario: Scenario,
    pub turns: Vec<ConversationTurn>,
    pub adaptive_settings: AdaptiveSettings,
    pub status: ConversationStatus,
    pub current_speaker: ParticipantId,
    pub trajectory_a: Vec<OceanProfile>,
    pub trajectory_b: Vec<OceanProfile>,
    /// Cue computed after the latest turn, consumed by the next generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_cue: Option<AdaptiveCue>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(Participant::default_a(), Participant::default_b(), Scenario::default())
    }
}

impl ConversationState {
    pub fn new(participant_a: Participant, participant_b: Participant, scenario: Scenario) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            participant_a,
            participant_b,
            scenario,
            turns: Vec::new(),
            adaptive_settings: AdaptiveSettings::default(),
            status: ConversationStatus::Idle,
            current_speaker: ParticipantId::A,
            trajectory_a: Vec::new(),
            trajectory_b: Vec::new(),
            pending_cue: None,
        }
    }

    pub fn participant(&self, id: ParticipantId) -> &Participant {
        match id {
            ParticipantId::A => &self.participant_a,
            ParticipantId::B => &self.participant_b,
        }
    }

    fn participant_mut(&mut self, id: ParticipantId) -> &mut Participant {
        match id {
            ParticipantId::A => &mut self.participant_a,
            ParticipantId::B => &mut self.participant_b,
        }
    }

    pub fn trajectory(&self, id: ParticipantId) -> &[OceanProfile] {
        match id {
            ParticipantId::A => &self.trajectory_a,
            ParticipantId::B => &self.trajectory_b,
        }
    }

    pub fn is_full(&self) -> bool {
        self.turns.len() >= self.scenario.max_turns
    }

    pub fn next_turn_number(&self) -> usize {
        self.turns.len() + 1
    }

    /// Turns spoken by `id`, in order.
    pub fn turns_by(&self, id: ParticipantId) -> Vec<ConversationTurn> {
        self.turns.iter().filter(|t| t.speaker == id).cloned().collect()
    }

    /// Last trajectory `id` produced, or their baseline before their first turn.
    pub fn previous_trajectory(&self, id: ParticipantId) -> OceanProfile {
        self.trajectory(id)
            .last()
            .copied()
            .unwrap_or(self.participant(id).ocean)
    }

    /// The trailing `n` turns.
    pub fn recent_turns(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// "Name: dialogue" lines for the trailing `n` turns.
    pub fn transcript(&self, n: usize) -> String {
        self.recent_turns(n)
            .iter()
            .map(|t| format!("{}: {}", self.participant(t.speaker).name, t.dialogue))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn apply(&mut self, event: StatusEvent) -> Result<()> {
        self.status = self.status.transition(event)?;
        if event == StatusEvent::Reset {
            self.id = Uuid::new_v4().to_string();
            self.turns.clear();
            self.trajectory_a.clear();
            self.trajectory_b.clear();
            self.current_speaker = ParticipantId::A;
            self.pending_cue = None;
        }
        Ok(())
    }

    /// Append a fully built turn and advance the speaker. Rejects turns out
    /// of alternation or past the turn budget.
    pub fn commit_turn(&mut self, turn: ConversationTurn) -> Result<()> {
        if self.is_full() {
            return Err(DuetError::InvalidTransition {
                from: self.status.as_str().to_string(),
                event: format!("commit turn {} past limit {}", turn.turn_number, self.scenario.max_turns),
            });
        }
        if turn.speaker != self.current_speaker {
            return Err(DuetError::InvalidTransition {
                from: self.status.as_str().to_string(),
                event: format!("commit turn for {} while {} is due", turn.speaker, self.current_speaker),
            });
        }

        match turn.speaker {
            ParticipantId::A => self.trajectory_a.push(turn.cumulative_trajectory),
            ParticipantId::B => self.trajectory_b.push(turn.cumulative_trajectory),
        }
        self.current_speaker = turn.speaker.other();
        self.turns.push(turn);
        Ok(())
    }

    // ============ Editing (idle only) ============

    fn ensure_editable(&self, what: &str) -> Result<()> {
        if self.status != ConversationStatus::Idle {
            return Err(DuetError::InvalidTransition {
                from: self.status.as_str().to_string(),
                event: what.to_string(),
            });
        }
        Ok(())
    }

    /// Replace a participant's profile. Their documents are kept.
    pub fn set_participant(&mut self, mut participant: Participant) -> Result<()> {
        self.ensure_editable("edit participant")?;
        participant.ocean = participant.ocean.clamped();
        let slot = self.participant_mut(participant.id);
        participant.documents = std::mem::take(&mut slot.documents);
        *slot = participant;
        Ok(())
    }

    pub fn set_scenario(&mut self, scenario: Scenario) -> Result<()> {
        self.ensure_editable("edit scenario")?;
        if scenario.max_turns == 0 {
            return Err(DuetError::InvalidConfig("scenario needs at least one turn".to_string()));
        }
        self.scenario = scenario;
        Ok(())
    }

    pub fn set_adaptive_settings(&mut self, settings: AdaptiveSettings) -> Result<()> {
        self.ensure_editable("edit adaptive settings")?;
        self.adaptive_settings = settings;
        Ok(())
    }

    pub fn add_document(&mut self, document: Document) -> Result<()> {
        self.ensure_editable("add document")?;
        self.participant_mut(document.participant_id).documents.push(document);
        Ok(())
    }

    pub fn remove_document(&mut self, id: ParticipantId, document_id: &str) -> Result<Option<Document>> {
        self.ensure_editable("remove document")?;
        let documents = &mut self.participant_mut(id).documents;
        let removed = documents
            .iter()
            .position(|d| d.id == document_id)
            .map(|idx| documents.remove(idx));
        Ok(removed)
    }

    // ============ Export ============

    pub fn export(&self) -> ExportData {
        ExportData {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now().to_rfc3339(),
            participant_a: self.participant_a.clone(),
            participant_b: self.participant_b.clone(),
            scenario: self.scenario.clone(),
            turns: self.turns.clone(),
            adaptive_settings: self.adaptive_settings.clone(),
        }
    }

    /// Recompute the cue for the upcoming speaker from the turns of the
    /// participant who spoke last.
    pub fn refresh_pending_cue(&mut self, table: &StrategyTable) -> Option<&AdaptiveCue> {
        self.pending_cue = match self.turns.last() {
            Some(last) if self.adaptive_settings.enabled => {
                let speaker_turns = self.turns_by(last.speaker);
                compute_adaptive_cue_with(&speaker_turns, &self.adaptive_settings, table)
            }
            _ => None,
        };
        self.pending_cue.as_ref()
    }

    /// Rebuild a state from a snapshot. Trajectory histories, the next
    /// speaker and the pending cue are derived from the turn list. A partial transcript comes
    /// back paused so it can be resumed.
    pub fn import(data: ExportData) -> Result<ConversationState> {
        if data.version != EXPORT_VERSION {
            return Err(DuetError::UnsupportedExportVersion(data.version));
        }
        if data.turns.len() > data.scenario.max_turns {
            return Err(DuetError::InvalidConfig(format!(
                "snapshot holds {} turns but the scenario allows {}",
                data.turns.len(),
                data.scenario.max_turns
            )));
        }

        let mut state = ConversationState::new(data.participant_a, data.participant_b, data.scenario);
        state.adaptive_settings = data.adaptive_settings;
        for turn in data.turns {
            state.commit_turn(turn)?;
        }
        state.refresh_pending_cue(StrategyTable::builtin());
        state.status = if state.turns.is_empty() {
            ConversationStatus::Idle
        } else if state.is_full() {
            ConversationStatus::Completed
        } else {
            ConversationStatus::Paused
        };
        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    pub exported_at: String,
    pub participant_a: Participant,
    pub participant_b: Participant,
    pub scenario: Scenario,
    pub turns: Vec<ConversationTurn>,
    pub adaptive_settings: AdaptiveSettings,
}

impl ExportData {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<ExportData> {
        Ok(serde_json::from_str(json)?)
    }
}
