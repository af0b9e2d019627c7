//! Conversation orchestrator
//!
//! Drives the turn loop: generate for the current speaker, analyze the new
//! dialogue against their previous trajectory, commit the turn, then
//! recompute the adaptive cue for the next speaker. Turns are strictly
//! sequential. A turn only touches shared state at commit time, so a failed
//! or cancelled turn leaves no trace.

use crate::config::DuetConfig;
use crate::conversation::{
    ConversationState, ConversationStatus, ConversationTurn, ExportData, ParticipantId,
    StatusEvent,
};
use crate::error::{DuetError, Result};
use crate::logging;
use crate::ocean::OceanProfile;
use crate::prompts::build_retrieval_query;
use crate::services::{AnalysisRequest, GenerationRequest, Services};
use crate::strategies::StrategyTable;
use crate::vector_store::{self, Document, RetrievalResult, VectorStore};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Coarse run status. `Failed` is reported once the consecutive failure
/// budget is exhausted; the conversation itself is left paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl From<ConversationStatus> for RunStatus {
    fn from(status: ConversationStatus) -> Self {
        match status {
            ConversationStatus::Idle => RunStatus::Idle,
            ConversationStatus::Running => RunStatus::Running,
            ConversationStatus::Paused => RunStatus::Paused,
            ConversationStatus::Completed => RunStatus::Completed,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Committed(ConversationTurn),
    /// Turn budget already reached; nothing was generated.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: RunStatus,
    /// Turns committed by this run
    pub committed: usize,
    pub total_turns: usize,
}

/// Everything a turn needs, captured under one read lock.
struct TurnPlan {
    conversation_id: String,
    turn_count: usize,
    turn_number: usize,
    speaker: ParticipantId,
    generation: GenerationRequest,
    previous_trajectory: OceanProfile,
    analysis_context: String,
    retrieval_query: String,
}

/// Clears the running flag on every exit path of `run`.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    state: Arc<RwLock<ConversationState>>,
    store: Arc<RwLock<VectorStore>>,
    services: Services,
    config: DuetConfig,
    strategies: Arc<StrategyTable>,
    running: AtomicBool,
    stop_requested: AtomicBool,
    failed: AtomicBool,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl Orchestrator {
    pub fn new(state: ConversationState, services: Services, config: DuetConfig) -> Self {
        Self::with_strategies(state, services, config, StrategyTable::builtin().clone())
    }

    pub fn with_strategies(
        state: ConversationState,
        services: Services,
        config: DuetConfig,
        strategies: StrategyTable,
    ) -> Self {
        let mut store = VectorStore::new();
        for id in [ParticipantId::A, ParticipantId::B] {
            for document in &state.participant(id).documents {
                store.add_document(document);
            }
        }

        Self {
            state: Arc::new(RwLock::new(state)),
            store: Arc::new(RwLock::new(store)),
            services,
            config,
            strategies: Arc::new(strategies),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    /// Shared handle for readers (analytics, export). Writers other than the
    /// orchestrator should go through its methods.
    pub fn state(&self) -> Arc<RwLock<ConversationState>> {
        self.state.clone()
    }

    pub fn store(&self) -> Arc<RwLock<VectorStore>> {
        self.store.clone()
    }

    pub fn config(&self) -> &DuetConfig {
        &self.config
    }

    pub async fn run_status(&self) -> RunStatus {
        if self.failed.load(Ordering::SeqCst) {
            return RunStatus::Failed;
        }
        self.state.read().await.status.into()
    }

    // ============ Single turn ============

    /// Run one turn against the current state.
    ///
    /// Nothing is written unless generation and analysis both succeed and
    /// the state has not moved underneath the turn (reset, import). A
    /// cancelled turn returns `DuetError::Cancelled`.
    pub async fn run_turn(&self, cancel: &CancellationToken) -> Result<TurnOutcome> {
        let plan = match self.plan_turn().await? {
            Some(plan) => plan,
            None => return Ok(TurnOutcome::Completed),
        };
        let conversation_id = plan.conversation_id.clone();

        let retrieved = self.retrieve_for(&plan, cancel).await?;

        let mut generation_request = plan.generation;
        generation_request.retrieved_docs = retrieved.clone();
        let generated = self
            .guarded(cancel, "generation", self.services.generation.generate(&generation_request))
            .await?;
        if generated.dialogue.trim().is_empty() {
            return Err(DuetError::EmptyDialogue);
        }

        let analysis_request = AnalysisRequest {
            dialogue: generated.dialogue.clone(),
            actions: generated.actions.clone(),
            speaker: plan.speaker,
            participant: generation_request.speaker.clone(),
            conversation_context: plan.analysis_context,
            previous_trajectory: plan.previous_trajectory,
        };
        let analysis = self
            .guarded(cancel, "analysis", self.services.analysis.analyze(&analysis_request))
            .await?
            .clamped(&generated.dialogue);

        let turn = ConversationTurn::new(
            plan.turn_number,
            plan.speaker,
            generated.dialogue,
            generated.actions,
            analysis.trait_signals,
            analysis.sentiment,
            analysis.cumulative_trajectory,
        )
        .with_retrieved_docs(retrieved)
        .with_adaptation(generation_request.adaptive_cue);

        if cancel.is_cancelled() {
            return Err(DuetError::Cancelled);
        }

        let mut state = self.state.write().await;
        if state.id != conversation_id || state.turns.len() != plan.turn_count {
            return Err(DuetError::Cancelled);
        }
        state.commit_turn(turn.clone())?;

        logging::log_turn(Some(&conversation_id), &format!(
            "Turn {} committed for {} ({} signals, sentiment {})",
            turn.turn_number,
            turn.speaker.as_str(),
            turn.trait_signals.len(),
            turn.sentiment.as_str()
        ));

        // The next speaker listens to whoever just spoke.
        if let Some(cue) = state.refresh_pending_cue(&self.strategies) {
            logging::log_adaptive(Some(&conversation_id), &format!(
                "Cue for {}: {} (confidence {:.2})",
                turn.speaker.other().as_str(),
                cue.rationale,
                cue.confidence
            ));
        }

        Ok(TurnOutcome::Committed(turn))
    }

    async fn plan_turn(&self) -> Result<Option<TurnPlan>> {
        {
            let state = self.state.read().await;
            if !state.is_full() && state.status != ConversationStatus::Completed {
                let speaker = state.current_speaker;
                let participant = state.participant(speaker).clone();
                let adaptive_cue = if state.adaptive_settings.enabled {
                    state.pending_cue.clone()
                } else {
                    None
                };

                return Ok(Some(TurnPlan {
                    conversation_id: state.id.clone(),
                    turn_count: state.turns.len(),
                    turn_number: state.next_turn_number(),
                    speaker,
                    previous_trajectory: state.previous_trajectory(speaker),
                    analysis_context: state.transcript(self.config.analysis_context_turns),
                    retrieval_query: build_retrieval_query(&participant, &state.scenario, &state.turns),
                    generation: GenerationRequest {
                        speaker: participant,
                        other: state.participant(speaker.other()).clone(),
                        scenario: state.scenario.clone(),
                        history: state.recent_turns(self.config.max_history_turns).to_vec(),
                        adaptive_cue,
                        retrieved_docs: Vec::new(),
                    },
                }));
            }
        }

        let mut state = self.state.write().await;
        if matches!(state.status, ConversationStatus::Running | ConversationStatus::Paused) {
            state.apply(StatusEvent::Complete)?;
            logging::log_session(Some(&state.id), &format!(
                "Conversation completed after {} turns",
                state.turns.len()
            ));
        }
        Ok(None)
    }

    /// Grounding snippets for the speaker. Failures other than cancellation
    /// degrade to no snippets.
    async fn retrieve_for(&self, plan: &TurnPlan, cancel: &CancellationToken) -> Result<Vec<RetrievalResult>> {
        let store = self.store.read().await;
        if !store.has_embedded_chunks(plan.speaker) {
            return Ok(Vec::new());
        }

        let lookup = vector_store::retrieve(
            &store,
            plan.speaker,
            &plan.retrieval_query,
            self.services.embedding.as_ref(),
            self.config.retrieval_top_k,
        );
        match self.guarded(cancel, "embedding", lookup).await {
            Ok(results) => {
                logging::log_retrieval(Some(&plan.conversation_id), &format!(
                    "Retrieved {} snippets for {}",
                    results.len(),
                    plan.speaker.as_str()
                ));
                Ok(results)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                logging::log_error(Some(&plan.conversation_id), &format!("Retrieval failed: {}", e));
                Ok(Vec::new())
            }
        }
    }

    /// Bound an external call by the configured timeout and the turn's
    /// cancellation token.
    async fn guarded<T, F>(&self, cancel: &CancellationToken, service: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let after = self.config.request_timeout();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DuetError::Cancelled),
            result = tokio::time::timeout(after, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(DuetError::Timeout {
                    service: service.to_string(),
                    after,
                }),
            },
        }
    }

    // ============ Run loop ============

    /// Run turns until the budget is reached, a pause/stop is requested, or
    /// the consecutive failure budget is exhausted (`DuetError::RunFailed`).
    pub async fn run(&self) -> Result<RunSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DuetError::InvalidTransition {
                from: "running".to_string(),
                event: "run".to_string(),
            });
        }
        let _guard = RunningGuard(&self.running);
        self.stop_requested.store(false, Ordering::SeqCst);
        self.failed.store(false, Ordering::SeqCst);

        let conversation_id = {
            let mut state = self.state.write().await;
            match state.status {
                ConversationStatus::Idle => state.apply(StatusEvent::Start)?,
                ConversationStatus::Paused => state.apply(StatusEvent::Resume)?,
                ConversationStatus::Running => {}
                ConversationStatus::Completed => {
                    return Ok(RunSummary {
                        status: RunStatus::Completed,
                        committed: 0,
                        total_turns: state.turns.len(),
                    });
                }
            }
            logging::log_session(Some(&state.id), &format!(
                "Run started at turn {} of {}",
                state.next_turn_number(),
                state.scenario.max_turns
            ));
            state.id.clone()
        };

        let mut committed = 0;
        let mut failures = 0;

        while !self.stop_requested.load(Ordering::SeqCst) {
            let token = CancellationToken::new();
            self.set_in_flight(Some(token.clone()));

            match self.run_turn(&token).await {
                Ok(TurnOutcome::Committed(_)) => {
                    committed += 1;
                    failures = 0;
                }
                Ok(TurnOutcome::Completed) => break,
                Err(e) if e.is_cancelled() => {
                    logging::log_turn(Some(&conversation_id), "Turn cancelled; discarded");
                }
                Err(e) => {
                    failures += 1;
                    logging::log_error(Some(&conversation_id), &format!(
                        "Turn failed ({}/{}): {}",
                        failures, self.config.max_consecutive_failures, e
                    ));
                    if failures >= self.config.max_consecutive_failures {
                        self.set_in_flight(None);
                        return Err(self.fail_run(failures).await);
                    }
                }
            }

            if self.state.read().await.is_full() {
                continue;
            }

            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(self.config.turn_delay()) => {}
            }
        }
        self.set_in_flight(None);

        let state = self.state.read().await;
        logging::log_session(Some(&state.id), &format!(
            "Run ended: {} ({} turns committed this run)",
            state.status.as_str(),
            committed
        ));
        Ok(RunSummary {
            status: state.status.into(),
            committed,
            total_turns: state.turns.len(),
        })
    }

    async fn fail_run(&self, failures: usize) -> DuetError {
        self.failed.store(true, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if state.status == ConversationStatus::Running {
            let _ = state.apply(StatusEvent::Pause);
        }
        logging::log_error(Some(&state.id), &format!(
            "Run halted after {} consecutive failures",
            failures
        ));
        DuetError::RunFailed { failures }
    }

    fn set_in_flight(&self, token: Option<CancellationToken>) {
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = token;
        }
    }

    /// Soft pause: the in-flight turn may still commit, no new turn starts.
    pub async fn pause(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.apply(StatusEvent::Pause)?;
        logging::log_session(Some(&state.id), "Pause requested");
        Ok(())
    }

    /// Hard stop: pause and cancel the in-flight turn, discarding it.
    pub async fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Ok(slot) = self.in_flight.lock() {
            if let Some(token) = slot.as_ref() {
                token.cancel();
            }
        }
        let mut state = self.state.write().await;
        if state.status == ConversationStatus::Running {
            state.apply(StatusEvent::Pause)?;
        }
        logging::log_session(Some(&state.id), "Stop requested");
        Ok(())
    }

    /// Continue a paused conversation.
    pub async fn resume(&self) -> Result<RunSummary> {
        let status = self.state.read().await.status;
        if status != ConversationStatus::Paused {
            return Err(DuetError::InvalidTransition {
                from: status.as_str().to_string(),
                event: StatusEvent::Resume.as_str().to_string(),
            });
        }
        self.run().await
    }

    /// Stop anything in flight and clear the transcript. Participants,
    /// documents and settings are kept.
    pub async fn reset(&self) -> Result<()> {
        self.stop().await?;
        self.failed.store(false, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.apply(StatusEvent::Reset)?;
        logging::log_session(Some(&state.id), "Conversation reset");
        Ok(())
    }

    // ============ Documents / snapshots ============

    /// Chunk, embed and attach a document to a participant. Only while idle.
    pub async fn add_document(&self, participant: ParticipantId, name: &str, content: &str) -> Result<Document> {
        {
            let state = self.state.read().await;
            if state.status != ConversationStatus::Idle {
                return Err(DuetError::InvalidTransition {
                    from: state.status.as_str().to_string(),
                    event: "add document".to_string(),
                });
            }
        }

        let document = vector_store::embed_document(
            participant,
            name,
            content,
            self.services.embedding.as_ref(),
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
        .await?;

        self.state.write().await.add_document(document.clone())?;
        self.store.write().await.add_document(&document);
        Ok(document)
    }

    pub async fn remove_document(&self, participant: ParticipantId, document_id: &str) -> Result<bool> {
        let removed = self.state.write().await.remove_document(participant, document_id)?;
        self.store.write().await.remove_document(participant, document_id);
        Ok(removed.is_some())
    }

    pub async fn export(&self) -> ExportData {
        self.state.read().await.export()
    }

    /// Replace the conversation with an imported snapshot and re-index its
    /// documents. Refused while a run is active.
    pub async fn import(&self, data: ExportData) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(DuetError::InvalidTransition {
                from: "running".to_string(),
                event: "import".to_string(),
            });
        }
        let mut imported = ConversationState::import(data)?;
        imported.refresh_pending_cue(&self.strategies);

        let mut store = self.store.write().await;
        store.clear_all();
        for id in [ParticipantId::A, ParticipantId::B] {
            for document in &imported.participant(id).documents {
                store.add_document(document);
            }
        }

        let mut state = self.state.write().await;
        *state = imported;
        self.failed.store(false, Ordering::SeqCst);
        logging::log_session(Some(&state.id), &format!("Imported snapshot with {} turns", state.turns.len()));
        Ok(())
    }
}
