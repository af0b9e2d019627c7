//! OCEAN Duet: two personality-modeled participants in a simulated dialogue,
//! with per-turn Big Five analysis, cumulative trajectories and adaptive
//! listening cues.

pub mod adaptive;
pub mod analytics;
pub mod archive;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod ocean;
pub mod openai;
pub mod orchestrator;
pub mod prompts;
pub mod services;
pub mod signals;
pub mod strategies;
pub mod vector_store;

pub use adaptive::{compute_adaptive_cue, AdaptiveCue, AdaptiveSettings, AdaptiveTrigger, Sensitivity};
pub use config::DuetConfig;
pub use conversation::{
    ConversationState, ConversationStatus, ConversationTurn, ExportData, Participant,
    ParticipantId, Scenario,
};
pub use error::{DuetError, Result};
pub use ocean::{OceanProfile, OceanTrait};
pub use orchestrator::{Orchestrator, RunStatus, RunSummary, TurnOutcome};
pub use services::Services;
pub use strategies::{AdaptiveStrategy, StrategyTable};

use openai::OpenAIClient;
use std::path::Path;
use std::sync::Arc;

// ============ App Initialization ============

/// Build an orchestrator backed by OpenAI for all three services.
pub fn build_orchestrator(state: ConversationState, config: DuetConfig) -> Result<Orchestrator> {
    config.validate()?;
    let client = Arc::new(OpenAIClient::new(&config)?);
    Ok(Orchestrator::new(state, Services::from_provider(client), config))
}

/// Initialize logging (pruning week-old log files) and load config from the
/// environment.
pub fn init(log_dir: Option<&Path>) -> Result<DuetConfig> {
    logging::init_logging(log_dir)?;
    if log_dir.is_some() {
        match logging::cleanup_old_logs(7) {
            Ok(n) if n > 0 => logging::log_session(None, &format!("Cleaned up {} old log files", n)),
            Ok(_) => {}
            Err(e) => logging::log_error(None, &format!("Log cleanup failed: {}", e)),
        }
    }
    DuetConfig::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_orchestrator_requires_key() {
        let err = build_orchestrator(ConversationState::default(), DuetConfig::default()).err();
        assert!(matches!(err, Some(DuetError::InvalidConfig(_))));

        let config = DuetConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..DuetConfig::default()
        };
        let orch = build_orchestrator(ConversationState::default(), config).unwrap();
        assert_eq!(orch.run_status().await, RunStatus::Idle);
    }
}
