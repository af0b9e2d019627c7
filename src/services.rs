//! External service boundaries
//!
//! Generation, analysis and embedding are opaque request/response services.
//! Analysis output is untrusted and only reaches the core through
//! `RawAnalysis::sanitize`.

use crate::adaptive::AdaptiveCue;
use crate::conversation::{ConversationTurn, Participant, ParticipantId, Scenario};
use crate::error::{DuetError, Result};
use crate::ocean::{OceanProfile, OceanTrait};
use crate::signals::{sanitize_signals, RawTraitSignal, Sentiment, TraitSignal};
use crate::vector_store::RetrievalResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

// ============ Generation ============

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub speaker: Participant,
    pub other: Participant,
    pub scenario: Scenario,
    /// Trailing history, oldest first
    pub history: Vec<ConversationTurn>,
    pub adaptive_cue: Option<AdaptiveCue>,
    pub retrieved_docs: Vec<RetrievalResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub dialogue: String,
    pub actions: Vec<String>,
}

/// Loose wire shape of a generation reply.
#[derive(Debug, Default, Deserialize)]
pub struct RawGeneration {
    pub dialogue: Option<String>,
    pub actions: Option<serde_json::Value>,
}

impl RawGeneration {
    /// Non-array `actions` become empty; non-string entries are skipped.
    pub fn normalize(self) -> GenerationResponse {
        let actions = match self.actions {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };
        GenerationResponse {
            dialogue: self.dialogue.unwrap_or_default().trim().to_string(),
            actions,
        }
    }
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

// ============ Analysis ============

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub dialogue: String,
    pub actions: Vec<String>,
    pub speaker: ParticipantId,
    pub participant: Participant,
    /// Rolling "Name: dialogue" transcript of recent turns
    pub conversation_context: String,
    pub previous_trajectory: OceanProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub trait_signals: Vec<TraitSignal>,
    pub sentiment: Sentiment,
    pub cumulative_trajectory: OceanProfile,
}

impl AnalysisResponse {
    /// Clamp every signal to `dialogue` and the trajectory to 0-100.
    pub fn clamped(self, dialogue: &str) -> AnalysisResponse {
        let len = dialogue.chars().count();
        AnalysisResponse {
            trait_signals: self.trait_signals.into_iter().map(|s| s.clamped(len)).collect(),
            sentiment: self.sentiment,
            cumulative_trajectory: self.cumulative_trajectory.clamped(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    pub openness: Option<f64>,
    pub conscientiousness: Option<f64>,
    pub extraversion: Option<f64>,
    pub agreeableness: Option<f64>,
    pub neuroticism: Option<f64>,
}

impl RawProfile {
    fn field(&self, t: OceanTrait) -> Option<f64> {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    /// Missing or NaN fields keep the previous value; the rest are clamped.
    pub fn resolve(&self, previous: &OceanProfile) -> OceanProfile {
        let mut out = previous.clamped();
        for t in OceanTrait::ALL {
            if let Some(v) = self.field(t).filter(|v| !v.is_nan()) {
                out.set(t, v);
            }
        }
        out
    }
}

/// Loose wire shape of an analysis reply.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    #[serde(default)]
    pub trait_signals: Option<Vec<RawTraitSignal>>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub cumulative_trajectory: Option<RawProfile>,
}

impl RawAnalysis {
    pub fn sanitize(self, dialogue: &str, previous: &OceanProfile) -> AnalysisResponse {
        AnalysisResponse {
            trait_signals: sanitize_signals(self.trait_signals.as_deref().unwrap_or(&[]), dialogue),
            sentiment: Sentiment::parse_lenient(self.sentiment.as_deref()),
            cumulative_trajectory: match &self.cumulative_trajectory {
                Some(raw) => raw.resolve(previous),
                None => previous.clamped(),
            },
        }
    }
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// The orchestrator clamps whatever comes back (`AnalysisResponse::clamped`)
    /// before committing a turn.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

// ============ Embedding ============

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============ Bundle ============

#[derive(Clone)]
pub struct Services {
    pub generation: Arc<dyn GenerationService>,
    pub analysis: Arc<dyn AnalysisService>,
    pub embedding: Arc<dyn EmbeddingService>,
}

impl Services {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        analysis: Arc<dyn AnalysisService>,
        embedding: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            generation,
            analysis,
            embedding,
        }
    }

    /// One provider backing all three boundaries.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: GenerationService + AnalysisService + EmbeddingService + 'static,
    {
        Self {
            generation: provider.clone(),
            analysis: provider.clone(),
            embedding: provider,
        }
    }
}

/// Parse a structured model reply, tolerating markdown code fences.
pub fn parse_structured<T: DeserializeOwned>(service: &str, content: &str) -> Result<T> {
    let cleaned = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(cleaned)
        .map_err(|e| DuetError::provider(service, format!("unparseable reply: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_trajectory_falls_back_to_previous() {
        let previous = OceanProfile::new(40.0, 50.0, 60.0, 70.0, 80.0);
        let raw: RawAnalysis = parse_structured("analysis", r#"{"sentiment":"positive"}"#).unwrap();
        let out = raw.sanitize("hello", &previous);
        assert_eq!(out.cumulative_trajectory, previous);
        assert_eq!(out.sentiment, Sentiment::Positive);
        assert!(out.trait_signals.is_empty());
    }

    #[test]
    fn test_partial_trajectory_is_merged_and_clamped() {
        let previous = OceanProfile::uniform(50.0);
        let raw: RawAnalysis = parse_structured(
            "analysis",
            r#"```json
            {"traitSignals":[{"trait":"neuroticism","startIndex":0,"endIndex":99,"value":2,"confidence":0.9,"rationale":"worry"}],
             "sentiment":"furious",
             "cumulativeTrajectory":{"neuroticism":140,"openness":-3}}
            ```"#,
        )
        .unwrap();
        let out = raw.sanitize("I'm scared", &previous);
        assert_eq!(out.cumulative_trajectory.neuroticism, 100.0);
        assert_eq!(out.cumulative_trajectory.openness, 0.0);
        assert_eq!(out.cumulative_trajectory.agreeableness, 50.0);
        assert_eq!(out.sentiment, Sentiment::Neutral);
        assert_eq!(out.trait_signals[0].end_index, 10);
        assert_eq!(out.trait_signals[0].value, 1.0);
    }

    #[test]
    fn test_generation_normalize() {
        let raw: RawGeneration =
            parse_structured("generation", r#"{"dialogue":"  Hi. ","actions":["sits down", 3, ""]}"#).unwrap();
        let out = raw.normalize();
        assert_eq!(out.dialogue, "Hi.");
        assert_eq!(out.actions, vec!["sits down".to_string()]);

        let raw: RawGeneration = parse_structured("generation", r#"{"actions":"waves"}"#).unwrap();
        let out = raw.normalize();
        assert!(out.dialogue.is_empty());
        assert!(out.actions.is_empty());
    }

    #[test]
    fn test_unparseable_reply_is_provider_error() {
        let err = parse_structured::<RawGeneration>("generation", "not json").unwrap_err();
        assert!(matches!(err, DuetError::Provider { ref service, .. } if service == "generation"));
    }
}
