//! Big Five (OCEAN) personality model
//!
//! `OceanProfile` is used both for a participant's fixed baseline and for the
//! cumulative per-turn trajectory snapshots. Every write path clamps to
//! [0, 100].

use serde::{Deserialize, Serialize};

pub const TRAIT_MIN: f64 = 0.0;
pub const TRAIT_MAX: f64 = 100.0;

/// Deltas smaller than this (in points) are reported as stable.
pub const STABLE_DELTA: f64 = 2.0;

// ============ Traits ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OceanTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl OceanTrait {
    /// Canonical ordering. Ties in delta ranking resolve in this order.
    pub const ALL: [OceanTrait; 5] = [
        OceanTrait::Openness,
        OceanTrait::Conscientiousness,
        OceanTrait::Extraversion,
        OceanTrait::Agreeableness,
        OceanTrait::Neuroticism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "openness",
            OceanTrait::Conscientiousness => "conscientiousness",
            OceanTrait::Extraversion => "extraversion",
            OceanTrait::Agreeableness => "agreeableness",
            OceanTrait::Neuroticism => "neuroticism",
        }
    }

    pub fn from_str(s: &str) -> Option<OceanTrait> {
        match s.trim().to_lowercase().as_str() {
            "openness" => Some(OceanTrait::Openness),
            "conscientiousness" => Some(OceanTrait::Conscientiousness),
            "extraversion" => Some(OceanTrait::Extraversion),
            "agreeableness" => Some(OceanTrait::Agreeableness),
            "neuroticism" => Some(OceanTrait::Neuroticism),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "Openness",
            OceanTrait::Conscientiousness => "Conscientiousness",
            OceanTrait::Extraversion => "Extraversion",
            OceanTrait::Agreeableness => "Agreeableness",
            OceanTrait::Neuroticism => "Neuroticism",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            OceanTrait::Openness => "O",
            OceanTrait::Conscientiousness => "C",
            OceanTrait::Extraversion => "E",
            OceanTrait::Agreeableness => "A",
            OceanTrait::Neuroticism => "N",
        }
    }

    /// (high, low) descriptions used in analysis prompts
    pub fn descriptions(&self) -> (&'static str, &'static str) {
        match self {
            OceanTrait::Openness => (
                "Curious, creative, open to new experiences",
                "Practical, conventional, prefers routine",
            ),
            OceanTrait::Conscientiousness => (
                "Organized, disciplined, goal-oriented",
                "Flexible, spontaneous, adaptable",
            ),
            OceanTrait::Extraversion => (
                "Outgoing, energetic, talkative",
                "Reserved, reflective, prefers solitude",
            ),
            OceanTrait::Agreeableness => (
                "Cooperative, trusting, helpful",
                "Competitive, skeptical, challenging",
            ),
            OceanTrait::Neuroticism => (
                "Sensitive, anxious, emotionally reactive",
                "Calm, stable, emotionally resilient",
            ),
        }
    }
}

/// Coarse reading of a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitLevel {
    Low,
    Moderate,
    High,
}

impl TraitLevel {
    pub fn classify(value: f64) -> TraitLevel {
        if value > 70.0 {
            TraitLevel::High
        } else if value < 30.0 {
            TraitLevel::Low
        } else {
            TraitLevel::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TraitLevel::Low => "low",
            TraitLevel::Moderate => "moderate",
            TraitLevel::High => "high",
        }
    }
}

// ============ Profile ============

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return TRAIT_MIN;
    }
    value.clamp(TRAIT_MIN, TRAIT_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OceanProfile {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for OceanProfile {
    fn default() -> Self {
        Self::uniform(50.0)
    }
}

impl OceanProfile {
    /// Build a profile, clamping every field to [0, 100].
    pub fn new(
        openness: f64,
        conscientiousness: f64,
        extraversion: f64,
        agreeableness: f64,
        neuroticism: f64,
    ) -> Self {
        Self {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
        }
        .clamped()
    }

    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value, value)
    }

    pub fn get(&self, t: OceanTrait) -> f64 {
        match t {
            OceanTrait::Openness => self.openness,
            OceanTrait::Conscientiousness => self.conscientiousness,
            OceanTrait::Extraversion => self.extraversion,
            OceanTrait::Agreeableness => self.agreeableness,
            OceanTrait::Neuroticism => self.neuroticism,
        }
    }

    pub fn set(&mut self, t: OceanTrait, value: f64) {
        let value = clamp_score(value);
        match t {
            OceanTrait::Openness => self.openness = value,
            OceanTrait::Conscientiousness => self.conscientiousness = value,
            OceanTrait::Extraversion => self.extraversion = value,
            OceanTrait::Agreeableness => self.agreeableness = value,
            OceanTrait::Neuroticism => self.neuroticism = value,
        }
    }

    /// Builder-style setter, clamped like `set`.
    pub fn with(mut self, t: OceanTrait, value: f64) -> Self {
        self.set(t, value);
        self
    }

    pub fn clamped(self) -> Self {
        Self {
            openness: clamp_score(self.openness),
            conscientiousness: clamp_score(self.conscientiousness),
            extraversion: clamp_score(self.extraversion),
            agreeableness: clamp_score(self.agreeableness),
            neuroticism: clamp_score(self.neuroticism),
        }
    }

    pub fn level(&self, t: OceanTrait) -> TraitLevel {
        TraitLevel::classify(self.get(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = (OceanTrait, f64)> + '_ {
        OceanTrait::ALL.iter().map(move |t| (*t, self.get(*t)))
    }
}

// ============ Deltas ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn classify(delta: f64) -> TrendDirection {
        if delta.abs() < STABLE_DELTA {
            TrendDirection::Stable
        } else if delta > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitDelta {
    #[serde(rename = "trait")]
    pub ocean_trait: OceanTrait,
    pub delta: f64,
    pub direction: TrendDirection,
}

impl TraitDelta {
    /// `end[trait] - start[trait]`; only the window endpoints matter.
    pub fn between(start: &OceanProfile, end: &OceanProfile, t: OceanTrait) -> Self {
        let delta = end.get(t) - start.get(t);
        Self {
            ocean_trait: t,
            delta,
            direction: TrendDirection::classify(delta),
        }
    }

    /// All five deltas in canonical trait order.
    pub fn all_between(start: &OceanProfile, end: &OceanProfile) -> Vec<TraitDelta> {
        OceanTrait::ALL
            .iter()
            .map(|t| TraitDelta::between(start, end, *t))
            .collect()
    }

    pub fn magnitude(&self) -> f64 {
        self.delta.abs()
    }
}
