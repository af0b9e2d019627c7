//! Adaptive strategy rule tables
//!
//! Each strategy maps (trait x high/low) to a stance modifier vector plus the
//! instruction and avoid lists handed to the listener. The cue engine only
//! ever looks rows up; adding a strategy means adding rows to a
//! `StrategyTable`, either in code or from JSON.

use crate::error::{DuetError, Result};
use crate::ocean::OceanTrait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const STANCE_MIN: f64 = -3.0;
pub const STANCE_MAX: f64 = 3.0;

// ============ Stance ============

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StanceAdjustments {
    pub warmth: f64,
    pub structure: f64,
    /// Negative = slower
    pub pace: f64,
    pub autonomy: f64,
    pub directness: f64,
}

/// Nearest third, halves rounding toward positive infinity.
fn round_to_third(value: f64) -> f64 {
    (value * 3.0 + 0.5).floor() / 3.0
}

impl StanceAdjustments {
    pub const fn new(warmth: f64, structure: f64, pace: f64, autonomy: f64, directness: f64) -> Self {
        Self {
            warmth,
            structure,
            pace,
            autonomy,
            directness,
        }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            warmth: f(self.warmth),
            structure: f(self.structure),
            pace: f(self.pace),
            autonomy: f(self.autonomy),
            directness: f(self.directness),
        }
    }

    /// Multiply every dial by `scale`, round to the nearest third, and keep
    /// the result inside [-3, 3].
    pub fn scaled(&self, scale: f64) -> Self {
        self.map(|v| round_to_third(v * scale).clamp(STANCE_MIN, STANCE_MAX))
    }

    pub fn dials(&self) -> [(&'static str, f64); 5] {
        [
            ("warmth", self.warmth),
            ("structure", self.structure),
            ("pace", self.pace),
            ("autonomy", self.autonomy),
            ("directness", self.directness),
        ]
    }
}

// ============ Rules ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitResponse {
    pub when_high: StanceAdjustments,
    pub when_low: StanceAdjustments,
    #[serde(default)]
    pub instructions_when_high: Vec<String>,
    #[serde(default)]
    pub instructions_when_low: Vec<String>,
    #[serde(default)]
    pub avoid_when_high: Vec<String>,
    #[serde(default)]
    pub avoid_when_low: Vec<String>,
}

/// One side of a `TraitResponse`
#[derive(Debug, Clone, Copy)]
pub struct RuleBranch<'a> {
    pub stance: &'a StanceAdjustments,
    pub instructions: &'a [String],
    pub avoid: &'a [String],
}

impl TraitResponse {
    /// `high` selects the whenHigh side.
    pub fn branch(&self, high: bool) -> RuleBranch<'_> {
        if high {
            RuleBranch {
                stance: &self.when_high,
                instructions: &self.instructions_when_high,
                avoid: &self.avoid_when_high,
            }
        } else {
            RuleBranch {
                stance: &self.when_low,
                instructions: &self.instructions_when_low,
                avoid: &self.avoid_when_low,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRules {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub base_stance: StanceAdjustments,
    pub trait_responses: BTreeMap<OceanTrait, TraitResponse>,
}

impl StrategyRules {
    pub fn response(&self, t: OceanTrait) -> Option<&TraitResponse> {
        self.trait_responses.get(&t)
    }
}

// ============ Strategy identity ============

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdaptiveStrategy {
    #[default]
    ClinicalEmpathy,
    MotivationalInterviewing,
    ConflictDeescalation,
    Coaching,
    NeutralProfessional,
    /// A strategy supplied through a custom table
    Custom(String),
}

impl AdaptiveStrategy {
    pub const BUILTIN: [AdaptiveStrategy; 5] = [
        AdaptiveStrategy::ClinicalEmpathy,
        AdaptiveStrategy::MotivationalInterviewing,
        AdaptiveStrategy::ConflictDeescalation,
        AdaptiveStrategy::Coaching,
        AdaptiveStrategy::NeutralProfessional,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AdaptiveStrategy::ClinicalEmpathy => "clinical_empathy",
            AdaptiveStrategy::MotivationalInterviewing => "motivational_interviewing",
            AdaptiveStrategy::ConflictDeescalation => "conflict_deescalation",
            AdaptiveStrategy::Coaching => "coaching",
            AdaptiveStrategy::NeutralProfessional => "neutral_professional",
            AdaptiveStrategy::Custom(name) => name,
        }
    }
}

impl From<String> for AdaptiveStrategy {
    fn from(s: String) -> Self {
        match s.as_str() {
            "clinical_empathy" => AdaptiveStrategy::ClinicalEmpathy,
            "motivational_interviewing" => AdaptiveStrategy::MotivationalInterviewing,
            "conflict_deescalation" => AdaptiveStrategy::ConflictDeescalation,
            "coaching" => AdaptiveStrategy::Coaching,
            "neutral_professional" => AdaptiveStrategy::NeutralProfessional,
            _ => AdaptiveStrategy::Custom(s),
        }
    }
}

impl From<&str> for AdaptiveStrategy {
    fn from(s: &str) -> Self {
        AdaptiveStrategy::from(s.to_string())
    }
}

impl From<AdaptiveStrategy> for String {
    fn from(s: AdaptiveStrategy) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for AdaptiveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Table ============

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyTable {
    rules: HashMap<AdaptiveStrategy, StrategyRules>,
}

static BUILTIN_TABLE: Lazy<StrategyTable> = Lazy::new(builtin_table);

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five shipped strategies.
    pub fn builtin() -> &'static StrategyTable {
        &BUILTIN_TABLE
    }

    /// Parse a table from a JSON object keyed by strategy name.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, StrategyRules> = serde_json::from_str(json)?;
        Ok(Self {
            rules: raw
                .into_iter()
                .map(|(name, rules)| (AdaptiveStrategy::from(name), rules))
                .collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let raw: BTreeMap<&str, &StrategyRules> =
            self.rules.iter().map(|(k, v)| (k.as_str(), v)).collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Add or replace a strategy's rows.
    pub fn insert(&mut self, strategy: AdaptiveStrategy, rules: StrategyRules) {
        self.rules.insert(strategy, rules);
    }

    pub fn get(&self, strategy: &AdaptiveStrategy) -> Option<&StrategyRules> {
        self.rules.get(strategy)
    }

    pub fn rules_for(&self, strategy: &AdaptiveStrategy) -> Result<&StrategyRules> {
        self.get(strategy)
            .ok_or_else(|| DuetError::UnknownStrategy(strategy.to_string()))
    }

    pub fn contains(&self, strategy: &AdaptiveStrategy) -> bool {
        self.rules.contains_key(strategy)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &AdaptiveStrategy> {
        self.rules.keys()
    }
}

// ============ Built-in content ============

const fn st(warmth: f64, structure: f64, pace: f64, autonomy: f64, directness: f64) -> StanceAdjustments {
    StanceAdjustments::new(warmth, structure, pace, autonomy, directness)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn response(
    when_high: StanceAdjustments,
    when_low: StanceAdjustments,
    instructions_when_high: &[&str],
    instructions_when_low: &[&str],
    avoid_when_high: &[&str],
    avoid_when_low: &[&str],
) -> TraitResponse {
    TraitResponse {
        when_high,
        when_low,
        instructions_when_high: strings(instructions_when_high),
        instructions_when_low: strings(instructions_when_low),
        avoid_when_high: strings(avoid_when_high),
        avoid_when_low: strings(avoid_when_low),
    }
}

fn rules(
    label: &str,
    description: &str,
    base_stance: StanceAdjustments,
    responses: [(OceanTrait, TraitResponse); 5],
) -> StrategyRules {
    StrategyRules {
        label: label.to_string(),
        description: description.to_string(),
        base_stance,
        trait_responses: responses.into_iter().collect(),
    }
}

fn clinical_empathy() -> StrategyRules {
    use OceanTrait::*;
    rules(
        "Clinical Empathy",
        "Balanced warmth and structure for healthcare contexts",
        st(0.5, 0.3, 0.0, 0.3, 0.0),
        [
            (Neuroticism, response(
                st(1.0, 0.7, -0.5, 0.3, -0.3),
                st(0.3, 0.0, 0.2, 0.5, 0.2),
                &[
                    "Validate their feelings explicitly",
                    "Provide clear structure and next steps",
                    "Use a calm, measured pace",
                    "Offer reassurance without dismissing concerns",
                ],
                &["Match their composed energy", "Focus on information and options"],
                &[
                    "Rushing through information",
                    "Dismissing or minimizing concerns",
                    "Overwhelming with too many options at once",
                ],
                &["Over-emphasizing emotional aspects", "Being overly cautious in delivery"],
            )),
            (Agreeableness, response(
                st(0.5, 0.2, 0.0, 0.5, 0.0),
                st(0.3, 0.5, 0.0, 0.2, 0.5),
                &["Collaborate on decisions", "Acknowledge their cooperative approach"],
                &[
                    "Be direct and fact-based",
                    "Respect their need for autonomy",
                    "Provide clear rationales",
                ],
                &["Being overly directive", "Ignoring their input"],
                &["Being too soft or indirect", "Taking disagreement personally"],
            )),
            (Extraversion, response(
                st(0.3, 0.5, 0.0, 0.0, 0.2),
                st(0.5, 0.2, -0.3, 0.5, -0.2),
                &[
                    "Allow space for them to express thoughts",
                    "Provide structure to keep on track",
                    "Engage with their energy appropriately",
                ],
                &[
                    "Give time for reflection",
                    "Use gentle prompts rather than rapid questions",
                    "Allow comfortable silences",
                ],
                &["Cutting them off frequently", "Being overly reserved"],
                &["Filling every silence", "Putting them on the spot"],
            )),
            (Openness, response(
                st(0.2, 0.0, 0.0, 0.5, 0.0),
                st(0.3, 0.5, -0.2, 0.0, 0.3),
                &[
                    "Explore multiple perspectives",
                    "Use metaphors and analogies",
                    "Welcome their questions and ideas",
                ],
                &[
                    "Use concrete, practical language",
                    "Focus on established approaches",
                    "Limit abstract discussions",
                ],
                &["Being overly rigid or prescriptive", "Shutting down exploration"],
                &["Using too much abstract language", "Overwhelming with novel concepts"],
            )),
            (Conscientiousness, response(
                st(0.0, 0.7, 0.0, 0.3, 0.3),
                st(0.3, 0.3, -0.2, 0.3, 0.0),
                &[
                    "Provide detailed information",
                    "Offer timelines and specific plans",
                    "Be thorough and precise",
                ],
                &[
                    "Simplify to key points",
                    "Break into small, manageable steps",
                    "Offer support for follow-through",
                ],
                &["Being vague or imprecise", "Skipping important details"],
                &["Overwhelming with complexity", "Expecting rigid adherence to plans"],
            )),
        ],
    )
}

fn motivational_interviewing() -> StrategyRules {
    use OceanTrait::*;
    rules(
        "Motivational Interviewing",
        "Evokes change through autonomy support and reflection",
        st(0.7, 0.2, -0.2, 0.8, -0.3),
        [
            (Neuroticism, response(
                st(1.0, 0.3, -0.5, 0.5, -0.5),
                st(0.5, 0.0, 0.0, 0.7, 0.0),
                &[
                    "Reflect emotions back with empathy",
                    "Explore ambivalence gently",
                    "Affirm their strengths and efforts",
                ],
                &["Focus on values and goals", "Explore motivation openly"],
                &["Pushing for change too quickly", "Arguing or confronting"],
                &["Over-emphasizing problems"],
            )),
            (Agreeableness, response(
                st(0.5, 0.0, 0.0, 0.7, -0.2),
                st(0.5, 0.3, 0.0, 0.5, 0.2),
                &["Collaborate on change talk", "Build on their cooperative nature"],
                &["Roll with resistance", "Avoid arguing", "Find common ground"],
                &["Being directive"],
                &["Getting into power struggles", "Taking a confrontational stance"],
            )),
            (Extraversion, response(
                st(0.3, 0.3, 0.0, 0.5, 0.0),
                st(0.7, 0.0, -0.3, 0.7, -0.3),
                &["Let them verbalize their thoughts", "Summarize their key points"],
                &["Use open-ended questions sparingly", "Give space for internal processing"],
                &["Interrupting their flow"],
                &["Demanding immediate responses"],
            )),
            (Openness, response(
                st(0.3, 0.0, 0.0, 0.7, 0.0),
                st(0.5, 0.3, 0.0, 0.3, 0.2),
                &["Explore possibilities together", "Use their creativity in planning"],
                &["Keep to familiar frameworks", "Use concrete examples"],
                &["Being too prescriptive"],
                &["Introducing too many new concepts"],
            )),
            (Conscientiousness, response(
                st(0.3, 0.5, 0.0, 0.5, 0.2),
                st(0.5, 0.2, -0.2, 0.5, 0.0),
                &["Support their planning nature", "Help create action plans"],
                &["Focus on small wins", "Make steps very manageable"],
                &["Being vague about next steps"],
                &["Creating overwhelming plans"],
            )),
        ],
    )
}

fn conflict_deescalation() -> StrategyRules {
    use OceanTrait::*;
    rules(
        "Conflict De-escalation",
        "Reduces tension through validation and slow pacing",
        st(0.5, 0.5, -0.5, 0.3, -0.2),
        [
            (Neuroticism, response(
                st(1.0, 0.7, -0.7, 0.2, -0.5),
                st(0.3, 0.3, 0.0, 0.5, 0.2),
                &[
                    "Acknowledge the intensity of their feelings",
                    "Slow down significantly",
                    "Focus on safety and stability",
                    "Use calming language",
                ],
                &["Proceed with measured approach", "Focus on problem-solving"],
                &[
                    "Escalating with your own intensity",
                    "Dismissing their emotional state",
                    "Moving too quickly",
                ],
                &["Over-dramatizing the situation"],
            )),
            (Agreeableness, response(
                st(0.5, 0.3, -0.3, 0.5, 0.0),
                st(0.3, 0.7, -0.5, 0.2, 0.3),
                &["Build on their willingness to cooperate", "Find mutual interests"],
                &[
                    "Set clear boundaries calmly",
                    "Stay firm but not aggressive",
                    "Focus on facts and process",
                ],
                &["Taking advantage of their agreeableness"],
                &["Matching their combative energy", "Backing down on important boundaries"],
            )),
            (Extraversion, response(
                st(0.3, 0.7, -0.3, 0.2, 0.2),
                st(0.5, 0.3, -0.5, 0.5, -0.2),
                &["Let them express, then redirect", "Use summaries to slow pace"],
                &["Give space to process", "Don't force verbal engagement"],
                &["Trying to out-talk them"],
                &["Pressuring for immediate response"],
            )),
            (Openness, response(
                st(0.3, 0.3, -0.2, 0.5, 0.0),
                st(0.3, 0.5, -0.3, 0.2, 0.3),
                &["Explore alternative solutions", "Frame as a problem to solve together"],
                &["Stick to established procedures", "Be concrete and specific"],
                &["Being rigid in approach"],
                &["Introducing unfamiliar concepts"],
            )),
            (Conscientiousness, response(
                st(0.2, 0.7, 0.0, 0.3, 0.3),
                st(0.5, 0.5, -0.3, 0.3, 0.0),
                &["Document agreements clearly", "Follow through on commitments"],
                &["Keep agreements simple", "Check understanding frequently"],
                &["Being imprecise about agreements"],
                &["Creating complex resolutions"],
            )),
        ],
    )
}

fn coaching() -> StrategyRules {
    use OceanTrait::*;
    rules(
        "Coaching / Development",
        "Growth-oriented with accountability and exploration",
        st(0.5, 0.3, 0.0, 0.7, 0.3),
        [
            (Neuroticism, response(
                st(0.7, 0.5, -0.3, 0.3, 0.0),
                st(0.3, 0.2, 0.2, 0.7, 0.3),
                &[
                    "Balance challenge with support",
                    "Build confidence gradually",
                    "Celebrate small wins",
                ],
                &["Push for growth directly", "Set challenging goals"],
                &["Pushing too hard too fast", "Ignoring emotional needs"],
                &["Being too cautious"],
            )),
            (Agreeableness, response(
                st(0.5, 0.2, 0.0, 0.5, 0.2),
                st(0.3, 0.5, 0.0, 0.3, 0.5),
                &["Co-create goals", "Use collaborative language"],
                &[
                    "Be direct about expectations",
                    "Provide clear feedback",
                    "Respect their independence",
                ],
                &["Being too prescriptive"],
                &["Being wishy-washy"],
            )),
            (Extraversion, response(
                st(0.3, 0.5, 0.0, 0.5, 0.2),
                st(0.5, 0.2, -0.2, 0.5, 0.0),
                &["Use their verbal processing", "Channel energy into action"],
                &["Allow reflection time", "Use writing exercises"],
                &["All talk, no action"],
                &["Requiring verbal processing"],
            )),
            (Openness, response(
                st(0.3, 0.0, 0.0, 0.7, 0.2),
                st(0.3, 0.5, 0.0, 0.3, 0.3),
                &["Encourage experimentation", "Explore creative solutions"],
                &["Use proven methods", "Provide clear frameworks"],
                &["Being too structured"],
                &["Requiring too much novelty"],
            )),
            (Conscientiousness, response(
                st(0.2, 0.5, 0.2, 0.5, 0.3),
                st(0.5, 0.3, -0.2, 0.3, 0.2),
                &["Support their planning", "Add accountability structures"],
                &[
                    "Keep goals very simple",
                    "Build in flexibility",
                    "Focus on habits over plans",
                ],
                &["Suggesting shortcuts"],
                &["Expecting strict adherence"],
            )),
        ],
    )
}

fn neutral_professional() -> StrategyRules {
    use OceanTrait::*;
    rules(
        "Neutral Professional",
        "Minimal adaptation, maintains professional baseline",
        st(0.2, 0.3, 0.0, 0.3, 0.3),
        [
            (Neuroticism, response(
                st(0.3, 0.3, -0.2, 0.2, 0.0),
                st(0.1, 0.2, 0.0, 0.3, 0.2),
                &["Maintain professional composure", "Provide clear information"],
                &["Proceed efficiently"],
                &["Being dismissive"],
                &[],
            )),
            (Agreeableness, response(
                st(0.2, 0.2, 0.0, 0.3, 0.1),
                st(0.1, 0.3, 0.0, 0.2, 0.3),
                &["Be collaborative but focused"],
                &["Be direct and professional"],
                &[],
                &["Taking disagreement personally"],
            )),
            (Extraversion, response(
                st(0.1, 0.3, 0.0, 0.2, 0.2),
                st(0.2, 0.2, 0.0, 0.3, 0.1),
                &["Keep discussions focused"],
                &["Allow processing time"],
                &[],
                &[],
            )),
            (Openness, response(
                st(0.1, 0.2, 0.0, 0.3, 0.1),
                st(0.1, 0.3, 0.0, 0.2, 0.2),
                &["Allow brief exploration"],
                &["Stay practical"],
                &[],
                &[],
            )),
            (Conscientiousness, response(
                st(0.1, 0.3, 0.0, 0.3, 0.2),
                st(0.2, 0.2, 0.0, 0.2, 0.2),
                &["Be thorough"],
                &["Keep it simple"],
                &[],
                &[],
            )),
        ],
    )
}

fn builtin_table() -> StrategyTable {
    let mut table = StrategyTable::new();
    table.insert(AdaptiveStrategy::ClinicalEmpathy, clinical_empathy());
    table.insert(AdaptiveStrategy::MotivationalInterviewing, motivational_interviewing());
    table.insert(AdaptiveStrategy::ConflictDeescalation, conflict_deescalation());
    table.insert(AdaptiveStrategy::Coaching, coaching());
    table.insert(AdaptiveStrategy::NeutralProfessional, neutral_professional());
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_complete() {
        let table = StrategyTable::builtin();
        assert_eq!(table.len(), 5);
        for strategy in AdaptiveStrategy::BUILTIN.iter() {
            let rules = table.rules_for(strategy).unwrap();
            for t in OceanTrait::ALL.iter() {
                assert!(rules.response(*t).is_some(), "{} missing {}", strategy, t.as_str());
            }
        }
    }

    #[test]
    fn test_scaled_rounds_to_thirds() {
        let stance = st(1.0, 0.7, -0.5, 0.3, -0.3);
        let half = stance.scaled(0.5);
        assert!((half.warmth - 2.0 / 3.0).abs() < 1e-9);
        assert!((half.structure - 1.0 / 3.0).abs() < 1e-9);
        assert!((half.pace - (-1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(half.autonomy, 0.0);
        assert_eq!(half.directness, 0.0);
        assert_eq!(st(9.0, -9.0, 0.0, 0.0, 0.0).scaled(1.0).warmth, STANCE_MAX);
    }

    #[test]
    fn test_scaled_halves_round_up() {
        // -1.5 thirds lands on -1/3, not -2/3
        let stance = st(0.5, -0.5, -0.25, 0.0, 0.0).scaled(1.0);
        assert!((stance.warmth - 2.0 / 3.0).abs() < 1e-9);
        assert!((stance.structure - (-1.0 / 3.0)).abs() < 1e-9);
        assert_eq!(stance.pace, 0.0);
    }

    #[test]
    fn test_strategy_names_round_trip_through_serde() {
        let json = serde_json::to_string(&AdaptiveStrategy::ConflictDeescalation).unwrap();
        assert_eq!(json, "\"conflict_deescalation\"");
        let custom: AdaptiveStrategy = serde_json::from_str("\"socratic\"").unwrap();
        assert_eq!(custom, AdaptiveStrategy::Custom("socratic".to_string()));
    }

    #[test]
    fn test_custom_strategy_from_json_rows() {
        let mut table = StrategyTable::builtin().clone();
        let json = table.to_json().unwrap();
        let reparsed = StrategyTable::from_json(&json).unwrap();
        assert_eq!(&reparsed, StrategyTable::builtin());

        let socratic = StrategyTable::from_json(
            r#"{"socratic": {
                "label": "Socratic",
                "baseStance": {"warmth":0,"structure":0,"pace":0,"autonomy":1,"directness":0},
                "traitResponses": {
                    "openness": {
                        "whenHigh": {"warmth":0,"structure":0,"pace":0,"autonomy":1,"directness":0},
                        "whenLow": {"warmth":0,"structure":1,"pace":0,"autonomy":0,"directness":0},
                        "instructionsWhenHigh": ["Ask a deeper question"]
                    }
                }
            }}"#,
        )
        .unwrap();
        let name = AdaptiveStrategy::from("socratic");
        let rules = socratic.rules_for(&name).unwrap().clone();
        table.insert(name.clone(), rules);
        assert!(table.contains(&name));
        let branch = table
            .rules_for(&name)
            .unwrap()
            .response(OceanTrait::Openness)
            .unwrap()
            .branch(true);
        assert_eq!(branch.instructions, &["Ask a deeper question".to_string()]);
        assert!(branch.avoid.is_empty());
    }

    #[test]
    fn test_unknown_strategy_is_an_error() {
        let err = StrategyTable::new()
            .rules_for(&AdaptiveStrategy::Coaching)
            .unwrap_err();
        assert!(matches!(err, DuetError::UnknownStrategy(name) if name == "coaching"));
    }
}
