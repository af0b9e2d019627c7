// Prompt builders for the chat-completion backed services

use crate::adaptive::AdaptiveCue;
use crate::conversation::{ConversationTurn, Participant, Scenario};
use crate::ocean::OceanTrait;
use crate::services::{AnalysisRequest, GenerationRequest};

pub const GENERATION_SYSTEM_PROMPT: &str = "You are a conversation simulator that generates realistic dialogue. Always respond with valid JSON only, no additional text.";

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a personality analysis system that identifies OCEAN trait signals in dialogue. Always respond with valid JSON only.";

const STYLE_GUIDE: &str = r#"This personality profile should subtly influence your communication style:
- High Openness → More creative, abstract, exploratory language
- Low Openness → More concrete, practical, conventional language
- High Conscientiousness → More organized, detailed, precise
- Low Conscientiousness → More flexible, casual, spontaneous
- High Extraversion → More enthusiastic, talkative, engaging
- Low Extraversion → More reserved, thoughtful, concise
- High Agreeableness → More cooperative, warm, accommodating
- Low Agreeableness → More direct, skeptical, challenging
- High Neuroticism → More emotionally expressive, sensitive to concerns
- Low Neuroticism → More calm, stable, emotionally measured"#;

const GENERATION_RULES: &str = r#"IMPORTANT RULES:
- The dialogue must be clean, natural speech with NO repeated words or phrases
- Do NOT duplicate any part of the text
- The actions array should contain 0-3 screenplay-style descriptions (e.g., "leans forward", "pauses thoughtfully")
- Keep the response focused and avoid unnecessary filler"#;

const ANALYSIS_FORMAT: &str = r#"Respond with ONLY a JSON object in this exact format:
{
  "traitSignals": [
    {
      "trait": "openness" | "conscientiousness" | "extraversion" | "agreeableness" | "neuroticism",
      "startIndex": number,
      "endIndex": number,
      "value": number between -1 (low trait) and 1 (high trait),
      "confidence": number between 0 and 1,
      "rationale": "Brief explanation"
    }
  ],
  "sentiment": "positive" | "neutral" | "negative",
  "cumulativeTrajectory": {
    "openness": number 0-100,
    "conscientiousness": number 0-100,
    "extraversion": number 0-100,
    "agreeableness": number 0-100,
    "neuroticism": number 0-100
  }
}

Guidelines:
- Only include traitSignals for clearly observable signals (2-5 signals typical)
- startIndex/endIndex should be exact character positions in the dialogue string
- value: use negative for low-trait signals, positive for high-trait signals
- cumulativeTrajectory should move gradually (typically 1-5 points per turn)
- Consider non-verbal actions as additional trait signals"#;

fn profile_lines(participant: &Participant) -> String {
    participant
        .ocean
        .iter()
        .map(|(t, v)| format!("- {}: {}/100 ({})", t.label(), v, participant.ocean.level(t).as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn history_block(speaker: &Participant, other: &Participant, turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return "This is the start of the conversation.".to_string();
    }
    turns
        .iter()
        .map(|t| {
            let name = if t.speaker == speaker.id { &speaker.name } else { &other.name };
            if t.actions.is_empty() {
                format!("{}: {}", name, t.dialogue)
            } else {
                format!("{}: {}\n  [{}]", name, t.dialogue, t.actions.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn cue_block(cue: &AdaptiveCue) -> String {
    let bullets = |items: &[String]| {
        items.iter().map(|i| format!("- {}", i)).collect::<Vec<_>>().join("\n")
    };
    format!(
        "\n\nADAPTIVE COMMUNICATION GUIDANCE:\nBased on the conversation dynamics, adjust your response style:\n\nInstructions:\n{}\n\nAvoid:\n{}\n\nRationale: {}\n",
        bullets(&cue.instructions),
        bullets(&cue.do_not_do),
        cue.rationale
    )
}

pub fn build_generation_prompt(request: &GenerationRequest) -> String {
    let speaker = &request.speaker;
    let other = &request.other;
    let scenario = &request.scenario;

    let mut character = vec![
        format!("Name: {}", speaker.name),
        format!("Role: {}", speaker.role),
        format!("Persona: {}", speaker.persona),
    ];
    if let Some(style) = &speaker.speaking_style {
        character.push(format!("Speaking Style: {}", style));
    }

    let mut scenario_lines = vec![
        format!("Topic: {}", scenario.topic),
        format!("Background: {}", scenario.background),
        format!("Tone: {}", scenario.tone.as_str()),
    ];
    if let Some(objective) = scenario.objective_for(speaker.id) {
        scenario_lines.push(format!("Your objective: {}", objective));
    }
    if let Some(bounds) = &scenario.safety_boundaries {
        scenario_lines.push(format!("Boundaries: {}", bounds));
    }

    let documents = if request.retrieved_docs.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nRELEVANT INFORMATION FROM {}'S DOCUMENTS:\n{}",
            speaker.name.to_uppercase(),
            request
                .retrieved_docs
                .iter()
                .map(|d| format!("- {}", d.content))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    let guidance = request.adaptive_cue.as_ref().map(cue_block).unwrap_or_default();

    format!(
        r#"You are simulating a realistic conversation as {name}, a {role}.

CHARACTER PROFILE:
{character}

OCEAN PERSONALITY PROFILE:
{profile}

{style}

SCENARIO:
{scenario}

OTHER PARTICIPANT:
{other_name} ({other_role}){documents}{guidance}

CONVERSATION SO FAR:
{history}

Now respond as {name}. Your response must be:
1. Authentic to your personality profile
2. Contextually appropriate to the conversation
3. Include natural non-verbal actions where appropriate
4. NEVER repeat words or phrases - no stuttering or duplication
5. Do NOT start with greetings if the conversation has already begun

Respond with ONLY a JSON object in this exact format:
{{
  "dialogue": "Your spoken words as {name}",
  "actions": ["Non-verbal action 1", "Non-verbal action 2"]
}}

{rules}"#,
        name = speaker.name,
        role = speaker.role,
        character = character.join("\n"),
        profile = profile_lines(speaker),
        style = STYLE_GUIDE,
        scenario = scenario_lines.join("\n"),
        other_name = other.name,
        other_role = other.role,
        documents = documents,
        guidance = guidance,
        history = history_block(speaker, other, &request.history),
        rules = GENERATION_RULES,
    )
}

pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let participant = &request.participant;
    let actions = if request.actions.is_empty() {
        String::new()
    } else {
        format!("\nNon-verbal actions: {}", request.actions.join(", "))
    };

    let baseline = participant
        .ocean
        .iter()
        .map(|(t, v)| format!("- {}: {}/100", t.label(), v))
        .collect::<Vec<_>>()
        .join("\n");
    let previous = request
        .previous_trajectory
        .iter()
        .map(|(t, v)| format!("- {}: {:.1}", t.label(), v))
        .collect::<Vec<_>>()
        .join("\n");
    let reference = OceanTrait::ALL
        .iter()
        .map(|t| {
            let (high, low) = t.descriptions();
            format!("- {} ({}): High = {}. Low = {}.", t.label(), t.as_str(), high, low)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following dialogue for OCEAN personality trait signals.

SPEAKER: {name} ({role})
BASELINE PERSONALITY:
{baseline}

PREVIOUS TRAJECTORY (last turn):
{previous}

RECENT CONVERSATION CONTEXT:
{context}

DIALOGUE TO ANALYZE:
"{dialogue}"{actions}

TRAIT REFERENCE:
{reference}

Analyze this dialogue and identify:
1. Specific text spans that signal OCEAN traits (with start/end character indices)
2. Overall sentiment of the turn
3. Updated cumulative trajectory scores (should move gradually from previous, staying within 0-100)

{format}"#,
        name = participant.name,
        role = participant.role,
        baseline = baseline,
        previous = previous,
        context = request.conversation_context,
        dialogue = request.dialogue,
        actions = actions,
        reference = reference,
        format = ANALYSIS_FORMAT,
    )
}

/// Query used to pull grounding snippets from the speaker's documents.
pub fn build_retrieval_query(speaker: &Participant, scenario: &Scenario, turns: &[ConversationTurn]) -> String {
    let start = turns.len().saturating_sub(3);
    let recent = turns[start..]
        .iter()
        .map(|t| t.dialogue.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {} {} perspective", scenario.topic, recent, speaker.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationState, ParticipantId};
    use crate::ocean::OceanProfile;
    use crate::signals::Sentiment;
    use crate::strategies::StanceAdjustments;
    use crate::adaptive::AdaptiveTrigger;

    fn turn(n: usize, speaker: ParticipantId, text: &str) -> ConversationTurn {
        ConversationTurn::new(n, speaker, text.to_string(), Vec::new(), Vec::new(), Sentiment::Neutral, OceanProfile::default())
    }

    #[test]
    fn test_generation_prompt_sections() {
        let state = ConversationState::default();
        let mut request = GenerationRequest {
            speaker: state.participant_b.clone(),
            other: state.participant_a.clone(),
            scenario: state.scenario.clone(),
            history: Vec::new(),
            adaptive_cue: None,
            retrieved_docs: Vec::new(),
        };
        let prompt = build_generation_prompt(&request);
        assert!(prompt.contains("as Michael Torres, a Patient"));
        assert!(prompt.contains("- Neuroticism: 65/100 (moderate)"));
        assert!(prompt.contains("Your objective: Understand all options"));
        assert!(prompt.contains("This is the start of the conversation."));
        assert!(!prompt.contains("ADAPTIVE COMMUNICATION GUIDANCE"));

        request.history = vec![turn(1, ParticipantId::A, "How are you feeling?")];
        request.adaptive_cue = Some(AdaptiveCue {
            stance_adjustments: StanceAdjustments::default(),
            instructions: vec!["Slow down".to_string()],
            do_not_do: vec!["Rush".to_string()],
            rationale: "Because".to_string(),
            confidence: 0.5,
            trigger: AdaptiveTrigger {
                detected_trait: OceanTrait::Neuroticism,
                delta: 6.0,
                sentiment: None,
                window_turns: 3,
            },
        });
        let prompt = build_generation_prompt(&request);
        assert!(prompt.contains("Dr. Sarah Chen: How are you feeling?"));
        assert!(prompt.contains("Instructions:\n- Slow down"));
        assert!(prompt.contains("Avoid:\n- Rush"));
    }

    #[test]
    fn test_analysis_prompt_includes_trajectory() {
        let state = ConversationState::default();
        let request = AnalysisRequest {
            dialogue: "I keep reading about side effects.".to_string(),
            actions: vec!["fidgets".to_string()],
            speaker: ParticipantId::B,
            participant: state.participant_b.clone(),
            conversation_context: "Dr. Sarah Chen: Any questions?".to_string(),
            previous_trajectory: OceanProfile::uniform(42.25),
        };
        let prompt = build_analysis_prompt(&request);
        assert!(prompt.contains("- Openness: 42.2") || prompt.contains("- Openness: 42.3"));
        assert!(prompt.contains("Non-verbal actions: fidgets"));
        assert!(prompt.contains("- Neuroticism (neuroticism): High = Sensitive"));
    }

    #[test]
    fn test_retrieval_query_uses_last_three_dialogues() {
        let state = ConversationState::default();
        let turns: Vec<_> = ["one", "two", "three", "four"]
            .iter()
            .enumerate()
            .map(|(i, d)| turn(i + 1, ParticipantId::A, d))
            .collect();
        let query = build_retrieval_query(&state.participant_a, &state.scenario, &turns);
        assert_eq!(query, "Treatment Options Discussion two three four Doctor perspective");
    }
}
