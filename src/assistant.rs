/// Lab assistant ("Dr. ChemBot")
/// Answers questions about the live beaker through a hosted Gemini model when a key
/// is configured, and from a local answer bank otherwise or whenever the call fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AssistantError;
use crate::monitor::{ph_category, temperature_status};
use crate::reaction::{LiquidColor, ReactionSnapshot};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Keys shipped in sample env files; treated the same as no key
const PLACEHOLDER_KEYS: [&str; 2] = ["your-gemini-api-key-here", "your_actual_api_key_here"];

static ADVICE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:suggestion|tip|try|next time)\b").expect("static regex"));

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl AssistantConfig {
    pub fn is_configured(&self) -> bool {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) => !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Remote,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
    pub context: &'static [&'static str],
    pub difficulty: Difficulty,
}

pub static FAQS: [Faq; 7] = [
    Faq {
        question: "What happens when acid and base mix?",
        answer: "When you mix an acid and a base, they undergo a neutralization reaction. The pH moves toward 7 (neutral), and you'll often see color changes and gas bubbles forming. This is because H⁺ ions from the acid react with OH⁻ ions from the base to form water.",
        context: &["acid-base", "neutralization"],
        difficulty: Difficulty::Beginner,
    },
    Faq {
        question: "Why does the solution change color?",
        answer: "Color changes occur due to chemical indicators or the formation of new compounds. In acid-base reactions, different pH levels cause indicator molecules to change their structure, which affects how they absorb light and appear to our eyes.",
        context: &["indicators", "pH", "color"],
        difficulty: Difficulty::Intermediate,
    },
    Faq {
        question: "What causes bubbling in reactions?",
        answer: "Bubbling indicates gas evolution! This happens when a chemical reaction produces a gas as a product. In acid-base reactions, CO₂ gas is often produced, creating the bubbles you see.",
        context: &["gas-evolution", "bubbles"],
        difficulty: Difficulty::Beginner,
    },
    Faq {
        question: "Why does heating affect reaction rate?",
        answer: "Heat increases molecular motion and collision frequency, making reactions happen faster. Higher temperatures provide more energy for molecules to overcome activation barriers and react more readily.",
        context: &["temperature", "kinetics"],
        difficulty: Difficulty::Intermediate,
    },
    Faq {
        question: "How do I safely handle chemicals?",
        answer: "Always add acid to water (never water to acid), wear safety equipment, work in a well-ventilated area, and never mix unknown chemicals. The lab shows safety warnings when pH or temperature reach dangerous levels.",
        context: &["safety", "handling"],
        difficulty: Difficulty::Beginner,
    },
    Faq {
        question: "What is pH and how is it measured?",
        answer: "pH measures hydrogen ion concentration on a scale of 0-14. Values below 7 are acidic, 7 is neutral, and above 7 is basic. pH meters and indicators help us measure these values accurately.",
        context: &["pH", "measurement"],
        difficulty: Difficulty::Beginner,
    },
    Faq {
        question: "How do catalysts work?",
        answer: "Catalysts speed up reactions by providing an alternative pathway with lower activation energy. They participate in the reaction but are regenerated unchanged, so they're not consumed in the process.",
        context: &["catalysis", "kinetics"],
        difficulty: Difficulty::Advanced,
    },
];

const DEFAULT_ANSWERS: [&str; 3] = [
    "That's an interesting chemistry question! Start an experiment to see live reactions.",
    "Great question! Pick a chemical from the catalog to begin observing real chemical changes.",
    "Chemistry is all about observation - try starting an acid-base experiment to see pH changes!",
];

pub fn quick_questions() -> &'static [Faq] {
    &FAQS[..2]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub question: String,
    pub answer: &'static str,
}

/// Up to three follow-up questions that fit what is in the beaker right now
pub fn suggestions(snapshot: Option<&ReactionSnapshot>) -> Vec<Suggestion> {
    let Some(s) = snapshot else {
        return vec![
            Suggestion {
                question: "How do I start an experiment?".to_string(),
                answer: "Pick chemicals from the catalog and drop them into the beaker!",
            },
            Suggestion {
                question: "What safety precautions should I know?".to_string(),
                answer: "Always observe proper lab safety - watch for heat, gases, and chemical reactions!",
            },
        ];
    };

    let mut out = Vec::new();
    if s.ph < 6.5 {
        out.push(Suggestion {
            question: format!("Why is my solution acidic (pH {:.1})?", s.ph),
            answer: "The pH below 7 indicates excess H+ ions from acids in your solution.",
        });
    } else if s.ph > 7.5 {
        out.push(Suggestion {
            question: format!("Why is my solution basic (pH {:.1})?", s.ph),
            answer: "The pH above 7 shows excess OH- ions from bases in your solution.",
        });
    } else {
        out.push(Suggestion {
            question: format!("Why is my solution neutral (pH {:.1})?", s.ph),
            answer: "You've achieved a near-perfect acid-base balance!",
        });
    }

    if s.temperature > 40.0 {
        out.push(Suggestion {
            question: format!("Why is my solution heating up to {:.1}°C?", s.temperature),
            answer: "Heat speeds up molecular motion - watch how the reaction responds as the temperature climbs!",
        });
    }
    if s.is_bubbling || s.has_gas_evolution {
        out.push(Suggestion {
            question: "What's causing the bubbling I see?".to_string(),
            answer: "Gas evolution reactions produce bubbles when gases like CO2 are formed!",
        });
    }
    if s.has_precipitate {
        out.push(Suggestion {
            question: "What's the solid forming in my solution?".to_string(),
            answer: "You've created a precipitate - an insoluble solid formed when two solutions react!",
        });
    }
    if s.color != LiquidColor::Water {
        out.push(Suggestion {
            question: format!("Why did my solution turn {}?", s.color.name()),
            answer: "Color changes indicate chemical reactions and pH changes in your solution!",
        });
    }

    out.truncate(3);
    out
}

/// Deterministic answer from the local bank. Never empty.
pub fn offline_answer(question: &str, snapshot: Option<&ReactionSnapshot>) -> String {
    let q = question.to_lowercase();

    if let Some(s) = snapshot {
        if q.contains("what") && (q.contains("happening") || q.contains("see")) {
            let mut parts = vec![format!(
                "Looking at your current experiment: pH is {:.2}, temperature is {:.1}°C, and your solution is {}.",
                s.ph,
                s.temperature,
                s.color.name()
            )];
            if s.is_bubbling {
                parts.push("I can see bubbling occurring!".to_string());
            }
            if s.has_gas_evolution {
                parts.push("Gas is being evolved!".to_string());
            }
            if s.has_precipitate {
                parts.push("A precipitate has formed!".to_string());
            }
            return parts.join(" ");
        }

        if q.contains("ph") {
            let (desc, detail) = if s.ph < 7.0 {
                ("acidic", "This indicates excess H+ ions from acids.")
            } else if s.ph > 7.0 {
                ("basic", "This shows excess OH- ions from bases.")
            } else {
                ("neutral", "You have a perfect acid-base balance!")
            };
            return format!(
                "Your current pH is {:.2}, which means your solution is {desc}. {detail}",
                s.ph
            );
        }

        if q.contains("temperature") || q.contains("hot") || q.contains("heat") {
            let detail = if s.temperature > 30.0 {
                "The solution is being heated - higher temperatures speed up reactions!"
            } else {
                "The temperature is stable, showing no significant heat generation."
            };
            return format!("Your solution is currently at {:.1}°C. {detail}", s.temperature);
        }

        if q.contains("color") || q.contains("change") {
            return format!(
                "Your solution is currently {}. Color changes in chemistry often indicate pH changes, chemical reactions, or the formation of new compounds!",
                s.color.name()
            );
        }

        if q.contains("bubble") || q.contains("gas") {
            return if s.is_bubbling || s.has_gas_evolution {
                "Yes! I can see bubbling in your solution right now. This indicates a gas-evolution reaction is taking place, likely producing CO2 or another gas.".to_string()
            } else {
                "I don't see any bubbling in your current experiment. Try adding carbonate to acid to see gas evolution!".to_string()
            };
        }
    }

    if q.contains("acid") && q.contains("base") {
        return FAQS[0].answer.to_string();
    }
    if q.contains("safe") || q.contains("danger") {
        return FAQS[4].answer.to_string();
    }

    let pick = question.bytes().map(usize::from).sum::<usize>() % DEFAULT_ANSWERS.len();
    DEFAULT_ANSWERS[pick].to_string()
}

/// Prompt sent to the model: the question framed by every live reading
pub fn build_prompt(question: &str, snapshot: Option<&ReactionSnapshot>) -> String {
    let mut prompt = String::from(
        "You are Dr. ChemBot, an expert chemistry assistant observing a live virtual chemistry lab. You can see everything happening in real-time.\n\nCURRENT LAB STATE:\n",
    );

    if let Some(s) = snapshot {
        let components = if s.components.is_empty() {
            "Pure solvent".to_string()
        } else {
            s.components.join(", ")
        };
        prompt.push_str(&format!(
            "LIVE REACTION DATA:\n\
             - pH: {:.2} ({})\n\
             - Temperature: {:.1}°C ({})\n\
             - Solution Color: {}\n\
             - Volume: {:.1} mL\n\
             - Concentration: {:.3} M\n\
             - Pressure: {:.2} atm\n\
             - Reaction Progress: {:.1}%\n\
             - Reaction Type: {}\n\n\
             VISUAL OBSERVATIONS:\n\
             - Boiling: {}\n\
             - Bubbling: {}\n\
             - Gas Evolution: {}\n\
             - Precipitate: {}\n\
             - Components: {}\n\n",
            s.ph,
            ph_category(s.ph),
            s.temperature,
            temperature_status(s.temperature),
            s.color.name(),
            s.volume,
            s.concentration,
            s.pressure,
            s.reaction_progress,
            s.reaction_type.as_str(),
            yes_no(s.is_boiling, "YES - Solution is boiling!", "No"),
            yes_no(s.is_bubbling, "YES - Active bubbling observed", "No bubbling"),
            yes_no(s.has_gas_evolution, "YES - Gas being produced", "No gas production"),
            yes_no(s.has_precipitate, "YES - Solid precipitate formed", "No precipitate"),
            components,
        ));
    } else {
        prompt.push_str("No experiment is running yet.\n\n");
    }

    prompt.push_str(&format!(
        "STUDENT QUESTION: \"{question}\"\n\n\
         RESPONSE GUIDELINES:\n\
         - Reference the exact current lab values and observations\n\
         - Connect observations to chemistry theory\n\
         - Be encouraging and educational\n\
         - Keep under 200 words but be specific\n\n\
         Answer as if you're watching the experiment live and can see exactly what the student sees:"
    ));
    prompt
}

fn yes_no(flag: bool, yes: &'static str, no: &'static str) -> &'static str {
    if flag {
        yes
    } else {
        no
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Acidic,
    Basic,
    Neutral,
    None,
}

impl Outcome {
    /// Without an indicator there is no visible result to explain
    pub fn from_snapshot(snapshot: &ReactionSnapshot) -> Self {
        if !snapshot.has_indicator() {
            Outcome::None
        } else if snapshot.ph < 7.0 {
            Outcome::Acidic
        } else if snapshot.ph > 7.0 {
            Outcome::Basic
        } else {
            Outcome::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Acidic => "acidic",
            Outcome::Basic => "basic",
            Outcome::Neutral => "neutral",
            Outcome::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub outcome: Outcome,
    pub explanation: String,
    pub suggestion: Option<String>,
    pub source: ReplySource,
}

fn fallback_analysis(outcome: Outcome) -> Analysis {
    let (explanation, suggestion) = match outcome {
        Outcome::Acidic => (
            "Your solution turned red because you added more acid than base. The excess acid ions (H+) lowered the pH below 7, making it acidic.",
            "Try adding more base to neutralize the excess acid and observe how the color changes.",
        ),
        Outcome::Basic => (
            "Your solution turned blue because you added more base than acid. The excess hydroxide ions (OH-) raised the pH above 7, making it basic.",
            "Try adding more acid to neutralize the excess base and reach a neutral pH of 7.",
        ),
        Outcome::Neutral => (
            "Excellent! Your solution turned green because you achieved a nearly perfect balance between acid and base, resulting in a neutral pH around 7.",
            "Great job! You successfully performed an acid-base neutralization. Try experimenting with different volumes next time.",
        ),
        Outcome::None => (
            "No color change occurred because you need to add an indicator to see the pH changes in your acid-base reaction.",
            "Add the indicator first, then try mixing different amounts of acid and base to see the color changes.",
        ),
    };
    Analysis {
        outcome,
        explanation: explanation.to_string(),
        suggestion: Some(suggestion.to_string()),
        source: ReplySource::Offline,
    }
}

/// Separate the model's explanation from any trailing advice
pub fn split_advice(text: &str) -> (String, Option<String>) {
    let mut parts = ADVICE_SPLIT.split(text);
    let explanation = parts.next().unwrap_or_default().trim().to_string();
    let rest: Vec<&str> = parts
        .map(|p| p.trim_start_matches(|c: char| c == ':' || c.is_whitespace()).trim_end())
        .filter(|p| !p.is_empty())
        .collect();
    let suggestion = if rest.is_empty() { None } else { Some(rest.join(" ")) };
    (explanation, suggestion)
}

fn analysis_prompt(snapshot: &ReactionSnapshot, outcome: Outcome) -> String {
    let actions: Vec<String> = snapshot
        .components
        .iter()
        .map(|c| format!("- Added {:.0}mL of {c}", crate::reaction::component_volume(c)))
        .collect();
    format!(
        "You are a chemistry teacher analyzing a student's acid-base experiment. Here are the details:\n\n\
         Experiment Actions:\n{}\n\n\
         Final State:\n\
         - Total volume: {:.0}mL\n\
         - pH: {:.2}\n\
         - Indicator added: {}\n\
         - Result: {}\n\n\
         Please provide:\n\
         1. A brief explanation (2-3 sentences) of what happened in the experiment and why the solution turned this color\n\
         2. A suggestion for improvement if needed (or praise if done well)\n\n\
         Keep it educational but encouraging, suitable for a student learning chemistry.",
        actions.join("\n"),
        snapshot.volume,
        snapshot.ph,
        if snapshot.has_indicator() { "Yes" } else { "No" },
        outcome.as_str(),
    )
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct Assistant {
    config: AssistantConfig,
    client: reqwest::Client,
}

impl Assistant {
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AssistantError::Client)?;
        if config.is_configured() {
            info!(model = %config.model, "assistant online");
        } else {
            info!("assistant offline: no API key configured, using local answers");
        }
        Ok(Assistant { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn greeting(&self) -> &'static str {
        if self.is_configured() {
            "Hello! I'm Dr. ChemBot, your AI chemistry assistant. I can help you understand chemical reactions, explain experimental results, and answer your chemistry questions!"
        } else {
            "Hello! I'm Dr. ChemBot. Note: AI features are currently offline (API key not configured). I'll still help with basic chemistry questions using my knowledge base!"
        }
    }

    /// Answer a question about the beaker. Falls back to the offline bank on any failure.
    pub async fn answer(&self, question: &str, snapshot: Option<&ReactionSnapshot>) -> Reply {
        if self.is_configured() {
            let prompt = build_prompt(question, snapshot);
            match self.generate(&prompt, 300).await {
                Ok(text) => {
                    return Reply {
                        text,
                        source: ReplySource::Remote,
                    }
                }
                Err(e) => warn!("assistant falling back to offline answers: {e}"),
            }
        }
        Reply {
            text: offline_answer(question, snapshot),
            source: ReplySource::Offline,
        }
    }

    pub async fn analyze(&self, snapshot: &ReactionSnapshot) -> Analysis {
        let outcome = Outcome::from_snapshot(snapshot);
        if self.is_configured() {
            match self.generate(&analysis_prompt(snapshot, outcome), 300).await {
                Ok(text) => {
                    let (explanation, suggestion) = split_advice(&text);
                    return Analysis {
                        outcome,
                        explanation,
                        suggestion,
                        source: ReplySource::Remote,
                    };
                }
                Err(e) => warn!("analysis falling back to offline answers: {e}"),
            }
        }
        fallback_analysis(outcome)
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AssistantError> {
        let key = match self.config.api_key.as_deref() {
            Some(key) if self.is_configured() => key.trim(),
            _ => return Err(AssistantError::NotConfigured),
        };
        let url = format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.8,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": max_tokens,
            }
        });

        debug!(%url, "calling model");
        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Status {
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&raw)?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AssistantError::MissingField {
                field: "candidates[0].content.parts[0].text",
            })
    }
}
