//! Miscue analysis: compares what the reader said against the line on the
//! page. A remote text-generation model does the comparison; whenever it is
//! unavailable the verdict comes from [`mock::verdict`] instead, and the
//! result says so through [`Analysis::Fallback`].

pub mod gemini;
pub mod mock;
pub mod prompt;
pub mod worker;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

pub use mock::SIMULATE_ERROR;

/// Identifies one analysis request so late results can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miscue {
    pub expected_word: String,
    pub spoken_word: String,
    pub phonetic_hint: String,
    pub feedback_script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VerdictWire", into = "VerdictWire")]
pub enum MiscueVerdict {
    Correct,
    Miscue(Miscue),
}

impl MiscueVerdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, MiscueVerdict::Correct)
    }
}

/// JSON shape shared with the model: `{"isCorrect": true}` or the full
/// miscue record.
#[derive(Debug, Serialize, Deserialize)]
struct VerdictWire {
    #[serde(rename = "isCorrect")]
    is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    miscue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phonemes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script: Option<String>,
}

impl TryFrom<VerdictWire> for MiscueVerdict {
    type Error = String;

    fn try_from(wire: VerdictWire) -> Result<Self, Self::Error> {
        if wire.is_correct {
            return Ok(MiscueVerdict::Correct);
        }
        match (wire.word, wire.miscue, wire.phonemes, wire.script) {
            (Some(word), Some(miscue), Some(phonemes), Some(script)) => {
                Ok(MiscueVerdict::Miscue(Miscue {
                    expected_word: word,
                    spoken_word: miscue,
                    phonetic_hint: phonemes,
                    feedback_script: script,
                }))
            }
            _ => Err("miscue record needs word, miscue, phonemes and script".to_string()),
        }
    }
}

impl From<MiscueVerdict> for VerdictWire {
    fn from(verdict: MiscueVerdict) -> Self {
        match verdict {
            MiscueVerdict::Correct => VerdictWire {
                is_correct: true,
                word: None,
                miscue: None,
                phonemes: None,
                script: None,
            },
            MiscueVerdict::Miscue(m) => VerdictWire {
                is_correct: false,
                word: Some(m.expected_word),
                miscue: Some(m.spoken_word),
                phonemes: Some(m.phonetic_hint),
                script: Some(m.feedback_script),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("running offline")]
    Offline,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} {body}")]
    Status { status: u16, body: String },
    #[error("no candidates in response")]
    NoCandidates,
    #[error("unexpected response structure")]
    UnexpectedShape,
    #[error("verdict is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of one analysis, tagged with where the verdict came from.
#[derive(Debug)]
pub enum Analysis {
    Remote(MiscueVerdict),
    Fallback {
        verdict: MiscueVerdict,
        reason: AnalyzerError,
    },
}

impl Analysis {
    pub fn verdict(&self) -> &MiscueVerdict {
        match self {
            Analysis::Remote(verdict) | Analysis::Fallback { verdict, .. } => verdict,
        }
    }

    pub fn into_verdict(self) -> MiscueVerdict {
        match self {
            Analysis::Remote(verdict) | Analysis::Fallback { verdict, .. } => verdict,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Analysis::Fallback { .. })
    }

    pub fn source(&self) -> &'static str {
        match self {
            Analysis::Remote(_) => "remote",
            Analysis::Fallback { .. } => "fallback",
        }
    }
}

/// Anything that turns a prompt into generated text.
pub trait TextGenerator: Send {
    fn generate(&self, prompt: &str) -> Result<String, AnalyzerError>;
}

/// Generator that is never reachable; every analysis takes the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl TextGenerator for Offline {
    fn generate(&self, _prompt: &str) -> Result<String, AnalyzerError> {
        Err(AnalyzerError::Offline)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str) -> Result<String, AnalyzerError> {
        (**self).generate(prompt)
    }
}

pub struct Analyzer<G, R = StdRng> {
    generator: G,
    rng: R,
}

impl<G: TextGenerator> Analyzer<G, StdRng> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            rng: StdRng::from_entropy(),
        }
    }
}

impl<G: TextGenerator, R: Rng> Analyzer<G, R> {
    pub fn with_rng(generator: G, rng: R) -> Self {
        Self { generator, rng }
    }

    pub fn analyze(&mut self, spoken: &str, reference: &str) -> Analysis {
        let prompt = prompt::build(spoken, reference);
        let remote = self
            .generator
            .generate(&prompt)
            .and_then(|text| parse_verdict(&text));

        match remote {
            Ok(verdict) => {
                debug!(correct = verdict.is_correct(), "remote verdict");
                Analysis::Remote(verdict)
            }
            Err(reason) => {
                warn!(%reason, "miscue analysis unavailable, using local fallback");
                Analysis::Fallback {
                    verdict: mock::verdict(spoken, reference, &mut self.rng),
                    reason,
                }
            }
        }
    }
}

/// Parses generated text that should hold a single verdict object,
/// optionally wrapped in a markdown code fence.
pub fn parse_verdict(text: &str) -> Result<MiscueVerdict, AnalyzerError> {
    let unfenced = text.replace("```json", "").replace("```", "");
    Ok(serde_json::from_str(unfenced.trim())?)
}
