use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Config, Database, Ledger, LedgerError, PrimaryKey};

mod payloads;
mod provider;

pub use payloads::*;
pub use provider::*;

/// Every generation operation the gateway supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiOperation {
    Melody,
    Chords,
    Drums,
    Mastering,
    Stems,
    Structure,
    Mixing,
    Variations,
}

impl AiOperation {
    /// How many credits the operation costs. Charged once, after a payload
    /// has been produced.
    pub fn credit_cost(&self) -> f64 {
        match self {
            Self::Melody => 0.5,
            Self::Chords => 0.5,
            Self::Drums => 0.3,
            Self::Mastering => 1.,
            Self::Stems => 2.,
            Self::Structure => 0.5,
            Self::Mixing => 0.5,
            Self::Variations => 1.,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Melody => "melody",
            Self::Chords => "chords",
            Self::Drums => "drums",
            Self::Mastering => "mastering",
            Self::Stems => "stems",
            Self::Structure => "structure",
            Self::Mixing => "mixing",
            Self::Variations => "variations",
        }
    }
}

/// A minimal view of a track, as supplied by clients asking for mixing
/// suggestions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackSummary {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl TrackSummary {
    fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.kind.as_deref())
            .unwrap_or("unnamed")
    }
}

/// A fully described generation request
#[derive(Debug, Clone)]
pub enum AiRequest {
    Melody {
        prompt: String,
        style: String,
        key: String,
        tempo: i64,
        length: i64,
    },
    Chords {
        genre: String,
        key: String,
        mood: String,
        length: i64,
    },
    Drums {
        style: String,
        tempo: i64,
        complexity: String,
        length: i64,
    },
    Mastering {
        audio_url: String,
        style: String,
        settings: Value,
    },
    Stems {
        audio_url: String,
        stem_types: Vec<String>,
    },
    Structure {
        audio_url: String,
    },
    Mixing {
        tracks: Vec<TrackSummary>,
        genre: String,
        reference_track: Option<String>,
    },
    Variations {
        audio_url: String,
        variation_type: String,
        intensity: String,
    },
}

impl AiRequest {
    pub fn operation(&self) -> AiOperation {
        match self {
            Self::Melody { .. } => AiOperation::Melody,
            Self::Chords { .. } => AiOperation::Chords,
            Self::Drums { .. } => AiOperation::Drums,
            Self::Mastering { .. } => AiOperation::Mastering,
            Self::Stems { .. } => AiOperation::Stems,
            Self::Structure { .. } => AiOperation::Structure,
            Self::Mixing { .. } => AiOperation::Mixing,
            Self::Variations { .. } => AiOperation::Variations,
        }
    }

    fn validate(&self) -> Result<(), AiError> {
        match self {
            Self::Melody { prompt, .. } if prompt.trim().is_empty() => {
                Err(AiError::MissingParameter("prompt"))
            }
            Self::Mastering { audio_url, .. }
            | Self::Stems { audio_url, .. }
            | Self::Structure { audio_url }
            | Self::Variations { audio_url, .. }
                if audio_url.trim().is_empty() =>
            {
                Err(AiError::MissingParameter("audio_url"))
            }
            Self::Stems { stem_types, .. } if stem_types.is_empty() => {
                Err(AiError::MissingParameter("stem_types"))
            }
            Self::Mixing { tracks, .. } if tracks.is_empty() => {
                Err(AiError::MissingParameter("tracks"))
            }
            _ => Ok(()),
        }
    }

    /// The prompt sent to the generation provider. Operations that are
    /// simulated entirely locally return `None`.
    fn prompt(&self) -> Option<String> {
        match self {
            Self::Melody {
                prompt,
                style,
                key,
                tempo,
                length,
            } => Some(format!(
                "Generate a {length}-bar melody in {key} key with the following specifications:\n\
                 - Style: {style}\n\
                 - Tempo: {tempo} BPM\n\
                 - Creative prompt: {prompt}\n\n\
                 Return the melody as a sequence of MIDI notes with timing information.\n\
                 Include note names, octaves, durations, and velocities.\n\
                 Format as JSON with clear structure."
            )),
            Self::Chords {
                genre,
                key,
                mood,
                length,
            } => Some(format!(
                "Suggest {length} chord progressions for a {genre} song in {key} key.\n\
                 Mood: {mood}\n\n\
                 Provide multiple progression options with:\n\
                 - Chord names and Roman numeral analysis\n\
                 - Voicing suggestions\n\
                 - Rhythm patterns\n\
                 - Variations and alternatives\n\n\
                 Format as structured JSON."
            )),
            Self::Drums {
                style,
                tempo,
                complexity,
                length,
            } => Some(format!(
                "Generate a {length}-bar drum pattern for {style} music.\n\
                 Tempo: {tempo} BPM\n\
                 Complexity: {complexity}\n\n\
                 Include patterns for:\n\
                 - Kick drum\n\
                 - Snare drum\n\
                 - Hi-hats (closed and open)\n\
                 - Crash cymbals\n\
                 - Additional percussion\n\n\
                 Provide timing grid and velocity information."
            )),
            Self::Mastering {
                style, settings, ..
            } => Some(format!(
                "Apply professional mastering to an audio track with the following requirements:\n\
                 - Style: {style}\n\
                 - Settings: {settings}\n\n\
                 Provide detailed mastering chain recommendations including:\n\
                 - EQ settings with specific frequency bands and adjustments\n\
                 - Compression settings (ratio, attack, release, threshold)\n\
                 - Limiting settings for loudness optimization\n\
                 - Stereo enhancement recommendations\n\
                 - Harmonic enhancement suggestions"
            )),
            Self::Mixing {
                tracks,
                genre,
                reference_track,
            } => {
                let track_names: Vec<_> = tracks.iter().map(|t| t.label()).collect();
                let reference = reference_track
                    .as_deref()
                    .map(|r| format!("Reference track: {}\n", r))
                    .unwrap_or_default();

                Some(format!(
                    "Analyze {} audio tracks for a {genre} production.\n\
                     Tracks: {}\n\
                     {reference}\n\
                     Provide professional mixing suggestions including:\n\
                     - EQ recommendations for each track\n\
                     - Compression settings\n\
                     - Reverb and delay suggestions\n\
                     - Panning positions\n\
                     - Level balancing\n\
                     - Processing chain order\n\
                     - Creative effects suggestions",
                    tracks.len(),
                    track_names.join(", "),
                ))
            }
            Self::Stems { .. } | Self::Structure { .. } | Self::Variations { .. } => None,
        }
    }
}

/// The outcome of a completed generation request
#[derive(Debug, Serialize)]
pub struct AiResult {
    #[serde(flatten)]
    pub payload: AiPayload,
    /// The user's balance after the operation was charged
    #[serde(skip)]
    pub remaining_credits: f64,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Routes generation requests through a provider and charges the acting
/// user's credit balance.
///
/// A request is only ever charged after a payload has been produced, and the
/// balance is checked before anything is dispatched. Provider failures fall
/// back to deterministic output rather than surfacing to the caller.
pub struct AiGateway<Db> {
    ledger: Ledger<Db>,
    provider: Box<dyn GenerationProvider>,
    public_url: String,
}

impl<Db> AiGateway<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, config: &Config) -> Self {
        let provider: Box<dyn GenerationProvider> = match &config.openrouter_key {
            Some(key) => Box::new(OpenRouterProvider::new(
                key.clone(),
                config.frontend_url.clone(),
            )),
            None => {
                log::warn!("No generation provider key configured, serving canned output");
                Box::new(CannedProvider)
            }
        };

        Self {
            ledger: Ledger::new(db),
            provider,
            public_url: config.public_url.clone(),
        }
    }

    /// Creates a gateway with a specific provider. Used in tests.
    pub fn with_provider(
        db: &Arc<Db>,
        config: &Config,
        provider: Box<dyn GenerationProvider>,
    ) -> Self {
        Self {
            ledger: Ledger::new(db),
            provider,
            public_url: config.public_url.clone(),
        }
    }

    /// Runs a request through the full pipeline, returning its payload and
    /// charging the user on success
    pub async fn handle(
        &self,
        user_id: PrimaryKey,
        request: AiRequest,
    ) -> Result<AiResult, AiError> {
        request.validate()?;

        let cost = request.operation().credit_cost();
        self.ledger.ensure_balance(user_id, cost).await?;

        let response = match request.prompt() {
            Some(prompt) => match self.provider.generate(&prompt).await {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!(
                        "Provider {} failed, falling back to canned output: {}",
                        self.provider.describe(),
                        e
                    );

                    None
                }
            },
            None => None,
        };

        let payload = payloads::build(&request, response.as_deref(), &self.public_url);
        let remaining_credits = self.ledger.debit(user_id, cost).await?;

        Ok(AiResult {
            payload,
            remaining_credits,
        })
    }

    /// The catalogue of models exposed to clients
    pub fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "mastering-v1",
                name: "Professional Mastering",
                description: "AI-powered professional mastering with multiple style options",
                capabilities: vec!["mastering", "loudness_optimization", "eq", "compression"],
                cost_per_use: 1.,
                status: "active",
            },
            ModelInfo {
                id: "composition-v1",
                name: "Music Composition",
                description: "Generate melodies, chord progressions, and rhythms",
                capabilities: vec!["melody_generation", "chord_suggestions", "rhythm_patterns"],
                cost_per_use: 0.5,
                status: "active",
            },
            ModelInfo {
                id: "separation-v1",
                name: "Stem Separation",
                description: "High-quality AI stem separation",
                capabilities: vec!["stem_separation", "vocal_isolation", "instrument_extraction"],
                cost_per_use: 2.,
                status: "active",
            },
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: Vec<&'static str>,
    pub cost_per_use: f64,
    pub status: &'static str,
}
