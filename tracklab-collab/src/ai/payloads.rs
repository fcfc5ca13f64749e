use chrono::Utc;
use lazy_static::lazy_static;
use rand::{thread_rng, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AiRequest;

lazy_static! {
    /// Matches the outermost JSON object in a chatty provider response
    static ref JSON_BLOCK: Regex = Regex::new(r"(?s)\{.*\}").expect("valid regex");
}

/// The response body of a completed generation request. Serializes without a
/// tag, so each operation keeps its own shape on the wire.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AiPayload {
    Melody(MelodyPayload),
    Chords(ChordsPayload),
    Drums(DrumsPayload),
    Mastering(MasteringPayload),
    Stems(StemsPayload),
    Structure(StructurePayload),
    Mixing(MixingPayload),
    Variations(VariationsPayload),
}

#[derive(Debug, Serialize)]
pub struct MelodyPayload {
    pub midi_data: MelodyMidi,
    pub audio_preview: String,
    pub notes: Vec<MidiNote>,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct MelodyMidi {
    pub notes: Vec<MidiNote>,
    pub key: String,
    pub tempo: i64,
    pub length: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiNote {
    pub note: String,
    pub start: f64,
    pub duration: f64,
    pub velocity: i64,
}

#[derive(Debug, Serialize)]
pub struct ChordsPayload {
    pub progressions: Vec<ChordProgression>,
    pub midi_data: Value,
    pub chord_names: Vec<String>,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct ChordProgression {
    pub progression: String,
    pub chords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DrumsPayload {
    pub midi_data: DrumMidi,
    pub audio_preview: String,
    pub pattern: DrumGrid,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct DrumMidi {
    pub kick: Vec<u8>,
    pub snare: Vec<u8>,
    pub hihat: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct DrumGrid {
    pub kick: String,
    pub snare: String,
    pub hihat: String,
}

#[derive(Debug, Serialize)]
pub struct MasteringPayload {
    pub mastered_url: String,
    pub settings_applied: Value,
    /// Simulated processing time in milliseconds
    pub processing_time: f64,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct StemsPayload {
    pub stems: Vec<Stem>,
    pub processing_time: f64,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct Stem {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct StructurePayload {
    pub sections: Vec<Section>,
    pub tempo_changes: Vec<Value>,
    pub key_changes: Vec<Value>,
    pub energy_curve: Vec<f64>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Section {
    pub name: &'static str,
    pub start: i64,
    pub end: i64,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct MixingPayload {
    pub eq_suggestions: Value,
    pub compression_settings: Value,
    pub reverb_settings: Value,
    pub panning_suggestions: Value,
    pub level_suggestions: Value,
    pub processing_chain: Value,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct VariationsPayload {
    pub variations: Vec<Variation>,
    pub original_analysis: OriginalAnalysis,
    pub credits_used: f64,
}

#[derive(Debug, Serialize)]
pub struct Variation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub url: String,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OriginalAnalysis {
    pub tempo: i64,
    pub key: &'static str,
    pub genre: &'static str,
    pub energy: f64,
}

/// Builds the payload for a request from the provider's response, falling
/// back to deterministic defaults when the response is absent or unusable
pub(super) fn build(request: &AiRequest, response: Option<&str>, public_url: &str) -> AiPayload {
    let cost = request.operation().credit_cost();
    let mut rng = thread_rng();

    match request {
        AiRequest::Melody {
            key, tempo, length, ..
        } => {
            let notes = response
                .and_then(extract_json)
                .and_then(|mut v| serde_json::from_value::<Vec<MidiNote>>(v["notes"].take()).ok())
                .unwrap_or_default();

            AiPayload::Melody(MelodyPayload {
                midi_data: MelodyMidi {
                    notes: notes.clone(),
                    key: key.clone(),
                    tempo: *tempo,
                    length: *length,
                },
                audio_preview: format!(
                    "{}/generated/melody_{}.mp3",
                    public_url,
                    Utc::now().timestamp_millis()
                ),
                notes,
                credits_used: cost,
            })
        }
        AiRequest::Chords { key, .. } => AiPayload::Chords(ChordsPayload {
            progressions: vec![
                ChordProgression {
                    progression: "I-V-vi-IV".to_string(),
                    chords: chords(&["C", "G", "Am", "F"]),
                },
                ChordProgression {
                    progression: "vi-IV-I-V".to_string(),
                    chords: chords(&["Am", "F", "C", "G"]),
                },
            ],
            midi_data: json!({ "chords": [], "key": key }),
            chord_names: chords(&["C", "G", "Am", "F"]),
            credits_used: cost,
        }),
        AiRequest::Drums { .. } => AiPayload::Drums(DrumsPayload {
            midi_data: DrumMidi {
                kick: vec![1, 0, 0, 0, 1, 0, 0, 0],
                snare: vec![0, 0, 1, 0, 0, 0, 1, 0],
                hihat: vec![1, 1, 1, 1, 1, 1, 1, 1],
            },
            audio_preview: format!(
                "{}/generated/drums_{}.mp3",
                public_url,
                Utc::now().timestamp_millis()
            ),
            pattern: DrumGrid {
                kick: "1000100010001000".to_string(),
                snare: "0010001000100010".to_string(),
                hihat: "1111111111111111".to_string(),
            },
            credits_used: cost,
        }),
        AiRequest::Mastering {
            audio_url, style, ..
        } => AiPayload::Mastering(MasteringPayload {
            mastered_url: format!("{}?mastered=true&style={}", audio_url, style),
            settings_applied: response.and_then(extract_json).unwrap_or_else(|| {
                json!({
                    "eq_applied": true,
                    "compression_applied": true,
                    "limiting_applied": true,
                    "loudness_lufs": -14
                })
            }),
            processing_time: rng.gen_range(5000.0..35000.0),
            credits_used: cost,
        }),
        AiRequest::Stems {
            audio_url,
            stem_types,
        } => AiPayload::Stems(StemsPayload {
            stems: stem_types
                .iter()
                .map(|kind| Stem {
                    kind: kind.clone(),
                    url: format!("{}?stem={}", audio_url, kind),
                    confidence: rng.gen_range(0.7..1.0),
                })
                .collect(),
            processing_time: rng.gen_range(10000.0..70000.0),
            credits_used: cost,
        }),
        AiRequest::Structure { .. } => AiPayload::Structure(StructurePayload {
            sections: sections(),
            tempo_changes: vec![],
            key_changes: vec![],
            energy_curve: energy_curve(),
            recommendations: vec![
                "Consider adding a breakdown section before the final chorus".to_string(),
                "The bridge could benefit from different instrumentation".to_string(),
                "Add automation to create more dynamic movement".to_string(),
            ],
        }),
        AiRequest::Mixing { .. } => AiPayload::Mixing(MixingPayload {
            eq_suggestions: json!({
                "vocals": { "high_pass": 80, "presence": 3000, "air": 10000 },
                "drums": { "punch": 60, "crack": 200, "presence": 5000 },
                "bass": { "sub": 40, "definition": 100, "clarity": 800 }
            }),
            compression_settings: json!({
                "vocals": { "ratio": 4, "attack": 3, "release": 30, "threshold": -18 },
                "drums": { "ratio": 6, "attack": 1, "release": 10, "threshold": -10 }
            }),
            reverb_settings: json!({
                "vocals": { "type": "hall", "decay": 2.1, "pre_delay": 30, "damping": 0.7 },
                "instruments": { "type": "room", "decay": 1.2, "pre_delay": 15, "damping": 0.5 }
            }),
            panning_suggestions: json!({
                "vocals": 0,
                "kick": 0,
                "snare": 0,
                "bass": 0,
                "guitar_l": -30,
                "guitar_r": 30,
                "keys": 15
            }),
            level_suggestions: json!({
                "vocals": -6,
                "kick": -8,
                "snare": -12,
                "bass": -10,
                "guitars": -15,
                "keys": -18
            }),
            processing_chain: json!({
                "vocals": ["high_pass_filter", "compressor", "eq", "de_esser", "reverb"],
                "drums": ["gate", "compressor", "eq", "reverb"],
                "bass": ["high_pass_filter", "compressor", "eq"]
            }),
            credits_used: cost,
        }),
        AiRequest::Variations { audio_url, .. } => AiPayload::Variations(VariationsPayload {
            variations: vec![
                Variation {
                    kind: "pitch_shift",
                    name: "Pitched Up (+2 semitones)",
                    url: format!("{}?variation=pitch_up", audio_url),
                    description: "Pitched up by 2 semitones for higher energy",
                },
                Variation {
                    kind: "tempo_change",
                    name: "Faster Tempo (+10 BPM)",
                    url: format!("{}?variation=tempo_up", audio_url),
                    description: "Increased tempo for more drive",
                },
                Variation {
                    kind: "harmonic",
                    name: "Minor Key Version",
                    url: format!("{}?variation=minor", audio_url),
                    description: "Converted to minor key for different mood",
                },
            ],
            original_analysis: OriginalAnalysis {
                tempo: 120,
                key: "C major",
                genre: "electronic",
                energy: 0.7,
            },
            credits_used: cost,
        }),
    }
}

/// Parses a provider response as JSON, tolerating prose around the object
fn extract_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok().or_else(|| {
        JSON_BLOCK
            .find(text)
            .and_then(|m| serde_json::from_str(m.as_str()).ok())
    })
}

fn chords(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

fn sections() -> Vec<Section> {
    [
        ("Intro", 0, 8, 0.95),
        ("Verse 1", 8, 24, 0.92),
        ("Chorus", 24, 40, 0.98),
        ("Verse 2", 40, 56, 0.90),
        ("Chorus", 56, 72, 0.98),
        ("Bridge", 72, 88, 0.87),
        ("Chorus", 88, 104, 0.98),
        ("Outro", 104, 120, 0.93),
    ]
    .into_iter()
    .map(|(name, start, end, confidence)| Section {
        name,
        start,
        end,
        confidence,
    })
    .collect()
}

/// A plausible energy curve over a two minute song, one point per second
fn energy_curve() -> Vec<f64> {
    let mut rng = thread_rng();
    let points = 120;

    (0..points)
        .map(|i| {
            let progress = i as f64 / points as f64;

            let energy = 0.3
                + if progress < 0.1 {
                    progress * 3.
                } else if progress < 0.3 {
                    0.2
                } else if progress < 0.35 {
                    (progress - 0.3) * 4.
                } else if progress < 0.6 {
                    0.6
                } else if progress < 0.8 {
                    0.3
                } else {
                    0.8
                };

            (energy + rng.gen_range(-0.05..0.05)).min(1.)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_json_from_chatty_text() {
        let text = "Here is your melody:\n{\"notes\": []}\nEnjoy!";
        let value = extract_json(text).expect("json is extracted");

        assert!(value["notes"].is_array());
    }

    #[test]
    fn melody_falls_back_to_empty_notes() {
        let request = AiRequest::Melody {
            prompt: "something upbeat".to_string(),
            style: "electronic".to_string(),
            key: "C".to_string(),
            tempo: 120,
            length: 8,
        };

        let payload = build(&request, Some("not json at all"), "http://localhost:8000");

        match payload {
            AiPayload::Melody(melody) => {
                assert!(melody.notes.is_empty());
                assert_eq!(melody.credits_used, 0.5);
            }
            _ => panic!("expected a melody payload"),
        }
    }

    #[test]
    fn melody_parses_provider_notes() {
        let request = AiRequest::Melody {
            prompt: "something upbeat".to_string(),
            style: "electronic".to_string(),
            key: "C".to_string(),
            tempo: 120,
            length: 8,
        };

        let response = r#"{"notes": [{ "note": "C4", "start": 0, "duration": 0.5, "velocity": 80 }]}"#;
        let payload = build(&request, Some(response), "http://localhost:8000");

        match payload {
            AiPayload::Melody(melody) => {
                assert_eq!(melody.notes.len(), 1);
                assert_eq!(melody.notes[0].note, "C4");
            }
            _ => panic!("expected a melody payload"),
        }
    }

    #[test]
    fn energy_curve_is_bounded() {
        let curve = energy_curve();

        assert_eq!(curve.len(), 120);
        assert!(curve.iter().all(|&x| (0. ..=1.).contains(&x)));
    }

    #[test]
    fn mastering_defaults_when_response_is_prose() {
        let request = AiRequest::Mastering {
            audio_url: "http://localhost:8000/uploads/a.wav".to_string(),
            style: "warm".to_string(),
            settings: serde_json::json!({}),
        };

        let payload = build(&request, Some("sorry, no json"), "http://localhost:8000");

        match payload {
            AiPayload::Mastering(mastering) => {
                assert_eq!(mastering.settings_applied["loudness_lufs"], -14);
                assert!(mastering
                    .mastered_url
                    .contains("?mastered=true&style=warm"));
            }
            _ => panic!("expected a mastering payload"),
        }
    }
}
