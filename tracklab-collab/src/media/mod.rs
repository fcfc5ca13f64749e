use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::{util::random_string, Config, EffectDescriptor, PrimaryKey};

mod ffmpeg;
pub use ffmpeg::AudioInfo;

/// Exported artifacts stop being served after this long
const EXPORT_EXPIRY_IN_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to run {tool}: {message}")]
    Spawn { tool: &'static str, message: String },
    #[error("{tool} exited with code {code}: {stderr}")]
    Tool {
        tool: &'static str,
        code: i32,
        stderr: String,
    },
    #[error("{tool} did not finish within {seconds} seconds")]
    Timeout { tool: &'static str, seconds: u64 },
    #[error("Failed to parse {tool} output")]
    Parse { tool: &'static str },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stored upload, described for clients
#[derive(Debug, Serialize)]
pub struct IngestedFile {
    pub id: String,
    pub filename: String,
    #[serde(skip)]
    pub file_path: PathBuf,
    pub file_url: String,
    pub waveform_url: String,
    pub duration: f64,
    pub sample_rate: i64,
    pub channels: i64,
    pub file_size: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Waveform {
    pub peaks: Vec<f64>,
    pub duration: f64,
    pub sample_rate: i64,
    pub resolution: usize,
}

#[derive(Debug, Serialize)]
pub struct AudioAnalysis {
    pub tempo: f64,
    pub key: String,
    pub genre: &'static str,
    pub energy: f64,
    pub valence: f64,
    pub loudness: f64,
    pub duration: f64,
    pub spectral_features: SpectralFeatures,
}

#[derive(Debug, Serialize)]
pub struct SpectralFeatures {
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    pub mfcc: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct ExportArtifact {
    pub download_url: String,
    pub format: String,
    pub file_size: u64,
    pub duration: f64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ConvertOptions {
    pub sample_rate: Option<String>,
    pub bitrate: Option<String>,
}

/// Stores uploads and processed artifacts on disk and runs the external
/// audio tooling over them.
///
/// Analysis and waveform output is currently simulated apart from the
/// ffprobe metadata, matching what clients can render today.
pub struct MediaStore {
    uploads_dir: PathBuf,
    processed_dir: PathBuf,
    public_url: String,
}

impl MediaStore {
    pub fn new(config: &Config) -> Result<Self, ProcessingError> {
        std::fs::create_dir_all(&config.uploads_dir)?;
        std::fs::create_dir_all(&config.processed_dir)?;

        Ok(Self {
            uploads_dir: config.uploads_dir.clone(),
            processed_dir: config.processed_dir.clone(),
            public_url: config.public_url.clone(),
        })
    }

    /// Persists an upload, probes it, and writes its waveform next to it
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestedFile, ProcessingError> {
        let id = new_file_id();
        let stored_name = format!("{}_{}", id, filename);
        let file_path = self.uploads_dir.join(&stored_name);

        fs::write(&file_path, bytes).await?;

        let info = ffmpeg::probe(&file_path).await?;
        let waveform = self.waveform(&file_path, 1000).await?;

        let waveform_path = self.processed_dir.join(format!("{}.json", id));
        let serialized =
            serde_json::to_vec(&waveform).map_err(|_| ProcessingError::Parse { tool: "waveform" })?;
        fs::write(&waveform_path, serialized).await?;

        Ok(IngestedFile {
            file_url: format!("{}/uploads/{}", self.public_url, stored_name),
            waveform_url: format!("{}/waveforms/{}.json", self.public_url, id),
            id,
            filename: filename.to_string(),
            file_path,
            duration: info.duration,
            sample_rate: info.sample_rate,
            channels: info.channels,
            file_size: bytes.len(),
            created_at: Utc::now(),
        })
    }

    /// Builds peak data for a file at the given resolution
    pub async fn waveform(
        &self,
        _path: &Path,
        resolution: usize,
    ) -> Result<Waveform, ProcessingError> {
        let mut rng = thread_rng();

        let peaks = (0..resolution)
            .map(|i| {
                let progress = i as f64 / resolution as f64;
                let amplitude =
                    (progress * std::f64::consts::PI * 20.).sin() * 0.5 + rng.gen::<f64>() * 0.3 + 0.2;

                amplitude.clamp(0., 1.)
            })
            .collect();

        Ok(Waveform {
            peaks,
            duration: 180.,
            sample_rate: 44100,
            resolution,
        })
    }

    /// Estimates musical properties of a file
    pub async fn analyze(&self, _audio_url: &str) -> Result<AudioAnalysis, ProcessingError> {
        let mut rng = thread_rng();

        Ok(AudioAnalysis {
            tempo: 120. + rng.gen::<f64>() * 60.,
            key: random_key(&mut rng),
            genre: random_genre(&mut rng),
            energy: rng.gen(),
            valence: rng.gen(),
            loudness: -14. + rng.gen::<f64>() * 20.,
            duration: 180. + rng.gen::<f64>() * 120.,
            spectral_features: SpectralFeatures {
                spectral_centroid: rng.gen::<f64>() * 4000. + 1000.,
                spectral_rolloff: rng.gen::<f64>() * 8000. + 2000.,
                zero_crossing_rate: rng.gen::<f64>() * 0.3,
                mfcc: (0..13).map(|_| rng.gen::<f64>() * 2. - 1.).collect(),
            },
        })
    }

    /// Renders a project down to a single file, returning a time-limited
    /// download
    pub async fn export(
        &self,
        project_id: PrimaryKey,
        format: &str,
        quality: &str,
    ) -> Result<ExportArtifact, ProcessingError> {
        let file_name = format!("project_{}_{}.{}", project_id, new_file_id(), format);
        let output_path = self.processed_dir.join(&file_name);

        // The mixdown itself is not implemented yet, so a placeholder
        // artifact is written in its place
        fs::write(&output_path, [0u8; 1024]).await?;

        let duration = 180.;

        Ok(ExportArtifact {
            download_url: format!("{}/downloads/{}", self.public_url, file_name),
            format: format.to_string(),
            file_size: estimated_file_size(format, duration, quality),
            duration,
            expires_at: Utc::now() + Duration::hours(EXPORT_EXPIRY_IN_HOURS),
        })
    }

    /// Converts a file to another format
    pub async fn convert(
        &self,
        input: &Path,
        format: &str,
        options: ConvertOptions,
    ) -> Result<PathBuf, ProcessingError> {
        let output = self
            .processed_dir
            .join(format!("{}.{}", new_file_id(), format));

        ffmpeg::transcode(
            input,
            &output,
            codec_for_format(format),
            options.sample_rate.as_deref().unwrap_or("44100"),
            options.bitrate.as_deref().unwrap_or("320k"),
        )
        .await?;

        Ok(output)
    }

    /// Applies a chain of effects in order, returning the final file
    pub async fn apply_effects(
        &self,
        input: &Path,
        effects: &[EffectDescriptor],
    ) -> Result<PathBuf, ProcessingError> {
        let mut current = input.to_path_buf();

        for effect in effects {
            let output = self
                .processed_dir
                .join(format!("{}_{}.wav", new_file_id(), effect.kind));

            ffmpeg::filter(&current, &output, &filter_for_effect(effect)).await?;
            current = output;
        }

        Ok(current)
    }
}

fn random_key(rng: &mut impl Rng) -> String {
    const KEYS: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    const MODES: [&str; 2] = ["major", "minor"];

    format!(
        "{} {}",
        KEYS[rng.gen_range(0..KEYS.len())],
        MODES[rng.gen_range(0..MODES.len())]
    )
}

fn random_genre(rng: &mut impl Rng) -> &'static str {
    const GENRES: [&str; 12] = [
        "electronic",
        "pop",
        "rock",
        "hip-hop",
        "jazz",
        "classical",
        "ambient",
        "techno",
        "house",
        "dubstep",
        "trap",
        "indie",
    ];

    GENRES[rng.gen_range(0..GENRES.len())]
}

fn new_file_id() -> String {
    format!(
        "{}{}",
        Utc::now().timestamp_millis(),
        random_string(9).to_lowercase()
    )
}

fn codec_for_format(format: &str) -> &'static str {
    match format {
        "mp3" => "libmp3lame",
        "flac" => "flac",
        "aac" => "aac",
        "ogg" => "libvorbis",
        _ => "pcm_s16le",
    }
}

fn estimated_file_size(format: &str, duration: f64, quality: &str) -> u64 {
    let bitrate = match (format, quality) {
        ("mp3", "low") => 128,
        ("mp3", "medium") => 192,
        ("mp3", _) => 320,
        ("wav", _) => 1411,
        ("flac", "low") => 700,
        ("flac", "medium") => 900,
        ("flac", _) => 1100,
        ("aac", "low") => 96,
        ("aac", "medium") => 128,
        ("aac", _) => 256,
        _ => 320,
    };

    (duration * bitrate as f64 * 1000. / 8.) as u64
}

/// Builds the ffmpeg filter expression for one effect, taking parameters
/// from its params map with sensible defaults
fn filter_for_effect(effect: &EffectDescriptor) -> String {
    let param = |key: &str, default: f64| effect.params[key].as_f64().unwrap_or(default);

    match effect.kind.as_str() {
        "reverb" => format!("aecho=0.8:0.9:{}:{}", param("delay", 60.), param("decay", 0.4)),
        "compressor" => format!(
            "acompressor=threshold={}:ratio={}:attack={}:release={}",
            param("threshold", 0.5),
            param("ratio", 4.),
            param("attack", 5.),
            param("release", 50.),
        ),
        "eq" => format!(
            "equalizer=f={}:width_type=h:width={}:g={}",
            param("frequency", 1000.),
            param("width", 100.),
            param("gain", 0.),
        ),
        _ => "anull".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn effect_filters_use_params() {
        let effect = EffectDescriptor {
            kind: "compressor".to_string(),
            params: json!({ "threshold": 0.3, "ratio": 8 }),
        };

        assert_eq!(
            filter_for_effect(&effect),
            "acompressor=threshold=0.3:ratio=8:attack=5:release=50"
        );
    }

    #[test]
    fn unknown_effects_pass_audio_through() {
        let effect = EffectDescriptor {
            kind: "flanger".to_string(),
            params: json!({}),
        };

        assert_eq!(filter_for_effect(&effect), "anull");
    }

    #[test]
    fn export_sizes_follow_quality() {
        assert_eq!(estimated_file_size("mp3", 180., "low"), 2_880_000);
        assert!(estimated_file_size("wav", 180., "high") > estimated_file_size("mp3", 180., "high"));
    }

    #[tokio::test]
    async fn exports_expire_a_day_after_creation() {
        let dir = tempfile::tempdir().expect("temp dir is created");

        let store = MediaStore::new(&Config {
            uploads_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            ..Config::default()
        })
        .expect("store is created");

        let earliest = Utc::now() + Duration::hours(EXPORT_EXPIRY_IN_HOURS);
        let export = store
            .export(1, "mp3", "high")
            .await
            .expect("export is created");
        let latest = Utc::now() + Duration::hours(EXPORT_EXPIRY_IN_HOURS);

        assert!(export.expires_at >= earliest && export.expires_at <= latest);
        assert_eq!(export.format, "mp3");
    }

    #[tokio::test]
    async fn waveform_peaks_are_normalized() {
        let config = Config::default();
        let dir = tempfile::tempdir().expect("temp dir is created");

        let store = MediaStore::new(&Config {
            uploads_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            ..config
        })
        .expect("store is created");

        let waveform = store
            .waveform(Path::new("unused.wav"), 500)
            .await
            .expect("waveform is generated");

        assert_eq!(waveform.peaks.len(), 500);
        assert!(waveform.peaks.iter().all(|&p| (0. ..=1.).contains(&p)));
    }
}
