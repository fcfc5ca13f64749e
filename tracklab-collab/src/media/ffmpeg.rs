use std::{path::Path, process::Stdio, time::Duration};

use serde::Deserialize;
use tokio::{process::Command, time::timeout};

use super::ProcessingError;

/// External tools are killed after this long
const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Properties of an audio file as reported by ffprobe
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub duration: f64,
    pub sample_rate: i64,
    pub channels: i64,
    pub bit_rate: i64,
    pub codec: String,
}

/// Runs a tool to completion, capturing its output
async fn run(tool: &'static str, args: &[&str]) -> Result<Vec<u8>, ProcessingError> {
    let child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProcessingError::Spawn {
            tool,
            message: e.to_string(),
        })?;

    let output = timeout(TOOL_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| ProcessingError::Timeout {
            tool,
            seconds: TOOL_TIMEOUT.as_secs(),
        })?
        .map_err(|e| ProcessingError::Spawn {
            tool,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ProcessingError::Tool {
            tool,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

/// Reads format and stream information from an audio file
pub async fn probe(path: &Path) -> Result<AudioInfo, ProcessingError> {
    let path = path.to_string_lossy();

    let stdout = run(
        "ffprobe",
        &[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            &path,
        ],
    )
    .await?;

    let probed: ProbeOutput =
        serde_json::from_slice(&stdout).map_err(|_| ProcessingError::Parse { tool: "ffprobe" })?;

    let stream = probed
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or(ProcessingError::Parse { tool: "ffprobe" })?;

    Ok(AudioInfo {
        duration: probed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or_default(),
        sample_rate: stream
            .sample_rate
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default(),
        channels: stream.channels.unwrap_or_default(),
        bit_rate: probed
            .format
            .bit_rate
            .as_deref()
            .and_then(|b| b.parse().ok())
            .unwrap_or_default(),
        codec: stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Transcodes a file with the given codec, sample rate and bitrate
pub async fn transcode(
    input: &Path,
    output: &Path,
    codec: &str,
    sample_rate: &str,
    bitrate: &str,
) -> Result<(), ProcessingError> {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();

    run(
        "ffmpeg",
        &[
            "-i", &input, "-acodec", codec, "-ar", sample_rate, "-ab", bitrate, "-y", &output,
        ],
    )
    .await
    .map(|_| ())
}

/// Runs a single audio filter over a file
pub async fn filter(input: &Path, output: &Path, filter: &str) -> Result<(), ProcessingError> {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();

    run("ffmpeg", &["-i", &input, "-af", filter, "-y", &output])
        .await
        .map(|_| ())
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<i64>,
}
