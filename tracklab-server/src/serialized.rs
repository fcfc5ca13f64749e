//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracklab_collab::{IngestedFile, ProjectData, SessionData, TrackData, UserData};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: i64,
    email: String,
    name: String,
    subscription_tier: String,
    credits: f64,
    #[schema(value_type = Object)]
    preferences: Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    message: &'static str,
    token: String,
    user: User,
}

impl LoginResult {
    pub fn with_message(self, message: &'static str) -> Self {
        Self { message, ..self }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Project {
    id: i64,
    name: String,
    description: String,
    genre: String,
    key_signature: String,
    tempo: i64,
    time_signature: String,
    #[schema(value_type = Object)]
    settings: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Track {
    id: i64,
    project_id: i64,
    name: String,
    track_number: i64,
    instrument_type: String,
    volume: f64,
    pan: f64,
    muted: bool,
    soloed: bool,
    #[schema(value_type = Object)]
    effects: Value,
    #[schema(value_type = Object)]
    automation: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackList {
    pub tracks: Vec<Track>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AudioFile {
    id: String,
    filename: String,
    duration: f64,
    sample_rate: i64,
    channels: i64,
    file_url: String,
    waveform_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResult {
    pub message: &'static str,
    pub audio: AudioFile,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.display_name.clone(),
            subscription_tier: self.subscription_tier.as_str().to_string(),
            credits: self.credits,
            preferences: self.preferences.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            message: "Login successful",
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Project> for ProjectData {
    fn to_serialized(&self) -> Project {
        Project {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            genre: self.genre.clone(),
            key_signature: self.key_signature.clone(),
            tempo: self.tempo,
            time_signature: self.time_signature.clone(),
            settings: self.settings.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<Track> for TrackData {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id,
            project_id: self.project_id,
            name: self.name.clone(),
            track_number: self.track_number,
            instrument_type: self.instrument_type.clone(),
            volume: self.volume,
            pan: self.pan,
            muted: self.muted,
            soloed: self.soloed,
            effects: serde_json::to_value(&self.effects).unwrap_or_default(),
            automation: serde_json::to_value(&self.automation).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<AudioFile> for IngestedFile {
    fn to_serialized(&self) -> AudioFile {
        AudioFile {
            id: self.id.clone(),
            filename: self.filename.clone(),
            duration: self.duration,
            sample_rate: self.sample_rate,
            channels: self.channels,
            file_url: self.file_url.clone(),
            waveform_url: self.waveform_url.clone(),
        }
    }
}
