//! All request bodies accepted by endpoints are defined here

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct RegisterSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[serde(rename = "name")]
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct LoginSchema {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct UpdateProfileSchema {
    #[serde(rename = "name")]
    #[validate(length(min = 2, max = 128))]
    pub display_name: Option<String>,
    #[schema(value_type = Object)]
    pub preferences: Option<Value>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct NewProjectSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default = "defaults::genre")]
    pub genre: String,
    #[serde(default = "defaults::key")]
    pub key_signature: String,
    #[serde(default = "defaults::tempo")]
    #[validate(range(min = 40, max = 300))]
    pub tempo: i64,
    #[serde(default = "defaults::time_signature")]
    pub time_signature: String,
    #[serde(default = "defaults::object")]
    #[schema(value_type = Object)]
    pub settings: Value,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct UpdateProjectSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub genre: Option<String>,
    pub key_signature: Option<String>,
    #[validate(range(min = 40, max = 300))]
    pub tempo: Option<i64>,
    pub time_signature: Option<String>,
    #[schema(value_type = Object)]
    pub settings: Option<Value>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct NewTrackSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(default)]
    pub instrument_type: String,
    #[serde(default = "defaults::volume")]
    #[validate(range(min = 0., max = 1.))]
    pub volume: f64,
    #[serde(default)]
    #[validate(range(min = -1., max = 1.))]
    pub pan: f64,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub soloed: bool,
    #[serde(default = "defaults::array")]
    #[schema(value_type = Object)]
    pub effects: Value,
    #[serde(default = "defaults::array")]
    #[schema(value_type = Object)]
    pub automation: Value,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct UpdateTrackSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub track_number: Option<i64>,
    pub instrument_type: Option<String>,
    #[validate(range(min = 0., max = 1.))]
    pub volume: Option<f64>,
    #[validate(range(min = -1., max = 1.))]
    pub pan: Option<f64>,
    pub muted: Option<bool>,
    pub soloed: Option<bool>,
    #[schema(value_type = Object)]
    pub effects: Option<Value>,
    #[schema(value_type = Object)]
    pub automation: Option<Value>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct MelodySchema {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[serde(default = "defaults::genre")]
    pub style: String,
    #[serde(default = "defaults::key")]
    pub key: String,
    #[serde(default = "defaults::tempo")]
    pub tempo: i64,
    #[serde(default = "defaults::melody_length")]
    pub length: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct ChordsSchema {
    #[serde(default = "defaults::genre")]
    pub genre: String,
    #[serde(default = "defaults::key")]
    pub key: String,
    #[serde(default = "defaults::mood")]
    pub mood: String,
    #[serde(default = "defaults::progression_length")]
    pub length: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct DrumsSchema {
    #[serde(default = "defaults::genre")]
    pub style: String,
    #[serde(default = "defaults::tempo")]
    pub tempo: i64,
    #[serde(default = "defaults::complexity")]
    pub complexity: String,
    #[serde(default = "defaults::progression_length")]
    pub length: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct MasterSchema {
    #[validate(url)]
    pub audio_url: String,
    #[serde(default = "defaults::mastering_style")]
    pub style: String,
    #[serde(default = "defaults::object")]
    #[schema(value_type = Object)]
    pub settings: Value,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct StemsSchema {
    #[validate(url)]
    pub audio_url: String,
    #[serde(default = "defaults::stem_types")]
    pub stem_types: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct StructureSchema {
    #[validate(url)]
    pub audio_url: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct MixingSchema {
    pub tracks: Vec<MixTrackSchema>,
    #[serde(default = "defaults::genre")]
    pub genre: String,
    pub reference_track: Option<String>,
}

#[derive(Debug, ToSchema, Deserialize)]
pub struct MixTrackSchema {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct VariationsSchema {
    #[validate(url)]
    pub audio_url: String,
    #[serde(default = "defaults::variation_type")]
    pub variation_type: String,
    #[serde(default = "defaults::complexity")]
    pub intensity: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct AnalyzeSchema {
    #[validate(url)]
    pub audio_url: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct WaveformSchema {
    #[validate(url)]
    pub audio_url: String,
    #[serde(default = "defaults::resolution")]
    #[validate(range(min = 10, max = 10000))]
    pub resolution: usize,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct ExportSchema {
    pub project_id: i64,
    #[serde(default = "defaults::format")]
    pub format: String,
    #[serde(default = "defaults::quality")]
    pub quality: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
pub struct InviteSchema {
    pub project_id: i64,
    #[validate(email)]
    pub email: String,
    #[serde(default = "defaults::permission_level")]
    pub permission_level: String,
}

mod defaults {
    use serde_json::Value;

    pub fn genre() -> String {
        "electronic".to_string()
    }

    pub fn key() -> String {
        "C".to_string()
    }

    pub fn tempo() -> i64 {
        120
    }

    pub fn time_signature() -> String {
        "4/4".to_string()
    }

    pub fn volume() -> f64 {
        0.8
    }

    pub fn melody_length() -> i64 {
        8
    }

    pub fn progression_length() -> i64 {
        4
    }

    pub fn mood() -> String {
        "uplifting".to_string()
    }

    pub fn complexity() -> String {
        "medium".to_string()
    }

    pub fn mastering_style() -> String {
        "balanced".to_string()
    }

    pub fn variation_type() -> String {
        "creative".to_string()
    }

    pub fn stem_types() -> Vec<String> {
        ["vocals", "drums", "bass", "other"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn resolution() -> usize {
        1000
    }

    pub fn format() -> String {
        "wav".to_string()
    }

    pub fn quality() -> String {
        "high".to_string()
    }

    pub fn permission_level() -> String {
        "viewer".to_string()
    }

    pub fn object() -> Value {
        Value::Object(Default::default())
    }

    pub fn array() -> Value {
        Value::Array(Default::default())
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::Validation(e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        Ok(Self(extracted_json.0))
    }
}
