use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// The plan an account is on. Only affects billing, which is handled
/// elsewhere; the ledger itself is tier-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Elite,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Elite => "elite",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "pro" => Self::Pro,
            "elite" => Self::Elite,
            "enterprise" => Self::Enterprise,
            _ => Self::Free,
        }
    }
}

/// A tracklab account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub email: String,
    /// The argon2 hash, never the raw password
    pub password: String,
    pub display_name: String,
    pub subscription_tier: SubscriptionTier,
    /// Remaining credit balance. Never negative.
    pub credits: f64,
    /// Opaque key-value preferences, owned by the clients
    pub preferences: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The bearer token presented on authenticated requests
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A music project, owned by exactly one user
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub genre: String,
    pub key_signature: String,
    pub tempo: i64,
    pub time_signature: String,
    /// Free-form settings map
    pub settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single track within a project
#[derive(Debug, Clone)]
pub struct TrackData {
    pub id: PrimaryKey,
    pub project_id: PrimaryKey,
    pub name: String,
    /// Ordered position within the project
    pub track_number: i64,
    pub instrument_type: String,
    /// In [0, 1]
    pub volume: f64,
    /// In [-1, 1]
    pub pan: f64,
    pub muted: bool,
    pub soloed: bool,
    /// Ordered effects chain
    pub effects: Vec<EffectDescriptor>,
    pub automation: Vec<AutomationPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single entry in a track's effects chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Effect type, such as "reverb", "compressor", or "eq"
    #[serde(rename = "type")]
    pub kind: String,
    /// Effect-specific parameters
    #[serde(default)]
    pub params: Value,
}

/// An automation point targeting one track parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationPoint {
    /// Position in seconds
    pub time: f64,
    pub value: f64,
    /// The parameter being automated, such as "volume"
    pub target: String,
}
