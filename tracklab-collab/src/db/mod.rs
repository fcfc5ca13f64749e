use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and store tracklab data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;

    /// Atomically subtracts `amount` from the user's balance if and only if
    /// the balance covers it, returning the new balance. Returns `None`
    /// without mutating anything when the balance is insufficient.
    async fn try_debit_credits(&self, user_id: PrimaryKey, amount: f64) -> Result<Option<f64>>;
    /// Adds `amount` to the user's balance, returning the new balance.
    async fn credit_credits(&self, user_id: PrimaryKey, amount: f64) -> Result<f64>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn project_by_id(&self, project_id: PrimaryKey) -> Result<ProjectData>;
    async fn projects_by_user(&self, user_id: PrimaryKey) -> Result<Vec<ProjectData>>;
    async fn create_project(&self, new_project: NewProject) -> Result<ProjectData>;
    async fn update_project(&self, updated_project: UpdatedProject) -> Result<ProjectData>;
    /// Deletes a project and every track belonging to it
    async fn delete_project(&self, project_id: PrimaryKey) -> Result<()>;

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData>;
    async fn tracks_by_project(&self, project_id: PrimaryKey) -> Result<Vec<TrackData>>;
    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData>;
    async fn update_track(&self, updated_track: UpdatedTrack) -> Result<TrackData>;
    async fn delete_track(&self, track_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub subscription_tier: SubscriptionTier,
    pub credits: f64,
}

#[derive(Debug)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub display_name: Option<String>,
    pub preferences: Option<Value>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewProject {
    /// The owner of the new project
    pub user_id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub genre: String,
    pub key_signature: String,
    pub tempo: i64,
    pub time_signature: String,
    pub settings: Value,
}

#[derive(Debug, Default)]
pub struct UpdatedProject {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub key_signature: Option<String>,
    pub tempo: Option<i64>,
    pub time_signature: Option<String>,
    pub settings: Option<Value>,
}

#[derive(Debug)]
pub struct NewTrack {
    pub project_id: PrimaryKey,
    pub name: String,
    pub track_number: i64,
    pub instrument_type: String,
    pub volume: f64,
    pub pan: f64,
    pub muted: bool,
    pub soloed: bool,
    pub effects: Vec<EffectDescriptor>,
    pub automation: Vec<AutomationPoint>,
}

#[derive(Debug, Default)]
pub struct UpdatedTrack {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub track_number: Option<i64>,
    pub instrument_type: Option<String>,
    pub volume: Option<f64>,
    pub pan: Option<f64>,
    pub muted: Option<bool>,
    pub soloed: Option<bool>,
    pub effects: Option<Vec<EffectDescriptor>>,
    pub automation: Option<Vec<AutomationPoint>>,
}
