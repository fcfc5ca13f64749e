use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Error as SqlxError, Row, SqlitePool,
};

use crate::{
    Database, DatabaseError, DatabaseResult, IntoDatabaseError, NewProject, NewSession, NewTrack,
    NewUser, PrimaryKey, ProjectData, Result, SessionData, SubscriptionTier, TrackData,
    UpdatedProject, UpdatedTrack, UpdatedUser, UserData,
};

/// The schema is applied statement by statement at connect time, so a fresh
/// database file (or an in-memory database in tests) is always usable.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        display_name TEXT NOT NULL,
        subscription_tier TEXT NOT NULL DEFAULT 'free',
        credits REAL NOT NULL DEFAULT 0,
        preferences TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL REFERENCES users (id),
        expires_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        genre TEXT NOT NULL DEFAULT 'electronic',
        key_signature TEXT NOT NULL DEFAULT 'C',
        tempo INTEGER NOT NULL DEFAULT 120,
        time_signature TEXT NOT NULL DEFAULT '4/4',
        settings TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects (id),
        name TEXT NOT NULL,
        track_number INTEGER NOT NULL,
        instrument_type TEXT NOT NULL DEFAULT '',
        volume REAL NOT NULL DEFAULT 0.8,
        pan REAL NOT NULL DEFAULT 0,
        muted INTEGER NOT NULL DEFAULT 0,
        soloed INTEGER NOT NULL DEFAULT 0,
        effects TEXT NOT NULL DEFAULT '[]',
        automation TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
];

/// A SQLite database implementation for tracklab
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection, so the
        // pool must hold exactly one
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(if in_memory { 1 } else { 0 })
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(Self { pool })
    }

    fn user_from_row(row: &SqliteRow) -> Result<UserData> {
        let tier: String = row.try_get("subscription_tier").map_err(|e| e.any())?;
        let preferences: String = row.try_get("preferences").map_err(|e| e.any())?;

        Ok(UserData {
            id: row.try_get("id").map_err(|e| e.any())?,
            email: row.try_get("email").map_err(|e| e.any())?,
            password: row.try_get("password").map_err(|e| e.any())?,
            display_name: row.try_get("display_name").map_err(|e| e.any())?,
            subscription_tier: SubscriptionTier::from_str(&tier),
            credits: row.try_get("credits").map_err(|e| e.any())?,
            preferences: serde_json::from_str(&preferences)
                .unwrap_or_else(|_| Value::Object(Default::default())),
            created_at: row.try_get("created_at").map_err(|e| e.any())?,
            updated_at: row.try_get("updated_at").map_err(|e| e.any())?,
        })
    }

    fn project_from_row(row: &SqliteRow) -> Result<ProjectData> {
        let settings: String = row.try_get("settings").map_err(|e| e.any())?;

        Ok(ProjectData {
            id: row.try_get("id").map_err(|e| e.any())?,
            user_id: row.try_get("user_id").map_err(|e| e.any())?,
            name: row.try_get("name").map_err(|e| e.any())?,
            description: row.try_get("description").map_err(|e| e.any())?,
            genre: row.try_get("genre").map_err(|e| e.any())?,
            key_signature: row.try_get("key_signature").map_err(|e| e.any())?,
            tempo: row.try_get("tempo").map_err(|e| e.any())?,
            time_signature: row.try_get("time_signature").map_err(|e| e.any())?,
            settings: serde_json::from_str(&settings)
                .unwrap_or_else(|_| Value::Object(Default::default())),
            created_at: row.try_get("created_at").map_err(|e| e.any())?,
            updated_at: row.try_get("updated_at").map_err(|e| e.any())?,
        })
    }

    fn track_from_row(row: &SqliteRow) -> Result<TrackData> {
        let effects: String = row.try_get("effects").map_err(|e| e.any())?;
        let automation: String = row.try_get("automation").map_err(|e| e.any())?;

        Ok(TrackData {
            id: row.try_get("id").map_err(|e| e.any())?,
            project_id: row.try_get("project_id").map_err(|e| e.any())?,
            name: row.try_get("name").map_err(|e| e.any())?,
            track_number: row.try_get("track_number").map_err(|e| e.any())?,
            instrument_type: row.try_get("instrument_type").map_err(|e| e.any())?,
            volume: row.try_get("volume").map_err(|e| e.any())?,
            pan: row.try_get("pan").map_err(|e| e.any())?,
            muted: row.try_get("muted").map_err(|e| e.any())?,
            soloed: row.try_get("soloed").map_err(|e| e.any())?,
            effects: serde_json::from_str(&effects).unwrap_or_default(),
            automation: serde_json::from_str(&automation).unwrap_or_default(),
            created_at: row.try_get("created_at").map_err(|e| e.any())?,
            updated_at: row.try_get("updated_at").map_err(|e| e.any())?,
        })
    }

    fn json_text(value: &Value) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        Self::user_from_row(&row)
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "email"))?;

        Self::user_from_row(&row)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (email, password, display_name, subscription_tier, credits, preferences, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, '{}', ?, ?)",
        )
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(new_user.subscription_tier.as_str())
        .bind(new_user.credits)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(result.last_insert_rowid()).await
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        sqlx::query("UPDATE users SET display_name = ?, preferences = ?, updated_at = ? WHERE id = ?")
            .bind(updated_user.display_name.unwrap_or(user.display_name))
            .bind(Self::json_text(
                &updated_user.preferences.unwrap_or(user.preferences),
            ))
            .bind(Utc::now())
            .bind(updated_user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn try_debit_credits(&self, user_id: PrimaryKey, amount: f64) -> Result<Option<f64>> {
        // The balance check lives inside the UPDATE, so two racing debits
        // can never take the balance below zero
        let result = sqlx::query(
            "UPDATE users SET credits = credits - ?, updated_at = ? WHERE id = ? AND credits >= ?",
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            // Distinguish a missing user from an insufficient balance
            let _ = self.user_by_id(user_id).await?;
            return Ok(None);
        }

        let user = self.user_by_id(user_id).await?;
        Ok(Some(user.credits))
    }

    async fn credit_credits(&self, user_id: PrimaryKey, amount: f64) -> Result<f64> {
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("UPDATE users SET credits = credits + ?, updated_at = ? WHERE id = ?")
            .bind(amount)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let user = self.user_by_id(user_id).await?;
        Ok(user.credits)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = sqlx::query(
            "SELECT
                sessions.id AS session_id,
                sessions.token,
                sessions.expires_at,
                users.*
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.try_get("session_id").map_err(|e| e.any())?,
            token: row.try_get("token").map_err(|e| e.any())?,
            expires_at: row.try_get("expires_at").map_err(|e| e.any())?,
            user: Self::user_from_row(&row)?,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn project_by_id(&self, project_id: PrimaryKey) -> Result<ProjectData> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("project", "id"))?;

        Self::project_from_row(&row)
    }

    async fn projects_by_user(&self, user_id: PrimaryKey) -> Result<Vec<ProjectData>> {
        let rows = sqlx::query("SELECT * FROM projects WHERE user_id = ? ORDER BY updated_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(Self::project_from_row).collect()
    }

    async fn create_project(&self, new_project: NewProject) -> Result<ProjectData> {
        // Ensure owner exists
        let _ = self.user_by_id(new_project.user_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO projects (user_id, name, description, genre, key_signature, tempo, time_signature, settings, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_project.user_id)
        .bind(&new_project.name)
        .bind(&new_project.description)
        .bind(&new_project.genre)
        .bind(&new_project.key_signature)
        .bind(new_project.tempo)
        .bind(&new_project.time_signature)
        .bind(Self::json_text(&new_project.settings))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.project_by_id(result.last_insert_rowid()).await
    }

    async fn update_project(&self, updated_project: UpdatedProject) -> Result<ProjectData> {
        let project = self.project_by_id(updated_project.id).await?;

        sqlx::query(
            "UPDATE projects SET
                name = ?,
                description = ?,
                genre = ?,
                key_signature = ?,
                tempo = ?,
                time_signature = ?,
                settings = ?,
                updated_at = ?
            WHERE id = ?",
        )
        .bind(updated_project.name.unwrap_or(project.name))
        .bind(updated_project.description.unwrap_or(project.description))
        .bind(updated_project.genre.unwrap_or(project.genre))
        .bind(updated_project.key_signature.unwrap_or(project.key_signature))
        .bind(updated_project.tempo.unwrap_or(project.tempo))
        .bind(updated_project.time_signature.unwrap_or(project.time_signature))
        .bind(Self::json_text(
            &updated_project.settings.unwrap_or(project.settings),
        ))
        .bind(Utc::now())
        .bind(updated_project.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.project_by_id(updated_project.id).await
    }

    async fn delete_project(&self, project_id: PrimaryKey) -> Result<()> {
        // Ensure project exists
        let _ = self.project_by_id(project_id).await?;

        // Tracks are bound to their project's lifecycle
        sqlx::query("DELETE FROM tracks WHERE project_id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData> {
        let row = sqlx::query("SELECT * FROM tracks WHERE id = ?")
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("track", "id"))?;

        Self::track_from_row(&row)
    }

    async fn tracks_by_project(&self, project_id: PrimaryKey) -> Result<Vec<TrackData>> {
        let rows = sqlx::query("SELECT * FROM tracks WHERE project_id = ? ORDER BY track_number ASC")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(Self::track_from_row).collect()
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        // Ensure project exists
        let _ = self.project_by_id(new_track.project_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tracks (project_id, name, track_number, instrument_type, volume, pan, muted, soloed, effects, automation, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_track.project_id)
        .bind(&new_track.name)
        .bind(new_track.track_number)
        .bind(&new_track.instrument_type)
        .bind(new_track.volume)
        .bind(new_track.pan)
        .bind(new_track.muted)
        .bind(new_track.soloed)
        .bind(serde_json::to_string(&new_track.effects).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&new_track.automation).unwrap_or_else(|_| "[]".to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.track_by_id(result.last_insert_rowid()).await
    }

    async fn update_track(&self, updated_track: UpdatedTrack) -> Result<TrackData> {
        let track = self.track_by_id(updated_track.id).await?;

        sqlx::query(
            "UPDATE tracks SET
                name = ?,
                track_number = ?,
                instrument_type = ?,
                volume = ?,
                pan = ?,
                muted = ?,
                soloed = ?,
                effects = ?,
                automation = ?,
                updated_at = ?
            WHERE id = ?",
        )
        .bind(updated_track.name.unwrap_or(track.name))
        .bind(updated_track.track_number.unwrap_or(track.track_number))
        .bind(updated_track.instrument_type.unwrap_or(track.instrument_type))
        .bind(updated_track.volume.unwrap_or(track.volume))
        .bind(updated_track.pan.unwrap_or(track.pan))
        .bind(updated_track.muted.unwrap_or(track.muted))
        .bind(updated_track.soloed.unwrap_or(track.soloed))
        .bind(
            serde_json::to_string(&updated_track.effects.unwrap_or(track.effects))
                .unwrap_or_else(|_| "[]".to_string()),
        )
        .bind(
            serde_json::to_string(&updated_track.automation.unwrap_or(track.automation))
                .unwrap_or_else(|_| "[]".to_string()),
        )
        .bind(Utc::now())
        .bind(updated_track.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.track_by_id(updated_track.id).await
    }

    async fn delete_track(&self, track_id: PrimaryKey) -> Result<()> {
        // Ensure track exists
        let _ = self.track_by_id(track_id).await?;

        sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(track_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
