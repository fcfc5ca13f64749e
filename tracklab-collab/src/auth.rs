use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::random_string, Database, DatabaseError, NewSession, NewUser, SessionData,
    SubscriptionTier, UpdatedUser, UserData,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The presented token exists but has passed its expiry
    #[error("Session expired")]
    SessionExpired,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_HOURS: usize = 24;
    /// Every new account starts with this many credits
    pub const STARTING_CREDITS: f64 = 3.;

    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Creates an account and immediately logs it in, returning a new session
    pub async fn register(&self, new_account: NewAccount) -> Result<SessionData, AuthError> {
        let user = self.create_user(new_account).await?;
        self.create_session(&user).await
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.create_session(&user).await
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Updates a user's profile
    pub async fn update_profile(&self, updated_user: UpdatedUser) -> Result<UserData, DatabaseError> {
        self.db.update_user(updated_user).await
    }

    /// Returns the session behind a token, verifying its expiry
    pub async fn session(&self, token: &str) -> Result<SessionData, AuthError> {
        let session = self
            .db
            .session_by_token(token)
            .await
            .map_err(AuthError::Db)?;

        if session.expires_at < Utc::now() {
            return Err(AuthError::SessionExpired);
        }

        Ok(session)
    }

    async fn create_user(&self, new_account: NewAccount) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_account.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .create_user(NewUser {
                email: new_account.email,
                password: hashed_password,
                display_name: new_account.display_name,
                subscription_tier: SubscriptionTier::Free,
                credits: Self::STARTING_CREDITS,
            })
            .await
            .map_err(AuthError::Db)
    }

    async fn create_session(&self, user: &UserData) -> Result<SessionData, AuthError> {
        let expires_at = Utc::now() + Duration::hours(Self::SESSION_DURATION_IN_HOURS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.db.clear_expired_sessions().await {
            log::error!("Failed to clear expired sessions: {}", e);
        }
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}
