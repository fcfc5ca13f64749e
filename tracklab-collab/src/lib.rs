mod ai;
mod auth;
mod config;
mod db;
mod ledger;
mod media;
mod projects;
mod relay;
mod util;

use std::sync::Arc;

pub use ai::*;
pub use auth::*;
pub use config::*;
pub use db::*;
pub use ledger::*;
pub use media::*;
pub use projects::*;
pub use relay::*;
pub use util::random_string;

/// The tracklab collab system, facilitating accounts, projects, generation,
/// media processing, and realtime rooms.
pub struct Collab<Db> {
    database: Arc<Db>,

    pub auth: Auth<Db>,
    pub ledger: Ledger<Db>,
    pub projects: ProjectManager<Db>,
    pub ai: AiGateway<Db>,
    pub media: MediaStore,
    pub relay: RoomRelay,
}

impl<Db> Collab<Db>
where
    Db: Database,
{
    pub fn new(config: &Config, database: Db) -> std::result::Result<Self, ProcessingError> {
        let database = Arc::new(database);

        Ok(Self {
            auth: Auth::new(&database),
            ledger: Ledger::new(&database),
            projects: ProjectManager::new(&database),
            ai: AiGateway::new(&database, config),
            media: MediaStore::new(config)?,
            relay: RoomRelay::new(),
            database,
        })
    }

    pub fn database(&self) -> &Arc<Db> {
        &self.database
    }
}

impl Collab<SqliteDatabase> {
    /// Connects to the configured database and sets up every component
    pub async fn init(config: &Config) -> std::result::Result<Self, InitError> {
        let database = SqliteDatabase::new(&config.database_url).await?;
        Ok(Self::new(config, database)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Db(#[from] DatabaseError),
    #[error(transparent)]
    Media(#[from] ProcessingError),
}
