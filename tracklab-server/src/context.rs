use std::sync::Arc;

use axum::extract::FromRef;
use tracklab_collab::{Collab, Config, SqliteDatabase};

use crate::rate_limit::RateLimiter;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub collab: Arc<Collab<SqliteDatabase>>,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
}
