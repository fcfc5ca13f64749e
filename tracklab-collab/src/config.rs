use std::{env, path::PathBuf};

/// Process-wide configuration, built once at startup and passed by reference
/// to every component constructor. Components never read the environment
/// directly.
#[derive(Debug, Clone)]
pub struct Config {
    /// The port the HTTP server listens on.
    pub port: u16,
    /// SQLite connection url, such as `sqlite://tracklab.db`.
    pub database_url: String,
    /// API key for the external generation provider. When absent, the AI
    /// gateway runs entirely on the deterministic fallback provider.
    pub openrouter_key: Option<String>,
    /// Directory raw uploads are persisted to.
    pub uploads_dir: PathBuf,
    /// Directory processed artifacts (waveforms, exports) are written to.
    pub processed_dir: PathBuf,
    /// Public base url used when building file and download urls.
    pub public_url: String,
    /// The origin allowed by CORS.
    pub frontend_url: String,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 8000;

    /// Reads the configuration from the environment.
    ///
    /// Every variable has a development default. None of the defaults are
    /// suitable for production use.
    pub fn from_env() -> Self {
        let port = env::var("TRACKLAB_PORT")
            .ok()
            .map(|x| x.parse::<u16>().expect("TRACKLAB_PORT must be a number"))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            port,
            database_url: env::var("TRACKLAB_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tracklab.db".to_string()),
            openrouter_key: env::var("TRACKLAB_OPENROUTER_KEY").ok().filter(|k| !k.is_empty()),
            uploads_dir: env::var("TRACKLAB_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            processed_dir: env::var("TRACKLAB_PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./processed")),
            public_url: env::var("TRACKLAB_PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            frontend_url: env::var("TRACKLAB_FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            database_url: "sqlite::memory:".to_string(),
            openrouter_key: None,
            uploads_dir: PathBuf::from("./uploads"),
            processed_dir: PathBuf::from("./processed"),
            public_url: format!("http://localhost:{}", Self::DEFAULT_PORT),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}
