use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root directory for uploaded and parsed files (default: `./data`).
    pub data_root: PathBuf,
    /// Path to the packet schema JSON file (default: `packet_schema.json`).
    pub schema_file: PathBuf,
    /// Bundled demo capture served by `POST /datasets/demo_upload`.
    pub demo_file: PathBuf,
    /// Whether to run a parse worker inside the API process (default: on).
    pub embedded_worker: bool,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DATA_ROOT`            | `./data`                   |
    /// | `SCHEMA_FILE`          | `packet_schema.json`       |
    /// | `DEMO_FILE`            | `sample_data/serial_data.txt` |
    /// | `EMBEDDED_WORKER`      | `true`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let data_root =
            PathBuf::from(std::env::var("DATA_ROOT").unwrap_or_else(|_| "./data".into()));

        let schema_file = PathBuf::from(
            std::env::var("SCHEMA_FILE").unwrap_or_else(|_| "packet_schema.json".into()),
        );

        let demo_file = PathBuf::from(
            std::env::var("DEMO_FILE").unwrap_or_else(|_| "sample_data/serial_data.txt".into()),
        );

        let embedded_worker = std::env::var("EMBEDDED_WORKER")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_root,
            schema_file,
            demo_file,
            embedded_worker,
            jwt,
        }
    }

    /// Directory for raw uploads.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_root.join("uploads")
    }
}
