//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tracing::{error, info};

use crate::db::Database;
use crate::store::TokenStore;
use crate::{ServerConfig, default_allow_list};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "careerchat-server",
    about = "Career chat backend with JWT session management"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "careerchat.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Browser origin allowed to call the API, or "none" to disable CORS
    #[arg(long, default_value = "http://localhost:3000")]
    pub allow_origin: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse the --allow-origin value. "none" disables CORS entirely.
/// Returns None and logs an error if the origin is not a valid header value.
pub fn validate_allow_origin(allow_origin: &str) -> Option<Option<HeaderValue>> {
    if allow_origin == "none" {
        return Some(None);
    }

    match HeaderValue::from_str(allow_origin) {
        Ok(value) => Some(Some(value)),
        Err(e) => {
            error!(origin = %allow_origin, error = %e, "Invalid allow-origin value");
            None
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    store: Arc<TokenStore>,
    jwt_secret: String,
    allow_origin: Option<HeaderValue>,
) -> ServerConfig {
    ServerConfig {
        db,
        store,
        jwt_secret: jwt_secret.into_bytes(),
        allow_origin,
        allow_list: default_allow_list(),
    }
}
