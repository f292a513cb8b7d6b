//! Configuration for atrium
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Atrium - multi-tenant agency operations backend
#[derive(Parser, Debug, Clone)]
#[command(name = "atrium")]
#[command(about = "Multi-tenant operations backend for agencies")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "atrium.db")]
    pub database_path: PathBuf,

    /// Secret for signing session tokens (required in production)
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: Option<String>,

    /// Session token expiry in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "86400")]
    pub session_ttl_seconds: u64,

    /// Enable development mode (insecure session secret fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum accepted JSON body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,

    /// Maximum duplicate candidates surfaced by create endpoints
    #[arg(long, env = "DUPLICATE_CANDIDATE_CAP", default_value = "3")]
    pub duplicate_candidate_cap: usize,
}

impl Args {
    /// Get effective session secret (uses default in dev mode)
    pub fn session_secret(&self) -> String {
        if self.dev_mode {
            self.session_secret
                .clone()
                .unwrap_or_else(|| "dev-mode-secret-not-for-production-use-1234".to_string())
        } else {
            self.session_secret
                .clone()
                .expect("SESSION_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.session_secret {
                None => return Err("SESSION_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < 32 => {
                    return Err("SESSION_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }
}
