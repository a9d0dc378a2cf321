//! Configuration management for the ZIP comparison server

use std::env;

use crate::reconcile::unpack::DEFAULT_MAX_NESTED_DEPTH;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Cap on each multipart upload body
    pub max_upload_bytes: usize,
    /// Bound on nested-archive expansion inside an upload
    pub max_nested_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            limits: LimitsConfig {
                // Two archives per request; 100MB covers both comfortably
                max_upload_bytes: 100 * 1024 * 1024,
                max_nested_depth: DEFAULT_MAX_NESTED_DEPTH,
            },
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            limits: LimitsConfig {
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.limits.max_upload_bytes),
                max_nested_depth: env::var("MAX_NESTED_ZIP_DEPTH")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.limits.max_nested_depth),
            },
        }
    }
}
