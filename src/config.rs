// src/config.rs
use actix_web::cookie::Key;
use serde::Deserialize;
use std::path::PathBuf;

const PLACEHOLDER_CLIENT_ID: &str = "YOUR_GOOGLE_CLIENT_ID.apps.googleusercontent.com";
const PLACEHOLDER_SESSION_SECRET: &str =
    "replace_this_with_a_very_strong_random_secret_string_xyz789";
/// `Key::derive_from` needs at least this much master key material.
const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub google_client_id: Option<String>,
    pub session_secret: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    pub app_env: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_path() -> PathBuf {
    PathBuf::from("db.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// The configured OAuth client id, ignoring blanks and the sample value.
    pub fn google_client_id(&self) -> Option<&str> {
        self.google_client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != PLACEHOLDER_CLIENT_ID)
    }

    pub fn secure_cookies(&self) -> bool {
        self.app_env.as_deref() == Some("production")
    }

    fn usable_session_secret(&self) -> Option<&str> {
        self.session_secret
            .as_deref()
            .filter(|s| s.len() >= MIN_SESSION_SECRET_LEN && *s != PLACEHOLDER_SESSION_SECRET)
    }

    /// Session cookie key derived from `SESSION_SECRET`.
    ///
    /// Falls back to a random key, which logs everyone out on restart.
    pub fn session_key(&self) -> Key {
        match self.usable_session_secret() {
            Some(secret) => Key::derive_from(secret.as_bytes()),
            None => Key::generate(),
        }
    }

    /// Logs every setting that leaves the service degraded or insecure.
    pub fn warn_on_misconfiguration(&self) {
        if self.google_client_id().is_none() {
            tracing::warn!("GOOGLE_CLIENT_ID is not set or is the placeholder value; Google Sign-In will not work");
        }
        if self.usable_session_secret().is_none() {
            tracing::warn!(
                "SESSION_SECRET is missing, the placeholder, or shorter than {} bytes; using a random per-process key",
                MIN_SESSION_SECRET_LEN
            );
        }
        if !self.static_dir.is_dir() {
            tracing::warn!(
                "Static directory {} does not exist; only the API will be served",
                self.static_dir.display()
            );
        }
    }
}
