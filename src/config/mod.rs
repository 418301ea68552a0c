//! Config Module - Configuration management

use serde::{Serialize, Deserialize};

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls_cert: None,
            tls_key: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Replaces the bundled seed document when set
    pub seed_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/db.json".to_string(),
            seed_path: None,
        }
    }
}

/// Minimum length of a configured session secret
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 key. Empty means a random key is generated at startup.
    pub jwt_secret: String,
    pub session_ttl_hours: u64,
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_ttl_hours: 12,
            cookie_name: "session".to_string(),
        }
    }
}

/// Page-level access rules
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Require a session; anonymous requests go to the login page
    pub protected_prefixes: Vec<String>,
    /// Sign-in pages; requests with a session go to the landing page
    pub auth_routes: Vec<String>,
    pub login_path: String,
    pub landing_path: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec![
                "/dashboard".to_string(),
                "/patients".to_string(),
                "/recordings".to_string(),
                "/consultations".to_string(),
                "/settings".to_string(),
            ],
            auth_routes: vec!["/login".to_string(), "/forgot-password".to_string()],
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load from a `.toml` or `.json` file
    pub async fn load(path: &str) -> Result<Self, String> {
        let content = tokio::fs::read_to_string(path).await
            .map_err(|e| format!("Failed to read config: {}", e))?;
        Self::parse(path, &content)
    }

    fn parse(path: &str, content: &str) -> Result<Self, String> {
        if path.ends_with(".toml") {
            toml::from_str(content).map_err(|e| format!("Invalid TOML: {}", e))
        } else if path.ends_with(".json") {
            serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {}", e))
        } else {
            Err("Unsupported config format".to_string())
        }
    }

    /// Load `path` when given, defaults otherwise, then apply the environment
    pub async fn resolve(path: Option<&str>) -> Result<Self, String> {
        let mut config = match path {
            Some(p) => Self::load(p).await?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `JWT_SECRET` and `CLINICNOTES_DB_PATH` override the file
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(db_path) = lookup("CLINICNOTES_DB_PATH") {
            self.storage.db_path = db_path;
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Invalid server port".to_string());
        }

        if self.storage.db_path.trim().is_empty() {
            errors.push("storage.db_path must not be empty".to_string());
        }

        if !self.auth.jwt_secret.is_empty() && self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            errors.push(format!("auth.jwt_secret must be at least {} characters", MIN_SECRET_LEN));
        }

        if self.auth.session_ttl_hours == 0 {
            errors.push("auth.session_ttl_hours must be > 0".to_string());
        }

        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            errors.push("server.tls_cert and server.tls_key must be set together".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn export_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize: {}", e))
    }
}
