//! Runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, an optional YAML file, then
//! `HEARTCHECK_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Where per-session prediction results are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for SessionBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// SQLite file used when `backend` is `sqlite`
    pub sqlite_path: PathBuf,
    /// Results older than this are treated as absent
    pub ttl_secs: u64,
    /// Add `Secure` to the session cookie (serve over HTTPS only)
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            sqlite_path: PathBuf::from("data/sessions.db"),
            ttl_secs: 24 * 60 * 60,
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Directory holding the exported model artifacts
    pub model_dir: PathBuf,
    /// Refuse to start unless `manifest.json` binds every artifact
    pub require_manifest: bool,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            model_dir: PathBuf::from("models"),
            require_manifest: false,
            session: SessionConfig::default(),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load a [`Config`] from a YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is invalid.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns an error naming the first variable with an unusable value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn invalid(name: &'static str, value: String) -> ConfigError {
            ConfigError::InvalidEnv { name, value }
        }

        if let Some(v) = lookup("HEARTCHECK_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Some(v) = lookup("HEARTCHECK_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HEARTCHECK_REQUIRE_MANIFEST") {
            self.require_manifest =
                parse_bool(&v).ok_or_else(|| invalid("HEARTCHECK_REQUIRE_MANIFEST", v))?;
        }
        if let Some(v) = lookup("HEARTCHECK_SESSION_BACKEND") {
            self.session.backend = v
                .parse()
                .map_err(|()| invalid("HEARTCHECK_SESSION_BACKEND", v))?;
        }
        if let Some(v) = lookup("HEARTCHECK_SESSION_DB") {
            self.session.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("HEARTCHECK_SESSION_TTL_SECS") {
            self.session.ttl_secs = v
                .trim()
                .parse()
                .map_err(|_| invalid("HEARTCHECK_SESSION_TTL_SECS", v))?;
        }
        if let Some(v) = lookup("HEARTCHECK_COOKIE_SECURE") {
            self.session.cookie_secure =
                parse_bool(&v).ok_or_else(|| invalid("HEARTCHECK_COOKIE_SECURE", v))?;
        }
        Ok(())
    }

    /// Defaults, then the optional YAML file, then the process environment.
    ///
    /// # Errors
    /// Returns an error if the file or any override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::from_yaml_file(path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Session time-to-live as a chrono duration.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.session.ttl_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SessionStore;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper to write YAML to a temp file and return the path.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_config_partial_yaml() {
        let f = write_yaml(
            r#"
listen_addr: "0.0.0.0:8080"
session:
  backend: sqlite
  ttl_secs: 600
"#,
        );
        let config = Config::from_yaml_file(f.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.session.backend, SessionBackend::Sqlite);
        assert_eq!(config.session.ttl_secs, 600);
        assert!(!config.session.cookie_secure);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::from_yaml_file(Path::new("/nonexistent/heartcheck.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("session: [valid: yaml: {{{}}}");
        assert!(matches!(
            Config::from_yaml_file(f.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("HEARTCHECK_MODEL_DIR", "/srv/models"),
                ("HEARTCHECK_REQUIRE_MANIFEST", "yes"),
                ("HEARTCHECK_SESSION_BACKEND", "SQLite"),
                ("HEARTCHECK_SESSION_TTL_SECS", "30"),
            ]))
            .unwrap();

        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert!(config.require_manifest);
        assert_eq!(config.session.backend, SessionBackend::Sqlite);
        assert_eq!(config.session_ttl(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_oversized_ttl_saturates() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("HEARTCHECK_SESSION_TTL_SECS", "18446744073709551615")]))
            .unwrap();
        assert_eq!(config.session_ttl(), chrono::Duration::MAX);

        let store =
            crate::adapters::SqliteSessionStore::in_memory(config.session_ttl()).unwrap();
        let session = crate::domain::SessionId::generate();
        assert!(store.load_prediction(&session).unwrap().is_none());
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("HEARTCHECK_SESSION_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: "HEARTCHECK_SESSION_TTL_SECS",
                ..
            }
        ));
    }
}
