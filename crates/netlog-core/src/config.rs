//! Credential loading and tunable settings.
//!
//! The credential comes from the process environment (optionally pre-populated from a
//! local `.env` file). Everything else is read from an optional TOML settings file; a
//! missing file means defaults.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigurationError;

pub const CREDENTIAL_ENV: &str = "GEMINI_API_KEY";
pub const PLACEHOLDER_CREDENTIAL: &str = "your-gemini-api-key-here";

/// Overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "NETLOG_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "netlog.toml";

/// Backend access token. Debug output is masked so it never lands in logs whole.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigurationError> {
        let raw = raw.into();
        if raw.is_empty() || raw == PLACEHOLDER_CREDENTIAL {
            return Err(ConfigurationError::MissingCredential);
        }
        Ok(Self(raw))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First four characters followed by an ellipsis.
    pub fn masked(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Validate a raw environment value.
pub fn credential_from(value: Option<String>) -> Result<Credential, ConfigurationError> {
    value
        .ok_or(ConfigurationError::MissingCredential)
        .and_then(Credential::new)
}

/// Load `.env` (if present) and read the credential from the environment.
pub fn load_credential() -> Result<Credential, ConfigurationError> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env file");
    }
    let credential = credential_from(std::env::var(CREDENTIAL_ENV).ok())?;
    info!(key = %credential.masked(), "Backend credential loaded");
    Ok(credential)
}

// SETTINGS //

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the web server listens on
    pub bind_addr: String,

    /// Gemini REST base, without trailing slash
    pub api_base_url: String,

    pub model: ModelSettings,
    pub ingest: IngestSettings,
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Tried first, before the catalog is consulted
    pub preferred: String,

    /// Ordered identifier substrings used to rank catalog entries
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    // characters of log text sent to the model
    pub max_log_chars: usize,

    // characters shown in the preview pane
    pub preview_chars: usize,

    // advisory only, processing continues above it
    pub size_warning_bytes: u64,

    // hard HTTP body limit
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: ModelSettings::default(),
            ingest: IngestSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            preferred: "gemini-2.5-flash".to_string(),
            preferences: [
                "gemini-2.5-flash",
                "gemini-2.5-pro",
                "gemini-2.0-flash",
                "gemini-1.5-flash",
                "gemini-1.5-pro",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_log_chars: crate::ingest::DEFAULT_MAX_LOG_CHARS,
            preview_chars: crate::ingest::DEFAULT_PREVIEW_CHARS,
            size_warning_bytes: crate::ingest::DEFAULT_SIZE_WARNING_BYTES,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `NETLOG_CONFIG`, else `./netlog.toml`, else defaults.
    pub fn load() -> Result<Self, ConfigurationError> {
        match settings_path(
            std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
            Path::new(DEFAULT_CONFIG_FILE),
        ) {
            Some(path) => Self::load_from(path),
            None => {
                debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::InvalidSettings(format!("{}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml(&content)?;
        info!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: &str| Err(ConfigurationError::InvalidSettings(msg.to_string()));

        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return invalid("generation.temperature must be within [0, 1]");
        }
        if self.generation.max_output_tokens == 0 {
            return invalid("generation.max_output_tokens must be positive");
        }
        if self.ingest.max_log_chars == 0 {
            return invalid("ingest.max_log_chars must be positive");
        }
        if self.ingest.max_upload_bytes == 0 {
            return invalid("ingest.max_upload_bytes must be positive");
        }
        if self.model.preferred.trim().is_empty() {
            return invalid("model.preferred must not be empty");
        }
        Ok(())
    }
}

// An explicit override always wins, even when the file is missing (load then fails).
fn settings_path(explicit: Option<PathBuf>, default_file: &Path) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    default_file.is_file().then(|| default_file.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_placeholder() {
        assert_eq!(credential_from(None), Err(ConfigurationError::MissingCredential));
        assert_eq!(
            credential_from(Some(String::new())),
            Err(ConfigurationError::MissingCredential)
        );
        assert_eq!(
            credential_from(Some(PLACEHOLDER_CREDENTIAL.to_string())),
            Err(ConfigurationError::MissingCredential)
        );
    }

    #[test]
    fn test_accepts_other_values_unchanged() {
        for raw in ["AIzaSyExample", " padded ", "x"] {
            let credential = credential_from(Some(raw.to_string())).unwrap();
            assert_eq!(credential.expose(), raw);
        }
    }

    #[test]
    fn test_debug_is_masked() {
        let credential = Credential::new("AIzaSySecretValue").unwrap();
        let printed = format!("{:?}", credential);
        assert!(printed.contains("AIza..."));
        assert!(!printed.contains("SecretValue"));
    }

    #[test]
    fn test_load_settings() {
        let toml_content = r#"
bind_addr = "127.0.0.1:8080"

[model]
preferred = "gemini-2.0-flash"
preferences = ["gemini-2.0", "gemini-1.5"]

[ingest]
max_log_chars = 8000

[generation]
temperature = 0.5
"#;
        let settings = Settings::from_toml(toml_content).unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.model.preferred, "gemini-2.0-flash");
        assert_eq!(settings.model.preferences.len(), 2);
        assert_eq!(settings.ingest.max_log_chars, 8000);
        // untouched fields keep their defaults
        assert_eq!(settings.ingest.preview_chars, 500);
        assert_eq!(settings.generation.max_output_tokens, 2048);
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let err = Settings::from_toml("[generation]\ntemperature = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSettings(_)));
    }

    #[test]
    fn test_explicit_settings_path_wins() {
        let got = settings_path(
            Some(PathBuf::from("/etc/netlog/custom.toml")),
            Path::new("does-not-exist.toml"),
        );
        assert_eq!(got, Some(PathBuf::from("/etc/netlog/custom.toml")));
        assert_eq!(settings_path(None, Path::new("does-not-exist.toml")), None);
    }
}
