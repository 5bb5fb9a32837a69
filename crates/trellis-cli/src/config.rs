use serde::Deserialize;
use std::path::Path;

use trellis_core::policy::PolicyLimits;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub limits: LimitsConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_entries: usize,
    pub max_subjects_per_entry: usize,
    pub max_resources_per_entry: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Resource type used for keys given as a bare `/path`.
    pub resource_type: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "warn".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = PolicyLimits::default();
        Self {
            max_entries: limits.max_entries,
            max_subjects_per_entry: limits.max_subjects_per_entry,
            max_resources_per_entry: limits.max_resources_per_entry,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            resource_type: "thing".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TRELLIS_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("TRELLIS_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("TRELLIS_LIMITS_MAX_ENTRIES")
            && let Ok(n) = v.parse()
        {
            self.limits.max_entries = n;
        }
        if let Ok(v) = std::env::var("TRELLIS_LIMITS_MAX_SUBJECTS_PER_ENTRY")
            && let Ok(n) = v.parse()
        {
            self.limits.max_subjects_per_entry = n;
        }
        if let Ok(v) = std::env::var("TRELLIS_LIMITS_MAX_RESOURCES_PER_ENTRY")
            && let Ok(n) = v.parse()
        {
            self.limits.max_resources_per_entry = n;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_entries == 0 {
            return Err(ConfigError::Validation(
                "limits.max_entries must be non-zero".to_string(),
            ));
        }
        if self.limits.max_subjects_per_entry == 0 {
            return Err(ConfigError::Validation(
                "limits.max_subjects_per_entry must be non-zero".to_string(),
            ));
        }
        if self.limits.max_resources_per_entry == 0 {
            return Err(ConfigError::Validation(
                "limits.max_resources_per_entry must be non-zero".to_string(),
            ));
        }
        if trellis_core::ResourceType::new(self.defaults.resource_type.as_str()).is_err() {
            return Err(ConfigError::Validation(format!(
                "defaults.resource_type '{}' is not a valid resource type",
                self.defaults.resource_type
            )));
        }
        Ok(())
    }

    pub fn to_policy_limits(&self) -> PolicyLimits {
        PolicyLimits {
            max_entries: self.limits.max_entries,
            max_subjects_per_entry: self.limits.max_subjects_per_entry,
            max_resources_per_entry: self.limits.max_resources_per_entry,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("config validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_sensible_values() {
        let config = AppConfig::default();

        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.limits.max_entries, 100);
        assert_eq!(config.defaults.resource_type, "thing");
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[log]
format = "json"
level = "debug"

[limits]
max_entries = 10

[defaults]
resource_type = "message"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.limits.max_entries, 10);
        assert_eq!(config.limits.max_subjects_per_entry, 100);
        assert_eq!(config.defaults.resource_type, "message");
    }

    #[test]
    fn env_vars_override_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[limits]
max_resources_per_entry = 50
"#
        )
        .unwrap();

        // SAFETY: no other test touches this variable
        unsafe { std::env::set_var("TRELLIS_LIMITS_MAX_RESOURCES_PER_ENTRY", "7") };
        let config = AppConfig::load(Some(&path)).unwrap();
        unsafe { std::env::remove_var("TRELLIS_LIMITS_MAX_RESOURCES_PER_ENTRY") };

        assert_eq!(config.limits.max_resources_per_entry, 7);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/trellis.toml")));

        assert!(matches!(result, Err(ConfigError::ReadFile(ref path, _)) if path.contains("nonexistent")));
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "[limits\nmax_entries = ").unwrap();

        let result = AppConfig::load(Some(&path));

        assert!(matches!(result, Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let mut config = AppConfig::default();
        config.limits.max_entries = 0;

        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("max_entries"))
        );
    }

    #[test]
    fn validation_rejects_bad_default_resource_type() {
        let mut config = AppConfig::default();
        config.defaults.resource_type = "thing:x".to_string();

        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("resource_type"))
        );
    }

    #[test]
    fn to_policy_limits_copies_values() {
        let mut config = AppConfig::default();
        config.limits.max_subjects_per_entry = 3;

        let limits = config.to_policy_limits();

        assert_eq!(limits.max_subjects_per_entry, 3);
        assert_eq!(limits.max_entries, 100);
    }
}
