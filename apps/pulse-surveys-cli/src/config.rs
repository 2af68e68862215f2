//! Layered application configuration: defaults, then YAML, then `PULSE__*` environment.

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use pulse_surveys::PulseSurveysConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "PULSE__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DatabaseConfig {
    pub dsn: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://pulse-surveys.db?mode=rwc".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub pulse_surveys: PulseSurveysConfig,
}

impl AppConfig {
    /// Load defaults, then the optional YAML file, then the environment.
    ///
    /// # Errors
    /// Returns an error when the file is missing, a layer does not parse or
    /// the merged module settings are invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract().context("invalid configuration")?;
        config
            .pulse_surveys
            .validate()
            .map_err(|e| anyhow::anyhow!("pulse_surveys: {e}"))?;
        Ok(config)
    }

    /// Pretty JSON of the effective configuration.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = AppConfig::default();
        assert_eq!(config.database.dsn, "sqlite://pulse-surveys.db?mode=rwc");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.pulse_surveys.default_invitation_expiry_days, 7);
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  dsn: \"sqlite::memory:\"\npulse_surveys:\n  default_invitation_expiry_days: 3\n  respondent_key_secret: \"0123456789abcdef0123\"\n"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.database.dsn, "sqlite::memory:");
        assert_eq!(config.pulse_surveys.default_invitation_expiry_days, 3);
        assert_eq!(config.pulse_surveys.max_invitation_expiry_days, 30);
    }

    #[test]
    fn invalid_module_settings_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pulse_surveys:\n  survey_code_bytes: 4\n").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("survey_code_bytes"));
    }

    #[test]
    fn respondent_key_secret_is_required_and_never_rendered() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: warn\n").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("respondent_key_secret"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "pulse_surveys:\n  respondent_key_secret: \"0123456789abcdef0123\"\n"
        )
        .unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(!config.render().unwrap().contains("0123456789abcdef"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "logging:\n  level: debug\n  colour: true\n";
        let parsed: Result<AppConfig, _> = serde_saphyr::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/pulse.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
