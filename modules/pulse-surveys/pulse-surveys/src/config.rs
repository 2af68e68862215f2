//! Configuration for the Pulse Surveys module.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret setting that never shows up in `Debug` output and is zeroed on drop.
#[derive(Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Callers must not log or persist the returned slice.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Configuration for the Pulse Surveys module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PulseSurveysConfig {
    /// Validity window applied when an issuer does not choose one.
    pub default_invitation_expiry_days: u32,
    /// Upper bound an issuer may request.
    pub max_invitation_expiry_days: u32,
    /// Random bytes behind a survey-response code (hex encoded).
    pub survey_code_bytes: usize,
    /// Length of company-join codes.
    pub join_code_length: usize,
    /// Fresh codes tried when a generated code collides.
    pub code_generation_attempts: u32,
    /// Refuse `draft -> scheduled` for surveys without questions or with empty blocks.
    pub require_questions_to_schedule: bool,
    pub max_title_length: usize,
    /// HMAC key for respondent keys. Must stay stable for the lifetime of
    /// the data; changing it lets every respondent answer again.
    #[serde(skip_serializing)]
    pub respondent_key_secret: SecretString,
}

/// Shortest accepted `respondent_key_secret`, in bytes.
pub const MIN_RESPONDENT_KEY_SECRET_LEN: usize = 16;

impl Default for PulseSurveysConfig {
    fn default() -> Self {
        Self {
            default_invitation_expiry_days: 7,
            max_invitation_expiry_days: 30,
            survey_code_bytes: 16,
            join_code_length: 6,
            code_generation_attempts: 5,
            require_questions_to_schedule: true,
            max_title_length: 200,
            respondent_key_secret: SecretString::default(),
        }
    }
}

impl PulseSurveysConfig {
    /// Reject settings that would weaken codes or make expiry meaningless.
    ///
    /// # Errors
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_invitation_expiry_days == 0 {
            return Err("default_invitation_expiry_days must be at least 1".to_owned());
        }
        if self.max_invitation_expiry_days < self.default_invitation_expiry_days {
            return Err(
                "max_invitation_expiry_days must not be below default_invitation_expiry_days"
                    .to_owned(),
            );
        }
        if self.survey_code_bytes < 16 {
            return Err("survey_code_bytes must be at least 16 (128 bits)".to_owned());
        }
        if self.join_code_length < 6 {
            return Err("join_code_length must be at least 6".to_owned());
        }
        if self.code_generation_attempts == 0 {
            return Err("code_generation_attempts must be at least 1".to_owned());
        }
        if self.respondent_key_secret.expose().len() < MIN_RESPONDENT_KEY_SECRET_LEN {
            return Err(format!(
                "respondent_key_secret must be set (at least {MIN_RESPONDENT_KEY_SECRET_LEN} bytes)"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret() -> PulseSurveysConfig {
        PulseSurveysConfig {
            respondent_key_secret: SecretString::new("0123456789abcdef0123"),
            ..PulseSurveysConfig::default()
        }
    }

    #[test]
    fn test_defaults_need_only_a_secret() {
        let cfg = PulseSurveysConfig::default();
        assert_eq!(cfg.default_invitation_expiry_days, 7);
        assert!(cfg.require_questions_to_schedule);
        assert!(cfg.validate().unwrap_err().contains("respondent_key_secret"));
        assert!(with_secret().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let cfg = PulseSurveysConfig {
            respondent_key_secret: SecretString::new("short"),
            ..PulseSurveysConfig::default()
        };
        assert!(cfg.validate().unwrap_err().contains("respondent_key_secret"));
    }

    #[test]
    fn test_secret_is_read_but_never_written() {
        let cfg: PulseSurveysConfig = serde_json::from_value(
            serde_json::json!({ "respondent_key_secret": "0123456789abcdef0123" }),
        )
        .unwrap();
        assert_eq!(cfg.respondent_key_secret.expose(), "0123456789abcdef0123");

        let written = serde_json::to_value(&cfg).unwrap();
        assert!(written.get("respondent_key_secret").is_none());
        assert!(!format!("{cfg:?}").contains("0123456789abcdef"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: PulseSurveysConfig =
            serde_json::from_value(serde_json::json!({ "join_code_length": 8 })).unwrap();
        assert_eq!(cfg.join_code_length, 8);
        assert_eq!(cfg.survey_code_bytes, 16);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let res: Result<PulseSurveysConfig, _> =
            serde_json::from_value(serde_json::json!({ "code_bytes": 8 }));
        assert!(res.is_err());
    }

    #[test]
    fn test_weak_survey_codes_rejected() {
        let cfg = PulseSurveysConfig {
            survey_code_bytes: 8,
            ..with_secret()
        };
        assert!(cfg.validate().unwrap_err().contains("128 bits"));
    }
}
