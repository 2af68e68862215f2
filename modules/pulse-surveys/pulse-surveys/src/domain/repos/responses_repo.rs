use async_trait::async_trait;
use hmac::{Hmac, Mac};
use pulse_surveys_sdk::SurveyResponse;
use sha2::Sha256;
use uuid::Uuid;

use super::CompanyScope;
use crate::config::SecretString;

type HmacSha256 = Hmac<Sha256>;

const KEY_DOMAIN: &[u8] = b"pulse-surveys/respondent/v2";

/// Uniqueness key of a response within its survey.
///
/// Anonymous rows carry nothing but this key, so it is keyed with a
/// deployment secret: without the secret a key cannot be recomputed from
/// a user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RespondentKey(String);

impl RespondentKey {
    /// Rebuild a key read back from storage.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Derives [`RespondentKey`]s as HMAC-SHA256 over (survey, respondent kind, respondent id).
#[derive(Clone)]
pub struct RespondentKeyring {
    secret: SecretString,
}

impl RespondentKeyring {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// # Errors
    /// Returns an error if the secret cannot key the MAC.
    pub fn for_user(&self, survey_id: Uuid, user_id: Uuid) -> anyhow::Result<RespondentKey> {
        self.derive(survey_id, b'u', user_id)
    }

    /// # Errors
    /// Returns an error if the secret cannot key the MAC.
    pub fn for_invitation(
        &self,
        survey_id: Uuid,
        invitation_id: Uuid,
    ) -> anyhow::Result<RespondentKey> {
        self.derive(survey_id, b'i', invitation_id)
    }

    fn derive(&self, survey_id: Uuid, kind: u8, id: Uuid) -> anyhow::Result<RespondentKey> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose().as_bytes())
            .map_err(|e| anyhow::anyhow!("respondent key secret rejected: {e}"))?;
        mac.update(KEY_DOMAIN);
        mac.update(survey_id.as_bytes());
        mac.update(&[kind]);
        mac.update(id.as_bytes());
        Ok(RespondentKey(hex::encode(mac.finalize().into_bytes())))
    }
}

impl std::fmt::Debug for RespondentKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespondentKeyring").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same (survey, respondent key) already exists.
    Duplicate,
}

/// Filter for counting responses of one survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFilter {
    pub survey_id: Uuid,
    /// Restrict to responses attributed to these companies.
    pub scope: Option<CompanyScope>,
}

/// Repository trait for append-only survey responses.
#[async_trait]
pub trait ResponsesRepository: Send + Sync {
    /// Insert the response; the unique (survey, key) constraint is the guard.
    async fn insert_response_if_absent(
        &self,
        key: &RespondentKey,
        response: &SurveyResponse,
    ) -> anyhow::Result<InsertOutcome>;

    async fn response_exists(&self, survey_id: Uuid, key: &RespondentKey) -> anyhow::Result<bool>;

    async fn count_responses(&self, filter: &ResponseFilter) -> anyhow::Result<u64>;

    /// Null `user_id` and set `anonymized` on every response of the user.
    async fn anonymize_user_responses(&self, user_id: Uuid) -> anyhow::Result<u64>;
}
