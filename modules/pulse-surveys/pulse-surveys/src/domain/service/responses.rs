use std::collections::BTreeMap;

use pulse_surveys_sdk::{Participant, ResponseRate, SurveyResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use super::Service;
use crate::domain::error::DomainError;

impl Service {
    /// # Errors
    /// `NotFound` plus the outcomes of `ResponseCollector::submit`.
    pub async fn submit_response(
        &self,
        survey_id: Uuid,
        participant: &Participant,
        answers: BTreeMap<String, serde_json::Value>,
    ) -> Result<SurveyResponse, DomainError> {
        let survey = self.get_survey(survey_id).await?;
        self.collector.submit(&survey, participant, answers).await
    }

    /// # Errors
    /// `NotFound` or `Database`.
    pub async fn response_rate(&self, survey_id: Uuid) -> Result<ResponseRate, DomainError> {
        let survey = self.get_survey(survey_id).await?;
        self.rates.rate_for(&survey).await
    }

    /// Called when a user is deleted: their rows stay, their identity goes.
    ///
    /// # Errors
    /// Returns `Database` when the store fails.
    #[instrument(skip(self))]
    pub async fn anonymize_user_responses(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let touched = self.store.anonymize_user_responses(user_id).await?;
        info!(touched, "responses anonymized");
        Ok(touched)
    }
}
