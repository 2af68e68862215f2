//! Local implementation of `PulseSurveysClient`.
//!
//! Delegates to the domain service and converts errors to SDK error types.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use pulse_surveys_sdk::{
    Actor, Invitation, InvitationTarget, NewInvitation, NewSurvey, Participant,
    PulseSurveysClient, PulseSurveysError, ResponseRate, Survey, SurveyPatch, SurveyResponse,
    SurveyStatus,
};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// In-process client over the domain service.
pub struct PulseSurveysLocalClient {
    service: Arc<Service>,
}

impl PulseSurveysLocalClient {
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

fn to_public(e: DomainError) -> PulseSurveysError {
    if let DomainError::Database { message } = &e {
        tracing::error!(error = %message, "pulse surveys storage failure");
    }
    e.into()
}

#[async_trait]
impl PulseSurveysClient for PulseSurveysLocalClient {
    async fn get_survey(&self, id: Uuid) -> Result<Survey, PulseSurveysError> {
        self.service.get_survey(id).await.map_err(to_public)
    }

    async fn create_survey(
        &self,
        actor: &Actor,
        new_survey: NewSurvey,
    ) -> Result<Survey, PulseSurveysError> {
        self.service
            .create_survey(actor, new_survey)
            .await
            .map_err(to_public)
    }

    async fn update_survey_content(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: SurveyPatch,
    ) -> Result<Survey, PulseSurveysError> {
        self.service
            .update_survey_content(actor, id, patch)
            .await
            .map_err(to_public)
    }

    async fn delete_survey(&self, actor: &Actor, id: Uuid) -> Result<(), PulseSurveysError> {
        self.service.delete_survey(actor, id).await.map_err(to_public)
    }

    async fn request_transition(
        &self,
        actor: &Actor,
        survey_id: Uuid,
        target: SurveyStatus,
    ) -> Result<Survey, PulseSurveysError> {
        self.service
            .request_transition(actor, survey_id, target)
            .await
            .map_err(to_public)
    }

    async fn issue_invitation(
        &self,
        actor: &Actor,
        new_invitation: NewInvitation,
    ) -> Result<Invitation, PulseSurveysError> {
        self.service
            .issue_invitation(actor, new_invitation)
            .await
            .map_err(to_public)
    }

    async fn validate_invitation(
        &self,
        target: &InvitationTarget,
        code: &str,
    ) -> Result<Invitation, PulseSurveysError> {
        self.service
            .validate_invitation(target, code)
            .await
            .map_err(to_public)
    }

    async fn accept_company_invitation(
        &self,
        code: &str,
        email: &str,
        user_id: Uuid,
    ) -> Result<Invitation, PulseSurveysError> {
        self.service
            .accept_company_invitation(code, email, user_id)
            .await
            .map_err(to_public)
    }

    async fn resend_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<Invitation, PulseSurveysError> {
        self.service
            .resend_invitation(actor, invitation_id)
            .await
            .map_err(to_public)
    }

    async fn delete_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<(), PulseSurveysError> {
        self.service
            .delete_invitation(actor, invitation_id)
            .await
            .map_err(to_public)
    }

    async fn list_invitations(
        &self,
        actor: &Actor,
        target: &InvitationTarget,
    ) -> Result<Vec<Invitation>, PulseSurveysError> {
        self.service
            .list_invitations(actor, target)
            .await
            .map_err(to_public)
    }

    async fn submit_response(
        &self,
        survey_id: Uuid,
        participant: &Participant,
        answers: BTreeMap<String, serde_json::Value>,
    ) -> Result<SurveyResponse, PulseSurveysError> {
        self.service
            .submit_response(survey_id, participant, answers)
            .await
            .map_err(to_public)
    }

    async fn response_rate(&self, survey_id: Uuid) -> Result<ResponseRate, PulseSurveysError> {
        self.service.response_rate(survey_id).await.map_err(to_public)
    }

    async fn anonymize_user_responses(&self, user_id: Uuid) -> Result<u64, PulseSurveysError> {
        self.service
            .anonymize_user_responses(user_id)
            .await
            .map_err(to_public)
    }
}
