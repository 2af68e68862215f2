//! `PulseSurveysClient` trait definition.
//!
//! Session-based operations take the calling `Actor`; code-based operations
//! take the `Participant` or the invitation code itself.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::PulseSurveysError;
use crate::models::{
    Actor, Invitation, InvitationTarget, NewInvitation, NewSurvey, Participant, ResponseRate,
    Survey, SurveyPatch, SurveyResponse, SurveyStatus,
};

/// Public API of the pulse surveys module.
#[async_trait]
pub trait PulseSurveysClient: Send + Sync {
    // Surveys

    async fn get_survey(&self, id: Uuid) -> Result<Survey, PulseSurveysError>;

    async fn create_survey(
        &self,
        actor: &Actor,
        new_survey: NewSurvey,
    ) -> Result<Survey, PulseSurveysError>;

    /// Replace content of a draft survey.
    async fn update_survey_content(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: SurveyPatch,
    ) -> Result<Survey, PulseSurveysError>;

    async fn delete_survey(&self, actor: &Actor, id: Uuid) -> Result<(), PulseSurveysError>;

    /// Move a survey to `target` if the actor's role allows the transition.
    async fn request_transition(
        &self,
        actor: &Actor,
        survey_id: Uuid,
        target: SurveyStatus,
    ) -> Result<Survey, PulseSurveysError>;

    // Invitations

    async fn issue_invitation(
        &self,
        actor: &Actor,
        new_invitation: NewInvitation,
    ) -> Result<Invitation, PulseSurveysError>;

    async fn validate_invitation(
        &self,
        target: &InvitationTarget,
        code: &str,
    ) -> Result<Invitation, PulseSurveysError>;

    /// Redeem a company-join code for `user_id`; `email` must match the invitation.
    async fn accept_company_invitation(
        &self,
        code: &str,
        email: &str,
        user_id: Uuid,
    ) -> Result<Invitation, PulseSurveysError>;

    async fn resend_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<Invitation, PulseSurveysError>;

    async fn delete_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<(), PulseSurveysError>;

    async fn list_invitations(
        &self,
        actor: &Actor,
        target: &InvitationTarget,
    ) -> Result<Vec<Invitation>, PulseSurveysError>;

    // Responses

    async fn submit_response(
        &self,
        survey_id: Uuid,
        participant: &Participant,
        answers: BTreeMap<String, serde_json::Value>,
    ) -> Result<SurveyResponse, PulseSurveysError>;

    async fn response_rate(&self, survey_id: Uuid) -> Result<ResponseRate, PulseSurveysError>;

    /// Detach a deleted user from their responses. Returns the number of rows touched.
    async fn anonymize_user_responses(&self, user_id: Uuid) -> Result<u64, PulseSurveysError>;
}
