use pulse_surveys_sdk::{Actor, Invitation, InvitationTarget, NewInvitation, SurveyStatus};
use tracing::instrument;
use uuid::Uuid;

use super::Service;
use crate::domain::error::DomainError;
use crate::domain::ports::InvitationSubject;

impl Service {
    /// Mail subject for an invitation target; also checks the target exists
    /// and, for surveys, that the targeted company is assigned.
    async fn subject_for(&self, target: &InvitationTarget) -> Result<InvitationSubject, DomainError> {
        match target {
            InvitationTarget::Company { company_id } => {
                let name = self.store.company_name(*company_id).await?;
                if name.is_none() {
                    return Err(DomainError::not_found("company", company_id));
                }
                Ok(InvitationSubject::Company {
                    id: *company_id,
                    name,
                })
            }
            InvitationTarget::Survey { survey_id, company } => {
                let survey = self.get_survey(*survey_id).await?;
                if matches!(
                    survey.status,
                    SurveyStatus::Completed | SurveyStatus::Archived
                ) {
                    return Err(DomainError::SurveyNotOpen {
                        id: survey.id,
                        status: survey.status,
                    });
                }
                if !self.resolver.resolve_assignment(&survey, company).await? {
                    return Err(DomainError::validation(
                        "target.company",
                        "company is not assigned to this survey",
                    ));
                }
                Ok(InvitationSubject::Survey {
                    id: survey.id,
                    title: survey.title,
                })
            }
        }
    }

    async fn load_invitation(&self, id: Uuid) -> Result<Invitation, DomainError> {
        self.store
            .find_invitation(id)
            .await?
            .ok_or_else(|| DomainError::not_found("invitation", id))
    }

    /// Issue an invitation and queue its mail.
    ///
    /// # Errors
    /// `Forbidden`, `NotFound`, `SurveyNotOpen`, `Validation`,
    /// `DuplicateActiveInvitation` or `Database`.
    #[instrument(skip(self, actor, new_invitation), fields(actor = %actor.user_id))]
    pub async fn issue_invitation(
        &self,
        actor: &Actor,
        new_invitation: NewInvitation,
    ) -> Result<Invitation, DomainError> {
        self.authorize_for_target(actor, &new_invitation.target)
            .await?;
        let subject = self.subject_for(&new_invitation.target).await?;

        let invitation = self.ledger.issue(actor.user_id, new_invitation).await?;
        self.dispatch_invitation_mail(invitation.clone(), subject);
        Ok(invitation)
    }

    /// # Errors
    /// `NotFound`, `AlreadyUsed`, `Expired` or `Database`.
    pub async fn validate_invitation(
        &self,
        target: &InvitationTarget,
        code: &str,
    ) -> Result<Invitation, DomainError> {
        self.ledger.validate(target, code).await
    }

    /// # Errors
    /// `NotFound`, `AlreadyUsed`, `Expired` or `Database`.
    #[instrument(skip(self, code, email))]
    pub async fn accept_company_invitation(
        &self,
        code: &str,
        email: &str,
        user_id: Uuid,
    ) -> Result<Invitation, DomainError> {
        self.ledger.accept_company(code, email, user_id).await
    }

    /// Refresh an unredeemed invitation and send it again.
    ///
    /// # Errors
    /// `Forbidden`, `NotFound`, `AlreadyUsed` or `Database`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn resend_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<Invitation, DomainError> {
        let existing = self.load_invitation(invitation_id).await?;
        self.authorize_for_target(actor, &existing.target).await?;
        let subject = self.subject_for(&existing.target).await?;

        let refreshed = self.ledger.resend(invitation_id).await?;
        self.dispatch_invitation_mail(refreshed.clone(), subject);
        Ok(refreshed)
    }

    /// # Errors
    /// `Forbidden`, `NotFound`, `AlreadyUsed` or `Database`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn delete_invitation(
        &self,
        actor: &Actor,
        invitation_id: Uuid,
    ) -> Result<(), DomainError> {
        let existing = self.load_invitation(invitation_id).await?;
        self.authorize_for_target(actor, &existing.target).await?;
        self.ledger.delete(invitation_id).await
    }

    /// # Errors
    /// `Forbidden` or `Database`.
    pub async fn list_invitations(
        &self,
        actor: &Actor,
        target: &InvitationTarget,
    ) -> Result<Vec<Invitation>, DomainError> {
        self.authorize_for_target(actor, target).await?;
        self.ledger.list(target).await
    }
}
