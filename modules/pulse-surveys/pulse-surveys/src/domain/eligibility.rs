use std::sync::Arc;

use pulse_surveys_sdk::{
    CompanyRef, Invitation, InvitationTarget, Participant, Survey, SurveyStatus,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::identifier::IdentifierResolver;
use crate::domain::ledger::InvitationLedger;
use crate::domain::repos::{RespondentKey, RespondentKeyring, Store};

/// Where an eligible participant's right to respond comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Member { user_id: Uuid, company: CompanyRef },
    Invitation(Invitation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleParticipant {
    pub key: RespondentKey,
    pub admission: Admission,
}

impl EligibleParticipant {
    /// Company the response is attributed to.
    #[must_use]
    pub fn company(&self) -> Option<&CompanyRef> {
        match &self.admission {
            Admission::Member { company, .. } => Some(company),
            Admission::Invitation(invitation) => match &invitation.target {
                InvitationTarget::Survey { company, .. } => Some(company),
                InvitationTarget::Company { .. } => None,
            },
        }
    }
}

/// Decides whether a participant may respond to a survey.
#[derive(Clone)]
pub struct EligibilityGate {
    store: Arc<dyn Store>,
    resolver: IdentifierResolver,
    ledger: InvitationLedger,
    keys: RespondentKeyring,
}

impl EligibilityGate {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        resolver: IdentifierResolver,
        ledger: InvitationLedger,
        keys: RespondentKeyring,
    ) -> Self {
        Self {
            store,
            resolver,
            ledger,
            keys,
        }
    }

    /// # Errors
    /// `SurveyNotOpen`, `NotEligible`, `AlreadyResponded`, the ledger's
    /// validation outcomes for invitees, or `Database`.
    pub async fn can_respond(
        &self,
        survey: &Survey,
        participant: &Participant,
    ) -> Result<EligibleParticipant, DomainError> {
        if survey.status != SurveyStatus::Active {
            return Err(DomainError::SurveyNotOpen {
                id: survey.id,
                status: survey.status,
            });
        }
        let not_eligible = || DomainError::NotEligible {
            survey_id: survey.id,
        };

        let eligible = match participant {
            Participant::Member(member) => {
                if !member.active {
                    return Err(not_eligible());
                }
                if !self
                    .resolver
                    .resolve_assignment(survey, &member.company)
                    .await?
                {
                    debug!(company = %member.company, "member company not assigned");
                    return Err(not_eligible());
                }
                EligibleParticipant {
                    key: self.keys.for_user(survey.id, member.user_id)?,
                    admission: Admission::Member {
                        user_id: member.user_id,
                        company: member.company.clone(),
                    },
                }
            }
            Participant::Invitee { code } => {
                let invitation = self.ledger.validate_code(code).await?;
                let for_this_survey = matches!(
                    &invitation.target,
                    InvitationTarget::Survey { survey_id, .. } if *survey_id == survey.id
                );
                if !for_this_survey {
                    return Err(not_eligible());
                }
                EligibleParticipant {
                    key: self.keys.for_invitation(survey.id, invitation.id)?,
                    admission: Admission::Invitation(invitation),
                }
            }
        };

        // Early rejection only; the unique insert is what enforces it.
        if self.store.response_exists(survey.id, &eligible.key).await? {
            return Err(DomainError::AlreadyResponded {
                survey_id: survey.id,
            });
        }

        Ok(eligible)
    }
}
