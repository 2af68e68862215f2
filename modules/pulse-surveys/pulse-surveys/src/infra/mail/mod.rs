//! Invitation mail adapters.

use async_trait::async_trait;
use pulse_surveys_sdk::{Invitation, InvitationTarget};
use tracing::info;

use crate::domain::ports::{InvitationSubject, Mailer};

/// Mailer that writes the invitation to the log instead of sending it.
///
/// The code itself is never logged; only where it would have gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        subject: &InvitationSubject,
    ) -> anyhow::Result<()> {
        let about = match subject {
            InvitationSubject::Survey { title, .. } => format!("survey '{title}'"),
            InvitationSubject::Company { name: Some(name), .. } => format!("company '{name}'"),
            InvitationSubject::Company { id, name: None } => format!("company {id}"),
        };
        let kind = match invitation.target {
            InvitationTarget::Company { .. } => "company_join",
            InvitationTarget::Survey { .. } => "survey_response",
        };
        info!(
            invitation_id = %invitation.id,
            to = %invitation.email,
            kind,
            expires_at = %invitation.expires_at,
            "invitation mail for {about}"
        );
        Ok(())
    }
}
