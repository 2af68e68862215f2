//! Collaborators the domain consumes but does not implement.

use async_trait::async_trait;
use pulse_surveys_sdk::{Actor, Invitation, InvitationKind};
use time::OffsetDateTime;
use uuid::Uuid;

/// Source of "now" for expiry and audit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Produces invitation codes.
///
/// Survey-response codes must carry at least 128 bits of entropy; company-join
/// codes may be short because they expire within days and require the email too.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, kind: InvitationKind) -> String;
}

/// What an invitation email talks about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationSubject {
    Survey { id: Uuid, title: String },
    Company { id: Uuid, name: Option<String> },
}

/// Outbound invitation mail. Delivery is best-effort.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        subject: &InvitationSubject,
    ) -> anyhow::Result<()>;
}

/// Resolves a session into the acting user's role and company.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn actor_for_session(&self, session: &str) -> anyhow::Result<Option<Actor>>;
}
