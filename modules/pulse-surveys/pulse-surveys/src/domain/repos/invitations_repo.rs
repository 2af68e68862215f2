use async_trait::async_trait;
use pulse_surveys_sdk::{Invitation, InvitationTarget, Redeemer};
use time::OffsetDateTime;
use uuid::Uuid;

/// Result of an issuance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Inserted,
    /// A non-redeemed, non-expired invitation exists for the same target and email.
    DuplicateActive,
    /// The generated code collided with an existing one.
    CodeTaken,
}

/// Result of refreshing an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// Missing or already redeemed.
    NotPending,
    /// The invitation had expired and another one is now active for the
    /// same target and email.
    DuplicateActive,
}

/// Repository trait for the invitation ledger.
#[async_trait]
pub trait InvitationsRepository: Send + Sync {
    /// Insert `invitation` unless an active one exists for the same
    /// (target, email) pair as of `now`.
    async fn insert_invitation_if_no_active(
        &self,
        invitation: &Invitation,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssueOutcome>;

    async fn find_invitation(&self, id: Uuid) -> anyhow::Result<Option<Invitation>>;

    async fn find_invitation_by_code(&self, code: &str) -> anyhow::Result<Option<Invitation>>;

    /// Set `redeemed_at`/`redeemed_by` only if `redeemed_at` is still null.
    ///
    /// Returns `None` when the invitation is missing or already redeemed.
    async fn conditional_redeem(
        &self,
        id: Uuid,
        redeemer: Redeemer,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Invitation>>;

    /// Update `issued_at`/`expires_at` only if `redeemed_at` is still null
    /// and no other invitation is active for the same target and email as
    /// of `issued_at`.
    async fn conditional_refresh(
        &self,
        id: Uuid,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<RefreshOutcome>;

    /// Remove the invitation only if `redeemed_at` is still null.
    async fn delete_unredeemed(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn list_invitations(&self, target: &InvitationTarget) -> anyhow::Result<Vec<Invitation>>;
}
