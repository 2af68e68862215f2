//! Invitation ledger: issue, validate, redeem, resend and delete single-use codes.

use std::sync::Arc;

use pulse_surveys_sdk::{
    Invitation, InvitationKind, InvitationTarget, NewInvitation, Redeemer,
};
use time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::PulseSurveysConfig;
use crate::domain::error::DomainError;
use crate::domain::ports::{Clock, CodeGenerator};
use crate::domain::repos::{IssueOutcome, RefreshOutcome, Store};

const MAX_DISPLAY_NAME_LEN: usize = 200;

/// Lowercase and trim an email, rejecting obviously malformed input.
///
/// # Errors
/// Returns `Validation` for an empty or malformed address.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation("email", "must be a valid email address"))
    }
}

#[derive(Clone)]
pub struct InvitationLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
    config: Arc<PulseSurveysConfig>,
}

impl InvitationLedger {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeGenerator>,
        config: Arc<PulseSurveysConfig>,
    ) -> Self {
        Self {
            store,
            clock,
            codes,
            config,
        }
    }

    fn validate_new(&self, new: &NewInvitation) -> Result<(String, String, u32), DomainError> {
        let email = normalize_email(&new.email)?;

        let display_name = new.display_name.trim().to_owned();
        if display_name.is_empty() {
            return Err(DomainError::validation("display_name", "must not be empty"));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(DomainError::validation(
                "display_name",
                format!("must be at most {MAX_DISPLAY_NAME_LEN} characters"),
            ));
        }

        let expiry_days = new
            .expiry_days
            .unwrap_or(self.config.default_invitation_expiry_days);
        if expiry_days == 0 || expiry_days > self.config.max_invitation_expiry_days {
            return Err(DomainError::validation(
                "expiry_days",
                format!(
                    "must be between 1 and {}",
                    self.config.max_invitation_expiry_days
                ),
            ));
        }

        Ok((email, display_name, expiry_days))
    }

    /// Create and store a fresh invitation.
    ///
    /// # Errors
    /// `Validation`, `DuplicateActiveInvitation` or `Database`.
    #[instrument(skip(self, new), fields(kind = ?new.target.kind()))]
    pub async fn issue(&self, issued_by: Uuid, new: NewInvitation) -> Result<Invitation, DomainError> {
        let (email, display_name, expiry_days) = self.validate_new(&new)?;
        let kind = new.target.kind();

        for attempt in 1..=self.config.code_generation_attempts {
            let now = self.clock.now();
            let invitation = Invitation {
                id: Uuid::now_v7(),
                target: new.target.clone(),
                email: email.clone(),
                display_name: display_name.clone(),
                role: new.role,
                code: self.codes.generate(kind),
                expiry_days,
                issued_by,
                issued_at: now,
                expires_at: now + Duration::days(i64::from(expiry_days)),
                redeemed_at: None,
                redeemed_by: None,
            };

            match self
                .store
                .insert_invitation_if_no_active(&invitation, now)
                .await?
            {
                IssueOutcome::Inserted => {
                    info!(invitation_id = %invitation.id, "invitation issued");
                    return Ok(invitation);
                }
                IssueOutcome::DuplicateActive => {
                    return Err(DomainError::DuplicateActiveInvitation { email });
                }
                IssueOutcome::CodeTaken => {
                    debug!(attempt, "generated invitation code collided");
                }
            }
        }

        Err(DomainError::database(
            "could not generate a unique invitation code",
        ))
    }

    /// Look a code up and check it is still usable.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyUsed`, `Expired` or `Database`.
    pub async fn validate_code(&self, code: &str) -> Result<Invitation, DomainError> {
        let code = code.trim();
        let invitation = self
            .store
            .find_invitation_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("invitation", "code"))?;

        if invitation.is_redeemed() {
            return Err(DomainError::AlreadyUsed { id: invitation.id });
        }
        if invitation.is_expired_at(self.clock.now()) {
            return Err(DomainError::Expired { id: invitation.id });
        }
        Ok(invitation)
    }

    /// Like [`Self::validate_code`] but the code must belong to `target`.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyUsed`, `Expired` or `Database`.
    pub async fn validate(
        &self,
        target: &InvitationTarget,
        code: &str,
    ) -> Result<Invitation, DomainError> {
        let invitation = self.validate_code(code).await?;
        if &invitation.target != target {
            return Err(DomainError::not_found("invitation", "code"));
        }
        Ok(invitation)
    }

    /// Mark the invitation used. Exactly one of any number of concurrent calls succeeds.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyUsed` or `Database`.
    #[instrument(skip(self))]
    pub async fn redeem(&self, id: Uuid, redeemer: Redeemer) -> Result<Invitation, DomainError> {
        let now = self.clock.now();
        if let Some(redeemed) = self.store.conditional_redeem(id, redeemer, now).await? {
            info!("invitation redeemed");
            return Ok(redeemed);
        }
        Err(self.missing_or_used(id).await?)
    }

    /// Redeem a company-join code presented together with the invitee's email.
    ///
    /// # Errors
    /// `NotFound` when the code, kind or email do not match, plus the
    /// outcomes of [`Self::validate_code`] and [`Self::redeem`].
    pub async fn accept_company(
        &self,
        code: &str,
        email: &str,
        user_id: Uuid,
    ) -> Result<Invitation, DomainError> {
        let invitation = self.validate_code(code).await?;
        let email_matches = normalize_email(email).is_ok_and(|e| e == invitation.email);
        if invitation.target.kind() != InvitationKind::CompanyJoin || !email_matches {
            return Err(DomainError::not_found("invitation", "code"));
        }
        self.redeem(invitation.id, Redeemer::User(user_id)).await
    }

    /// Refresh `issued_at`, extending `expires_at` by a fresh window if it
    /// already lapsed. The code never changes.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyUsed`, `DuplicateActiveInvitation` when a newer
    /// invitation replaced an expired one, or `Database`.
    #[instrument(skip(self))]
    pub async fn resend(&self, id: Uuid) -> Result<Invitation, DomainError> {
        let invitation = self
            .store
            .find_invitation(id)
            .await?
            .ok_or_else(|| DomainError::not_found("invitation", id))?;
        if invitation.is_redeemed() {
            return Err(DomainError::AlreadyUsed { id });
        }

        let now = self.clock.now();
        let expires_at = if invitation.is_expired_at(now) {
            now + invitation.validity_window()
        } else {
            invitation.expires_at
        };

        match self.store.conditional_refresh(id, now, expires_at).await? {
            RefreshOutcome::Refreshed => {
                let refreshed = self
                    .store
                    .find_invitation(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("invitation", id))?;
                info!(expires_at = %refreshed.expires_at, "invitation refreshed");
                Ok(refreshed)
            }
            RefreshOutcome::DuplicateActive => Err(DomainError::DuplicateActiveInvitation {
                email: invitation.email,
            }),
            RefreshOutcome::NotPending => Err(self.missing_or_used(id).await?),
        }
    }

    /// Remove an unredeemed invitation.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyUsed` or `Database`.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.store.delete_unredeemed(id).await? {
            info!("invitation deleted");
            return Ok(());
        }
        Err(self.missing_or_used(id).await?)
    }

    /// # Errors
    /// Returns `Database` when the store fails.
    pub async fn list(&self, target: &InvitationTarget) -> Result<Vec<Invitation>, DomainError> {
        Ok(self.store.list_invitations(target).await?)
    }

    /// Explain why a conditional write on `id` matched nothing.
    async fn missing_or_used(&self, id: Uuid) -> Result<DomainError, DomainError> {
        match self.store.find_invitation(id).await? {
            Some(_) => {
                warn!(invitation_id = %id, "invitation already redeemed");
                Ok(DomainError::AlreadyUsed { id })
            }
            None => Ok(DomainError::not_found("invitation", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.COM ").unwrap(),
            "jane.doe@example.com"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "   ", "jane", "@example.com", "jane@", "a@b@c", "ja ne@example.com"] {
            assert!(
                matches!(normalize_email(raw), Err(DomainError::Validation { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
