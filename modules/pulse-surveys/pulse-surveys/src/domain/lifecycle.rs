//! Survey status state machine.
//!
//! ```text
//!            operator            company admin         company admin
//!   draft ─────────────▶ scheduled ─────────▶ active ─────────▶ completed
//!     ▲   ◀─────────────             operator   │
//!     └─────────────────────────────────────────┘
//! ```
//!
//! `archived` has no outbound transition; `pending` and `in_progress` are
//! reserved and unreachable.

use std::sync::Arc;

use pulse_surveys_sdk::{Actor, ActorRole, Survey, SurveyStatus};
use tracing::{info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::identifier::IdentifierResolver;
use crate::domain::ports::Clock;
use crate::domain::repos::{StatusChange, Store};

/// The complete transition table.
#[must_use]
pub const fn is_allowed(role: ActorRole, from: SurveyStatus, to: SurveyStatus) -> bool {
    matches!(
        (role, from, to),
        (
            ActorRole::OperatorAdmin,
            SurveyStatus::Draft,
            SurveyStatus::Scheduled
        ) | (
            ActorRole::OperatorAdmin,
            SurveyStatus::Scheduled | SurveyStatus::Active,
            SurveyStatus::Draft
        ) | (
            ActorRole::CompanyAdmin,
            SurveyStatus::Scheduled,
            SurveyStatus::Active
        ) | (
            ActorRole::CompanyAdmin,
            SurveyStatus::Active,
            SurveyStatus::Completed
        )
    )
}

/// Content requirements for leaving `draft`.
///
/// # Errors
/// Returns `Validation` naming the first unmet requirement.
pub fn check_ready_to_schedule(survey: &Survey) -> Result<(), DomainError> {
    if survey.questions().next().is_none() {
        return Err(DomainError::validation(
            "blocks",
            "survey needs at least one question before it can be scheduled",
        ));
    }
    if let Some(block) = survey.blocks.iter().find(|b| b.questions.is_empty()) {
        return Err(DomainError::validation(
            "blocks",
            format!("block '{}' has no questions", block.id),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SurveyLifecycle {
    store: Arc<dyn Store>,
    resolver: IdentifierResolver,
    clock: Arc<dyn Clock>,
    require_questions_to_schedule: bool,
}

impl SurveyLifecycle {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        resolver: IdentifierResolver,
        clock: Arc<dyn Clock>,
        require_questions_to_schedule: bool,
    ) -> Self {
        Self {
            store,
            resolver,
            clock,
            require_questions_to_schedule,
        }
    }

    /// Move `survey` to `target` on behalf of `actor`.
    ///
    /// The write is conditional on the stored status still being
    /// `survey.status`; if another request got there first the call fails with
    /// `StaleState` and nothing is written.
    ///
    /// # Errors
    /// `ForbiddenTransition`, `StaleState`, `Validation` or `Database`.
    #[instrument(
        skip(self, survey, actor),
        fields(survey_id = %survey.id, from = %survey.status, to = %target, role = %actor.role)
    )]
    pub async fn request_transition(
        &self,
        survey: &Survey,
        actor: &Actor,
        target: SurveyStatus,
    ) -> Result<Survey, DomainError> {
        let forbidden = || DomainError::ForbiddenTransition {
            from: survey.status,
            to: target,
        };

        if !is_allowed(actor.role, survey.status, target) {
            return Err(forbidden());
        }

        if actor.role == ActorRole::CompanyAdmin {
            let Some(company) = actor.company.as_ref() else {
                return Err(forbidden());
            };
            if !self.resolver.resolve_assignment(survey, company).await? {
                warn!(company = %company, "company admin is not assigned to survey");
                return Err(forbidden());
            }
        }

        if survey.status == SurveyStatus::Draft
            && target == SurveyStatus::Scheduled
            && self.require_questions_to_schedule
        {
            check_ready_to_schedule(survey)?;
        }

        let change = StatusChange {
            to: target,
            changed_by: actor.user_id,
            changed_at: self.clock.now(),
        };

        let Some(updated) = self
            .store
            .conditional_update_status(survey.id, survey.status, change)
            .await?
        else {
            warn!("status changed concurrently, transition rejected");
            return Err(DomainError::StaleState {
                id: survey.id,
                expected: survey.status,
            });
        };

        info!("survey status changed");
        Ok(updated)
    }
}
