use async_trait::async_trait;
use pulse_surveys_sdk::{Survey, SurveyStatus};
use time::OffsetDateTime;
use uuid::Uuid;

/// Audit data written together with a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub to: SurveyStatus,
    pub changed_by: Uuid,
    pub changed_at: OffsetDateTime,
}

/// Repository trait for survey persistence.
#[async_trait]
pub trait SurveysRepository: Send + Sync {
    async fn find_survey(&self, id: Uuid) -> anyhow::Result<Option<Survey>>;

    async fn insert_survey(&self, survey: &Survey) -> anyhow::Result<()>;

    /// Overwrite title, description, blocks, anonymity, window and assignment,
    /// but only while the stored status is still `Draft`.
    ///
    /// Returns `None` when the survey is missing or no longer a draft.
    async fn update_draft_content(&self, survey: &Survey) -> anyhow::Result<Option<Survey>>;

    /// Set `status`, `updated_at` and the audit fields in one write that only
    /// applies if the stored status equals `expected`.
    ///
    /// Returns `None` when the precondition did not hold.
    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: SurveyStatus,
        change: StatusChange,
    ) -> anyhow::Result<Option<Survey>>;

    /// Delete the survey unless responses reference it.
    ///
    /// Returns `Ok(false)` when responses exist; the caller distinguishes a
    /// missing survey beforehand.
    async fn delete_survey_if_unused(&self, id: Uuid) -> anyhow::Result<bool>;
}
