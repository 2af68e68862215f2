use std::collections::HashSet;

use pulse_surveys_sdk::{
    Actor, Block, NewSurvey, QuestionKind, Survey, SurveyPatch, SurveyStatus,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::Service;
use crate::domain::error::DomainError;
use crate::domain::identifier::partition_assignment;

impl Service {
    fn validate_title(&self, title: &str) -> Result<String, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        if title.chars().count() > self.config.max_title_length {
            return Err(DomainError::validation(
                "title",
                format!("must be at most {} characters", self.config.max_title_length),
            ));
        }
        Ok(title.to_owned())
    }

    fn validate_content(
        blocks: &[Block],
        starts_at: Option<OffsetDateTime>,
        ends_at: Option<OffsetDateTime>,
    ) -> Result<(), DomainError> {
        let mut block_ids = HashSet::new();
        let mut question_ids = HashSet::new();

        for block in blocks {
            if block.id.trim().is_empty() || !block_ids.insert(block.id.as_str()) {
                return Err(DomainError::validation(
                    "blocks",
                    format!("block id '{}' is empty or duplicated", block.id),
                ));
            }
            for question in &block.questions {
                if question.id.trim().is_empty() || !question_ids.insert(question.id.as_str()) {
                    return Err(DomainError::validation(
                        "questions",
                        format!("question id '{}' is empty or duplicated", question.id),
                    ));
                }
                if question.text.trim().is_empty() {
                    return Err(DomainError::validation(
                        format!("questions.{}", question.id),
                        "text must not be empty",
                    ));
                }
                match &question.kind {
                    QuestionKind::Choice { options } if options.is_empty() => {
                        return Err(DomainError::validation(
                            format!("questions.{}", question.id),
                            "choice question needs options",
                        ));
                    }
                    QuestionKind::Scale { min, max } if min >= max => {
                        return Err(DomainError::validation(
                            format!("questions.{}", question.id),
                            "scale minimum must be below maximum",
                        ));
                    }
                    _ => {}
                }
            }
        }

        if let (Some(start), Some(end)) = (starts_at, ends_at) {
            if start >= end {
                return Err(DomainError::validation("ends_at", "must be after starts_at"));
            }
        }

        Ok(())
    }

    /// # Errors
    /// `NotFound` or `Database`.
    #[instrument(skip(self), fields(survey_id = %id))]
    pub async fn get_survey(&self, id: Uuid) -> Result<Survey, DomainError> {
        debug!("Getting survey by id");
        self.store
            .find_survey(id)
            .await?
            .ok_or_else(|| DomainError::not_found("survey", id))
    }

    /// Create a draft survey. Raw company references are partitioned once here.
    ///
    /// # Errors
    /// `Forbidden`, `Validation` or `Database`.
    #[instrument(skip(self, actor, new_survey), fields(actor = %actor.user_id))]
    pub async fn create_survey(
        &self,
        actor: &Actor,
        new_survey: NewSurvey,
    ) -> Result<Survey, DomainError> {
        Self::require_operator(actor)?;

        let title = self.validate_title(&new_survey.title)?;
        Self::validate_content(&new_survey.blocks, new_survey.starts_at, new_survey.ends_at)?;

        let now = self.clock.now();
        let survey = Survey {
            id: Uuid::now_v7(),
            title,
            description: new_survey.description.trim().to_owned(),
            blocks: new_survey.blocks,
            status: SurveyStatus::Draft,
            is_anonymous: new_survey.is_anonymous,
            starts_at: new_survey.starts_at,
            ends_at: new_survey.ends_at,
            assignment: partition_assignment(&new_survey.companies),
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
            last_status_change_by: None,
            last_status_change_at: None,
        };

        self.store.insert_survey(&survey).await?;
        info!(survey_id = %survey.id, "survey created");
        Ok(survey)
    }

    /// Apply a content patch to a draft survey. Last write wins.
    ///
    /// # Errors
    /// `Forbidden`, `NotFound`, `Validation`, `StaleState` or `Database`.
    #[instrument(skip(self, actor, patch), fields(survey_id = %id))]
    pub async fn update_survey_content(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: SurveyPatch,
    ) -> Result<Survey, DomainError> {
        Self::require_operator(actor)?;

        let mut survey = self.get_survey(id).await?;
        if survey.status != SurveyStatus::Draft {
            return Err(DomainError::validation(
                "status",
                format!("only draft surveys can be edited (status: {})", survey.status),
            ));
        }

        if let Some(title) = patch.title {
            survey.title = self.validate_title(&title)?;
        }
        if let Some(description) = patch.description {
            survey.description = description.trim().to_owned();
        }
        if let Some(blocks) = patch.blocks {
            survey.blocks = blocks;
        }
        if let Some(is_anonymous) = patch.is_anonymous {
            survey.is_anonymous = is_anonymous;
        }
        if let Some(starts_at) = patch.starts_at {
            survey.starts_at = starts_at;
        }
        if let Some(ends_at) = patch.ends_at {
            survey.ends_at = ends_at;
        }
        if let Some(companies) = patch.companies {
            survey.assignment = partition_assignment(&companies);
        }
        Self::validate_content(&survey.blocks, survey.starts_at, survey.ends_at)?;
        survey.updated_at = self.clock.now();

        let updated = self
            .store
            .update_draft_content(&survey)
            .await?
            .ok_or(DomainError::StaleState {
                id,
                expected: SurveyStatus::Draft,
            })?;
        info!("survey content updated");
        Ok(updated)
    }

    /// # Errors
    /// `Forbidden`, `NotFound`, `SurveyInUse` or `Database`.
    #[instrument(skip(self, actor), fields(survey_id = %id))]
    pub async fn delete_survey(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        Self::require_operator(actor)?;
        self.get_survey(id).await?;

        if !self.store.delete_survey_if_unused(id).await? {
            return Err(DomainError::SurveyInUse { id });
        }
        info!("survey deleted");
        Ok(())
    }

    /// Load the survey and run it through the lifecycle state machine.
    ///
    /// # Errors
    /// `NotFound` plus the outcomes of `SurveyLifecycle::request_transition`.
    pub async fn request_transition(
        &self,
        actor: &Actor,
        survey_id: Uuid,
        target: SurveyStatus,
    ) -> Result<Survey, DomainError> {
        let survey = self.get_survey(survey_id).await?;
        self.lifecycle.request_transition(&survey, actor, target).await
    }
}
