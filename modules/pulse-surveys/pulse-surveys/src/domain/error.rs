use pulse_surveys_sdk::{PulseSurveysError, SurveyStatus};
use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Transition {from} -> {to} is not allowed for this actor")]
    ForbiddenTransition {
        from: SurveyStatus,
        to: SurveyStatus,
    },

    #[error("Survey {id} is no longer in status {expected}")]
    StaleState {
        id: uuid::Uuid,
        expected: SurveyStatus,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invitation {id} already used")]
    AlreadyUsed { id: uuid::Uuid },

    #[error("Invitation {id} expired")]
    Expired { id: uuid::Uuid },

    #[error("Active invitation already exists for '{email}'")]
    DuplicateActiveInvitation { email: String },

    #[error("Survey {id} is not open (status: {status})")]
    SurveyNotOpen {
        id: uuid::Uuid,
        status: SurveyStatus,
    },

    #[error("Response already submitted for survey {survey_id}")]
    AlreadyResponded { survey_id: uuid::Uuid },

    #[error("Participant is not eligible for survey {survey_id}")]
    NotEligible { survey_id: uuid::Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Survey {id} has responses")]
    SurveyInUse { id: uuid::Uuid },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(e: anyhow::Error) -> Self {
        Self::database(format!("{e:#}"))
    }
}

/// Convert domain errors to SDK errors for public API consumption.
impl From<DomainError> for PulseSurveysError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::ForbiddenTransition { from, to } => Self::ForbiddenTransition { from, to },
            DomainError::StaleState { expected, .. } => Self::StaleState { expected },
            DomainError::NotFound { entity, id } => Self::not_found(entity, id),
            DomainError::AlreadyUsed { .. } => Self::AlreadyUsed,
            DomainError::Expired { .. } => Self::Expired,
            DomainError::DuplicateActiveInvitation { email } => {
                Self::DuplicateActiveInvitation { email }
            }
            DomainError::SurveyNotOpen { status, .. } => Self::SurveyNotOpen { status },
            DomainError::AlreadyResponded { .. } => Self::AlreadyResponded,
            DomainError::NotEligible { .. } => Self::NotEligible,
            DomainError::Forbidden(message) => Self::forbidden(message),
            DomainError::SurveyInUse { .. } => Self::SurveyInUse,
            DomainError::Validation { field, message } => {
                Self::validation(format!("{field}: {message}"))
            }
            DomainError::Database { .. } => Self::internal(),
        }
    }
}
