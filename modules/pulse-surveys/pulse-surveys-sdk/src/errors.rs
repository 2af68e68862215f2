//! Public error types for the `pulse_surveys` module.
//!
//! These errors are safe to expose to other modules and consumers.

use thiserror::Error;

use crate::models::SurveyStatus;

/// Errors that can be returned by the `PulseSurveysClient`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PulseSurveysError {
    /// The actor may not move the survey between these statuses.
    #[error("Transition {from} -> {to} is not allowed")]
    ForbiddenTransition {
        from: SurveyStatus,
        to: SurveyStatus,
    },

    /// The survey changed status since it was read.
    #[error("Survey is no longer in status {expected}")]
    StaleState { expected: SurveyStatus },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invitation already used")]
    AlreadyUsed,

    #[error("Invitation expired")]
    Expired,

    #[error("An active invitation already exists for '{email}'")]
    DuplicateActiveInvitation { email: String },

    #[error("Survey is not open for responses (status: {status})")]
    SurveyNotOpen { status: SurveyStatus },

    #[error("Response already submitted")]
    AlreadyResponded,

    #[error("Participant is not eligible for this survey")]
    NotEligible,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Survey has responses and cannot be deleted")]
    SurveyInUse,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl PulseSurveysError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::Internal
    }

    /// Actionable sentence suitable for showing to the person who triggered the error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ForbiddenTransition { from, to } => {
                format!("You are not allowed to move this survey from {from} to {to}.")
            }
            Self::StaleState { .. } => {
                "This survey was changed by someone else. Reload it and try again.".to_owned()
            }
            Self::NotFound { entity, .. } => format!("The requested {entity} does not exist."),
            Self::AlreadyUsed => "This invitation was already used.".to_owned(),
            Self::Expired => "This invitation has expired. Ask for it to be resent.".to_owned(),
            Self::DuplicateActiveInvitation { email } => {
                format!("{email} already has a pending invitation. Resend it instead.")
            }
            Self::SurveyNotOpen { .. } => "This survey is not accepting responses.".to_owned(),
            Self::AlreadyResponded => "You have already responded to this survey.".to_owned(),
            Self::NotEligible => "This survey is not available to you.".to_owned(),
            Self::Forbidden { .. } => "You are not allowed to perform this action.".to_owned(),
            Self::SurveyInUse => {
                "This survey already has responses and cannot be deleted. Archive it instead."
                    .to_owned()
            }
            Self::Validation { message } => format!("Please check your input: {message}."),
            Self::Internal => "Something went wrong on our side. Please try again.".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_used_message_is_specific() {
        assert_eq!(
            PulseSurveysError::AlreadyUsed.user_message(),
            "This invitation was already used."
        );
    }

    #[test]
    fn forbidden_transition_names_both_statuses() {
        let err = PulseSurveysError::ForbiddenTransition {
            from: SurveyStatus::Scheduled,
            to: SurveyStatus::Active,
        };
        assert_eq!(err.to_string(), "Transition scheduled -> active is not allowed");
        assert!(err.user_message().contains("from scheduled to active"));
    }
}
