//! Pulse Surveys SDK
//!
//! This crate provides the public API for the `pulse_surveys` module:
//! - `PulseSurveysClient` trait
//! - Model types for surveys, company assignments, invitations and responses
//! - Error type (`PulseSurveysError`)
//!
//! ## Usage
//!
//! ```ignore
//! use pulse_surveys_sdk::{PulseSurveysClient, SurveyStatus};
//!
//! let survey = client
//!     .request_transition(&actor, survey_id, SurveyStatus::Scheduled)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod client;
pub mod errors;
pub mod models;

pub use client::PulseSurveysClient;
pub use errors::PulseSurveysError;
pub use models::{
    Actor, ActorRole, Block, CompanyAssignment, CompanyRef, Invitation, InvitationKind,
    InvitationState, InvitationTarget, Member, NewInvitation, NewSurvey, Participant, Question,
    QuestionKind, Redeemer, Respondent, ResponseRate, Survey, SurveyPatch, SurveyResponse,
    SurveyStatus,
};
