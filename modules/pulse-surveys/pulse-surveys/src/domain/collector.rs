//! Response acceptance.
//!
//! Order of operations for code-based participants: redeem first, insert
//! second. A redeemed invitation without a response can be inspected by an
//! operator; a second response cannot be taken back.

use std::collections::BTreeMap;
use std::sync::Arc;

use pulse_surveys_sdk::{
    CompanyRef, Participant, Question, QuestionKind, Redeemer, Respondent, Survey,
    SurveyResponse,
};
use serde_json::Value;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::eligibility::{Admission, EligibilityGate, EligibleParticipant};
use crate::domain::error::DomainError;
use crate::domain::identifier::IdentifierResolver;
use crate::domain::ledger::InvitationLedger;
use crate::domain::ports::Clock;
use crate::domain::repos::{InsertOutcome, Store};

/// Check answers against the survey's questions.
///
/// `null` counts as unanswered.
///
/// # Errors
/// Returns `Validation` for unknown questions, ill-typed values and missing
/// required answers.
pub fn validate_answers(
    survey: &Survey,
    answers: &BTreeMap<String, Value>,
) -> Result<(), DomainError> {
    if answers.values().all(Value::is_null) {
        return Err(DomainError::validation("answers", "must not be empty"));
    }

    for (question_id, value) in answers {
        let Some(question) = survey.question(question_id) else {
            return Err(DomainError::validation(
                "answers",
                format!("unknown question '{question_id}'"),
            ));
        };
        if !value.is_null() && !accepts(question, value) {
            return Err(DomainError::validation(
                format!("answers.{question_id}"),
                "value does not match the question type",
            ));
        }
    }

    if let Some(missing) = survey
        .questions()
        .filter(|q| q.required)
        .find(|q| answers.get(&q.id).is_none_or(Value::is_null))
    {
        return Err(DomainError::validation(
            format!("answers.{}", missing.id),
            "answer is required",
        ));
    }

    Ok(())
}

fn accepts(question: &Question, value: &Value) -> bool {
    match &question.kind {
        QuestionKind::Text => value.is_string(),
        QuestionKind::YesNo => match value {
            Value::Bool(_) => true,
            Value::String(s) => s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("no"),
            _ => false,
        },
        QuestionKind::Choice { options } => value
            .as_str()
            .is_some_and(|choice| options.iter().any(|o| o == choice)),
        QuestionKind::Scale { min, max } => value
            .as_i64()
            .is_some_and(|n| (*min..=*max).contains(&n)),
    }
}

#[derive(Clone)]
pub struct ResponseCollector {
    store: Arc<dyn Store>,
    gate: EligibilityGate,
    ledger: InvitationLedger,
    resolver: IdentifierResolver,
    clock: Arc<dyn Clock>,
}

impl ResponseCollector {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gate: EligibilityGate,
        ledger: InvitationLedger,
        resolver: IdentifierResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gate,
            ledger,
            resolver,
            clock,
        }
    }

    /// Accept one response from `participant`.
    ///
    /// # Errors
    /// Eligibility outcomes, `Validation`, `AlreadyResponded`, `AlreadyUsed`
    /// for a code redeemed concurrently, or `Database`.
    #[instrument(skip(self, survey, participant, answers), fields(survey_id = %survey.id))]
    pub async fn submit(
        &self,
        survey: &Survey,
        participant: &Participant,
        answers: BTreeMap<String, Value>,
    ) -> Result<SurveyResponse, DomainError> {
        let eligible = self.gate.can_respond(survey, participant).await?;
        validate_answers(survey, &answers)?;

        let response = self.build_response(survey, &eligible, answers).await?;

        match &eligible.admission {
            Admission::Member { .. } => self.insert(&eligible, response).await,
            Admission::Invitation(invitation) => {
                let redeemer = if survey.is_anonymous {
                    Redeemer::Anonymous
                } else {
                    Redeemer::Response(response.id)
                };
                self.ledger.redeem(invitation.id, redeemer).await?;
                self.insert(&eligible, response).await.inspect_err(|e| {
                    error!(
                        invitation_id = %invitation.id,
                        error = %e,
                        "invitation redeemed but response was not stored"
                    );
                })
            }
        }
    }

    async fn insert(
        &self,
        eligible: &EligibleParticipant,
        response: SurveyResponse,
    ) -> Result<SurveyResponse, DomainError> {
        match self
            .store
            .insert_response_if_absent(&eligible.key, &response)
            .await?
        {
            InsertOutcome::Inserted => {
                info!(response_id = %response.id, "response stored");
                Ok(response)
            }
            InsertOutcome::Duplicate => Err(DomainError::AlreadyResponded {
                survey_id: response.survey_id,
            }),
        }
    }

    async fn build_response(
        &self,
        survey: &Survey,
        eligible: &EligibleParticipant,
        answers: BTreeMap<String, Value>,
    ) -> Result<SurveyResponse, DomainError> {
        let (company_id, company_name) = match eligible.company() {
            Some(company @ CompanyRef::Id(id)) => {
                (Some(*id), self.resolver.company_name(company).await?)
            }
            Some(CompanyRef::Name(name)) => (None, Some(name.clone())),
            None => (None, None),
        };

        let (user_id, respondent) = match (&eligible.admission, survey.is_anonymous) {
            (_, true) => (None, Respondent::Anonymous),
            (Admission::Member { user_id, .. }, false) => {
                (Some(*user_id), Respondent::User(*user_id))
            }
            (Admission::Invitation(invitation), false) => {
                (None, Respondent::Invitation(invitation.id))
            }
        };

        Ok(SurveyResponse {
            id: Uuid::now_v7(),
            survey_id: survey.id,
            user_id,
            company_id,
            company_name,
            answers,
            respondent,
            anonymized: false,
            completed_at: self.clock.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_surveys_sdk::{Block, SurveyStatus};
    use serde_json::json;

    fn survey() -> Survey {
        let now = time::OffsetDateTime::now_utc();
        Survey {
            id: Uuid::new_v4(),
            title: "Pulse".to_owned(),
            description: String::new(),
            blocks: vec![Block {
                id: "b1".to_owned(),
                title: "Mood".to_owned(),
                questions: vec![
                    Question {
                        id: "q1".to_owned(),
                        text: "Happy?".to_owned(),
                        kind: QuestionKind::YesNo,
                        required: true,
                    },
                    Question {
                        id: "q2".to_owned(),
                        text: "Score".to_owned(),
                        kind: QuestionKind::Scale { min: 1, max: 5 },
                        required: false,
                    },
                    Question {
                        id: "q3".to_owned(),
                        text: "Team".to_owned(),
                        kind: QuestionKind::Choice {
                            options: vec!["red".to_owned(), "blue".to_owned()],
                        },
                        required: false,
                    },
                ],
            }],
            status: SurveyStatus::Active,
            is_anonymous: false,
            starts_at: None,
            ends_at: None,
            assignment: pulse_surveys_sdk::CompanyAssignment::default(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            last_status_change_by: None,
            last_status_change_at: None,
        }
    }

    fn answers(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_well_typed_answers() {
        let s = survey();
        assert!(validate_answers(&s, &answers(json!({"q1": "yes"}))).is_ok());
        assert!(validate_answers(&s, &answers(json!({"q1": false, "q2": 5, "q3": "red"}))).is_ok());
    }

    #[test]
    fn rejects_unknown_question() {
        let err = validate_answers(&survey(), &answers(json!({"q1": "yes", "q9": 1}))).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref message, .. } if message.contains("q9")));
    }

    #[test]
    fn rejects_out_of_range_scale_and_unknown_choice() {
        let s = survey();
        assert!(validate_answers(&s, &answers(json!({"q1": "yes", "q2": 6}))).is_err());
        assert!(validate_answers(&s, &answers(json!({"q1": "yes", "q3": "green"}))).is_err());
    }

    #[test]
    fn rejects_missing_required_answer() {
        let err = validate_answers(&survey(), &answers(json!({"q2": 3, "q1": null}))).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "answers.q1"));
    }

    #[test]
    fn rejects_empty_submission() {
        assert!(validate_answers(&survey(), &BTreeMap::new()).is_err());
    }
}
