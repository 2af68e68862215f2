#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for pulse surveys integration tests

use std::collections::BTreeMap;

use pulse_surveys::test_support::Harness;
use pulse_surveys_sdk::{
    Actor, ActorRole, Block, CompanyRef, InvitationTarget, NewInvitation, NewSurvey, Question,
    QuestionKind, Survey, SurveyStatus,
};
use serde_json::Value;
use uuid::Uuid;

pub fn pulse_blocks() -> Vec<Block> {
    vec![Block {
        id: "b1".to_owned(),
        title: "How are things".to_owned(),
        questions: vec![
            Question {
                id: "q1".to_owned(),
                text: "Would you recommend us?".to_owned(),
                kind: QuestionKind::YesNo,
                required: true,
            },
            Question {
                id: "q2".to_owned(),
                text: "Workload".to_owned(),
                kind: QuestionKind::Scale { min: 1, max: 5 },
                required: false,
            },
        ],
    }]
}

pub fn answers(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

pub fn company_admin(company: CompanyRef) -> Actor {
    Actor::company_admin(Uuid::now_v7(), company)
}

pub async fn draft_survey(h: &Harness, companies: &[String], is_anonymous: bool) -> Survey {
    h.service
        .create_survey(
            &h.operator,
            NewSurvey {
                title: "Quarterly pulse".to_owned(),
                description: "How is the quarter going?".to_owned(),
                blocks: pulse_blocks(),
                is_anonymous,
                companies: companies.to_vec(),
                ..NewSurvey::default()
            },
        )
        .await
        .unwrap()
}

/// A survey assigned to `company` and moved all the way to `active`.
pub async fn active_survey(h: &Harness, company: &CompanyRef, is_anonymous: bool) -> Survey {
    let survey = draft_survey(h, &[company.to_string()], is_anonymous).await;
    h.service
        .request_transition(&h.operator, survey.id, SurveyStatus::Scheduled)
        .await
        .unwrap();
    let survey = h
        .service
        .request_transition(&company_admin(company.clone()), survey.id, SurveyStatus::Active)
        .await
        .unwrap();
    assert_eq!(survey.status, SurveyStatus::Active);
    survey
}

pub fn survey_invite(survey_id: Uuid, company: CompanyRef, email: &str) -> NewInvitation {
    NewInvitation {
        target: InvitationTarget::Survey { survey_id, company },
        email: email.to_owned(),
        display_name: "Guest respondent".to_owned(),
        role: ActorRole::Member,
        expiry_days: Some(7),
    }
}
