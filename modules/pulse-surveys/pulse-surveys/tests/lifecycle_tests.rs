#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Survey status transitions through the public client and the state machine.

mod common;

use std::sync::Arc;

use pulse_surveys::domain::identifier::IdentifierResolver;
use pulse_surveys::domain::lifecycle::{SurveyLifecycle, is_allowed};
use pulse_surveys::domain::repos::Store;
use pulse_surveys::test_support::Harness;
use pulse_surveys::{PulseSurveysClient, PulseSurveysLocalClient};
use pulse_surveys_sdk::{ActorRole, CompanyRef, PulseSurveysError, SurveyStatus};

use common::{company_admin, draft_survey};

const ALL_STATUSES: [SurveyStatus; 7] = [
    SurveyStatus::Draft,
    SurveyStatus::Scheduled,
    SurveyStatus::Active,
    SurveyStatus::Completed,
    SurveyStatus::Archived,
    SurveyStatus::Pending,
    SurveyStatus::InProgress,
];

#[tokio::test]
async fn operator_schedules_and_unassigned_admin_cannot_activate() {
    let h = Harness::new();
    let client = PulseSurveysLocalClient::new(h.service.clone());
    let survey = draft_survey(&h, &["Acme".to_owned()], false).await;

    let scheduled = client
        .request_transition(&h.operator, survey.id, SurveyStatus::Scheduled)
        .await
        .unwrap();
    assert_eq!(scheduled.status, SurveyStatus::Scheduled);
    assert_eq!(scheduled.last_status_change_by, Some(h.operator.user_id));

    let outsider = company_admin(CompanyRef::Name("Globex".into()));
    let err = client
        .request_transition(&outsider, survey.id, SurveyStatus::Active)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PulseSurveysError::ForbiddenTransition {
            from: SurveyStatus::Scheduled,
            to: SurveyStatus::Active
        }
    );
    assert_eq!(
        client.get_survey(survey.id).await.unwrap().status,
        SurveyStatus::Scheduled
    );
}

#[tokio::test]
async fn admin_of_company_assigned_by_id_runs_the_survey() {
    let h = Harness::new();
    let client = PulseSurveysLocalClient::new(h.service.clone());
    let company_x = h.store.add_company("Company X");
    let survey = draft_survey(&h, &[company_x.to_string()], false).await;
    client
        .request_transition(&h.operator, survey.id, SurveyStatus::Scheduled)
        .await
        .unwrap();

    // Either spelling of the admin's company must work.
    let by_id = company_admin(CompanyRef::Id(company_x));
    let by_name = company_admin(CompanyRef::Name("company x".into()));

    let active = client
        .request_transition(&by_id, survey.id, SurveyStatus::Active)
        .await
        .unwrap();
    assert_eq!(active.status, SurveyStatus::Active);

    let completed = client
        .request_transition(&by_name, survey.id, SurveyStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, SurveyStatus::Completed);
    assert_eq!(completed.last_status_change_by, Some(by_name.user_id));
}

#[tokio::test]
async fn operator_can_roll_an_active_survey_back_to_draft() {
    let h = Harness::new();
    let company = CompanyRef::Name("Acme".into());
    let survey = common::active_survey(&h, &company, false).await;

    let rolled_back = h
        .service
        .request_transition(&h.operator, survey.id, SurveyStatus::Draft)
        .await
        .unwrap();
    assert_eq!(rolled_back.status, SurveyStatus::Draft);
}

#[test]
fn transition_table_has_exactly_five_edges() {
    let roles = [
        ActorRole::OperatorAdmin,
        ActorRole::CompanyAdmin,
        ActorRole::Member,
    ];
    let mut allowed = Vec::new();
    for role in roles {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                if is_allowed(role, from, to) {
                    allowed.push((role, from, to));
                }
            }
        }
    }

    assert_eq!(
        allowed,
        vec![
            (
                ActorRole::OperatorAdmin,
                SurveyStatus::Draft,
                SurveyStatus::Scheduled
            ),
            (
                ActorRole::OperatorAdmin,
                SurveyStatus::Scheduled,
                SurveyStatus::Draft
            ),
            (
                ActorRole::OperatorAdmin,
                SurveyStatus::Active,
                SurveyStatus::Draft
            ),
            (
                ActorRole::CompanyAdmin,
                SurveyStatus::Scheduled,
                SurveyStatus::Active
            ),
            (
                ActorRole::CompanyAdmin,
                SurveyStatus::Active,
                SurveyStatus::Completed
            ),
        ]
    );
}

#[tokio::test]
async fn disallowed_requests_never_touch_the_survey() {
    let h = Harness::new();
    let company = CompanyRef::Name("Acme".into());
    let survey = common::active_survey(&h, &company, false).await;
    let admin = company_admin(company);

    for target in ALL_STATUSES {
        if target == SurveyStatus::Completed {
            continue;
        }
        let before = h.service.get_survey(survey.id).await.unwrap();
        let result = h.service.request_transition(&admin, survey.id, target).await;
        assert!(result.is_err(), "{target} should be refused");
        assert_eq!(h.service.get_survey(survey.id).await.unwrap(), before);
    }
}

#[tokio::test]
async fn stale_snapshot_fails_without_overwriting() {
    let h = Harness::new();
    let store: Arc<dyn Store> = h.store.clone();
    let lifecycle = SurveyLifecycle::new(
        Arc::clone(&store),
        IdentifierResolver::new(Arc::clone(&store)),
        h.clock.clone(),
        true,
    );
    let survey = draft_survey(&h, &["Acme".to_owned()], false).await;

    let first = lifecycle
        .request_transition(&survey, &h.operator, SurveyStatus::Scheduled)
        .await
        .unwrap();

    // Same draft snapshot, second request: the stored status moved on.
    let other_operator = pulse_surveys_sdk::Actor::operator_admin(uuid::Uuid::now_v7());
    let err = lifecycle
        .request_transition(&survey, &other_operator, SurveyStatus::Scheduled)
        .await
        .unwrap_err();
    let public: PulseSurveysError = err.into();
    assert_eq!(
        public,
        PulseSurveysError::StaleState {
            expected: SurveyStatus::Draft
        }
    );

    let stored = h.service.get_survey(survey.id).await.unwrap();
    assert_eq!(stored.last_status_change_by, first.last_status_change_by);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_record_one_audit_trail() {
    let h = Harness::new();
    let store: Arc<dyn Store> = h.store.clone();
    let lifecycle = SurveyLifecycle::new(
        Arc::clone(&store),
        IdentifierResolver::new(Arc::clone(&store)),
        h.clock.clone(),
        true,
    );
    let survey = draft_survey(&h, &["Acme".to_owned()], false).await;

    let attempts = (0..8).map(|_| {
        let lifecycle = lifecycle.clone();
        let survey = survey.clone();
        tokio::spawn(async move {
            let actor = pulse_surveys_sdk::Actor::operator_admin(uuid::Uuid::now_v7());
            lifecycle
                .request_transition(&survey, &actor, SurveyStatus::Scheduled)
                .await
                .map(|s| s.last_status_change_by)
        })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let stored = h.service.get_survey(survey.id).await.unwrap();
    assert_eq!(&stored.last_status_change_by, winners[0]);
}
