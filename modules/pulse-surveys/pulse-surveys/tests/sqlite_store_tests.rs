#![cfg(feature = "db-sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The `SeaORM` store against an in-memory `SQLite` database: the same
//! conditional semantics as the in-memory store, end to end through the service.

mod common;

use std::sync::Arc;

use pulse_surveys::domain::repos::{
    InsertOutcome, InvitationsRepository, IssueOutcome, RefreshOutcome, RespondentKeyring,
    ResponsesRepository, StatusChange, SurveysRepository,
};
use pulse_surveys::infra::identity::StaticIdentityProvider;
use pulse_surveys::infra::mail::LogMailer;
use pulse_surveys::infra::storage::SeaOrmStore;
use pulse_surveys::test_support::{ManualClock, ScriptedCodes};
use pulse_surveys::{PulseSurveysConfig, SecretString, Service, ServiceDeps};
use pulse_surveys_sdk::{
    Actor, CompanyRef, Invitation, Participant, Redeemer, Respondent, SurveyResponse,
    SurveyStatus,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::json;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use common::{answers, company_admin, pulse_blocks, survey_invite};

const START: OffsetDateTime = datetime!(2026-03-02 09:00 UTC);
const SECRET: &str = "sqlite-store-respondent-secret";

fn keyring() -> RespondentKeyring {
    RespondentKeyring::new(SecretString::new(SECRET))
}

struct Fixture {
    store: SeaOrmStore,
    service: Arc<Service>,
    clock: Arc<ManualClock>,
    codes: Arc<ScriptedCodes>,
    operator: Actor,
}

async fn fixture() -> Fixture {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let store = SeaOrmStore::new(Database::connect(opts).await.unwrap());
    store.migrate().await.unwrap();

    let clock = Arc::new(ManualClock::new(START));
    let codes = Arc::new(ScriptedCodes::new());
    let service = Service::new(
        ServiceDeps {
            store: Arc::new(store.clone()),
            mailer: Arc::new(LogMailer),
            identity: Arc::new(StaticIdentityProvider::new()),
            clock: clock.clone(),
            codes: codes.clone(),
        },
        PulseSurveysConfig {
            respondent_key_secret: SecretString::new(SECRET),
            ..PulseSurveysConfig::default()
        },
    );

    Fixture {
        store,
        service: Arc::new(service),
        clock,
        codes,
        operator: Actor::operator_admin(Uuid::now_v7()),
    }
}

async fn active_survey(f: &Fixture, company: &CompanyRef, is_anonymous: bool) -> Uuid {
    let survey = f
        .service
        .create_survey(
            &f.operator,
            pulse_surveys_sdk::NewSurvey {
                title: "Quarterly pulse".to_owned(),
                blocks: pulse_blocks(),
                is_anonymous,
                companies: vec![company.to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    f.service
        .request_transition(&f.operator, survey.id, SurveyStatus::Scheduled)
        .await
        .unwrap();
    f.service
        .request_transition(&company_admin(company.clone()), survey.id, SurveyStatus::Active)
        .await
        .unwrap();
    survey.id
}

fn invitation_for(survey_id: Uuid, email: &str, code: &str, issued_at: OffsetDateTime) -> Invitation {
    Invitation {
        id: Uuid::now_v7(),
        target: pulse_surveys_sdk::InvitationTarget::Survey {
            survey_id,
            company: CompanyRef::Name("Acme".into()),
        },
        email: email.to_owned(),
        display_name: "Guest".to_owned(),
        role: pulse_surveys_sdk::ActorRole::Member,
        code: code.to_owned(),
        expiry_days: 7,
        issued_by: Uuid::now_v7(),
        issued_at,
        expires_at: issued_at + Duration::days(7),
        redeemed_at: None,
        redeemed_by: None,
    }
}

fn response(survey_id: Uuid, company_id: Option<Uuid>, company_name: &str) -> SurveyResponse {
    let user_id = Uuid::now_v7();
    SurveyResponse {
        id: Uuid::now_v7(),
        survey_id,
        user_id: Some(user_id),
        company_id,
        company_name: Some(company_name.to_owned()),
        answers: answers(&[("q1", json!("yes"))]),
        respondent: Respondent::User(user_id),
        anonymized: false,
        completed_at: START,
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let f = fixture().await;
    f.store.migrate().await.unwrap();
}

#[tokio::test]
async fn survey_round_trips_and_status_is_conditional() {
    let f = fixture().await;
    let acme = f.store.insert_company("Acme").await.unwrap();
    let created = f
        .service
        .create_survey(
            &f.operator,
            pulse_surveys_sdk::NewSurvey {
                title: "Pulse".to_owned(),
                blocks: pulse_blocks(),
                companies: vec![acme.to_string(), "Globex".to_owned()],
                ends_at: Some(START + Duration::days(14)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let loaded = f.store.find_survey(created.id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.assignment.assigned_companies, vec![acme]);
    assert_eq!(loaded.assignment.special_company_names, vec!["Globex".to_owned()]);

    let change = StatusChange {
        to: SurveyStatus::Scheduled,
        changed_by: f.operator.user_id,
        changed_at: START + Duration::minutes(5),
    };
    let moved = f
        .store
        .conditional_update_status(created.id, SurveyStatus::Draft, change)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.status, SurveyStatus::Scheduled);
    assert_eq!(moved.last_status_change_at, Some(change.changed_at));

    let stale = f
        .store
        .conditional_update_status(created.id, SurveyStatus::Draft, change)
        .await
        .unwrap();
    assert!(stale.is_none());

    let mut edited = moved.clone();
    edited.title = "Too late".to_owned();
    assert!(f.store.update_draft_content(&edited).await.unwrap().is_none());
}

#[tokio::test]
async fn issuance_reports_duplicates_and_code_collisions() {
    let f = fixture().await;
    let survey_id = active_survey(&f, &CompanyRef::Name("Acme".into()), false).await;

    let first = invitation_for(survey_id, "a@example.com", "CODE01", START);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&first, START).await.unwrap(),
        IssueOutcome::Inserted
    );

    let same_pair = invitation_for(survey_id, "a@example.com", "CODE02", START);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&same_pair, START).await.unwrap(),
        IssueOutcome::DuplicateActive
    );

    let same_code = invitation_for(survey_id, "b@example.com", "CODE01", START);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&same_code, START).await.unwrap(),
        IssueOutcome::CodeTaken
    );

    // Once the first lapsed the pair is free again.
    let later = START + Duration::days(8);
    let renewed = invitation_for(survey_id, "a@example.com", "CODE03", later);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&renewed, later).await.unwrap(),
        IssueOutcome::Inserted
    );

    let by_code = f.store.find_invitation_by_code("CODE01").await.unwrap().unwrap();
    assert_eq!(by_code, first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_for_one_pair_inserts_once() {
    let f = fixture().await;
    let survey_id = active_survey(&f, &CompanyRef::Name("Acme".into()), false).await;

    let attempts = (0..8).map(|i| {
        let store = f.store.clone();
        let code = format!("PAIR{i:02}");
        let invitation = invitation_for(survey_id, "twice@example.com", &code, START);
        tokio::spawn(async move {
            store
                .insert_invitation_if_no_active(&invitation, START)
                .await
                .unwrap()
        })
    });
    let outcomes: Vec<IssueOutcome> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let inserted = outcomes.iter().filter(|o| **o == IssueOutcome::Inserted).count();
    assert_eq!(inserted, 1);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, IssueOutcome::Inserted | IssueOutcome::DuplicateActive))
    );
}

#[tokio::test]
async fn redeemed_or_expired_invitations_free_their_pair() {
    let f = fixture().await;
    let survey_id = active_survey(&f, &CompanyRef::Name("Acme".into()), false).await;

    let first = invitation_for(survey_id, "pair@example.com", "SLOT01", START);
    f.store.insert_invitation_if_no_active(&first, START).await.unwrap();
    f.store
        .conditional_redeem(first.id, Redeemer::Anonymous, START)
        .await
        .unwrap()
        .unwrap();

    let second = invitation_for(survey_id, "pair@example.com", "SLOT02", START);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&second, START).await.unwrap(),
        IssueOutcome::Inserted
    );
    let redeemed = f.store.find_invitation(first.id).await.unwrap().unwrap();
    assert_eq!(redeemed.redeemed_by, Some(Redeemer::Anonymous));

    // The second lapses; resending it takes the pair back while it is free.
    let later = START + Duration::days(8);
    assert_eq!(
        f.store
            .conditional_refresh(second.id, later, later + Duration::days(7))
            .await
            .unwrap(),
        RefreshOutcome::Refreshed
    );
    let third = invitation_for(survey_id, "pair@example.com", "SLOT03", later);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&third, later).await.unwrap(),
        IssueOutcome::DuplicateActive
    );
}

#[tokio::test]
async fn expired_invitation_cannot_be_resent_over_a_newer_one() {
    let f = fixture().await;
    let survey_id = active_survey(&f, &CompanyRef::Name("Acme".into()), false).await;

    let old = invitation_for(survey_id, "late@example.com", "OLD001", START);
    f.store.insert_invitation_if_no_active(&old, START).await.unwrap();

    let later = START + Duration::days(8);
    let newer = invitation_for(survey_id, "late@example.com", "NEW001", later);
    assert_eq!(
        f.store.insert_invitation_if_no_active(&newer, later).await.unwrap(),
        IssueOutcome::Inserted
    );

    assert_eq!(
        f.store
            .conditional_refresh(old.id, later, later + Duration::days(7))
            .await
            .unwrap(),
        RefreshOutcome::DuplicateActive
    );
    let untouched = f.store.find_invitation(old.id).await.unwrap().unwrap();
    assert_eq!(untouched.expires_at, START + Duration::days(7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn redeem_and_refresh_are_conditional() {
    let f = fixture().await;
    let survey_id = active_survey(&f, &CompanyRef::Name("Acme".into()), false).await;
    let invitation = invitation_for(survey_id, "race@example.com", "RACE01", START);
    f.store
        .insert_invitation_if_no_active(&invitation, START)
        .await
        .unwrap();

    let attempts = (0..8).map(|_| {
        let store = f.store.clone();
        tokio::spawn(async move {
            store
                .conditional_redeem(invitation.id, Redeemer::User(Uuid::now_v7()), START)
                .await
                .unwrap()
        })
    });
    let winners = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .filter(Option::is_some)
        .count();
    assert_eq!(winners, 1);

    let refreshed = f
        .store
        .conditional_refresh(invitation.id, START, START + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(refreshed, RefreshOutcome::NotPending);
    assert!(!f.store.delete_unredeemed(invitation.id).await.unwrap());
}

#[tokio::test]
async fn responses_are_unique_per_respondent_and_scoped_in_counts() {
    let f = fixture().await;
    let acme = f.store.insert_company("Acme").await.unwrap();
    let survey_id = active_survey(&f, &CompanyRef::Id(acme), false).await;

    let first = response(survey_id, Some(acme), "Acme");
    let user = first.user_id.unwrap();
    let key = keyring().for_user(survey_id, user).unwrap();
    assert_eq!(
        f.store.insert_response_if_absent(&key, &first).await.unwrap(),
        InsertOutcome::Inserted
    );

    let mut again = response(survey_id, Some(acme), "Acme");
    again.user_id = Some(user);
    assert_eq!(
        f.store.insert_response_if_absent(&key, &again).await.unwrap(),
        InsertOutcome::Duplicate
    );
    assert!(f.store.response_exists(survey_id, &key).await.unwrap());

    let by_name = response(survey_id, None, " ACME ");
    let key = keyring().for_user(survey_id, by_name.user_id.unwrap()).unwrap();
    f.store.insert_response_if_absent(&key, &by_name).await.unwrap();
    let elsewhere = response(survey_id, None, "Globex");
    let key = keyring().for_user(survey_id, elsewhere.user_id.unwrap()).unwrap();
    f.store.insert_response_if_absent(&key, &elsewhere).await.unwrap();

    f.store.insert_participant(Some(acme), None, true).await.unwrap();
    f.store.insert_participant(None, Some("acme"), true).await.unwrap();
    f.store.insert_participant(None, Some("Acme"), false).await.unwrap();
    f.store.insert_participant(None, Some("Globex"), true).await.unwrap();

    let rate = f.service.response_rate(survey_id).await.unwrap();
    assert_eq!((rate.eligible, rate.responded, rate.pct), (2, 2, 100));

    assert_eq!(f.store.anonymize_user_responses(user).await.unwrap(), 1);
    let rows = f.store.responses_for(survey_id).await.unwrap();
    let anonymized = rows.iter().find(|r| r.id == first.id).unwrap();
    assert_eq!(anonymized.user_id, None);
    assert_eq!(anonymized.respondent, Respondent::Anonymous);
    assert!(anonymized.anonymized);
    assert_eq!(rows.len(), 3);

    assert!(!f.store.delete_survey_if_unused(survey_id).await.unwrap());
}

#[tokio::test]
async fn invitee_flow_runs_end_to_end() {
    let f = fixture().await;
    f.store.insert_participant(None, Some("Acme"), true).await.unwrap();
    f.store.insert_participant(None, Some("Acme"), true).await.unwrap();
    let company = CompanyRef::Name("Acme".into());
    let survey_id = active_survey(&f, &company, true).await;

    f.codes.push("0123456789abcdef0123456789abcdef");
    let invitation = f
        .service
        .issue_invitation(&f.operator, survey_invite(survey_id, company.clone(), "guest@example.com"))
        .await
        .unwrap();
    assert_eq!(invitation.expires_at, START + Duration::days(7));

    f.clock.advance(Duration::hours(3));
    let participant = Participant::Invitee {
        code: invitation.code.clone(),
    };
    let stored = f
        .service
        .submit_response(survey_id, &participant, answers(&[("q1", json!("yes"))]))
        .await
        .unwrap();
    assert_eq!(stored.user_id, None);
    assert_eq!(stored.respondent, Respondent::Anonymous);
    assert_eq!(stored.company_name.as_deref(), Some("Acme"));

    let again = f
        .service
        .submit_response(survey_id, &participant, answers(&[("q1", json!("no"))]))
        .await;
    assert!(again.is_err());
    assert_eq!(f.store.responses_for(survey_id).await.unwrap().len(), 1);

    let redeemed = f.store.find_invitation(invitation.id).await.unwrap().unwrap();
    assert_eq!(redeemed.redeemed_by, Some(Redeemer::Anonymous));
    assert_eq!(redeemed.redeemed_at, Some(START + Duration::hours(3)));

    let rate = f.service.response_rate(survey_id).await.unwrap();
    assert_eq!((rate.eligible, rate.responded, rate.pct), (2, 1, 50));

    f.service
        .request_transition(&company_admin(company), survey_id, SurveyStatus::Completed)
        .await
        .unwrap();
    assert!(f.service.delete_survey(&f.operator, survey_id).await.is_err());
}
