//! In-memory store.
//!
//! Every conditional operation checks and mutates under one lock acquisition,
//! which gives it the same exactly-once semantics as the SQL statements of
//! the `SeaORM` store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_surveys_sdk::{
    Invitation, InvitationTarget, Redeemer, Respondent, Survey, SurveyResponse, SurveyStatus,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::repos::{
    DirectoryRepository, InsertOutcome, InvitationsRepository, IssueOutcome, ParticipantFilter,
    RefreshOutcome, RespondentKey, ResponseFilter, ResponsesRepository, StatusChange,
    SurveysRepository, normalize_name,
};

#[derive(Debug, Clone)]
struct ParticipantRecord {
    company_id: Option<Uuid>,
    company_name_key: Option<String>,
    active: bool,
}

#[derive(Default)]
struct State {
    surveys: HashMap<Uuid, Survey>,
    invitations: HashMap<Uuid, Invitation>,
    responses: Vec<(RespondentKey, SurveyResponse)>,
    companies: HashMap<Uuid, String>,
    participants: HashMap<Uuid, ParticipantRecord>,
}

/// Process-local store for tests and single-node tooling.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canonical company and return its id.
    pub fn add_company(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.state.lock().companies.insert(id, name.to_owned());
        id
    }

    /// Register a person belonging to a company given by id and/or name.
    pub fn add_participant(
        &self,
        company_id: Option<Uuid>,
        company_name: Option<&str>,
        active: bool,
    ) -> Uuid {
        let id = Uuid::now_v7();
        self.state.lock().participants.insert(
            id,
            ParticipantRecord {
                company_id,
                company_name_key: company_name.map(normalize_name),
                active,
            },
        );
        id
    }

    /// All stored responses of a survey, in insertion order.
    #[must_use]
    pub fn responses_for(&self, survey_id: Uuid) -> Vec<SurveyResponse> {
        self.state
            .lock()
            .responses
            .iter()
            .filter(|(_, r)| r.survey_id == survey_id)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

fn is_active_duplicate(existing: &Invitation, candidate: &Invitation, now: OffsetDateTime) -> bool {
    existing.target == candidate.target
        && existing.email == candidate.email
        && existing.redeemed_at.is_none()
        && !existing.is_expired_at(now)
}

#[async_trait]
impl SurveysRepository for InMemoryStore {
    async fn find_survey(&self, id: Uuid) -> anyhow::Result<Option<Survey>> {
        Ok(self.state.lock().surveys.get(&id).cloned())
    }

    async fn insert_survey(&self, survey: &Survey) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if state.surveys.contains_key(&survey.id) {
            anyhow::bail!("survey {} already exists", survey.id);
        }
        state.surveys.insert(survey.id, survey.clone());
        Ok(())
    }

    async fn update_draft_content(&self, survey: &Survey) -> anyhow::Result<Option<Survey>> {
        let mut state = self.state.lock();
        let Some(stored) = state.surveys.get_mut(&survey.id) else {
            return Ok(None);
        };
        if stored.status != SurveyStatus::Draft {
            return Ok(None);
        }
        stored.title.clone_from(&survey.title);
        stored.description.clone_from(&survey.description);
        stored.blocks.clone_from(&survey.blocks);
        stored.is_anonymous = survey.is_anonymous;
        stored.starts_at = survey.starts_at;
        stored.ends_at = survey.ends_at;
        stored.assignment.clone_from(&survey.assignment);
        stored.updated_at = survey.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: SurveyStatus,
        change: StatusChange,
    ) -> anyhow::Result<Option<Survey>> {
        let mut state = self.state.lock();
        match state.surveys.get_mut(&id) {
            Some(stored) if stored.status == expected => {
                stored.status = change.to;
                stored.updated_at = change.changed_at;
                stored.last_status_change_by = Some(change.changed_by);
                stored.last_status_change_at = Some(change.changed_at);
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_survey_if_unused(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        if state.responses.iter().any(|(_, r)| r.survey_id == id) {
            return Ok(false);
        }
        state.surveys.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl InvitationsRepository for InMemoryStore {
    async fn insert_invitation_if_no_active(
        &self,
        invitation: &Invitation,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssueOutcome> {
        let mut state = self.state.lock();
        if state
            .invitations
            .values()
            .any(|existing| is_active_duplicate(existing, invitation, now))
        {
            return Ok(IssueOutcome::DuplicateActive);
        }
        if state
            .invitations
            .values()
            .any(|existing| existing.code == invitation.code)
        {
            return Ok(IssueOutcome::CodeTaken);
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(IssueOutcome::Inserted)
    }

    async fn find_invitation(&self, id: Uuid) -> anyhow::Result<Option<Invitation>> {
        Ok(self.state.lock().invitations.get(&id).cloned())
    }

    async fn find_invitation_by_code(&self, code: &str) -> anyhow::Result<Option<Invitation>> {
        Ok(self
            .state
            .lock()
            .invitations
            .values()
            .find(|inv| inv.code == code)
            .cloned())
    }

    async fn conditional_redeem(
        &self,
        id: Uuid,
        redeemer: Redeemer,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Invitation>> {
        let mut state = self.state.lock();
        match state.invitations.get_mut(&id) {
            Some(inv) if inv.redeemed_at.is_none() => {
                inv.redeemed_at = Some(at);
                inv.redeemed_by = Some(redeemer);
                Ok(Some(inv.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn conditional_refresh(
        &self,
        id: Uuid,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<RefreshOutcome> {
        let mut state = self.state.lock();
        let Some(current) = state
            .invitations
            .get(&id)
            .filter(|inv| inv.redeemed_at.is_none())
            .cloned()
        else {
            return Ok(RefreshOutcome::NotPending);
        };
        if state
            .invitations
            .values()
            .any(|other| other.id != id && is_active_duplicate(other, &current, issued_at))
        {
            return Ok(RefreshOutcome::DuplicateActive);
        }
        if let Some(inv) = state.invitations.get_mut(&id) {
            inv.issued_at = issued_at;
            inv.expires_at = expires_at;
        }
        Ok(RefreshOutcome::Refreshed)
    }

    async fn delete_unredeemed(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        let removable = state
            .invitations
            .get(&id)
            .is_some_and(|inv| inv.redeemed_at.is_none());
        if removable {
            state.invitations.remove(&id);
        }
        Ok(removable)
    }

    async fn list_invitations(&self, target: &InvitationTarget) -> anyhow::Result<Vec<Invitation>> {
        let mut found: Vec<Invitation> = self
            .state
            .lock()
            .invitations
            .values()
            .filter(|inv| &inv.target == target)
            .cloned()
            .collect();
        found.sort_by_key(|inv| inv.issued_at);
        Ok(found)
    }
}

#[async_trait]
impl ResponsesRepository for InMemoryStore {
    async fn insert_response_if_absent(
        &self,
        key: &RespondentKey,
        response: &SurveyResponse,
    ) -> anyhow::Result<InsertOutcome> {
        let mut state = self.state.lock();
        let duplicate = state
            .responses
            .iter()
            .any(|(k, r)| r.survey_id == response.survey_id && k == key);
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }
        state.responses.push((key.clone(), response.clone()));
        Ok(InsertOutcome::Inserted)
    }

    async fn response_exists(&self, survey_id: Uuid, key: &RespondentKey) -> anyhow::Result<bool> {
        Ok(self
            .state
            .lock()
            .responses
            .iter()
            .any(|(k, r)| r.survey_id == survey_id && k == key))
    }

    async fn count_responses(&self, filter: &ResponseFilter) -> anyhow::Result<u64> {
        let state = self.state.lock();
        let count = state
            .responses
            .iter()
            .filter(|(_, r)| r.survey_id == filter.survey_id)
            .filter(|(_, r)| {
                filter.scope.as_ref().is_none_or(|scope| {
                    let name_key = r.company_name.as_deref().map(normalize_name);
                    scope.contains(r.company_id, name_key.as_deref())
                })
            })
            .count();
        Ok(count as u64)
    }

    async fn anonymize_user_responses(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut state = self.state.lock();
        let mut touched = 0_u64;
        for (_, response) in &mut state.responses {
            if response.user_id == Some(user_id) {
                response.user_id = None;
                response.anonymized = true;
                if response.respondent == Respondent::User(user_id) {
                    response.respondent = Respondent::Anonymous;
                }
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryStore {
    async fn company_name(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self.state.lock().companies.get(&id).cloned())
    }

    async fn company_ids_named(&self, name_key: &str) -> anyhow::Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .state
            .lock()
            .companies
            .iter()
            .filter(|(_, name)| normalize_name(name) == name_key)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn count_participants(&self, filter: &ParticipantFilter) -> anyhow::Result<u64> {
        let state = self.state.lock();
        let count = state
            .participants
            .values()
            .filter(|p| !filter.active_only || p.active)
            .filter(|p| {
                filter
                    .scope
                    .contains(p.company_id, p.company_name_key.as_deref())
            })
            .count();
        Ok(count as u64)
    }
}
