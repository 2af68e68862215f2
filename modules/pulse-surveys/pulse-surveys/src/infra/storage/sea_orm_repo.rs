//! `SeaORM` implementation of the pulse surveys store.
//!
//! Exactly-once operations are single conditional statements whose
//! `rows_affected` decides the outcome. Unique indexes guard the rest:
//! `(survey_id, respondent_key)` for responses and `active_slot` for
//! one usable invitation per (target, email).

use async_trait::async_trait;
use pulse_surveys_sdk::{
    Invitation, InvitationTarget, Redeemer, Survey, SurveyResponse, SurveyStatus,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::entity::{
    CompanyEntity, InvitationEntity, ParticipantEntity, ResponseEntity, SurveyEntity, company,
    invitation, participant, response, survey,
};
use super::mapper::{
    active_slot, invitation_from_model, invitation_to_active_model, redeemer_columns,
    response_from_model, response_to_active_model, survey_from_model, survey_to_active_model,
    target_columns, utc,
};
use super::migrations::Migrator;
use crate::domain::repos::{
    CompanyScope, DirectoryRepository, InsertOutcome, InvitationsRepository, IssueOutcome,
    ParticipantFilter, RefreshOutcome, RespondentKey, ResponseFilter, ResponsesRepository, StatusChange,
    SurveysRepository, normalize_name,
};

/// SQL-backed store.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect to `dsn` without touching the schema.
    ///
    /// # Errors
    /// Returns an error when the connection cannot be established.
    pub async fn connect(dsn: &str) -> anyhow::Result<Self> {
        let db = Database::connect(dsn).await?;
        Ok(Self::new(db))
    }

    /// Apply all pending migrations.
    ///
    /// # Errors
    /// Returns an error when a migration fails.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        Migrator::up(&self.db, None).await?;
        Ok(())
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Free `slot` if its holder expired before `now`.
    ///
    /// Matching on the holder's `expires_at` keeps a concurrent resend of
    /// that holder from losing the slot it just extended.
    async fn release_expired_slot(&self, slot: &str, now: OffsetDateTime) -> anyhow::Result<()> {
        let Some(holder) = InvitationEntity::find()
            .filter(invitation::Column::ActiveSlot.eq(slot))
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };
        let (holder_id, expires_at) = (holder.id, holder.expires_at);
        if !invitation_from_model(holder)?.is_expired_at(now) {
            return Ok(());
        }

        let result = InvitationEntity::update_many()
            .col_expr(invitation::Column::ActiveSlot, Expr::value(Option::<String>::None))
            .filter(invitation::Column::Id.eq(holder_id))
            .filter(invitation::Column::ActiveSlot.eq(slot))
            .filter(invitation::Column::ExpiresAt.eq(expires_at))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 1 {
            debug!(invitation_id = %holder_id, "expired invitation released its slot");
        }
        Ok(())
    }

    /// Register a canonical company and return its id.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub async fn insert_company(&self, name: &str) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        CompanyEntity::insert(company::ActiveModel {
            id: Set(id),
            name: Set(name.to_owned()),
            name_key: Set(normalize_name(name)),
        })
        .exec_without_returning(&self.db)
        .await?;
        Ok(id)
    }

    /// Register a person belonging to a company given by id and/or name.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub async fn insert_participant(
        &self,
        company_id: Option<Uuid>,
        company_name: Option<&str>,
        active: bool,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        ParticipantEntity::insert(participant::ActiveModel {
            id: Set(id),
            company_id: Set(company_id),
            company_name: Set(company_name.map(str::to_owned)),
            company_name_key: Set(company_name.map(normalize_name)),
            active: Set(active),
        })
        .exec_without_returning(&self.db)
        .await?;
        Ok(id)
    }

    /// All stored responses of a survey, oldest first.
    ///
    /// # Errors
    /// Returns an error when the query or decoding fails.
    pub async fn responses_for(&self, survey_id: Uuid) -> anyhow::Result<Vec<SurveyResponse>> {
        ResponseEntity::find()
            .filter(response::Column::SurveyId.eq(survey_id))
            .order_by_asc(response::Column::CompletedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(response_from_model)
            .collect()
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn target_condition(target: &InvitationTarget) -> Condition {
    let (kind, company_id, company_name, survey_id) = target_columns(target);
    Condition::all()
        .add(invitation::Column::Kind.eq(kind))
        .add(match company_id {
            Some(id) => invitation::Column::CompanyId.eq(id),
            None => invitation::Column::CompanyId.is_null(),
        })
        .add(match company_name {
            Some(name) => invitation::Column::CompanyName.eq(name),
            None => invitation::Column::CompanyName.is_null(),
        })
        .add(match survey_id {
            Some(id) => invitation::Column::SurveyId.eq(id),
            None => invitation::Column::SurveyId.is_null(),
        })
}

/// Match rows whose company id or normalized name falls inside `scope`.
/// Callers handle the empty scope, which matches nothing.
fn scope_condition<C: ColumnTrait>(scope: &CompanyScope, id_col: C, name_key_col: C) -> Condition {
    let mut cond = Condition::any();
    if !scope.ids.is_empty() {
        cond = cond.add(id_col.is_in(scope.ids.iter().copied()));
    }
    if !scope.names.is_empty() {
        cond = cond.add(name_key_col.is_in(scope.names.iter().cloned()));
    }
    cond
}

async fn load_survey<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<Survey>> {
    SurveyEntity::find_by_id(id)
        .one(conn)
        .await?
        .map(survey_from_model)
        .transpose()
}

async fn load_invitation<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> anyhow::Result<Option<Invitation>> {
    InvitationEntity::find_by_id(id)
        .one(conn)
        .await?
        .map(invitation_from_model)
        .transpose()
}

#[async_trait]
impl SurveysRepository for SeaOrmStore {
    async fn find_survey(&self, id: Uuid) -> anyhow::Result<Option<Survey>> {
        load_survey(&self.db, id).await
    }

    async fn insert_survey(&self, survey: &Survey) -> anyhow::Result<()> {
        SurveyEntity::insert(survey_to_active_model(survey)?)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn update_draft_content(&self, survey: &Survey) -> anyhow::Result<Option<Survey>> {
        let txn = self.db.begin().await?;
        let result = SurveyEntity::update_many()
            .col_expr(survey::Column::Title, Expr::value(survey.title.clone()))
            .col_expr(
                survey::Column::Description,
                Expr::value(survey.description.clone()),
            )
            .col_expr(
                survey::Column::Blocks,
                Expr::value(serde_json::to_value(&survey.blocks)?),
            )
            .col_expr(survey::Column::IsAnonymous, Expr::value(survey.is_anonymous))
            .col_expr(survey::Column::StartsAt, Expr::value(survey.starts_at.map(utc)))
            .col_expr(survey::Column::EndsAt, Expr::value(survey.ends_at.map(utc)))
            .col_expr(
                survey::Column::Assignment,
                Expr::value(serde_json::to_value(&survey.assignment)?),
            )
            .col_expr(survey::Column::UpdatedAt, Expr::value(utc(survey.updated_at)))
            .filter(survey::Column::Id.eq(survey.id))
            .filter(survey::Column::Status.eq(SurveyStatus::Draft.as_str()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        let updated = load_survey(&txn, survey.id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: SurveyStatus,
        change: StatusChange,
    ) -> anyhow::Result<Option<Survey>> {
        let at = utc(change.changed_at);
        let txn = self.db.begin().await?;
        let result = SurveyEntity::update_many()
            .col_expr(survey::Column::Status, Expr::value(change.to.as_str()))
            .col_expr(survey::Column::UpdatedAt, Expr::value(at))
            .col_expr(
                survey::Column::LastStatusChangeBy,
                Expr::value(Some(change.changed_by)),
            )
            .col_expr(survey::Column::LastStatusChangeAt, Expr::value(Some(at)))
            .filter(survey::Column::Id.eq(id))
            .filter(survey::Column::Status.eq(expected.as_str()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            debug!(%id, %expected, "status precondition did not hold");
            return Ok(None);
        }
        let updated = load_survey(&txn, id).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn delete_survey_if_unused(&self, id: Uuid) -> anyhow::Result<bool> {
        let txn = self.db.begin().await?;
        let responses = ResponseEntity::find()
            .filter(response::Column::SurveyId.eq(id))
            .count(&txn)
            .await?;
        if responses > 0 {
            return Ok(false);
        }
        SurveyEntity::delete_many()
            .filter(survey::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl InvitationsRepository for SeaOrmStore {
    async fn insert_invitation_if_no_active(
        &self,
        inv: &Invitation,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssueOutcome> {
        self.release_expired_slot(&active_slot(&inv.target, &inv.email)?, now)
            .await?;

        match InvitationEntity::insert(invitation_to_active_model(inv)?)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(IssueOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => {
                let code_taken = InvitationEntity::find()
                    .filter(invitation::Column::Code.eq(inv.code.clone()))
                    .count(&self.db)
                    .await?
                    > 0;
                Ok(if code_taken {
                    IssueOutcome::CodeTaken
                } else {
                    IssueOutcome::DuplicateActive
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_invitation(&self, id: Uuid) -> anyhow::Result<Option<Invitation>> {
        load_invitation(&self.db, id).await
    }

    async fn find_invitation_by_code(&self, code: &str) -> anyhow::Result<Option<Invitation>> {
        InvitationEntity::find()
            .filter(invitation::Column::Code.eq(code))
            .one(&self.db)
            .await?
            .map(invitation_from_model)
            .transpose()
    }

    async fn conditional_redeem(
        &self,
        id: Uuid,
        redeemer: Redeemer,
        at: OffsetDateTime,
    ) -> anyhow::Result<Option<Invitation>> {
        let (kind, redeemer_id) = redeemer_columns(redeemer);
        let txn = self.db.begin().await?;
        let result = InvitationEntity::update_many()
            .col_expr(invitation::Column::RedeemedAt, Expr::value(Some(utc(at))))
            .col_expr(invitation::Column::RedeemedByKind, Expr::value(Some(kind)))
            .col_expr(invitation::Column::RedeemedById, Expr::value(redeemer_id))
            .col_expr(invitation::Column::ActiveSlot, Expr::value(Option::<String>::None))
            .filter(invitation::Column::Id.eq(id))
            .filter(invitation::Column::RedeemedAt.is_null())
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        let redeemed = load_invitation(&txn, id).await?;
        txn.commit().await?;
        Ok(redeemed)
    }

    async fn conditional_refresh(
        &self,
        id: Uuid,
        issued_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<RefreshOutcome> {
        let Some(current) = load_invitation(&self.db, id).await? else {
            return Ok(RefreshOutcome::NotPending);
        };
        if current.is_redeemed() {
            return Ok(RefreshOutcome::NotPending);
        }
        // The row may have given its slot up after expiry; it has to win it back.
        let slot = active_slot(&current.target, &current.email)?;
        self.release_expired_slot(&slot, issued_at).await?;

        let result = InvitationEntity::update_many()
            .col_expr(invitation::Column::IssuedAt, Expr::value(utc(issued_at)))
            .col_expr(invitation::Column::ExpiresAt, Expr::value(utc(expires_at)))
            .col_expr(invitation::Column::ActiveSlot, Expr::value(Some(slot)))
            .filter(invitation::Column::Id.eq(id))
            .filter(invitation::Column::RedeemedAt.is_null())
            .exec(&self.db)
            .await;
        match result {
            Ok(r) if r.rows_affected == 0 => Ok(RefreshOutcome::NotPending),
            Ok(_) => Ok(RefreshOutcome::Refreshed),
            Err(e) if is_unique_violation(&e) => Ok(RefreshOutcome::DuplicateActive),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_unredeemed(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = InvitationEntity::delete_many()
            .filter(invitation::Column::Id.eq(id))
            .filter(invitation::Column::RedeemedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn list_invitations(&self, target: &InvitationTarget) -> anyhow::Result<Vec<Invitation>> {
        InvitationEntity::find()
            .filter(target_condition(target))
            .order_by_asc(invitation::Column::IssuedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(invitation_from_model)
            .collect()
    }
}

#[async_trait]
impl ResponsesRepository for SeaOrmStore {
    async fn insert_response_if_absent(
        &self,
        key: &RespondentKey,
        resp: &SurveyResponse,
    ) -> anyhow::Result<InsertOutcome> {
        match ResponseEntity::insert(response_to_active_model(key, resp)?)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn response_exists(&self, survey_id: Uuid, key: &RespondentKey) -> anyhow::Result<bool> {
        let count = ResponseEntity::find()
            .filter(response::Column::SurveyId.eq(survey_id))
            .filter(response::Column::RespondentKey.eq(key.as_str()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn count_responses(&self, filter: &ResponseFilter) -> anyhow::Result<u64> {
        let mut query = ResponseEntity::find().filter(response::Column::SurveyId.eq(filter.survey_id));
        if let Some(scope) = &filter.scope {
            if scope.is_empty() {
                return Ok(0);
            }
            query = query.filter(scope_condition(
                scope,
                response::Column::CompanyId,
                response::Column::CompanyNameKey,
            ));
        }
        Ok(query.count(&self.db).await?)
    }

    async fn anonymize_user_responses(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let txn = self.db.begin().await?;
        ResponseEntity::update_many()
            .col_expr(
                response::Column::RespondentKind,
                Expr::value(response::RESPONDENT_ANONYMOUS),
            )
            .col_expr(response::Column::RespondentId, Expr::value(Option::<Uuid>::None))
            .filter(response::Column::UserId.eq(user_id))
            .filter(response::Column::RespondentKind.eq(response::RESPONDENT_USER))
            .exec(&txn)
            .await?;
        let result = ResponseEntity::update_many()
            .col_expr(response::Column::UserId, Expr::value(Option::<Uuid>::None))
            .col_expr(response::Column::Anonymized, Expr::value(true))
            .filter(response::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl DirectoryRepository for SeaOrmStore {
    async fn company_name(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(CompanyEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|c| c.name))
    }

    async fn company_ids_named(&self, name_key: &str) -> anyhow::Result<Vec<Uuid>> {
        Ok(CompanyEntity::find()
            .filter(company::Column::NameKey.eq(name_key))
            .order_by_asc(company::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    async fn count_participants(&self, filter: &ParticipantFilter) -> anyhow::Result<u64> {
        if filter.scope.is_empty() {
            return Ok(0);
        }
        let mut query = ParticipantEntity::find().filter(scope_condition(
            &filter.scope,
            participant::Column::CompanyId,
            participant::Column::CompanyNameKey,
        ));
        if filter.active_only {
            query = query.filter(participant::Column::Active.eq(true));
        }
        Ok(query.count(&self.db).await?)
    }
}
