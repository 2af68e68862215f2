//! Entity to domain model mappers.
//!
//! Timestamps are normalized to UTC on the way in so that stored values
//! compare consistently across drivers.

use anyhow::Context;
use pulse_surveys_sdk::{
    CompanyRef, Invitation, InvitationTarget, Redeemer, Respondent, Survey, SurveyResponse,
};
use sea_orm::ActiveValue::Set;
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, UtcOffset};

use super::entity::{invitation, response, survey};
use crate::domain::repos::{RespondentKey, normalize_name};

pub(super) fn utc(at: OffsetDateTime) -> OffsetDateTime {
    at.to_offset(UtcOffset::UTC)
}

pub fn survey_from_model(model: survey::Model) -> anyhow::Result<Survey> {
    Ok(Survey {
        id: model.id,
        title: model.title,
        description: model.description,
        blocks: serde_json::from_value(model.blocks).context("decoding survey blocks")?,
        status: model
            .status
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        is_anonymous: model.is_anonymous,
        starts_at: model.starts_at,
        ends_at: model.ends_at,
        assignment: serde_json::from_value(model.assignment)
            .context("decoding survey assignment")?,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_status_change_by: model.last_status_change_by,
        last_status_change_at: model.last_status_change_at,
    })
}

pub fn survey_to_active_model(survey: &Survey) -> anyhow::Result<survey::ActiveModel> {
    Ok(survey::ActiveModel {
        id: Set(survey.id),
        title: Set(survey.title.clone()),
        description: Set(survey.description.clone()),
        blocks: Set(serde_json::to_value(&survey.blocks)?),
        status: Set(survey.status.as_str().to_owned()),
        is_anonymous: Set(survey.is_anonymous),
        starts_at: Set(survey.starts_at.map(utc)),
        ends_at: Set(survey.ends_at.map(utc)),
        assignment: Set(serde_json::to_value(&survey.assignment)?),
        created_by: Set(survey.created_by),
        created_at: Set(utc(survey.created_at)),
        updated_at: Set(utc(survey.updated_at)),
        last_status_change_by: Set(survey.last_status_change_by),
        last_status_change_at: Set(survey.last_status_change_at.map(utc)),
    })
}

/// Flattened target columns: (kind, `company_id`, `company_name`, `survey_id`).
pub fn target_columns(
    target: &InvitationTarget,
) -> (&'static str, Option<uuid::Uuid>, Option<String>, Option<uuid::Uuid>) {
    match target {
        InvitationTarget::Company { company_id } => {
            (invitation::KIND_COMPANY_JOIN, Some(*company_id), None, None)
        }
        InvitationTarget::Survey { survey_id, company } => {
            let (id, name) = match company {
                CompanyRef::Id(id) => (Some(*id), None),
                CompanyRef::Name(name) => (None, Some(name.clone())),
            };
            (invitation::KIND_SURVEY_RESPONSE, id, name, Some(*survey_id))
        }
    }
}

fn target_from_model(model: &invitation::Model) -> anyhow::Result<InvitationTarget> {
    match model.kind.as_str() {
        invitation::KIND_COMPANY_JOIN => Ok(InvitationTarget::Company {
            company_id: model
                .company_id
                .context("company invitation without company_id")?,
        }),
        invitation::KIND_SURVEY_RESPONSE => {
            let company = match (model.company_id, &model.company_name) {
                (Some(id), _) => CompanyRef::Id(id),
                (None, Some(name)) => CompanyRef::Name(name.clone()),
                (None, None) => anyhow::bail!("survey invitation {} without company", model.id),
            };
            Ok(InvitationTarget::Survey {
                survey_id: model
                    .survey_id
                    .context("survey invitation without survey_id")?,
                company,
            })
        }
        other => anyhow::bail!("unknown invitation kind '{other}'"),
    }
}

pub fn redeemer_columns(redeemer: Redeemer) -> (&'static str, Option<uuid::Uuid>) {
    match redeemer {
        Redeemer::User(id) => (invitation::REDEEMED_BY_USER, Some(id)),
        Redeemer::Response(id) => (invitation::REDEEMED_BY_RESPONSE, Some(id)),
        Redeemer::Anonymous => (invitation::REDEEMED_BY_ANONYMOUS, None),
    }
}

/// Slot an unredeemed invitation holds for its (target, email) pair.
///
/// # Errors
/// Returns an error if the target cannot be encoded.
pub fn active_slot(target: &InvitationTarget, email: &str) -> anyhow::Result<String> {
    let encoded = serde_json::to_vec(&(target_columns(target), email))?;
    Ok(hex::encode(Sha256::digest(encoded)))
}

fn redeemer_from_model(model: &invitation::Model) -> anyhow::Result<Option<Redeemer>> {
    match (model.redeemed_by_kind.as_deref(), model.redeemed_by_id) {
        (None, _) => Ok(None),
        (Some(invitation::REDEEMED_BY_USER), Some(id)) => Ok(Some(Redeemer::User(id))),
        (Some(invitation::REDEEMED_BY_RESPONSE), Some(id)) => Ok(Some(Redeemer::Response(id))),
        (Some(invitation::REDEEMED_BY_ANONYMOUS), None) => Ok(Some(Redeemer::Anonymous)),
        (Some(other), _) => anyhow::bail!("invalid redeemer '{other}' on invitation {}", model.id),
    }
}

pub fn invitation_from_model(model: invitation::Model) -> anyhow::Result<Invitation> {
    let target = target_from_model(&model)?;
    let redeemed_by = redeemer_from_model(&model)?;
    Ok(Invitation {
        id: model.id,
        target,
        email: model.email,
        display_name: model.display_name,
        role: model.role.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        code: model.code,
        expiry_days: u32::try_from(model.expiry_days).context("negative expiry_days")?,
        issued_by: model.issued_by,
        issued_at: model.issued_at,
        expires_at: model.expires_at,
        redeemed_at: model.redeemed_at,
        redeemed_by,
    })
}

pub fn invitation_to_active_model(inv: &Invitation) -> anyhow::Result<invitation::ActiveModel> {
    let (kind, company_id, company_name, survey_id) = target_columns(&inv.target);
    let (redeemed_by_kind, redeemed_by_id) = match inv.redeemed_by.map(redeemer_columns) {
        Some((kind, id)) => (Some(kind.to_owned()), id),
        None => (None, None),
    };
    let slot = match inv.redeemed_at {
        Some(_) => None,
        None => Some(active_slot(&inv.target, &inv.email)?),
    };
    Ok(invitation::ActiveModel {
        id: Set(inv.id),
        kind: Set(kind.to_owned()),
        company_id: Set(company_id),
        company_name: Set(company_name),
        survey_id: Set(survey_id),
        email: Set(inv.email.clone()),
        display_name: Set(inv.display_name.clone()),
        role: Set(inv.role.as_str().to_owned()),
        code: Set(inv.code.clone()),
        expiry_days: Set(i32::try_from(inv.expiry_days).context("expiry_days out of range")?),
        issued_by: Set(inv.issued_by),
        issued_at: Set(utc(inv.issued_at)),
        expires_at: Set(utc(inv.expires_at)),
        redeemed_at: Set(inv.redeemed_at.map(utc)),
        redeemed_by_kind: Set(redeemed_by_kind),
        redeemed_by_id: Set(redeemed_by_id),
        active_slot: Set(slot),
    })
}

pub fn response_from_model(model: response::Model) -> anyhow::Result<SurveyResponse> {
    let respondent = match (model.respondent_kind.as_str(), model.respondent_id) {
        (response::RESPONDENT_USER, Some(id)) => Respondent::User(id),
        (response::RESPONDENT_INVITATION, Some(id)) => Respondent::Invitation(id),
        (response::RESPONDENT_ANONYMOUS, _) => Respondent::Anonymous,
        (other, _) => anyhow::bail!("invalid respondent '{other}' on response {}", model.id),
    };
    Ok(SurveyResponse {
        id: model.id,
        survey_id: model.survey_id,
        user_id: model.user_id,
        company_id: model.company_id,
        company_name: model.company_name,
        answers: serde_json::from_value(model.answers).context("decoding answers")?,
        respondent,
        anonymized: model.anonymized,
        completed_at: model.completed_at,
    })
}

pub fn response_to_active_model(
    key: &RespondentKey,
    resp: &SurveyResponse,
) -> anyhow::Result<response::ActiveModel> {
    let (respondent_kind, respondent_id) = match resp.respondent {
        Respondent::User(id) => (response::RESPONDENT_USER, Some(id)),
        Respondent::Invitation(id) => (response::RESPONDENT_INVITATION, Some(id)),
        Respondent::Anonymous => (response::RESPONDENT_ANONYMOUS, None),
    };
    Ok(response::ActiveModel {
        id: Set(resp.id),
        survey_id: Set(resp.survey_id),
        respondent_key: Set(key.as_str().to_owned()),
        user_id: Set(resp.user_id),
        company_id: Set(resp.company_id),
        company_name: Set(resp.company_name.clone()),
        company_name_key: Set(resp.company_name.as_deref().map(normalize_name)),
        answers: Set(serde_json::to_value(&resp.answers)?),
        respondent_kind: Set(respondent_kind.to_owned()),
        respondent_id: Set(respondent_id),
        anonymized: Set(resp.anonymized),
        completed_at: Set(utc(resp.completed_at)),
    })
}
