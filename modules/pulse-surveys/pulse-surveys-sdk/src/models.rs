//! Public models for the pulse surveys module.
//!
//! These are transport-agnostic data structures that define the contract
//! between the pulse surveys module and its consumers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Lifecycle status of a survey.
///
/// `Pending` and `InProgress` are reserved: no transition leads into or out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurveyStatus {
    Draft,
    Scheduled,
    Active,
    Completed,
    Archived,
    Pending,
    InProgress,
}

impl SurveyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
        }
    }

    /// Reserved statuses exist for stored data compatibility only.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurveyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            other => Err(format!("unknown survey status '{other}'")),
        }
    }
}

/// Answer shape accepted by a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    YesNo,
    Choice { options: Vec<String> },
    Scale { min: i64, max: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
}

/// Ordered group of questions inside a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Reference to a company: either its canonical identifier or a literal name
/// for companies that have no canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CompanyRef {
    Id(Uuid),
    Name(String),
}

impl fmt::Display for CompanyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Companies a survey is assigned to. Membership is the union of both lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanyAssignment {
    pub assigned_companies: Vec<Uuid>,
    pub special_company_names: Vec<String>,
}

impl CompanyAssignment {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned_companies.is_empty() && self.special_company_names.is_empty()
    }
}

/// A survey with its content, lifecycle status and assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub blocks: Vec<Block>,
    pub status: SurveyStatus,
    pub is_anonymous: bool,
    pub starts_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub assignment: CompanyAssignment,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_status_change_by: Option<Uuid>,
    pub last_status_change_at: Option<OffsetDateTime>,
}

impl Survey {
    /// Find a question by id across all blocks.
    #[must_use]
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.blocks
            .iter()
            .flat_map(|b| b.questions.iter())
            .find(|q| q.id == id)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.blocks.iter().flat_map(|b| b.questions.iter())
    }
}

/// Data for creating a new survey.
///
/// `companies` holds raw references (canonical ids or names) that are
/// partitioned into the assignment at creation time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewSurvey {
    pub title: String,
    pub description: String,
    pub blocks: Vec<Block>,
    pub is_anonymous: bool,
    pub starts_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub companies: Vec<String>,
}

/// Partial update of a draft survey's content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurveyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub blocks: Option<Vec<Block>>,
    pub is_anonymous: Option<bool>,
    /// `Some(None)` clears the window start.
    #[allow(clippy::option_option)]
    pub starts_at: Option<Option<OffsetDateTime>>,
    /// `Some(None)` clears the window end.
    #[allow(clippy::option_option)]
    pub ends_at: Option<Option<OffsetDateTime>>,
    pub companies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRole {
    OperatorAdmin,
    CompanyAdmin,
    Member,
}

impl ActorRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperatorAdmin => "operator_admin",
            Self::CompanyAdmin => "company_admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator_admin" => Ok(Self::OperatorAdmin),
            "company_admin" => Ok(Self::CompanyAdmin),
            "member" => Ok(Self::Member),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Authenticated caller of a session-based operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
    pub company: Option<CompanyRef>,
}

impl Actor {
    #[must_use]
    pub fn operator_admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: ActorRole::OperatorAdmin,
            company: None,
        }
    }

    #[must_use]
    pub fn company_admin(user_id: Uuid, company: CompanyRef) -> Self {
        Self {
            user_id,
            role: ActorRole::CompanyAdmin,
            company: Some(company),
        }
    }
}

/// Authenticated employee answering a survey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: Uuid,
    pub company: CompanyRef,
    pub active: bool,
}

/// Whoever is submitting a response: a session-backed member or the holder
/// of a survey invitation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    Member(Member),
    Invitee { code: String },
}

/// What an invitation grants access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationTarget {
    /// Join the company as a user with the invitation's role.
    Company { company_id: Uuid },
    /// Respond to one survey on behalf of a company.
    Survey { survey_id: Uuid, company: CompanyRef },
}

impl InvitationTarget {
    #[must_use]
    pub const fn kind(&self) -> InvitationKind {
        match self {
            Self::Company { .. } => InvitationKind::CompanyJoin,
            Self::Survey { .. } => InvitationKind::SurveyResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationKind {
    CompanyJoin,
    SurveyResponse,
}

/// Back-reference stored on a redeemed invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redeemer {
    /// User that joined through a company invitation.
    User(Uuid),
    /// Response submitted with a survey invitation.
    Response(Uuid),
    /// Response to an anonymous survey. The response is not referenced, so
    /// the invitee's email cannot be joined to the answers.
    Anonymous,
}

/// Display state derived from redemption and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationState {
    Pending,
    Expired,
    Redeemed,
}

/// A single-use code granting company membership or survey-response access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub target: InvitationTarget,
    pub email: String,
    pub display_name: String,
    pub role: ActorRole,
    pub code: String,
    pub expiry_days: u32,
    pub issued_by: Uuid,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub redeemed_at: Option<OffsetDateTime>,
    pub redeemed_by: Option<Redeemer>,
}

impl Invitation {
    #[must_use]
    pub fn is_redeemed(&self) -> bool {
        self.redeemed_at.is_some()
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Redemption wins over expiry: a redeemed code is inert forever.
    #[must_use]
    pub fn state_at(&self, now: OffsetDateTime) -> InvitationState {
        if self.is_redeemed() {
            InvitationState::Redeemed
        } else if self.is_expired_at(now) {
            InvitationState::Expired
        } else {
            InvitationState::Pending
        }
    }

    #[must_use]
    pub fn validity_window(&self) -> Duration {
        Duration::days(i64::from(self.expiry_days))
    }
}

/// Data for issuing an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    pub target: InvitationTarget,
    pub email: String,
    pub display_name: String,
    pub role: ActorRole,
    /// Falls back to the configured default when absent.
    pub expiry_days: Option<u32>,
}

/// Descriptor of who submitted a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Respondent {
    User(Uuid),
    Invitation(Uuid),
    Anonymous,
}

/// A submitted response. Rows are append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub answers: BTreeMap<String, serde_json::Value>,
    pub respondent: Respondent,
    pub anonymized: bool,
    pub completed_at: OffsetDateTime,
}

/// Completed vs. eligible counts for one survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseRate {
    pub eligible: u64,
    pub responded: u64,
    pub pct: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SurveyStatus::Draft,
            SurveyStatus::Scheduled,
            SurveyStatus::Active,
            SurveyStatus::Completed,
            SurveyStatus::Archived,
            SurveyStatus::Pending,
            SurveyStatus::InProgress,
        ] {
            assert_eq!(status.as_str().parse::<SurveyStatus>(), Ok(status));
        }
        assert!("open".parse::<SurveyStatus>().is_err());
    }

    #[test]
    fn redeemed_invitation_stays_redeemed_after_expiry() {
        let now = OffsetDateTime::now_utc();
        let mut inv = Invitation {
            id: Uuid::new_v4(),
            target: InvitationTarget::Company {
                company_id: Uuid::new_v4(),
            },
            email: "a@example.com".to_owned(),
            display_name: "A".to_owned(),
            role: ActorRole::Member,
            code: "A1B2C3".to_owned(),
            expiry_days: 7,
            issued_by: Uuid::new_v4(),
            issued_at: now - Duration::days(10),
            expires_at: now - Duration::days(3),
            redeemed_at: None,
            redeemed_by: None,
        };
        assert_eq!(inv.state_at(now), InvitationState::Expired);

        inv.redeemed_at = Some(now - Duration::days(5));
        assert_eq!(inv.state_at(now), InvitationState::Redeemed);
    }

    #[test]
    fn company_ref_serializes_as_tagged_value() {
        let json = serde_json::to_value(CompanyRef::Name("Acme".to_owned())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "name", "value": "Acme"}));
    }
}
