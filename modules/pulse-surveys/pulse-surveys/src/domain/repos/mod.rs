//! Persistence seams of the pulse surveys core.
//!
//! Every mutation that races across requests is a single conditional write
//! here; callers never read-then-write to enforce an invariant.

mod directory_repo;
mod invitations_repo;
mod responses_repo;
mod surveys_repo;

pub use directory_repo::{CompanyScope, DirectoryRepository, ParticipantFilter, normalize_name};
pub use invitations_repo::{InvitationsRepository, IssueOutcome, RefreshOutcome};
pub use responses_repo::{
    InsertOutcome, RespondentKey, RespondentKeyring, ResponseFilter, ResponsesRepository,
};
pub use surveys_repo::{StatusChange, SurveysRepository};

/// The full store consumed by the domain, built once and injected.
pub trait Store:
    SurveysRepository + InvitationsRepository + ResponsesRepository + DirectoryRepository
{
}

impl<T> Store for T where
    T: SurveysRepository + InvitationsRepository + ResponsesRepository + DirectoryRepository
{
}
