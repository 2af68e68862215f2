//! Domain service layer.
//!
//! `Service` wires the six components together over one injected store and
//! is the single entry point used by `local_client` and the CLI:
//! - `surveys` - survey editing and status transitions
//! - `invitations` - ledger operations with issuer authorization and mail
//! - `responses` - submission, rates and anonymization

use std::sync::Arc;

use pulse_surveys_sdk::{Actor, ActorRole, CompanyRef, Invitation, InvitationTarget};
use tracing::{Instrument, error};

use crate::config::PulseSurveysConfig;
use crate::domain::collector::ResponseCollector;
use crate::domain::eligibility::EligibilityGate;
use crate::domain::error::DomainError;
use crate::domain::identifier::IdentifierResolver;
use crate::domain::ledger::InvitationLedger;
use crate::domain::lifecycle::SurveyLifecycle;
use crate::domain::ports::{Clock, CodeGenerator, IdentityProvider, InvitationSubject, Mailer};
use crate::domain::rates::ResponseRateCalculator;
use crate::domain::repos::{RespondentKeyring, Store, normalize_name};

mod invitations;
mod responses;
mod surveys;

/// Collaborators the service is built from.
#[derive(Clone)]
pub struct ServiceDeps {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<dyn CodeGenerator>,
}

/// Domain service with business rules for pulse surveys.
#[derive(Clone)]
pub struct Service {
    store: Arc<dyn Store>,
    resolver: IdentifierResolver,
    lifecycle: SurveyLifecycle,
    ledger: InvitationLedger,
    collector: ResponseCollector,
    rates: ResponseRateCalculator,
    mailer: Arc<dyn Mailer>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: Arc<PulseSurveysConfig>,
}

impl Service {
    #[must_use]
    pub fn new(deps: ServiceDeps, config: PulseSurveysConfig) -> Self {
        let ServiceDeps {
            store,
            mailer,
            identity,
            clock,
            codes,
        } = deps;
        let config = Arc::new(config);

        let resolver = IdentifierResolver::new(Arc::clone(&store));
        let lifecycle = SurveyLifecycle::new(
            Arc::clone(&store),
            resolver.clone(),
            Arc::clone(&clock),
            config.require_questions_to_schedule,
        );
        let ledger = InvitationLedger::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            codes,
            Arc::clone(&config),
        );
        let gate = EligibilityGate::new(
            Arc::clone(&store),
            resolver.clone(),
            ledger.clone(),
            RespondentKeyring::new(config.respondent_key_secret.clone()),
        );
        let collector = ResponseCollector::new(
            Arc::clone(&store),
            gate,
            ledger.clone(),
            resolver.clone(),
            Arc::clone(&clock),
        );
        let rates = ResponseRateCalculator::new(Arc::clone(&store), resolver.clone());

        Self {
            store,
            resolver,
            lifecycle,
            ledger,
            collector,
            rates,
            mailer,
            identity,
            clock,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PulseSurveysConfig {
        &self.config
    }

    /// Resolve a session token into the acting user.
    ///
    /// # Errors
    /// `Forbidden` for an unknown session, `Database` when the provider fails.
    pub async fn actor_for_session(&self, session: &str) -> Result<Actor, DomainError> {
        self.identity
            .actor_for_session(session)
            .await?
            .ok_or_else(|| DomainError::forbidden("unknown or expired session"))
    }

    fn require_operator(actor: &Actor) -> Result<(), DomainError> {
        if actor.role == ActorRole::OperatorAdmin {
            Ok(())
        } else {
            Err(DomainError::forbidden("operator admin role required"))
        }
    }

    /// Whether two references denote the same company, looking names up for ids.
    async fn same_company(&self, a: &CompanyRef, b: &CompanyRef) -> Result<bool, DomainError> {
        match (a, b) {
            (CompanyRef::Id(x), CompanyRef::Id(y)) => Ok(x == y),
            (CompanyRef::Name(x), CompanyRef::Name(y)) => Ok(normalize_name(x) == normalize_name(y)),
            (CompanyRef::Id(id), CompanyRef::Name(name))
            | (CompanyRef::Name(name), CompanyRef::Id(id)) => Ok(self
                .store
                .company_name(*id)
                .await?
                .is_some_and(|n| normalize_name(&n) == normalize_name(name))),
        }
    }

    /// Operator admins may manage any invitation; company admins only those
    /// targeting their own company.
    async fn authorize_for_target(
        &self,
        actor: &Actor,
        target: &InvitationTarget,
    ) -> Result<(), DomainError> {
        match actor.role {
            ActorRole::OperatorAdmin => Ok(()),
            ActorRole::CompanyAdmin => {
                let Some(own) = actor.company.as_ref() else {
                    return Err(DomainError::forbidden("company admin without company"));
                };
                let targeted = match target {
                    InvitationTarget::Company { company_id } => CompanyRef::Id(*company_id),
                    InvitationTarget::Survey { company, .. } => company.clone(),
                };
                if self.same_company(own, &targeted).await? {
                    Ok(())
                } else {
                    Err(DomainError::forbidden("invitation targets another company"))
                }
            }
            ActorRole::Member => Err(DomainError::forbidden("admin role required")),
        }
    }

    /// Fire-and-forget mail; failures are logged and never undo the ledger write.
    fn dispatch_invitation_mail(&self, invitation: Invitation, subject: InvitationSubject) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(
            async move {
                if let Err(e) = mailer.send_invitation(&invitation, &subject).await {
                    error!(invitation_id = %invitation.id, error = %e, "invitation mail failed");
                }
            }
            .in_current_span(),
        );
    }
}
