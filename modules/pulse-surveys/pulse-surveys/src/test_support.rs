//! Deterministic collaborators for unit and integration tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_surveys_sdk::{Actor, Invitation, InvitationKind};
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{PulseSurveysConfig, SecretString};
use crate::domain::ports::{Clock, CodeGenerator, InvitationSubject, Mailer};
use crate::domain::repos::Store;
use crate::domain::service::{Service, ServiceDeps};
use crate::infra::identity::StaticIdentityProvider;
use crate::infra::storage::InMemoryStore;
use crate::infra::system::RandomCodeGenerator;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

/// Hands out queued codes first, then random ones.
pub struct ScriptedCodes {
    queue: Mutex<VecDeque<String>>,
    fallback: RandomCodeGenerator,
}

impl ScriptedCodes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: RandomCodeGenerator::new(16, 6),
        }
    }

    pub fn push(&self, code: impl Into<String>) {
        self.queue.lock().push_back(code.into());
    }
}

impl Default for ScriptedCodes {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&self, kind: InvitationKind) -> String {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.generate(kind))
    }
}

/// A mail the service handed to the mailer.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub invitation: Invitation,
    pub subject: InvitationSubject,
}

/// Mailer that forwards every mail to a channel, optionally failing afterwards.
pub struct RecordingMailer {
    tx: mpsc::UnboundedSender<SentMail>,
    fail: bool,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SentMail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: false }, rx)
    }

    #[must_use]
    pub fn failing() -> (Self, mpsc::UnboundedReceiver<SentMail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, fail: true }, rx)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        subject: &InvitationSubject,
    ) -> anyhow::Result<()> {
        let sent = SentMail {
            invitation: invitation.clone(),
            subject: subject.clone(),
        };
        if self.tx.send(sent).is_err() {
            tracing::debug!("mail receiver dropped");
        }
        if self.fail {
            anyhow::bail!("smtp relay unavailable");
        }
        Ok(())
    }
}

/// Respondent key secret the [`Harness`] service runs with.
pub const TEST_RESPONDENT_KEY_SECRET: &str = "harness-respondent-key-secret";

/// Default settings plus [`TEST_RESPONDENT_KEY_SECRET`].
#[must_use]
pub fn test_config() -> PulseSurveysConfig {
    PulseSurveysConfig {
        respondent_key_secret: SecretString::new(TEST_RESPONDENT_KEY_SECRET),
        ..PulseSurveysConfig::default()
    }
}

/// A service over an in-memory store with every collaborator exposed.
pub struct Harness {
    pub service: Arc<Service>,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub codes: Arc<ScriptedCodes>,
    pub identity: Arc<StaticIdentityProvider>,
    pub mail: mpsc::UnboundedReceiver<SentMail>,
    pub operator: Actor,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with(test_config(), RecordingMailer::new())
    }

    #[must_use]
    pub fn with_config(config: PulseSurveysConfig) -> Self {
        Self::with(config, RecordingMailer::new())
    }

    #[must_use]
    pub fn with_failing_mailer() -> Self {
        Self::with(test_config(), RecordingMailer::failing())
    }

    fn with(
        config: PulseSurveysConfig,
        (mailer, mail): (RecordingMailer, mpsc::UnboundedReceiver<SentMail>),
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
        let codes = Arc::new(ScriptedCodes::new());
        let identity = Arc::new(StaticIdentityProvider::new());
        let shared: Arc<dyn Store> = store.clone();

        let service = Service::new(
            ServiceDeps {
                store: shared,
                mailer: Arc::new(mailer),
                identity: identity.clone(),
                clock: clock.clone(),
                codes: codes.clone(),
            },
            config,
        );

        Self {
            service: Arc::new(service),
            store,
            clock,
            codes,
            identity,
            mail,
            operator: Actor::operator_admin(Uuid::now_v7()),
        }
    }

    /// Next mail handed to the mailer, waiting briefly for the spawned send.
    pub async fn next_mail(&mut self) -> Option<SentMail> {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.mail.recv())
            .await
            .ok()
            .flatten()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
