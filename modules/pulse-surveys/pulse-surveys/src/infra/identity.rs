use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use pulse_surveys_sdk::Actor;

use crate::domain::ports::IdentityProvider;

/// Identity provider over a fixed session table, for tooling and tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    sessions: RwLock<HashMap<String, Actor>>,
}

impl StaticIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: impl Into<String>, actor: Actor) {
        self.sessions.write().insert(session.into(), actor);
    }

    pub fn revoke(&self, session: &str) {
        self.sessions.write().remove(session);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn actor_for_session(&self, session: &str) -> anyhow::Result<Option<Actor>> {
        Ok(self.sessions.read().get(session).cloned())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn resolves_known_sessions_only() {
        let provider = StaticIdentityProvider::new();
        let actor = Actor::operator_admin(Uuid::new_v4());
        provider.insert("s-1", actor.clone());

        assert_eq!(provider.actor_for_session("s-1").await.unwrap(), Some(actor));
        assert_eq!(provider.actor_for_session("s-2").await.unwrap(), None);

        provider.revoke("s-1");
        assert_eq!(provider.actor_for_session("s-1").await.unwrap(), None);
    }
}
