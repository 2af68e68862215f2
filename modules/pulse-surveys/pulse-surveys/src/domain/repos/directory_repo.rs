use async_trait::async_trait;
use uuid::Uuid;

/// Comparison form of a company name: trimmed and lowercased.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Set of companies expressed both ways, used to scope counts.
///
/// `names` are normalized with [`normalize_name`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompanyScope {
    pub ids: Vec<Uuid>,
    pub names: Vec<String>,
}

impl CompanyScope {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.names.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: Option<Uuid>, name_key: Option<&str>) -> bool {
        id.is_some_and(|id| self.ids.contains(&id))
            || name_key.is_some_and(|n| self.names.iter().any(|s| s == n))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFilter {
    pub scope: CompanyScope,
    pub active_only: bool,
}

/// Read access to companies and their people, owned by the wider platform.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn company_name(&self, id: Uuid) -> anyhow::Result<Option<String>>;

    /// Canonical companies whose normalized name equals `name_key`.
    async fn company_ids_named(&self, name_key: &str) -> anyhow::Result<Vec<Uuid>>;

    async fn count_participants(&self, filter: &ParticipantFilter) -> anyhow::Result<u64>;
}
