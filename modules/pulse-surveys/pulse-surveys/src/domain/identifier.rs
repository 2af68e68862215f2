//! Company reference handling.
//!
//! A reference is classified once, when an assignment is built. Reads never
//! re-sniff strings: they work on `CompanyRef` and `CompanyAssignment`.

use std::sync::Arc;

use pulse_surveys_sdk::{CompanyAssignment, CompanyRef, Survey};
use uuid::Uuid;

use crate::domain::repos::{CompanyScope, Store, normalize_name};

/// Length of the hyphenated canonical identifier form.
const CANONICAL_ID_LEN: usize = 36;

/// True only for the exact hyphenated identifier shape.
#[must_use]
pub fn is_canonical_id(candidate: &str) -> bool {
    candidate.len() == CANONICAL_ID_LEN && Uuid::try_parse(candidate).is_ok()
}

/// Classify a raw reference. Blank input yields `None`.
#[must_use]
pub fn parse_reference(raw: &str) -> Option<CompanyRef> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_canonical_id(trimmed) {
        Uuid::try_parse(trimmed).ok().map(CompanyRef::Id)
    } else {
        Some(CompanyRef::Name(trimmed.to_owned()))
    }
}

/// Split raw references into canonical ids and literal names.
///
/// Blank entries are dropped; duplicates (names compared case-insensitively)
/// keep their first occurrence.
pub fn partition_assignment<S: AsRef<str>>(raw: &[S]) -> CompanyAssignment {
    let mut assignment = CompanyAssignment::default();
    let mut seen_names: Vec<String> = Vec::new();

    for reference in raw.iter().filter_map(|r| parse_reference(r.as_ref())) {
        match reference {
            CompanyRef::Id(id) => {
                if !assignment.assigned_companies.contains(&id) {
                    assignment.assigned_companies.push(id);
                }
            }
            CompanyRef::Name(name) => {
                let key = normalize_name(&name);
                if !seen_names.contains(&key) {
                    seen_names.push(key);
                    assignment.special_company_names.push(name);
                }
            }
        }
    }

    assignment
}

/// Decides company membership against a survey's assignment, cross-checking
/// ids against names through the company directory.
#[derive(Clone)]
pub struct IdentifierResolver {
    store: Arc<dyn Store>,
}

impl IdentifierResolver {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// # Errors
    /// Returns an error when the directory lookup fails.
    pub async fn resolve_assignment(
        &self,
        survey: &Survey,
        company: &CompanyRef,
    ) -> anyhow::Result<bool> {
        self.is_member(&survey.assignment, company).await
    }

    /// # Errors
    /// Returns an error when the directory lookup fails.
    pub async fn is_member(
        &self,
        assignment: &CompanyAssignment,
        company: &CompanyRef,
    ) -> anyhow::Result<bool> {
        match company {
            CompanyRef::Id(id) => {
                if assignment.assigned_companies.contains(id) {
                    return Ok(true);
                }
                if assignment.special_company_names.is_empty() {
                    return Ok(false);
                }
                let Some(name) = self.store.company_name(*id).await? else {
                    return Ok(false);
                };
                Ok(contains_name(assignment, &normalize_name(&name)))
            }
            CompanyRef::Name(name) => {
                let key = normalize_name(name);
                if key.is_empty() {
                    return Ok(false);
                }
                if contains_name(assignment, &key) {
                    return Ok(true);
                }
                if assignment.assigned_companies.is_empty() {
                    return Ok(false);
                }
                let ids = self.store.company_ids_named(&key).await?;
                Ok(ids
                    .iter()
                    .any(|id| assignment.assigned_companies.contains(id)))
            }
        }
    }

    /// Both spellings of every assigned company, for scoping counts.
    ///
    /// # Errors
    /// Returns an error when a directory lookup fails.
    pub async fn expand_scope(&self, assignment: &CompanyAssignment) -> anyhow::Result<CompanyScope> {
        let mut scope = CompanyScope::default();

        for id in &assignment.assigned_companies {
            push_unique(&mut scope.ids, *id);
            if let Some(name) = self.store.company_name(*id).await? {
                push_unique(&mut scope.names, normalize_name(&name));
            }
        }
        for name in &assignment.special_company_names {
            let key = normalize_name(name);
            for id in self.store.company_ids_named(&key).await? {
                push_unique(&mut scope.ids, id);
            }
            push_unique(&mut scope.names, key);
        }

        Ok(scope)
    }

    /// Directory name for a canonical company, if it has one.
    ///
    /// # Errors
    /// Returns an error when the directory lookup fails.
    pub async fn company_name(&self, company: &CompanyRef) -> anyhow::Result<Option<String>> {
        match company {
            CompanyRef::Id(id) => self.store.company_name(*id).await,
            CompanyRef::Name(name) => Ok(Some(name.clone())),
        }
    }
}

fn contains_name(assignment: &CompanyAssignment, key: &str) -> bool {
    assignment
        .special_company_names
        .iter()
        .any(|n| normalize_name(n) == key)
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
