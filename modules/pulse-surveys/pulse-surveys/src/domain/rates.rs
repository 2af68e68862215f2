use std::sync::Arc;

use pulse_surveys_sdk::{ResponseRate, Survey};

use crate::domain::error::DomainError;
use crate::domain::identifier::IdentifierResolver;
use crate::domain::repos::{ParticipantFilter, ResponseFilter, Store};

/// Rounded percentage, half up, capped at 100. Zero when nobody is eligible.
#[must_use]
pub fn percentage(responded: u64, eligible: u64) -> u32 {
    if eligible == 0 {
        return 0;
    }
    let responded = u128::from(responded.min(eligible));
    let eligible = u128::from(eligible);
    let pct = (responded * 200 + eligible) / (eligible * 2);
    u32::try_from(pct).unwrap_or(100)
}

#[derive(Clone)]
pub struct ResponseRateCalculator {
    store: Arc<dyn Store>,
    resolver: IdentifierResolver,
}

impl ResponseRateCalculator {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, resolver: IdentifierResolver) -> Self {
        Self { store, resolver }
    }

    /// Active participants of the assigned companies against responses
    /// attributed to those same companies.
    ///
    /// # Errors
    /// Returns `Database` when a count fails.
    pub async fn rate_for(&self, survey: &Survey) -> Result<ResponseRate, DomainError> {
        let scope = self.resolver.expand_scope(&survey.assignment).await?;
        if scope.is_empty() {
            return Ok(ResponseRate {
                eligible: 0,
                responded: 0,
                pct: 0,
            });
        }

        let eligible = self
            .store
            .count_participants(&ParticipantFilter {
                scope: scope.clone(),
                active_only: true,
            })
            .await?;
        let responded = self
            .store
            .count_responses(&ResponseFilter {
                survey_id: survey.id,
                scope: Some(scope),
            })
            .await?;

        Ok(ResponseRate {
            eligible,
            responded,
            pct: percentage(responded, eligible),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_eligible_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
    }

    #[test]
    fn everyone_responded_is_hundred_percent() {
        assert_eq!(percentage(1, 1), 100);
        assert_eq!(percentage(37, 37), 100);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(1, 201), 0);
    }

    #[test]
    fn more_responses_than_eligible_caps_at_hundred() {
        assert_eq!(percentage(12, 10), 100);
    }
}
