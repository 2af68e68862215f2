//! Wall clock and random invitation codes.

use pulse_surveys_sdk::InvitationKind;
use rand::Rng;
use time::OffsetDateTime;

use crate::domain::ports::{Clock, CodeGenerator};

/// Unambiguous upper-case alphabet for short join codes (no 0/O, 1/I).
const JOIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Survey-response codes are hex-encoded random bytes; company-join codes are
/// short strings over [`JOIN_ALPHABET`].
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    survey_code_bytes: usize,
    join_code_length: usize,
}

impl RandomCodeGenerator {
    #[must_use]
    pub fn new(survey_code_bytes: usize, join_code_length: usize) -> Self {
        Self {
            survey_code_bytes,
            join_code_length,
        }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, kind: InvitationKind) -> String {
        let mut rng = rand::rng();
        match kind {
            InvitationKind::SurveyResponse => {
                let mut bytes = vec![0_u8; self.survey_code_bytes];
                rng.fill(bytes.as_mut_slice());
                hex::encode(bytes)
            }
            InvitationKind::CompanyJoin => (0..self.join_code_length)
                .map(|_| char::from(JOIN_ALPHABET[rng.random_range(0..JOIN_ALPHABET.len())]))
                .collect(),
        }
    }
}
