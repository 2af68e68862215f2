//! Pulse Surveys Module Implementation
//!
//! The public API is defined in `pulse-surveys-sdk` and re-exported here.

pub use pulse_surveys_sdk::{PulseSurveysClient, PulseSurveysError};

pub mod config;
pub use config::{PulseSurveysConfig, SecretString};

pub mod local_client;
pub use local_client::PulseSurveysLocalClient;

#[doc(hidden)]
pub mod domain;
pub use domain::service::{Service, ServiceDeps};

#[doc(hidden)]
pub mod infra;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
