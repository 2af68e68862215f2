pub mod collector;
pub mod eligibility;
pub mod error;
pub mod identifier;
pub mod ledger;
pub mod lifecycle;
pub mod ports;
pub mod rates;
pub mod repos;
pub mod service;
