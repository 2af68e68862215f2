//! Storage infrastructure for pulse surveys.
//!
//! `InMemoryStore` backs tests and tooling; `SeaOrmStore` is the SQL backend
//! whose conditional statements carry the exactly-once guarantees.

pub mod entity;
pub mod in_memory;
pub mod mapper;
pub mod migrations;
pub mod sea_orm_repo;

pub use in_memory::InMemoryStore;
pub use migrations::Migrator;
pub use sea_orm_repo::SeaOrmStore;
