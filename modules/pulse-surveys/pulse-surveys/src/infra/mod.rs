//! Adapters for the domain ports: storage, mail, identity and system sources.

pub mod identity;
pub mod mail;
pub mod storage;
pub mod system;
