//! # GardenHub Shared Library
//!
//! This crate contains the domain model, the data-store abstraction and the
//! business logic shared by the GardenHub API server and the scheduled-job
//! worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `store`: Abstract data store used by the domain services
//! - `events`: Domain events and the synchronous listener bus
//! - `notify`: Notification dispatcher and push gateway
//! - `badges`: Badge rule engine
//! - `gardens`: Garden membership lifecycle and events
//! - `community`: Registration, follows and forum writes
//! - `tasks`: Task workflow (assignment, status transitions)
//! - `moderation`: Report workflow and moderation actions
//! - `media`: Base64 data-URL image handling
//! - `services`: Wiring of the bus, listeners and services
//! - `auth`: Authentication and authorization utilities
//! - `db`: Connection pool and migrations
//! - `error`: Common domain error type

pub mod auth;
pub mod badges;
pub mod community;
pub mod db;
pub mod error;
pub mod events;
pub mod gardens;
pub mod media;
pub mod models;
pub mod moderation;
pub mod notify;
pub mod services;
pub mod store;
pub mod tasks;

/// Current version of the GardenHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
