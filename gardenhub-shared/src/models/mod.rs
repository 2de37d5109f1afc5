/// Database models for GardenHub
///
/// This module contains all database models and their CRUD operations. The
/// domain services reach them through the `store::Store` trait; read-only
/// API handlers call them directly with the pool.
///
/// # Models
///
/// - `user`: User accounts and community profiles
/// - `social`: Follows, blocks and push device registrations
/// - `garden`: Gardens and custom task types
/// - `membership`: User-garden relationships with roles and status
/// - `task`: Garden tasks, assignees and recurrence
/// - `forum`: Forum posts, comments and likes
/// - `report`: Moderation reports
/// - `notification`: In-app notifications
/// - `badge`: Badge catalog and awards
/// - `event`: Garden events and attendance
/// - `job_run`: Scheduled-job execution log

pub mod badge;
pub mod event;
pub mod forum;
pub mod garden;
pub mod job_run;
pub mod membership;
pub mod notification;
pub mod report;
pub mod social;
pub mod task;
pub mod user;
