//! # GardenHub Worker Library
//!
//! Scheduled batch jobs for GardenHub: deadline reminders, recurring task
//! generation, weather alerts and job-log cleanup.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `jobs`: The jobs themselves, runnable without the scheduler
//! - `scheduler`: Cron registration with per-job overlap guards
//! - `weather`: Geocoding and forecast clients
//!
//! ## Example
//!
//! ```no_run
//! use gardenhub_worker::jobs::JobKind;
//!
//! for kind in JobKind::ALL {
//!     println!("{} runs at {}", kind.name(), kind.schedule());
//! }
//! ```

pub mod config;
pub mod jobs;
pub mod scheduler;
pub mod weather;
