//! # GardenHub API Server Library
//!
//! HTTP surface of GardenHub: accounts, gardens and memberships, tasks,
//! the forum, notifications, badges, events and moderation.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and the suspension gate
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
