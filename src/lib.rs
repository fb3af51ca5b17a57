//! # OSF Web Library
//!
//! Comment moderation, external account linking, developer OAuth2 applications and
//! multi-party sanction approval for an OSF-style research platform.

pub mod auth;
pub mod cas;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod sanctions;
pub mod server;
pub mod telemetry;
pub mod tokens;
pub use migration;
