//! City Expert: a Telegram bot that finds places near the user.
//!
//! The crate is split into focused modules:
//! - [`config`]: environment configuration and API constants
//! - [`db`]: SQLite persistence for users, favorites and search history
//! - [`error`]: error classification for logging and user-facing messages
//! - [`geo`]: haversine distance and coordinate-based place identifiers
//! - [`places`]: the places API client with caching and rate limiting
//! - [`bot`]: Telegram message and callback handlers plus UI builders

pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod places;
