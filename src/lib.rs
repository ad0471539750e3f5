//! # Tour Finder Telegram Bot
//!
//! A Telegram bot that searches a flight pricing API for round trips over a
//! configured departure window, keeps offers matching the trip length and
//! direct-flight preference, and replies with formatted offer cards.

pub mod bot;
pub mod config;
pub mod errors;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod tours;

// Re-export types for easier access
pub use tours::{Tour, TourFilter, TourSearch, TourSearchClient};
