//! Hashtag Harvester library.
//!
//! Drives a headless browser through an infinite-scroll search results page, extracts
//! one record per rendered post, and stores the deduplicated records in SQLite.

pub mod browser;
pub mod config;
pub mod constants;
pub mod db;
pub mod extract;
pub mod pacing;
pub mod text;
