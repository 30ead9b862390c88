//! Pairbot core — shared types, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: messages, decisions, observations, turn records, run outcomes
//! - **config**: typed schema + file/env loader
//! - **utils**: path and string helpers

pub mod config;
pub mod types;
pub mod utils;
