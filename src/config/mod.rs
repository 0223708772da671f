//! # Configuration Module
//!
//! Session tunables and their validation.

pub mod config;

pub use config::EngineConfig;
