//! Hive SSH honeypot library
//!
//! This module exposes the core functionality for use in integration tests
//! and the main binary.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod keystore;
pub mod logging;
pub mod realm;
pub mod shell;
pub mod ssh;
