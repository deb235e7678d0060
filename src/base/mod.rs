//! Core components, types, and utilities for the calm-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Inbound event, envelope and reply types.
//! - Handler errors and result aliases.

pub mod config;
pub mod error;
pub mod types;
