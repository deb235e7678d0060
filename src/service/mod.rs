//! Service integrations for external APIs and clients.
//!
//! Each service module defines a generic trait and a concrete implementation
//! (currently only Slack), allowing for easy testing with mocks.

pub mod chat;
