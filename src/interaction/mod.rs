//! Event handling and user interactions for calm-bot.
//!
//! This module provides functionality for handling inbound platform events:
//! - Draining and acknowledging the event channel
//! - Answering slash commands
//! - Answering @-mentions and messages

pub mod dispatch;
pub mod notification;
pub mod slash_command;
