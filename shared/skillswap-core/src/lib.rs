//! SkillSwap Core - Shared domain types and error handling
//!
//! This crate provides:
//! - The error taxonomy shared by every SkillSwap crate
//! - Opaque identifier newtypes (UserId, ConversationId, etc.)
//! - The bearer credential wrapper handed out by the auth service

pub mod domain;
pub mod error;

pub use domain::{ConversationId, Credential, MessageId, SwapId, UserId};
pub use error::{Result, SkillSwapError};
