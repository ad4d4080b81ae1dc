//! CivicSphere Domain Layer
//!
//! This crate contains the core value types for the CivicSphere assistant.
//! It depends on nothing but `uuid` and defines the vocabulary and trait
//! interfaces that the store, assistant and CLI layers build upon.
//!
//! ## Key Concepts
//!
//! - **Department**: the active service context that selects a rule table
//! - **Response**: canned body text with embedded markup plus an ordered citation list
//! - **Message**: an append-only conversation record filed under a partition
//! - **Partition**: the (department, session) pair a message belongs to
//!
//! ## Architecture
//!
//! - Pure value types only, no I/O
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod citation;
pub mod department;
pub mod message;
pub mod traits;

// Re-exports for convenience
pub use citation::{Citation, Response};
pub use department::{Department, DepartmentProfile, Icon};
pub use message::{Message, MessageId, Partition, Role, SessionId};
