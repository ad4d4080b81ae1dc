//! CivicSphere Assistant
//!
//! Scripted intent matching and citation-aware rendering for the
//! CivicSphere services portal.
//!
//! # Overview
//!
//! - **Rulebooks** ([`Rulebook`]): declarative rule tables loaded from TOML,
//!   validated at load time, evaluated by explicit priority
//! - **Matching** ([`RuleMatcher`]): first-match-wins over the rules that
//!   apply to the active department, falling back when nothing fires
//! - **Rendering** ([`render`]): link, bold and citation-marker tokenization
//!   into [`DisplaySegment`]s
//! - **Conversations** ([`Conversation`]): welcome bootstrap, turns with
//!   simulated latency, department switching over a shared session store
//!
//! # Usage
//!
//! ```
//! use civic_assistant::{render, BuiltinRulebook, RuleMatcher, Rulebook};
//! use civic_domain::Department;
//!
//! let matcher = RuleMatcher::new(Rulebook::builtin(BuiltinRulebook::Portal).unwrap());
//! let matched = matcher.match_input("How do I renew my registration?", Department::Vehicle);
//!
//! for segment in render(&matched.response) {
//!     println!("{:?}", segment);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod latency;
pub mod matcher;
pub mod render;
pub mod rulebook;

pub use clock::MonotonicClock;
pub use config::AssistantConfig;
pub use conversation::{Conversation, Turn};
pub use error::{AssistantError, RulebookError};
pub use latency::LatencyConfig;
pub use matcher::{Matched, RuleMatcher};
pub use render::{plain_text, render, render_message, to_markup, unresolved_markers, DisplaySegment};
pub use rulebook::{BuiltinRulebook, Rule, Rulebook, Scope, Trigger};
