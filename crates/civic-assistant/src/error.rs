//! Error types for assistant operations

use thiserror::Error;

/// Errors raised while loading or validating a rulebook
#[derive(Error, Debug)]
pub enum RulebookError {
    /// Failed to read rulebook file
    #[error("Failed to read rulebook: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse rulebook TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Two rules share an id
    #[error("Duplicate rule id: {0}")]
    DuplicateRule(String),

    /// Scope is neither `any`, `departments` nor a department id
    #[error("Rule '{rule}' has unknown scope '{scope}'")]
    UnknownScope {
        /// Offending rule
        rule: String,
        /// Scope as written
        scope: String,
    },

    /// A response lists the same citation id twice
    #[error("{context}: duplicate citation id {id}")]
    DuplicateCitation {
        /// Rule id, fallback or welcome key
        context: String,
        /// Repeated id
        id: u32,
    },

    /// Citation ids are 1-based
    #[error("{context}: citation id 0 is not allowed")]
    ZeroCitation {
        /// Rule id, fallback or welcome key
        context: String,
    },

    /// Text cites a marker that has no citation
    #[error("{context}: marker [{id}] has no matching citation")]
    UnresolvedMarker {
        /// Rule id, fallback or welcome key
        context: String,
        /// Dangling marker id
        id: u32,
    },

    /// `home` or `default` fallback is absent
    #[error("Missing required fallback: {0}")]
    MissingFallback(&'static str),

    /// Fallback keyed by something other than a department
    #[error("Unknown fallback key: {0}")]
    UnknownFallback(String),

    /// A `words` entry produced an invalid pattern
    #[error("Rule '{rule}' has an invalid word trigger: {source}")]
    InvalidWords {
        /// Offending rule
        rule: String,
        /// Regex compilation failure
        #[source]
        source: regex::Error,
    },

    /// A trigger keyword or `all` group is empty after trimming
    #[error("Rule '{rule}' has a blank keyword in '{field}'")]
    BlankKeyword {
        /// Offending rule
        rule: String,
        /// Trigger field as written
        field: &'static str,
    },
}

/// Errors that can occur during a conversation
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Session store rejected a read or write
    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Rulebook could not be loaded
    #[error("Rulebook error: {0}")]
    Rulebook(#[from] RulebookError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
