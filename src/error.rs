//! Error taxonomy for user-facing operations
//!
//! Handlers catch broadly around each operation, classify the failure from
//! its message text, and pick the reply shown to the user. Nothing here
//! propagates as a crash to the dispatch loop.

/// Broad classification of a handler failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Database,
    Api,
    Network,
    Validation,
    Unknown,
}

impl ErrorKind {
    /// Heuristic classification by keywords in the error text.
    pub fn classify(error: &anyhow::Error) -> Self {
        let text = format!("{error:#}").to_lowercase();

        const DATABASE: &[&str] = &["database", "sqlite", "sql", "constraint", "query"];
        const API: &[&str] = &["api", "http", "status", "response"];
        const NETWORK: &[&str] = &["connection", "network", "timeout", "timed out", "socket", "dns"];
        const VALIDATION: &[&str] = &["validation", "invalid", "malformed", "parse"];

        if DATABASE.iter().any(|kw| text.contains(kw)) {
            ErrorKind::Database
        } else if API.iter().any(|kw| text.contains(kw)) {
            ErrorKind::Api
        } else if NETWORK.iter().any(|kw| text.contains(kw)) {
            ErrorKind::Network
        } else if VALIDATION.iter().any(|kw| text.contains(kw)) {
            ErrorKind::Validation
        } else {
            ErrorKind::Unknown
        }
    }

    /// Message shown to the user for this kind of failure.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Database => "⚠️ Something went wrong with storage. Please try again later.",
            ErrorKind::Api => "⚠️ The places service is temporarily unavailable. Please try again later.",
            ErrorKind::Network => "⚠️ Network trouble. Please check the connection and retry.",
            ErrorKind::Validation => "❌ That request looks malformed. Please check the input.",
            ErrorKind::Unknown => "⚠️ An unexpected error occurred. The developers have been notified.",
        }
    }

    /// Short tag used in structured log fields.
    pub fn log_tag(self) -> &'static str {
        match self {
            ErrorKind::Database => "database_error",
            ErrorKind::Api => "api_error",
            ErrorKind::Network => "network_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Unknown => "unknown_error",
        }
    }
}
