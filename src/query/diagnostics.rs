//! Structured diagnostics emitted while compiling a query.
//!
//! Diagnostics carry a message key and positional parameters instead of free
//! text so the caller can localize them.

use serde::Serialize;
use std::fmt;

/// Message keys understood by the diagnostics sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKey {
    /// Params: what is unavailable (e.g. "insource regex")
    FeatureNotAvailable,
    /// Params: keyword, max
    FeatureTooManyConditions,
    /// Params: keyword, value
    FileNumericNotANumber,
    /// Params: keyword
    FileNumericMultiArgumentWithSign,
    /// Params: category, limit
    DeepcatTooMany,
    /// Params: category, error
    DeepcatException,
    /// Params: page ids, error
    IncategoryLookupFailed,
    /// Params: topic
    ArticletopicInvalidTopic,
    /// Params: keyword
    ArticletopicNoValidTopic,
    /// Params: length, max
    QueryTooLong,
}

impl MessageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::FeatureNotAvailable => "feature-not-available",
            MessageKey::FeatureTooManyConditions => "feature-too-many-conditions",
            MessageKey::FileNumericNotANumber => "file-numeric-not-a-number",
            MessageKey::FileNumericMultiArgumentWithSign => "file-numeric-multi-argument-with-sign",
            MessageKey::DeepcatTooMany => "deepcat-too-many",
            MessageKey::DeepcatException => "deepcat-exception",
            MessageKey::IncategoryLookupFailed => "incategory-lookup-failed",
            MessageKey::ArticletopicInvalidTopic => "articletopic-invalid-topic",
            MessageKey::ArticletopicNoValidTopic => "articletopic-no-valid-topic",
            MessageKey::QueryTooLong => "query-too-long",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic: a message key plus its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub key: MessageKey,
    pub params: Vec<String>,
}

impl Diagnostic {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl ToString) -> Self {
        self.params.push(param.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if !self.params.is_empty() {
            write!(f, " ({})", self.params.join(", "))?;
        }
        Ok(())
    }
}
