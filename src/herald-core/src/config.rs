//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flags::ESCAPE_MARKER;
use crate::suggestion::SuggestionMethod;

/// Tunables of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Filter applied to suggestion candidates.
    pub suggestion_method: SuggestionMethod,
    /// Match flag keys case-insensitively.
    pub ignore_flag_case: bool,
    /// Prefix that makes a flag-shaped token literal.
    pub escape_marker: char,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            suggestion_method: SuggestionMethod::StartsWith,
            ignore_flag_case: false,
            escape_marker: ESCAPE_MARKER,
        }
    }
}

impl DispatcherConfig {
    /// The escape marker must not collide with flag or named syntax.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.escape_marker, '-' | ':' | '=') || self.escape_marker.is_whitespace() {
            return Err(ConfigError::InvalidEscapeMarker(self.escape_marker));
        }
        Ok(())
    }
}
