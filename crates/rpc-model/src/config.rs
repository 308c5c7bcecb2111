//! Client-side configuration read by the dispatcher.

use serde::{Deserialize, Serialize};

/// Configuration exposed by an [`ExecutionContext`](crate::ExecutionContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inject the environment context into remote calls that do not pass
    /// an explicit `context` keyword argument.
    pub auto_context: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { auto_context: true }
    }
}

impl Config {
    pub fn with_auto_context(mut self, enabled: bool) -> Self {
        self.auto_context = enabled;
        self
    }

    /// Parses a JSON object; missing keys take their default.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("configuration must be a JSON object"));
        }
        serde_json::from_value(value)
    }
}
