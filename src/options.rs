use serde::{Deserialize, Serialize};

/// Registry-wide switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleOptions {
    /// Unknown feature lookups fail instead of reading as inactive.
    pub strict: bool,
    /// Remember evaluated outcomes for the registry's lifetime.
    pub preserve: bool,
}

impl Default for ToggleOptions {
    fn default() -> Self {
        Self {
            strict: false,
            preserve: true,
        }
    }
}
