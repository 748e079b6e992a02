use serde::{Deserialize, Serialize};

/// Configuration from tasktree.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Send updated entities through the push collaborator's `update`.
    /// When off, only inserts and deletes are pushed.
    #[serde(default = "default_true")]
    pub push_updates: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig { push_updates: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Append entity IDs to rendered rows
    #[serde(default)]
    pub show_ids: bool,
    #[serde(default = "default_true")]
    pub show_completed: bool,
    /// Spaces per nesting level
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            show_ids: false,
            show_completed: true,
            indent: 2,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_indent() -> usize {
    2
}
