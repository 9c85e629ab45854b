//! Engine configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Size ceiling for mirroring a staged file to the system clipboard.
pub const DEFAULT_CLIPBOARD_MIRROR_LIMIT: u64 = 250 * 1024 * 1024;

/// Configuration for the operation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Capacity of the bounded message queue.
    #[builder(default = "100")]
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Pending-message count at which intermediate ticks are dropped.
    #[builder(default = "5")]
    #[serde(default = "default_tick_threshold")]
    pub tick_threshold: usize,

    /// Largest file whose content is mirrored to the system clipboard.
    #[builder(default = "DEFAULT_CLIPBOARD_MIRROR_LIMIT")]
    #[serde(default = "default_mirror_limit")]
    pub clipboard_mirror_limit: u64,

    /// Freedesktop trash root (`$XDG_DATA_HOME/Trash`).
    #[builder(default = "default_trash_root()")]
    #[serde(default = "default_trash_root")]
    pub trash_root: PathBuf,

    /// Delegate to the platform recycle facility instead of the built-in
    /// freedesktop implementation.
    #[builder(default = "default_native_trash()")]
    #[serde(default = "default_native_trash")]
    pub use_native_trash: bool,

    /// Mount prefixes treated as external volumes when device ids are
    /// unavailable.
    #[builder(default = "default_external_prefixes()")]
    #[serde(default = "default_external_prefixes")]
    pub external_mount_prefixes: Vec<PathBuf>,
}

fn default_bus_capacity() -> usize {
    100
}

fn default_tick_threshold() -> usize {
    5
}

fn default_mirror_limit() -> u64 {
    DEFAULT_CLIPBOARD_MIRROR_LIMIT
}

fn default_trash_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("Trash")
}

fn default_native_trash() -> bool {
    cfg!(any(target_os = "macos", target_os = "windows"))
}

fn default_external_prefixes() -> Vec<PathBuf> {
    ["/mnt", "/media", "/run/media", "/Volumes"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let capacity = self.bus_capacity.unwrap_or_else(default_bus_capacity);
        let threshold = self.tick_threshold.unwrap_or_else(default_tick_threshold);
        if threshold == 0 {
            return Err("Tick threshold must be at least 1".to_string());
        }
        if capacity <= threshold {
            return Err(format!(
                "Bus capacity ({capacity}) must exceed the tick threshold ({threshold})"
            ));
        }
        if let Some(ref root) = self.trash_root {
            if root.as_os_str().is_empty() {
                return Err("Trash root cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Default config with a custom trash root.
    pub fn with_trash_root(trash_root: impl Into<PathBuf>) -> Self {
        Self {
            trash_root: trash_root.into(),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus_capacity: default_bus_capacity(),
            tick_threshold: default_tick_threshold(),
            clipboard_mirror_limit: DEFAULT_CLIPBOARD_MIRROR_LIMIT,
            trash_root: default_trash_root(),
            use_native_trash: default_native_trash(),
            external_mount_prefixes: default_external_prefixes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .bus_capacity(16usize)
            .tick_threshold(3usize)
            .trash_root("/tmp/trash")
            .use_native_trash(false)
            .build()
            .unwrap();

        assert_eq!(config.bus_capacity, 16);
        assert_eq!(config.tick_threshold, 3);
        assert_eq!(config.trash_root, PathBuf::from("/tmp/trash"));
        assert_eq!(config.clipboard_mirror_limit, 250 * 1024 * 1024);
    }

    #[test]
    fn test_config_rejects_small_capacity() {
        let result = EngineConfig::builder()
            .bus_capacity(5usize)
            .tick_threshold(5usize)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.bus_capacity, 100);
        assert_eq!(config.tick_threshold, 5);
        assert!(config.trash_root.ends_with("Trash"));
        assert!(config
            .external_mount_prefixes
            .contains(&PathBuf::from("/media")));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"tick_threshold": 8}"#).unwrap();
        assert_eq!(config.tick_threshold, 8);
        assert_eq!(config.bus_capacity, 100);
    }
}
