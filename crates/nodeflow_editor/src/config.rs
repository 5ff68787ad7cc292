// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings, stored as RON (`nodeflow.ron`).

use nodeflow_graph::{CommandEngine, RecordingEngine, ScriptEngine};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "nodeflow.ron";

/// Where evaluated commands go
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchTarget {
    /// One command per line on stdout
    #[default]
    Stdout,
    /// One command per line in a script file
    Script {
        /// Script file, truncated on open
        path: PathBuf,
    },
    /// Keep commands in memory only
    DryRun,
}

impl DispatchTarget {
    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Stdout => "Standard output",
            Self::Script { .. } => "Script file",
            Self::DryRun => "Dry run",
        }
    }

    /// Open an engine for this target
    pub fn open_engine(&self) -> std::io::Result<Box<dyn CommandEngine>> {
        let engine: Box<dyn CommandEngine> = match self {
            Self::Stdout => Box::new(ScriptEngine::new(std::io::stdout())),
            Self::Script { path } => {
                Box::new(ScriptEngine::new(BufWriter::new(File::create(path)?)))
            }
            Self::DryRun => Box::new(RecordingEngine::new()),
        };
        Ok(engine)
    }
}

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Format version
    pub version: u32,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Dispatch target for evaluated commands
    pub dispatch: DispatchTarget,
    /// Evaluate after every committed edit
    pub auto_evaluate: bool,
    /// Undo history depth
    pub history_depth: usize,
    /// Operation created by the break-edge gesture
    pub break_edge_operation: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            log_level: "info".to_string(),
            dispatch: DispatchTarget::Stdout,
            auto_evaluate: false,
            history_depth: 100,
            break_edge_operation: "Dot".to_string(),
        }
    }
}

impl EditorSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: EditorSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Settings file inside a directory
    pub fn settings_file_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EditorSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.dispatch, DispatchTarget::Stdout);
        assert_eq!(settings.break_edge_operation, "Dot");
        assert!(!settings.auto_evaluate);
    }

    #[test]
    fn test_serialization() {
        let settings = EditorSettings {
            dispatch: DispatchTarget::Script {
                path: PathBuf::from("out.mb"),
            },
            auto_evaluate: true,
            ..Default::default()
        };
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let text = ron::ser::to_string_pretty(&settings, config).unwrap();
        let parsed: EditorSettings = ron::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: EditorSettings = ron::from_str("(auto_evaluate: true)").unwrap();
        assert!(parsed.auto_evaluate);
        assert_eq!(parsed.history_depth, 100);
    }

    #[test]
    fn test_missing_and_newer_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = EditorSettings::settings_file_path(dir.path());
        assert_eq!(
            EditorSettings::load_or_default(&path).unwrap(),
            EditorSettings::default()
        );

        let newer = EditorSettings {
            version: SETTINGS_FORMAT_VERSION + 1,
            ..Default::default()
        };
        newer.save(&path).unwrap();
        assert!(matches!(
            EditorSettings::load(&path),
            Err(ConfigError::UnsupportedVersion { .. })
        ));
    }
}
