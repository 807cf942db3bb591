use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("Could not determine a config directory. Pass --config-dir explicitly.")]
    ConfigDirUnavailable,

    #[error("Preset '{0}' not found")]
    PresetNotFound(String),

    #[error("Cannot delete '{0}': at least one preset must remain")]
    LastPreset(String),

    #[error("Failed to copy template {from} to {to}: {source}")]
    TemplateCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config document: {0}")]
    DocumentParse(#[source] serde_yaml::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Invalid profile archive: missing profile.yaml")]
    MissingProfile,

    #[error("Invalid profile archive: profile.yaml could not be parsed: {0}")]
    ProfileParse(#[source] serde_yaml::Error),

    #[error("Invalid profile archive: profile.yaml is not a mapping")]
    ProfileNotMapping,

    #[error("Failed to read profile archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to write profile archive {path}: {reason}")]
    ArchiveWrite { path: PathBuf, reason: String },

    #[error("Invalid config key '{0}'")]
    InvalidKey(String),

    #[error("Value for '{key}' does not fit the config schema: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Client institution is required")]
    MissingInstitution,

    #[error("Logo file not found: {0}")]
    LogoNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PresetError>;
