mod client;
mod document;
mod migrate;
mod preset;
mod resolve;
mod store;

pub use client::Client;
pub use document::{
    legacy_template_key, seed_preset, LlmSettings, RootDocument, DEFAULT_SYSTEM_PROMPT,
    LEGACY_SYSTEM_PROMPTS, LEGACY_TEMPLATE_NAMES, SEEDED_PRESET_KEYS,
};
pub use migrate::{migrate, Migration};
pub(crate) use migrate::StoredPreset;
pub use preset::{
    Bank, Company, Contact, Defaults, Layout, Legal, Preset, QuotationNumberState, Snippets,
    VatType,
};
pub use resolve::PathResolver;
pub use store::ConfigStore;

use crate::error::{PresetError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions of the template pair every preset owns.
pub const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "css"];

/// Environment variable overriding the bundled assets directory
pub const ASSETS_ENV: &str = "QUOTE_PRESETS_ASSETS";

/// Get the config directory path (XDG config dir, or ~/.quote-presets/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "quote-presets") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or(PresetError::ConfigDirUnavailable)?;
    Ok(home.join(".quote-presets"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Bundled assets shipped with the application: `$QUOTE_PRESETS_ASSETS`,
/// or `assets/` next to the executable.
pub fn default_assets_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(ASSETS_ENV) {
        return Some(PathBuf::from(dir));
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("assets")))
}

/// Where everything lives on disk.
///
/// ```text
/// <config_dir>/
/// ├── config.yaml
/// ├── templates/   {key}.html, {key}.css
/// ├── styles/
/// └── logos/       internalized logo copies
/// ```
#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    assets_dir: Option<PathBuf>,
}

impl AppPaths {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            assets_dir: default_assets_dir(),
        }
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(assets_dir.into());
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.yaml")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.config_dir.join("templates")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.config_dir.join("styles")
    }

    pub fn logos_dir(&self) -> PathBuf {
        self.config_dir.join("logos")
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }

    pub fn bundled_templates_dir(&self) -> Option<PathBuf> {
        self.assets_dir.as_ref().map(|dir| dir.join("templates"))
    }

    /// User-writable template file for `key` with extension `ext` ("html" or "css")
    pub fn user_template(&self, key: &str, ext: &str) -> PathBuf {
        self.templates_dir().join(format!("{key}.{ext}"))
    }

    /// The template file that applies to `key`: the user copy shadows the bundled one.
    pub fn find_template(&self, key: &str, ext: &str) -> Option<PathBuf> {
        let user = self.user_template(key, ext);
        if user.is_file() {
            return Some(user);
        }
        self.bundled_templates_dir()
            .map(|dir| dir.join(format!("{key}.{ext}")))
            .filter(|p| p.is_file())
    }

    /// Create the config directory and its subdirectories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(self.templates_dir())?;
        fs::create_dir_all(self.styles_dir())?;
        fs::create_dir_all(self.logos_dir())?;
        Ok(())
    }
}

/// Name a logo gets inside the logo store.
pub fn logo_file_name(key: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{key}.{}", ext.to_lowercase()),
        _ => key.to_string(),
    }
}
