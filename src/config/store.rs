use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::migrate::{internalize_logos, migrate, store_logo};
use super::{logo_file_name, AppPaths, PathResolver, Preset, QuotationNumberState, RootDocument};
use crate::error::{PresetError, Result};

/// Owns the configuration document for one config directory.
///
/// Every mutation goes through [`ConfigStore::commit`]: the change is applied
/// to a copy, the copy is written to disk, and only then does it replace the
/// in-memory document. A failed write leaves the store untouched.
#[derive(Debug)]
pub struct ConfigStore {
    paths: AppPaths,
    document: RootDocument,
}

impl ConfigStore {
    /// Create the directory layout and load (and migrate) the document.
    pub fn open(paths: AppPaths) -> Result<Self> {
        paths.ensure_dirs()?;
        let document = load_document(&paths);
        Ok(Self { paths, document })
    }

    /// Re-read the document from disk, discarding in-memory state.
    pub fn reload(&mut self) {
        if let Err(e) = self.paths.ensure_dirs() {
            tracing::warn!("Could not create config directories: {e}");
        }
        self.document = load_document(&self.paths);
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn document(&self) -> &RootDocument {
        &self.document
    }

    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.paths)
    }

    /// Resolve a stored asset reference (e.g. `company.logo`) to an existing file.
    pub fn resolve_path(&self, reference: &str) -> Option<PathBuf> {
        self.resolver().resolve(reference)
    }

    /// Write the current document to disk.
    pub fn save(&self) -> Result<()> {
        write_document(&self.paths, &self.document)
    }

    pub(crate) fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut RootDocument) -> Result<T>,
    ) -> Result<T> {
        let mut draft = self.document.clone();
        let out = change(&mut draft)?;
        write_document(&self.paths, &draft)?;
        self.document = draft;
        Ok(out)
    }

    /// Dot-path lookup, e.g. `presets.modern_split.company.name`.
    ///
    /// Returns `default` when a segment is missing, a parent is not a mapping,
    /// or the value is null.
    pub fn get(&self, dotted_key: &str, default: Value) -> Value {
        let Ok(root) = serde_yaml::to_value(&self.document) else {
            return default;
        };
        let mut current = &root;
        for segment in dotted_key.split('.') {
            match current {
                Value::Mapping(map) => match map.get(segment) {
                    Some(v) => current = v,
                    None => return default,
                },
                _ => return default,
            }
        }
        if current.is_null() {
            default
        } else {
            current.clone()
        }
    }

    /// Typed variant of [`ConfigStore::get`].
    pub fn get_as<T: DeserializeOwned>(&self, dotted_key: &str) -> Option<T> {
        let value = self.get(dotted_key, Value::Null);
        if value.is_null() {
            return None;
        }
        serde_yaml::from_value(value).ok()
    }

    /// Write `value` at a dotted path and persist.
    ///
    /// The result must still fit the document schema. Presets cannot be added
    /// or removed this way and numbering counters cannot be moved; template
    /// bindings stay on their keys.
    pub fn set(&mut self, dotted_key: &str, value: Value) -> Result<()> {
        let segments: Vec<&str> = dotted_key.split('.').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(PresetError::InvalidKey(dotted_key.to_string()));
        }

        self.commit(|doc| {
            let mut root = serde_yaml::to_value(&*doc).map_err(PresetError::Serialize)?;
            set_path(&mut root, &segments, value)
                .ok_or_else(|| PresetError::InvalidKey(dotted_key.to_string()))?;

            let invalid = |reason: String| PresetError::InvalidValue {
                key: dotted_key.to_string(),
                reason,
            };
            let mut updated: RootDocument =
                serde_yaml::from_value(root).map_err(|e| invalid(e.to_string()))?;

            if !updated.presets.keys().eq(doc.presets.keys()) {
                return Err(invalid(
                    "presets can only be added or removed with create/delete".to_string(),
                ));
            }
            for (key, preset) in updated.presets.iter_mut() {
                preset.layout.template = key.clone();
                let stored = doc.presets.get(key).map(|p| &p.quotation_number);
                if stored.is_some_and(|old| !same_numbering(old, &preset.quotation_number)) {
                    return Err(invalid(
                        "numbering counters only move when a number is issued".to_string(),
                    ));
                }
            }
            updated.active_preset = updated.active_key().to_string();

            *doc = updated;
            Ok(())
        })
    }

    pub fn preset(&self, key: &str) -> Result<&Preset> {
        self.document
            .presets
            .get(key)
            .ok_or_else(|| PresetError::PresetNotFound(key.to_string()))
    }

    pub fn presets(&self) -> impl Iterator<Item = (&String, &Preset)> {
        self.document.presets.iter()
    }

    pub fn active_preset_key(&self) -> &str {
        self.document.active_key()
    }

    pub fn active_preset(&self) -> Result<&Preset> {
        self.preset(self.active_preset_key())
    }

    pub fn set_active_preset(&mut self, key: &str) -> Result<()> {
        self.preset(key)?;
        self.commit(|doc| {
            doc.active_preset = key.to_string();
            Ok(())
        })
    }

    /// Replace a preset with an edited copy.
    ///
    /// The template binding is pinned to `key` and the numbering counter state
    /// is carried over from the stored preset. External logo paths are copied
    /// into the logo store.
    pub fn update_preset(&mut self, key: &str, mut preset: Preset) -> Result<()> {
        let paths = self.paths.clone();
        self.commit(|doc| {
            let current = doc
                .presets
                .get_mut(key)
                .ok_or_else(|| PresetError::PresetNotFound(key.to_string()))?;
            keep_numbering(&current.quotation_number, &mut preset.quotation_number);
            preset.layout.template = key.to_string();
            *current = preset;
            internalize_logos(doc, &paths);
            Ok(())
        })
    }

    /// Point a preset's logo at `reference`, copying the file into the logo store.
    /// An empty reference clears the logo.
    pub fn set_logo(&mut self, key: &str, reference: &str) -> Result<()> {
        self.preset(key)?;
        let paths = self.paths.clone();
        let mut replaced = None;
        let stored = if reference.trim().is_empty() {
            String::new()
        } else {
            let source = PathResolver::new(&paths)
                .resolve(reference)
                .ok_or_else(|| PresetError::LogoNotFound(reference.to_string()))?;
            let ext = source.extension().and_then(|e| e.to_str());
            let dest = paths.logos_dir().join(logo_file_name(key, ext));
            let previous = fs::read(&dest).ok();
            let name = store_logo(&paths, key, &source)?;
            replaced = Some((dest, previous));
            name
        };

        let committed = self.commit(|doc| {
            if let Some(preset) = doc.presets.get_mut(key) {
                preset.company.logo = stored;
            }
            Ok(())
        });
        if committed.is_err() {
            if let Some((dest, previous)) = replaced {
                restore_file(&dest, previous);
            }
        }
        committed
    }
}

fn keep_numbering(stored: &QuotationNumberState, edited: &mut QuotationNumberState) {
    edited.counter = stored.counter;
    edited.last_reset_year = stored.last_reset_year;
    edited.last_reset_month = stored.last_reset_month;
    edited.last_issued_day = stored.last_issued_day;
}

fn same_numbering(stored: &QuotationNumberState, edited: &QuotationNumberState) -> bool {
    edited.counter == stored.counter
        && edited.last_reset_year == stored.last_reset_year
        && edited.last_reset_month == stored.last_reset_month
        && edited.last_issued_day == stored.last_issued_day
}

/// Put back the bytes a file had before, or remove it if it did not exist.
fn restore_file(path: &Path, previous: Option<Vec<u8>>) {
    let outcome = match previous {
        Some(bytes) => fs::write(path, bytes),
        None => fs::remove_file(path),
    };
    if let Err(e) = outcome {
        tracing::warn!("Could not restore {}: {e}", path.display());
    }
}

fn set_path(root: &mut Value, segments: &[&str], value: Value) -> Option<()> {
    let (last, parents) = segments.split_last()?;
    let mut current = root;
    for segment in parents {
        current = current
            .as_mapping_mut()?
            .entry(Value::String(segment.to_string()))
            .or_insert(Value::Mapping(Mapping::new()));
    }
    current
        .as_mapping_mut()?
        .insert(Value::String(last.to_string()), value);
    Some(())
}

/// Read, parse and migrate the document. Never fails: anything unreadable
/// yields the seeded default document.
fn load_document(paths: &AppPaths) -> RootDocument {
    let path = paths.config_file();
    if !path.exists() {
        return RootDocument::default();
    }

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Could not read {}: {e}", path.display());
            return RootDocument::default();
        }
    };
    let raw: Value = match serde_yaml::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Could not parse {}: {e}", path.display());
            return RootDocument::default();
        }
    };

    match migrate(raw, paths) {
        Ok(migration) => {
            if migration.changed() {
                if let Err(e) = write_document(paths, &migration.document) {
                    tracing::warn!("Could not write migrated config: {e}");
                }
            }
            migration.document
        }
        Err(e) => {
            tracing::warn!("Falling back to default config: {e}");
            RootDocument::default()
        }
    }
}

/// Serialize the whole document and swap it into place (write-then-rename).
fn write_document(paths: &AppPaths, document: &RootDocument) -> Result<()> {
    paths.ensure_dirs()?;
    let path = paths.config_file();
    let content = serde_yaml::to_string(document).map_err(PresetError::Serialize)?;

    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, content).map_err(|source| PresetError::Save {
        path: tmp.clone(),
        source,
    })?;
    if let Err(source) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(PresetError::Save { path, source });
    }

    tracing::debug!("Saved config to {}", path.display());
    Ok(())
}
