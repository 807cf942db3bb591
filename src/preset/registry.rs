use chrono::Utc;
use std::fs;
use std::path::PathBuf;

use super::TEMPLATE_EXTENSIONS;
use crate::config::{AppPaths, ConfigStore};
use crate::error::{PresetError, Result};

/// Presets in display order as `(key, name)` pairs.
pub fn list_presets(store: &ConfigStore) -> Vec<(String, String)> {
    let doc = store.document();
    doc.ordered_keys()
        .into_iter()
        .filter_map(|key| {
            let name = doc.presets.get(&key)?.name.clone();
            Some((key, name))
        })
        .collect()
}

/// A fresh, time-based key that no preset or user template file uses yet.
pub(crate) fn new_preset_key(store: &ConfigStore) -> String {
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let key = format!("preset_{stamp}");
        let taken = store.document().presets.contains_key(&key)
            || TEMPLATE_EXTENSIONS
                .iter()
                .any(|ext| store.paths().user_template(&key, ext).exists());
        if !taken {
            return key;
        }
        stamp += 1;
    }
}

/// Copy the template pair bound to `from` into user templates named after `to`.
///
/// Returns the files written. Halves that exist nowhere are skipped; a failed
/// copy removes what was already written.
pub(crate) fn copy_templates(paths: &AppPaths, from: &str, to: &str) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for ext in TEMPLATE_EXTENSIONS {
        let Some(source) = paths.find_template(from, ext) else {
            tracing::warn!("No {ext} template found for '{from}', skipping");
            continue;
        };
        let dest = paths.user_template(to, ext);
        if let Err(e) = fs::copy(&source, &dest) {
            remove_files(&written);
            return Err(PresetError::TemplateCopy {
                from: source,
                to: dest,
                source: e,
            });
        }
        written.push(dest);
    }
    Ok(written)
}

pub(crate) fn remove_files(files: &[PathBuf]) {
    for file in files {
        if let Err(e) = fs::remove_file(file) {
            tracing::warn!("Could not remove {}: {e}", file.display());
        }
    }
}

/// Create a preset named `name` as a copy of `source_key` (or the active preset).
///
/// The copy gets a new key, its own template pair and a fresh numbering
/// sequence. Returns the new key.
pub fn create_preset(
    store: &mut ConfigStore,
    name: &str,
    source_key: Option<&str>,
) -> Result<String> {
    let source_key = source_key.unwrap_or(store.active_preset_key()).to_string();
    let source = store.preset(&source_key)?;

    let key = new_preset_key(store);
    let mut preset = source.clone();
    preset.name = name.to_string();
    preset.layout.template = key.clone();
    preset.quotation_number.reset();

    let written = copy_templates(store.paths(), &source.layout.template, &key)?;
    let committed = store.commit(|doc| {
        doc.presets.insert(key.clone(), preset);
        doc.preset_order.push(key.clone());
        Ok(())
    });
    if let Err(e) = committed {
        remove_files(&written);
        return Err(e);
    }

    tracing::info!("Created preset '{key}' from '{source_key}'");
    Ok(key)
}

/// Copy `source_key` under a new key. Default name: `"<source name> (Copy)"`.
pub fn duplicate_preset(
    store: &mut ConfigStore,
    source_key: &str,
    new_name: Option<&str>,
) -> Result<String> {
    let name = match new_name {
        Some(n) => n.to_string(),
        None => format!("{} (Copy)", store.preset(source_key)?.name),
    };
    create_preset(store, &name, Some(source_key))
}

/// Remove a preset and its user template files. The last preset cannot be deleted.
pub fn delete_preset(store: &mut ConfigStore, key: &str) -> Result<()> {
    store.preset(key)?;
    if store.document().presets.len() <= 1 {
        return Err(PresetError::LastPreset(key.to_string()));
    }

    store.commit(|doc| {
        doc.presets.remove(key);
        doc.preset_order.retain(|k| k != key);
        if doc.active_preset == key {
            doc.active_preset = doc.ordered_keys().into_iter().next().unwrap_or_default();
        }
        Ok(())
    })?;

    // Bundled templates are never touched; only the user copies go.
    for ext in TEMPLATE_EXTENSIONS {
        let file = store.paths().user_template(key, ext);
        if file.exists() {
            if let Err(e) = fs::remove_file(&file) {
                tracing::warn!("Could not remove {}: {e}", file.display());
            }
        }
    }

    tracing::info!("Deleted preset '{key}'");
    Ok(())
}

/// Change the display name. The key and its template binding never change.
pub fn rename_preset(store: &mut ConfigStore, key: &str, new_name: &str) -> Result<()> {
    store.preset(key)?;
    store.commit(|doc| {
        if let Some(preset) = doc.presets.get_mut(key) {
            preset.name = new_name.to_string();
        }
        Ok(())
    })
}
