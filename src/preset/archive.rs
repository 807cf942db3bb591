//! Portable preset archives.
//!
//! An archive is a zip file with fixed entry names, so it carries no trace of
//! the key the preset had where it was exported:
//!
//! ```text
//! profile.yaml     the preset (required)
//! template.html    bound template (optional)
//! template.css     bound stylesheet (optional)
//! logo.<ext>       logo image (optional)
//! ```

use serde_yaml::Value;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::registry::{new_preset_key, remove_files};
use super::TEMPLATE_EXTENSIONS;
use crate::config::{logo_file_name, ConfigStore, StoredPreset};
use crate::error::{PresetError, Result};

pub const PROFILE_ENTRY: &str = "profile.yaml";

const PLACEHOLDER_HTML: &str = "<!DOCTYPE html>
<html>
<head><meta charset=\"utf-8\"></head>
<body>
{{ content }}
</body>
</html>
";

const PLACEHOLDER_CSS: &str = "body { font-family: sans-serif; }\n";

/// Write preset `key` to a profile archive at `destination`.
pub fn export_profile(store: &ConfigStore, key: &str, destination: &Path) -> Result<()> {
    let preset = store.preset(key)?;
    let mut profile = preset.clone();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    if let Some(logo) = store.resolve_path(&preset.company.logo) {
        let name = logo_file_name("logo", logo.extension().and_then(|e| e.to_str()));
        entries.push((name.clone(), fs::read(&logo)?));
        profile.company.logo = name;
    }

    let yaml = serde_yaml::to_string(&profile).map_err(PresetError::Serialize)?;
    entries.insert(0, (PROFILE_ENTRY.to_string(), yaml.into_bytes()));

    for ext in TEMPLATE_EXTENSIONS {
        if let Some(path) = store.paths().find_template(&preset.layout.template, ext) {
            entries.push((format!("template.{ext}"), fs::read(&path)?));
        }
    }

    let write_failed = |reason: String| PresetError::ArchiveWrite {
        path: destination.to_path_buf(),
        reason,
    };
    let file = File::create(destination).map_err(|e| write_failed(e.to_string()))?;
    if let Err(e) = write_entries(file, &entries) {
        let _ = fs::remove_file(destination);
        return Err(write_failed(e.to_string()));
    }

    tracing::info!("Exported preset '{key}' to {}", destination.display());
    Ok(())
}

fn write_entries(file: File, entries: &[(String, Vec<u8>)]) -> zip::result::ZipResult<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(file);
    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    zip.finish()?;
    Ok(())
}

fn read_entries(source: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let read_failed = |e: zip::result::ZipError| PresetError::ArchiveRead {
        path: source.to_path_buf(),
        source: e,
    };
    let file = File::open(source).map_err(|e| read_failed(e.into()))?;
    let mut archive = ZipArchive::new(file).map_err(read_failed)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(read_failed)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| read_failed(e.into()))?;
        entries.push((name, data));
    }
    Ok(entries)
}

/// Exact `wanted` entry, else the first one ending in `suffix`.
fn find_entry<'a>(
    entries: &'a [(String, Vec<u8>)],
    wanted: &str,
    suffix: &str,
) -> Option<&'a [u8]> {
    entries
        .iter()
        .find(|(name, _)| name == wanted)
        .or_else(|| entries.iter().find(|(name, _)| name.ends_with(suffix)))
        .map(|(_, data)| data.as_slice())
}

fn entry_file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Add the preset in archive `source` under a new key. Returns that key.
///
/// Archives without templates still import; the missing halves get minimal
/// placeholder content.
pub fn import_profile(store: &mut ConfigStore, source: &Path) -> Result<String> {
    let entries = read_entries(source)?;

    let profile = entries
        .iter()
        .find(|(name, _)| name == PROFILE_ENTRY)
        .map(|(_, data)| data)
        .ok_or(PresetError::MissingProfile)?;
    let value: Value = serde_yaml::from_slice(profile).map_err(PresetError::ProfileParse)?;
    if !value.is_mapping() {
        return Err(PresetError::ProfileNotMapping);
    }
    let stored = StoredPreset::from_value(value).map_err(PresetError::ProfileParse)?;

    let key = new_preset_key(store);
    let (mut preset, _) = stored.upgrade(&key);
    preset.layout.template = key.clone();
    if store.presets().any(|(_, p)| p.name == preset.name) {
        preset.name = format!("{} (Imported)", preset.name);
    }

    let paths = store.paths().clone();
    let mut written: Vec<PathBuf> = Vec::new();
    let mut write = |path: PathBuf, data: &[u8]| -> Result<()> {
        fs::write(&path, data)?;
        written.push(path);
        Ok(())
    };

    let mut result = Ok(());
    for ext in TEMPLATE_EXTENSIONS {
        let placeholder = if ext == "html" { PLACEHOLDER_HTML } else { PLACEHOLDER_CSS };
        let data = find_entry(&entries, &format!("template.{ext}"), &format!(".{ext}"))
            .unwrap_or(placeholder.as_bytes());
        result = result.and_then(|_| write(paths.user_template(&key, ext), data));
    }

    let logo = entries
        .iter()
        .find(|(name, _)| entry_file_name(name).starts_with("logo."));
    preset.company.logo = match logo {
        Some((name, data)) => {
            let ext = Path::new(name).extension().and_then(|e| e.to_str());
            let file_name = logo_file_name(&key, ext);
            result = result.and_then(|_| {
                fs::create_dir_all(paths.logos_dir())?;
                write(paths.logos_dir().join(&file_name), data)
            });
            file_name
        }
        None => String::new(),
    };

    let committed = result.and_then(|_| {
        store.commit(|doc| {
            doc.presets.insert(key.clone(), preset);
            doc.preset_order.push(key.clone());
            Ok(())
        })
    });
    if let Err(e) = committed {
        remove_files(&written);
        return Err(e);
    }

    tracing::info!("Imported preset '{key}' from {}", source.display());
    Ok(key)
}
