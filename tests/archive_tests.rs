use quote_presets::config::{AppPaths, ConfigStore};
use quote_presets::preset::{export_profile, import_profile, rename_preset, PROFILE_ENTRY};
use quote_presets::PresetError;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn open_store(root: &Path) -> ConfigStore {
    let paths = AppPaths::new(root.join("config")).with_assets_dir(root.join("assets"));
    ConfigStore::open(paths).unwrap()
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

/// Gives `creative_studio` a logo and its own template pair; returns the logo bytes.
fn decorate(store: &mut ConfigStore, root: &Path) -> Vec<u8> {
    let logo_bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];
    let logo = root.join("Brand.PNG");
    fs::write(&logo, &logo_bytes).unwrap();
    store
        .set_logo("creative_studio", logo.to_str().unwrap())
        .unwrap();

    let paths = store.paths().clone();
    fs::write(paths.user_template("creative_studio", "html"), "<main>studio</main>").unwrap();
    fs::write(paths.user_template("creative_studio", "css"), "main { margin: 0; }").unwrap();
    logo_bytes
}

#[test]
fn test_export_writes_fixed_entry_names() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());
    decorate(&mut store, temp_dir.path());

    let archive = temp_dir.path().join("studio.zip");
    export_profile(&store, "creative_studio", &archive).unwrap();

    assert_eq!(
        entry_names(&archive),
        vec!["logo.png", PROFILE_ENTRY, "template.css", "template.html"]
    );
    let profile = String::from_utf8(read_entry(&archive, PROFILE_ENTRY)).unwrap();
    assert!(profile.contains("Creative Studio"));
    assert!(profile.contains("logo.png"));
    assert!(!profile.contains(temp_dir.path().to_str().unwrap()));
}

#[test]
fn test_round_trip_keeps_logo_and_templates() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());
    let logo_bytes = decorate(&mut store, temp_dir.path());

    let archive = temp_dir.path().join("studio.zip");
    export_profile(&store, "creative_studio", &archive).unwrap();
    let key = import_profile(&mut store, &archive).unwrap();

    assert_ne!(key, "creative_studio");
    let imported = store.preset(&key).unwrap().clone();
    let source = store.preset("creative_studio").unwrap();
    assert_eq!(imported.name, "Creative Studio (Imported)");
    assert_eq!(imported.layout.template, key);
    assert_eq!(imported.colors, source.colors);
    assert_eq!(imported.company.logo, format!("{key}.png"));
    assert_eq!(store.document().preset_order.last(), Some(&key));

    let logo = store.resolve_path(&imported.company.logo).unwrap();
    assert_eq!(fs::read(logo).unwrap(), logo_bytes);

    let paths = store.paths();
    assert_eq!(
        fs::read_to_string(paths.user_template(&key, "html")).unwrap(),
        "<main>studio</main>"
    );
    assert_eq!(
        fs::read_to_string(paths.user_template(&key, "css")).unwrap(),
        "main { margin: 0; }"
    );
}

#[test]
fn test_import_into_another_store_keeps_unique_name() {
    let source_dir = TempDir::new().unwrap();
    let mut source = open_store(source_dir.path());
    rename_preset(&mut source, "minimal_clean", "Travel Edition").unwrap();
    let archive = source_dir.path().join("travel.zip");
    export_profile(&source, "minimal_clean", &archive).unwrap();

    let target_dir = TempDir::new().unwrap();
    let mut target = open_store(target_dir.path());
    let key = import_profile(&mut target, &archive).unwrap();

    assert_eq!(target.preset(&key).unwrap().name, "Travel Edition");
    assert_eq!(target.preset(&key).unwrap().company.logo, "");
    assert_eq!(target.document().presets.len(), 6);

    let reopened = open_store(target_dir.path());
    assert_eq!(reopened.preset(&key).unwrap().name, "Travel Edition");
}

#[test]
fn test_import_fills_missing_templates_with_placeholders() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());

    let archive = temp_dir.path().join("bare.zip");
    write_zip(&archive, &[(PROFILE_ENTRY, b"name: Bare\n")]);
    let key = import_profile(&mut store, &archive).unwrap();

    let preset = store.preset(&key).unwrap();
    assert_eq!(preset.name, "Bare");
    assert_eq!(preset.company.name, "Your Company");
    assert_eq!(preset.quotation_number.format, "{YYYY}-{NNN}");

    let html = fs::read_to_string(store.paths().user_template(&key, "html")).unwrap();
    let css = fs::read_to_string(store.paths().user_template(&key, "css")).unwrap();
    assert!(html.contains("<html>"));
    assert!(!css.is_empty());
}

#[test]
fn test_import_accepts_differently_named_templates() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());

    let archive = temp_dir.path().join("custom.zip");
    write_zip(
        &archive,
        &[
            (PROFILE_ENTRY, b"name: Custom\nlayout:\n  template: modern-split\n"),
            ("custom.html", b"<p>custom</p>"),
        ],
    );
    let key = import_profile(&mut store, &archive).unwrap();

    assert_eq!(store.preset(&key).unwrap().layout.template, key);
    assert_eq!(
        fs::read_to_string(store.paths().user_template(&key, "html")).unwrap(),
        "<p>custom</p>"
    );
}

#[test]
fn test_import_rejects_archive_without_profile() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());
    let before = store.document().clone();

    let archive = temp_dir.path().join("empty.zip");
    write_zip(&archive, &[("template.html", b"<p></p>")]);

    let err = import_profile(&mut store, &archive).unwrap_err();
    assert!(matches!(err, PresetError::MissingProfile));
    assert_eq!(store.document(), &before);
    assert_eq!(templates_in(store.paths()), Vec::<PathBuf>::new());
}

#[test]
fn test_import_rejects_bad_profiles() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(temp_dir.path());
    let before = store.document().clone();

    let broken = temp_dir.path().join("broken.zip");
    write_zip(&broken, &[(PROFILE_ENTRY, b"name: [unclosed")]);
    let err = import_profile(&mut store, &broken).unwrap_err();
    assert!(matches!(err, PresetError::ProfileParse(_)));

    let list = temp_dir.path().join("list.zip");
    write_zip(&list, &[(PROFILE_ENTRY, b"- a\n- b\n")]);
    let err = import_profile(&mut store, &list).unwrap_err();
    assert!(matches!(err, PresetError::ProfileNotMapping));

    let not_zip = temp_dir.path().join("plain.zip");
    fs::write(&not_zip, "not an archive").unwrap();
    let err = import_profile(&mut store, &not_zip).unwrap_err();
    assert!(matches!(err, PresetError::ArchiveRead { .. }));

    assert_eq!(store.document(), &before);
}

#[test]
fn test_export_failures() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(temp_dir.path());

    let err = export_profile(&store, "missing", &temp_dir.path().join("x.zip")).unwrap_err();
    assert!(matches!(err, PresetError::PresetNotFound(_)));

    let unwritable = temp_dir.path().join("no_such_dir").join("x.zip");
    let err = export_profile(&store, "modern_split", &unwritable).unwrap_err();
    assert!(matches!(err, PresetError::ArchiveWrite { .. }));
}

fn templates_in(paths: &AppPaths) -> Vec<PathBuf> {
    fs::read_dir(paths.templates_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
