use quote_presets::config::{AppPaths, Client, ConfigStore};
use quote_presets::PresetError;
use std::fs;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> ConfigStore {
    let paths = AppPaths::new(dir.path().join("config")).with_assets_dir(dir.path().join("assets"));
    ConfigStore::open(paths).unwrap()
}

fn client(institution: &str) -> Client {
    Client {
        institution: institution.to_string(),
        contact: "Dr. Jane Roe".to_string(),
        email: "jane@example.org".to_string(),
        address: "Main St 1\n12345 Berlin".to_string(),
    }
}

#[test]
fn test_fresh_store_has_no_clients() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    assert!(store.clients_list().is_empty());
}

#[test]
fn test_add_and_list_clients_sorted_by_institution() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(&temp_dir);

    let zeta = store.add_client(client("Zeta Labs")).unwrap();
    let alpha = store.add_client(client("alpha university")).unwrap();
    assert_ne!(zeta, alpha);
    assert!(alpha.starts_with("client_"));

    assert_eq!(
        store.clients_list(),
        vec![
            (alpha.clone(), "alpha university".to_string()),
            (zeta.clone(), "Zeta Labs".to_string()),
        ]
    );
    assert_eq!(store.client(&alpha).unwrap().address, "Main St 1\n12345 Berlin");

    let reopened = open_store(&temp_dir);
    assert_eq!(reopened.client(&zeta).unwrap(), &client("Zeta Labs"));
}

#[test]
fn test_client_requires_institution() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(&temp_dir);

    let err = store.add_client(client("   ")).unwrap_err();
    assert!(matches!(err, PresetError::MissingInstitution));
    assert!(store.clients_list().is_empty());

    let key = store.add_client(client("Acme")).unwrap();
    let err = store.update_client(&key, client("")).unwrap_err();
    assert!(matches!(err, PresetError::MissingInstitution));
    assert_eq!(store.client(&key).unwrap().institution, "Acme");
}

#[test]
fn test_update_and_delete_client() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(&temp_dir);
    let key = store.add_client(client("Acme")).unwrap();

    let mut edited = store.client(&key).unwrap().clone();
    edited.email = "billing@acme.test".to_string();
    store.update_client(&key, edited).unwrap();
    assert_eq!(open_store(&temp_dir).client(&key).unwrap().email, "billing@acme.test");

    store.delete_client(&key).unwrap();
    assert!(matches!(
        store.client(&key).unwrap_err(),
        PresetError::ClientNotFound(_)
    ));
    assert!(open_store(&temp_dir).clients_list().is_empty());

    assert!(matches!(
        store.delete_client(&key).unwrap_err(),
        PresetError::ClientNotFound(_)
    ));
    assert!(store.update_client("client_0", client("Ghost")).is_err());
}

#[test]
fn test_document_without_clients_gains_empty_map() {
    let temp_dir = TempDir::new().unwrap();
    let paths = AppPaths::new(temp_dir.path().join("config"));
    paths.ensure_dirs().unwrap();
    fs::write(
        paths.config_file(),
        "active_preset: mine\npresets:\n  mine:\n    name: Mine\n",
    )
    .unwrap();

    let store = ConfigStore::open(paths.clone()).unwrap();
    assert!(store.clients_list().is_empty());
    let on_disk = fs::read_to_string(paths.config_file()).unwrap();
    assert!(on_disk.contains("clients: {}"));
}
