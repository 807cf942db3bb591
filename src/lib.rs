pub mod config;
pub mod error;
pub mod logging;
pub mod preset;

pub use config::{AppPaths, Client, ConfigStore, PathResolver, Preset, RootDocument};
pub use error::{PresetError, Result};
pub use preset::{
    create_preset, delete_preset, duplicate_preset, export_profile, generate_quotation_number,
    import_profile, list_presets, peek_quotation_number, rename_preset,
};
