use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use quote_presets::config::{config_dir, AppPaths, Client, ConfigStore};
use quote_presets::error::{PresetError, Result};
use quote_presets::logging;
use quote_presets::preset::{
    create_preset, delete_preset, duplicate_preset, export_profile, generate_quotation_number,
    import_profile, list_presets, peek_quotation_number, rename_preset,
};

#[derive(Parser)]
#[command(name = "quote-presets")]
#[command(version, about = "Manage quotation sender presets", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.quote-presets)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Directory with bundled templates (default: $QUOTE_PRESETS_ASSETS or ./assets next to the binary)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presets in display order
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print a preset as YAML
    Show {
        /// Preset key (default: active preset)
        key: Option<String>,
    },

    /// Read a value by dotted key (e.g. presets.modern_split.company.name)
    Get { key: String },

    /// Write a YAML value at a dotted key
    Set { key: String, value: String },

    /// Make a preset the active one
    Activate { key: String },

    /// Create a preset as a copy of another one
    Create {
        /// Display name of the new preset
        name: String,

        /// Preset to copy (default: active preset)
        #[arg(long)]
        from: Option<String>,
    },

    /// Duplicate a preset
    Duplicate {
        key: String,

        /// Display name (default: "<name> (Copy)")
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a preset and its template files
    Delete { key: String },

    /// Change a preset's display name
    Rename { key: String, name: String },

    /// Set or clear a preset's logo
    Logo {
        key: String,

        /// Image path; omit to clear the logo
        path: Option<String>,
    },

    /// Quotation numbers
    Number {
        #[command(subcommand)]
        action: NumberAction,
    },

    /// Manage saved clients (lists them by default)
    Clients {
        #[command(subcommand)]
        action: Option<ClientAction>,
    },

    /// Export a preset to a profile archive
    Export { key: String, file: PathBuf },

    /// Import a preset from a profile archive
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum NumberAction {
    /// Issue the next quotation number
    Next {
        /// Preset key (default: active preset)
        key: Option<String>,
    },

    /// Show the last issued quotation number
    Last {
        /// Preset key (default: active preset)
        key: Option<String>,
    },
}

#[derive(clap::Args)]
struct ClientFields {
    /// Institution or company name (required for new clients)
    #[arg(long)]
    institution: Option<String>,

    /// Contact person
    #[arg(long)]
    contact: Option<String>,

    #[arg(long)]
    email: Option<String>,

    /// Postal address
    #[arg(long)]
    address: Option<String>,
}

impl ClientFields {
    fn apply(self, client: &mut Client) {
        if let Some(v) = self.institution {
            client.institution = v;
        }
        if let Some(v) = self.contact {
            client.contact = v;
        }
        if let Some(v) = self.email {
            client.email = v;
        }
        if let Some(v) = self.address {
            client.address = v;
        }
    }
}

#[derive(Subcommand)]
enum ClientAction {
    /// List saved clients
    List,

    /// Print a client as YAML
    Show { key: String },

    /// Save a new client
    Add {
        #[command(flatten)]
        fields: ClientFields,
    },

    /// Change fields of a saved client
    Update {
        key: String,

        #[command(flatten)]
        fields: ClientFields,
    },

    /// Remove a saved client
    Delete { key: String },
}

fn main() {
    logging::init();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let mut paths = AppPaths::new(cfg_dir);
    if let Some(assets) = cli.assets_dir {
        paths = paths.with_assets_dir(assets);
    }
    let mut store = ConfigStore::open(paths)?;

    match cli.command {
        Commands::List { json } => cmd_list(&store, json),
        Commands::Show { key } => cmd_show(&store, key),
        Commands::Get { key } => cmd_get(&store, &key),
        Commands::Set { key, value } => cmd_set(&mut store, &key, &value),
        Commands::Activate { key } => cmd_activate(&mut store, &key),
        Commands::Create { name, from } => cmd_create(&mut store, &name, from.as_deref()),
        Commands::Duplicate { key, name } => cmd_duplicate(&mut store, &key, name.as_deref()),
        Commands::Delete { key } => cmd_delete(&mut store, &key),
        Commands::Rename { key, name } => cmd_rename(&mut store, &key, &name),
        Commands::Logo { key, path } => cmd_logo(&mut store, &key, path.as_deref()),
        Commands::Number { action } => match action {
            NumberAction::Next { key } => cmd_number_next(&mut store, key),
            NumberAction::Last { key } => cmd_number_last(&store, key),
        },
        Commands::Clients { action } => match action.unwrap_or(ClientAction::List) {
            ClientAction::List => cmd_clients(&store),
            ClientAction::Show { key } => cmd_client_show(&store, &key),
            ClientAction::Add { fields } => cmd_client_add(&mut store, fields),
            ClientAction::Update { key, fields } => cmd_client_update(&mut store, &key, fields),
            ClientAction::Delete { key } => cmd_client_delete(&mut store, &key),
        },
        Commands::Export { key, file } => cmd_export(&store, &key, &file),
        Commands::Import { file } => cmd_import(&mut store, &file),
    }
}

fn key_or_active(store: &ConfigStore, key: Option<String>) -> String {
    key.unwrap_or_else(|| store.active_preset_key().to_string())
}

// Table row structs for tabled
#[derive(Tabled, Serialize)]
struct PresetRow {
    #[tabled(rename = "ACTIVE")]
    #[serde(skip)]
    marker: String,
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "LAST NUMBER")]
    last_number: String,
    #[tabled(skip)]
    active: bool,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "INSTITUTION")]
    institution: String,
    #[tabled(rename = "EMAIL")]
    email: String,
}

/// List presets in display order
fn cmd_list(store: &ConfigStore, json: bool) -> Result<()> {
    let active = store.active_preset_key().to_string();
    let mut rows = Vec::new();
    for (key, name) in list_presets(store) {
        let preset = store.preset(&key)?;
        rows.push(PresetRow {
            marker: if key == active { "*".to_string() } else { String::new() },
            template: preset.layout.template.clone(),
            last_number: peek_quotation_number(store, &key)?,
            active: key == active,
            key,
            name,
        });
    }

    if json {
        let out = serde_json::to_string_pretty(&rows).map_err(std::io::Error::other)?;
        println!("{out}");
        return Ok(());
    }

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_show(store: &ConfigStore, key: Option<String>) -> Result<()> {
    let key = key_or_active(store, key);
    let preset = store.preset(&key)?;
    let yaml = serde_yaml::to_string(preset).map_err(PresetError::Serialize)?;
    println!("# {key}");
    print!("{yaml}");
    Ok(())
}

fn cmd_get(store: &ConfigStore, key: &str) -> Result<()> {
    let value = store.get(key, serde_yaml::Value::Null);
    if value.is_null() {
        return Err(PresetError::InvalidKey(key.to_string()));
    }
    let yaml = serde_yaml::to_string(&value).map_err(PresetError::Serialize)?;
    print!("{yaml}");
    Ok(())
}

fn cmd_set(store: &mut ConfigStore, key: &str, raw: &str) -> Result<()> {
    // Unparseable input is taken as a plain string.
    let value = serde_yaml::from_str(raw)
        .unwrap_or_else(|_| serde_yaml::Value::String(raw.to_string()));
    store.set(key, value)?;
    println!("Updated {key}");
    Ok(())
}

fn cmd_activate(store: &mut ConfigStore, key: &str) -> Result<()> {
    store.set_active_preset(key)?;
    println!("Active preset: {key}");
    Ok(())
}

fn cmd_create(store: &mut ConfigStore, name: &str, from: Option<&str>) -> Result<()> {
    let key = create_preset(store, name, from)?;
    println!("Created preset {key} ({name})");
    Ok(())
}

fn cmd_duplicate(store: &mut ConfigStore, key: &str, name: Option<&str>) -> Result<()> {
    let new_key = duplicate_preset(store, key, name)?;
    let new_name = &store.preset(&new_key)?.name;
    println!("Created preset {new_key} ({new_name})");
    Ok(())
}

fn cmd_delete(store: &mut ConfigStore, key: &str) -> Result<()> {
    delete_preset(store, key)?;
    println!("Deleted preset {key}");
    Ok(())
}

fn cmd_rename(store: &mut ConfigStore, key: &str, name: &str) -> Result<()> {
    rename_preset(store, key, name)?;
    println!("Renamed {key} to {name}");
    Ok(())
}

fn cmd_logo(store: &mut ConfigStore, key: &str, path: Option<&str>) -> Result<()> {
    store.set_logo(key, path.unwrap_or(""))?;
    let logo = &store.preset(key)?.company.logo;
    if logo.is_empty() {
        println!("Cleared logo for {key}");
    } else {
        println!("Logo for {key}: {logo}");
    }
    Ok(())
}

fn cmd_number_next(store: &mut ConfigStore, key: Option<String>) -> Result<()> {
    let key = key_or_active(store, key);
    let number = generate_quotation_number(store, &key)?;
    if number.is_empty() {
        println!("Numbering is disabled for {key}");
    } else {
        println!("{number}");
    }
    Ok(())
}

fn cmd_number_last(store: &ConfigStore, key: Option<String>) -> Result<()> {
    let key = key_or_active(store, key);
    let number = peek_quotation_number(store, &key)?;
    if number.is_empty() {
        println!("No quotation number issued for {key}");
    } else {
        println!("{number}");
    }
    Ok(())
}

fn cmd_export(store: &ConfigStore, key: &str, file: &PathBuf) -> Result<()> {
    export_profile(store, key, file)?;
    println!("Exported {key} to {}", file.display());
    Ok(())
}

fn cmd_import(store: &mut ConfigStore, file: &PathBuf) -> Result<()> {
    let key = import_profile(store, file)?;
    let name = &store.preset(&key)?.name;
    println!("Imported preset {key} ({name})");
    Ok(())
}

/// List saved clients
fn cmd_clients(store: &ConfigStore) -> Result<()> {
    let list = store.clients_list();
    if list.is_empty() {
        println!("No clients saved.");
        println!("Add one with: quote-presets clients add --institution <NAME>");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(list.len());
    for (key, institution) in list {
        let email = store.client(&key)?.email.clone();
        rows.push(ClientRow {
            key,
            institution,
            email,
        });
    }

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_client_show(store: &ConfigStore, key: &str) -> Result<()> {
    let client = store.client(key)?;
    let yaml = serde_yaml::to_string(client).map_err(PresetError::Serialize)?;
    println!("# {key}");
    print!("{yaml}");
    Ok(())
}

fn cmd_client_add(store: &mut ConfigStore, fields: ClientFields) -> Result<()> {
    let mut client = Client::default();
    fields.apply(&mut client);
    let key = store.add_client(client)?;
    println!("Added client {key}");
    Ok(())
}

fn cmd_client_update(store: &mut ConfigStore, key: &str, fields: ClientFields) -> Result<()> {
    let mut client = store.client(key)?.clone();
    fields.apply(&mut client);
    store.update_client(key, client)?;
    println!("Updated client {key}");
    Ok(())
}

fn cmd_client_delete(store: &mut ConfigStore, key: &str) -> Result<()> {
    store.delete_client(key)?;
    println!("Deleted client {key}");
    Ok(())
}
