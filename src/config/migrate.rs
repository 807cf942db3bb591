//! Upgrades whatever is on disk to the current [`RootDocument`] shape.
//!
//! The raw YAML is first read into an all-optional "stored" schema so that
//! missing sections can be told apart from present ones, then each pass
//! upgrades it one step. Every pass reports whether it changed anything and
//! is a no-op on a document it already converged.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::document::{
    legacy_template_key, seed_preset, LlmSettings, RootDocument, DEFAULT_SYSTEM_PROMPT,
    LEGACY_SYSTEM_PROMPTS,
};
use super::client::Client;
use super::preset::{
    Bank, Company, Contact, Defaults, Layout, Legal, Preset, QuotationNumberState, Snippets,
    VatType,
};
use super::{logo_file_name, AppPaths, PathResolver, TEMPLATE_EXTENSIONS};
use crate::error::{PresetError, Result};

/// Outcome of running the migration chain.
#[derive(Debug)]
pub struct Migration {
    pub document: RootDocument,
    /// Names of the passes that changed something, in the order they ran.
    pub applied: Vec<&'static str>,
}

impl Migration {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Deserialize, Default)]
struct StoredDocument {
    active_preset: Option<String>,
    preset_order: Option<Vec<String>>,
    presets: Option<BTreeMap<String, StoredPreset>>,
    clients: Option<BTreeMap<String, Client>>,
    llm: Option<LlmSettings>,
    /// Pre-preset files kept company/contact/... at the root.
    #[serde(flatten)]
    legacy: StoredPreset,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct StoredPreset {
    name: Option<String>,
    company: Option<StoredCompany>,
    contact: Option<Contact>,
    legal: Option<Legal>,
    bank: Option<Bank>,
    layout: Option<Layout>,
    snippets: Option<Snippets>,
    defaults: Option<StoredDefaults>,
    quotation_number: Option<QuotationNumberState>,
    typography: Option<Mapping>,
    colors: Option<Mapping>,
}

#[derive(Debug, Deserialize, Default)]
struct StoredCompany {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tagline: String,
    #[serde(default)]
    logo: String,
    show_name: Option<bool>,
    show_tagline: Option<bool>,
    show_logo: Option<bool>,
    logo_width: Option<u32>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Default)]
struct StoredDefaults {
    currency: Option<String>,
    vat_type: Option<VatType>,
    tax_rate: Option<f64>,
    payment_days: Option<u32>,
    valid_days: Option<u32>,
    language: Option<String>,
}

fn fill<T>(value: Option<T>, fallback: T, changed: &mut bool) -> T {
    match value {
        Some(v) => v,
        None => {
            *changed = true;
            fallback
        }
    }
}

impl StoredPreset {
    fn has_identity(&self) -> bool {
        self.company.is_some()
            || self.contact.is_some()
            || self.legal.is_some()
            || self.bank.is_some()
            || self.defaults.is_some()
    }

    /// Parse one preset from an arbitrary YAML mapping (e.g. an imported profile).
    pub(crate) fn from_value(value: Value) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(value)
    }

    /// Fill every missing section from the seeded preset for `key`.
    pub(crate) fn upgrade(self, key: &str) -> (Preset, bool) {
        let seed = seed_preset(key);
        let mut changed = false;

        let company = match self.company {
            Some(c) => Company {
                name: c.name,
                tagline: c.tagline,
                logo: c.logo,
                show_name: fill(c.show_name, seed.company.show_name, &mut changed),
                show_tagline: fill(c.show_tagline, seed.company.show_tagline, &mut changed),
                show_logo: fill(c.show_logo, seed.company.show_logo, &mut changed),
                logo_width: fill(c.logo_width, seed.company.logo_width, &mut changed),
                extra: c.extra,
            },
            None => {
                changed = true;
                seed.company
            }
        };

        let defaults = match self.defaults {
            Some(d) => Defaults {
                currency: fill(d.currency, seed.defaults.currency, &mut changed),
                vat_type: fill(d.vat_type, seed.defaults.vat_type, &mut changed),
                tax_rate: fill(d.tax_rate, seed.defaults.tax_rate, &mut changed),
                payment_days: fill(d.payment_days, seed.defaults.payment_days, &mut changed),
                valid_days: fill(d.valid_days, seed.defaults.valid_days, &mut changed),
                language: fill(d.language, seed.defaults.language, &mut changed),
            },
            None => {
                changed = true;
                seed.defaults
            }
        };

        let preset = Preset {
            name: fill(self.name, seed.name, &mut changed),
            company,
            contact: fill(self.contact, seed.contact, &mut changed),
            legal: fill(self.legal, seed.legal, &mut changed),
            bank: fill(self.bank, seed.bank, &mut changed),
            layout: fill(self.layout, seed.layout, &mut changed),
            snippets: fill(self.snippets, seed.snippets, &mut changed),
            defaults,
            quotation_number: fill(self.quotation_number, seed.quotation_number, &mut changed),
            typography: fill(self.typography, seed.typography, &mut changed),
            colors: fill(self.colors, seed.colors, &mut changed),
        };
        (preset, changed)
    }
}

impl From<Preset> for StoredPreset {
    fn from(p: Preset) -> Self {
        Self {
            name: Some(p.name),
            company: Some(StoredCompany {
                name: p.company.name,
                tagline: p.company.tagline,
                logo: p.company.logo,
                show_name: Some(p.company.show_name),
                show_tagline: Some(p.company.show_tagline),
                show_logo: Some(p.company.show_logo),
                logo_width: Some(p.company.logo_width),
                extra: p.company.extra,
            }),
            contact: Some(p.contact),
            legal: Some(p.legal),
            bank: Some(p.bank),
            layout: Some(p.layout),
            snippets: Some(p.snippets),
            defaults: Some(StoredDefaults {
                currency: Some(p.defaults.currency),
                vat_type: Some(p.defaults.vat_type),
                tax_rate: Some(p.defaults.tax_rate),
                payment_days: Some(p.defaults.payment_days),
                valid_days: Some(p.defaults.valid_days),
                language: Some(p.defaults.language),
            }),
            quotation_number: Some(p.quotation_number),
            typography: Some(p.typography),
            colors: Some(p.colors),
        }
    }
}

/// Run the full chain over a raw document.
///
/// Fails only when `raw` cannot be read as a document at all; callers fall
/// back to [`RootDocument::default`] in that case.
pub fn migrate(raw: Value, paths: &AppPaths) -> Result<Migration> {
    let raw = match raw {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    let mut stored: StoredDocument =
        serde_yaml::from_value(raw).map_err(PresetError::DocumentParse)?;
    let mut applied = Vec::new();

    if lift_legacy_flat(&mut stored) {
        applied.push("legacy-flat");
    }
    if bind_templates(&mut stored, paths) {
        applied.push("template-binding");
    }
    let (mut document, backfilled) = backfill(stored);
    if backfilled {
        applied.push("backfill");
    }
    if refresh_system_prompt(&mut document.llm) {
        applied.push("system-prompt");
    }
    if internalize_logos(&mut document, paths) {
        applied.push("logo-store");
    }

    for pass in &applied {
        tracing::debug!("Migration pass applied: {pass}");
    }
    Ok(Migration { document, applied })
}

/// Wrap a root-level company/contact/... document into the first seeded preset.
fn lift_legacy_flat(doc: &mut StoredDocument) -> bool {
    if doc.presets.is_some() || !doc.legacy.has_identity() {
        return false;
    }

    let seeded = RootDocument::default();
    let first = seeded.preset_order[0].clone();
    let mut presets: BTreeMap<String, StoredPreset> = seeded
        .presets
        .into_iter()
        .map(|(k, p)| (k, StoredPreset::from(p)))
        .collect();

    let mut wrapped = std::mem::take(&mut doc.legacy);
    let company_name = wrapped
        .company
        .as_ref()
        .map(|c| c.name.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(name) = company_name {
        wrapped.name = Some(name);
    }
    presets.insert(first.clone(), wrapped);

    doc.presets = Some(presets);
    doc.active_preset = Some(first);
    doc.preset_order = Some(seeded.preset_order);
    true
}

/// Bind every preset to a template pair named after its own key.
///
/// A preset still pointing at a hyphenated legacy name, or at another
/// preset's pair, gets a user copy of that pair under its key before the
/// binding is rewritten. User files that already exist for the key win.
fn bind_templates(doc: &mut StoredDocument, paths: &AppPaths) -> bool {
    let mut changed = false;
    for (key, preset) in doc.presets.iter_mut().flatten() {
        let Some(layout) = preset.layout.as_mut() else {
            continue;
        };
        let template = layout.template.trim().to_string();
        if template == *key {
            continue;
        }
        if !template.is_empty() {
            let source = legacy_template_key(&template).unwrap_or(template.as_str());
            if source != key.as_str() {
                adopt_template(paths, source, key);
            }
        }
        layout.template = key.clone();
        changed = true;
    }
    changed
}

fn adopt_template(paths: &AppPaths, from: &str, to: &str) {
    for ext in TEMPLATE_EXTENSIONS {
        let dest = paths.user_template(to, ext);
        if dest.exists() {
            continue;
        }
        let Some(source) = paths.find_template(from, ext) else {
            tracing::warn!("No {ext} template found for '{from}', '{to}' starts without one");
            continue;
        };
        if let Err(e) = fs::copy(&source, &dest) {
            tracing::warn!("Could not copy {} to {}: {e}", source.display(), dest.display());
        }
    }
}

fn backfill(doc: StoredDocument) -> (RootDocument, bool) {
    let stored_presets = doc.presets.filter(|p| !p.is_empty());
    let Some(stored_presets) = stored_presets else {
        let mut seeded = RootDocument::default();
        if let Some(llm) = doc.llm {
            seeded.llm = llm;
        }
        if let Some(clients) = doc.clients {
            seeded.clients = clients;
        }
        return (seeded, true);
    };

    let mut changed = false;
    let mut presets = BTreeMap::new();
    for (key, stored) in stored_presets {
        let (preset, filled) = stored.upgrade(&key);
        changed |= filled;
        presets.insert(key, preset);
    }

    let preset_order = fill(doc.preset_order, presets.keys().cloned().collect(), &mut changed);
    let clients = fill(doc.clients, BTreeMap::new(), &mut changed);
    let llm = fill(doc.llm, LlmSettings::default(), &mut changed);

    let mut document = RootDocument {
        active_preset: doc.active_preset.clone().unwrap_or_default(),
        preset_order,
        presets,
        clients,
        llm,
    };
    let active = document.active_key().to_string();
    if doc.active_preset.as_deref() != Some(active.as_str()) {
        document.active_preset = active;
        changed = true;
    }
    (document, changed)
}

/// Replace an empty or shipped-default prompt with the current default. Custom prompts stay.
fn refresh_system_prompt(llm: &mut LlmSettings) -> bool {
    let current = llm.system_prompt.trim();
    let stale = current.is_empty() || LEGACY_SYSTEM_PROMPTS.iter().any(|p| p.trim() == current);
    if stale && llm.system_prompt != DEFAULT_SYSTEM_PROMPT {
        llm.system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        return true;
    }
    false
}

/// Copy logos referenced by external path into the logo store.
pub(crate) fn internalize_logos(doc: &mut RootDocument, paths: &AppPaths) -> bool {
    let resolver = PathResolver::new(paths);
    let mut changed = false;

    for (key, preset) in doc.presets.iter_mut() {
        let logo = preset.company.logo.trim().to_string();
        if logo.is_empty() || resolver.is_internal_logo(&logo) {
            continue;
        }
        let Some(source) = resolver.resolve(&logo) else {
            tracing::warn!("Logo for preset '{key}' not found: {logo}");
            continue;
        };
        match store_logo(paths, key, &source) {
            Ok(stored) => {
                preset.company.logo = stored;
                changed = true;
            }
            Err(e) => tracing::warn!("Could not copy logo for preset '{key}': {e}"),
        }
    }
    changed
}

/// Copy `source` into the logo store under a key-derived name; returns that name.
pub(crate) fn store_logo(paths: &AppPaths, key: &str, source: &Path) -> Result<String> {
    let name = logo_file_name(key, source.extension().and_then(|e| e.to_str()));
    let dest = paths.logos_dir().join(&name);
    fs::create_dir_all(paths.logos_dir())?;
    if source != dest {
        fs::copy(source, &dest)?;
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> AppPaths {
        let paths = AppPaths::new(dir.path()).with_assets_dir(dir.path().join("assets"));
        paths.ensure_dirs().unwrap();
        paths
    }

    fn run(yaml: &str, paths: &AppPaths) -> Migration {
        crate::logging::init_test();
        migrate(serde_yaml::from_str(yaml).unwrap(), paths).unwrap()
    }

    #[test]
    fn empty_document_is_seeded() {
        let dir = TempDir::new().unwrap();
        let m = run("", &paths(&dir));
        assert!(m.changed());
        assert_eq!(m.document, RootDocument::default());
    }

    #[test]
    fn flat_legacy_document_becomes_first_preset() {
        let dir = TempDir::new().unwrap();
        let m = run(
            "company:\n  name: Acme Devs\n  tagline: We build\ncontact:\n  email: hi@acme.dev\n",
            &paths(&dir),
        );
        assert_eq!(m.applied[0], "legacy-flat");

        let doc = &m.document;
        assert_eq!(doc.presets.len(), 5);
        assert_eq!(doc.active_preset, "modern_split");
        let first = &doc.presets["modern_split"];
        assert_eq!(first.name, "Acme Devs");
        assert_eq!(first.company.tagline, "We build");
        assert!(first.company.show_logo);
        assert_eq!(first.contact.email, "hi@acme.dev");
        assert_eq!(first.layout.template, "modern_split");
    }

    #[test]
    fn hyphenated_template_names_are_rebound_to_key() {
        let dir = TempDir::new().unwrap();
        let seeded = serde_yaml::to_string(&RootDocument::default()).unwrap();
        let legacy = seeded.replace("template: corporate_bold", "template: corporate-bold");
        let m = run(&legacy, &paths(&dir));
        assert_eq!(m.applied, vec!["template-binding"]);
        assert_eq!(m.document.presets["corporate_bold"].layout.template, "corporate_bold");
    }

    fn bundle(dir: &TempDir, key: &str) {
        let templates = dir.path().join("assets").join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join(format!("{key}.html")), format!("<p>{key}</p>")).unwrap();
        fs::write(templates.join(format!("{key}.css")), format!("/* {key} */")).unwrap();
    }

    #[test]
    fn custom_preset_with_legacy_template_gets_its_own_copy() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        bundle(&dir, "classic_serif");

        let yaml = "presets:\n  mine:\n    name: Mine\n    layout:\n      template: classic-serif\n";
        let m = run(yaml, &paths);
        assert!(m.applied.contains(&"template-binding"));
        assert_eq!(m.document.presets["mine"].layout.template, "mine");

        let html = paths.find_template("mine", "html").unwrap();
        assert_eq!(html, paths.user_template("mine", "html"));
        assert_eq!(fs::read_to_string(html).unwrap(), "<p>classic_serif</p>");
        assert_eq!(
            fs::read_to_string(paths.user_template("mine", "css")).unwrap(),
            "/* classic_serif */"
        );
    }

    #[test]
    fn shared_template_is_copied_without_clobbering_user_files() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        bundle(&dir, "modern_split");
        fs::write(paths.user_template("mine", "css"), "/* mine */").unwrap();

        let yaml = "presets:\n  mine:\n    name: Mine\n    layout:\n      template: modern_split\n";
        let m = run(yaml, &paths);
        assert_eq!(m.document.presets["mine"].layout.template, "mine");
        assert_eq!(
            fs::read_to_string(paths.user_template("mine", "html")).unwrap(),
            "<p>modern_split</p>"
        );
        assert_eq!(
            fs::read_to_string(paths.user_template("mine", "css")).unwrap(),
            "/* mine */"
        );

        let again = run(&serde_yaml::to_string(&m.document).unwrap(), &paths);
        assert!(!again.changed());
    }

    #[test]
    fn missing_sections_are_backfilled() {
        let dir = TempDir::new().unwrap();
        let yaml = "active_preset: mine\npresets:\n  mine:\n    name: Mine\n    company:\n      name: Solo\n    defaults:\n      currency: USD\n";
        let m = run(yaml, &paths(&dir));
        assert!(m.applied.contains(&"backfill"));

        let preset = &m.document.presets["mine"];
        assert_eq!(preset.layout.template, "mine");
        assert_eq!(preset.company.logo_width, 120);
        assert!(preset.company.show_name);
        assert_eq!(preset.defaults.currency, "USD");
        assert_eq!(preset.defaults.vat_type, VatType::GermanVat);
        assert_eq!(m.document.llm, LlmSettings::default());
        assert_eq!(m.document.preset_order, vec!["mine".to_string()]);
    }

    #[test]
    fn legacy_prompt_is_replaced_but_custom_prompt_is_kept() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);

        let mut doc = RootDocument::default();
        doc.llm.system_prompt = LEGACY_SYSTEM_PROMPTS[0].to_string();
        let m = run(&serde_yaml::to_string(&doc).unwrap(), &paths);
        assert_eq!(m.applied, vec!["system-prompt"]);
        assert_eq!(m.document.llm.system_prompt, DEFAULT_SYSTEM_PROMPT);

        doc.llm.system_prompt = "Answer like a pirate.".to_string();
        let m = run(&serde_yaml::to_string(&doc).unwrap(), &paths);
        assert!(!m.changed());
        assert_eq!(m.document.llm.system_prompt, "Answer like a pirate.");
    }

    #[test]
    fn external_logo_is_copied_into_store() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let external = dir.path().join("brand").join("Logo.PNG");
        fs::create_dir_all(external.parent().unwrap()).unwrap();
        fs::write(&external, b"png-bytes").unwrap();

        let mut doc = RootDocument::default();
        doc.presets.get_mut("minimal_clean").unwrap().company.logo =
            external.to_string_lossy().into_owned();

        let m = run(&serde_yaml::to_string(&doc).unwrap(), &paths);
        assert_eq!(m.applied, vec!["logo-store"]);
        assert_eq!(m.document.presets["minimal_clean"].company.logo, "minimal_clean.png");
        assert_eq!(
            fs::read(paths.logos_dir().join("minimal_clean.png")).unwrap(),
            b"png-bytes"
        );
    }

    #[test]
    fn chain_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let first = run("company:\n  name: Old Shop\nlayout:\n  template: classic-serif\n", &paths);
        assert!(first.changed());

        let again = run(&serde_yaml::to_string(&first.document).unwrap(), &paths);
        assert!(!again.changed(), "passes re-applied: {:?}", again.applied);
        assert_eq!(again.document, first.document);
    }
}
