use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use super::client::Client;
use super::preset::{
    Bank, Company, Contact, Defaults, Layout, Legal, Preset, QuotationNumberState, Snippets,
};

/// The whole persisted configuration: every preset plus the LLM block.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RootDocument {
    pub active_preset: String,
    #[serde(default)]
    pub preset_order: Vec<String>,
    pub presets: BTreeMap<String, Preset>,
    /// Saved recipients by generated key
    #[serde(default)]
    pub clients: BTreeMap<String, Client>,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            api_key: String::new(),
            model: "anthropic/claude-sonnet-4".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You generate the body of a quotation in Markdown.

Rules:
- Write only the quotation body. Headers, footers, quotation numbers, dates and address blocks are added by the application.
- Do not invent client details, signature areas, payment instructions or validity dates unless they are already in the provided context.
- Keep every \"+++\" marker exactly where it is; it marks a page break.
- Return clean Markdown only, without questions, explanations or chatter.
- Use clear, professional language with short sections and bullet points covering scope, deliverables and timelines where relevant.";

/// Prompts shipped by earlier releases. A stored prompt equal to one of
/// these was never customised and is replaced by [`DEFAULT_SYSTEM_PROMPT`].
pub const LEGACY_SYSTEM_PROMPTS: &[&str] = &[
    "You are a helpful assistant that writes professional quotations in Markdown.",
    "You are an assistant that generates proposal content in Markdown. Output only the proposal body.",
];

/// Keys of the presets written on first run, in display order.
pub const SEEDED_PRESET_KEYS: [&str; 5] = [
    "modern_split",
    "corporate_bold",
    "minimal_clean",
    "classic_serif",
    "creative_studio",
];

/// Template names used before templates were bound to preset keys.
pub const LEGACY_TEMPLATE_NAMES: [(&str, &str); 5] = [
    ("modern-split", "modern_split"),
    ("corporate-bold", "corporate_bold"),
    ("minimal-clean", "minimal_clean"),
    ("classic-serif", "classic_serif"),
    ("creative-studio", "creative_studio"),
];

/// The seeded key a legacy hyphenated template name stands for.
pub fn legacy_template_key(name: &str) -> Option<&'static str> {
    LEGACY_TEMPLATE_NAMES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, key)| *key)
}

struct Theme {
    name: &'static str,
    heading: &'static str,
    body: &'static str,
    primary: &'static str,
    accent: &'static str,
    margins: [f64; 4],
}

fn theme_for(key: &str) -> Theme {
    match key {
        "corporate_bold" => Theme {
            name: "Corporate Bold",
            heading: "Montserrat",
            body: "Source Sans Pro",
            primary: "#0f172a",
            accent: "#2563eb",
            margins: [18.0, 18.0, 18.0, 18.0],
        },
        "minimal_clean" => Theme {
            name: "Minimal Clean",
            heading: "Inter",
            body: "Inter",
            primary: "#111111",
            accent: "#6b7280",
            margins: [25.0, 25.0, 25.0, 25.0],
        },
        "classic_serif" => Theme {
            name: "Classic Serif",
            heading: "Playfair Display",
            body: "Source Serif Pro",
            primary: "#2d2a26",
            accent: "#8b5e34",
            margins: [22.0, 20.0, 22.0, 20.0],
        },
        "creative_studio" => Theme {
            name: "Creative Studio",
            heading: "Space Grotesk",
            body: "DM Sans",
            primary: "#1a1a2e",
            accent: "#e94560",
            margins: [16.0, 16.0, 16.0, 16.0],
        },
        _ => Theme {
            name: "Modern Split",
            heading: "Montserrat",
            body: "Source Sans Pro",
            primary: "#1a1a2e",
            accent: "#e94560",
            margins: [20.0, 20.0, 20.0, 20.0],
        },
    }
}

fn mapping(pairs: &[(&str, Value)]) -> Mapping {
    pairs
        .iter()
        .map(|(k, v)| (Value::String(k.to_string()), v.clone()))
        .collect()
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// The preset written on first run for `key`. Unknown keys get the
/// "Modern Split" look bound to their own template.
pub fn seed_preset(key: &str) -> Preset {
    let theme = theme_for(key);
    let sizes = mapping(&[
        ("company_name", Value::from(24)),
        ("heading1", Value::from(18)),
        ("heading2", Value::from(14)),
        ("body", Value::from(10)),
        ("small", Value::from(8)),
    ]);

    Preset {
        name: theme.name.to_string(),
        company: Company {
            name: "Your Company".to_string(),
            tagline: String::new(),
            logo: String::new(),
            show_name: true,
            show_tagline: true,
            show_logo: true,
            logo_width: 120,
            extra: BTreeMap::new(),
        },
        contact: Contact {
            enabled: true,
            ..Contact::default()
        },
        legal: Legal {
            enabled: true,
            ..Legal::default()
        },
        bank: Bank {
            enabled: true,
            ..Bank::default()
        },
        layout: Layout {
            template: key.to_string(),
            page_margins: theme.margins,
        },
        snippets: Snippets::default(),
        defaults: Defaults::default(),
        quotation_number: QuotationNumberState::default(),
        typography: mapping(&[
            ("heading", text(theme.heading)),
            ("body", text(theme.body)),
            ("mono", text("JetBrains Mono")),
            ("sizes", Value::Mapping(sizes)),
        ]),
        colors: mapping(&[
            ("primary", text(theme.primary)),
            ("accent", text(theme.accent)),
            ("background", text("#ffffff")),
            ("text", text("#2d2d2d")),
            ("muted", text("#6c757d")),
            ("border", text("#dee2e6")),
            ("table_alt", text("#f8f9fa")),
        ]),
    }
}

impl Default for RootDocument {
    fn default() -> Self {
        let presets: BTreeMap<String, Preset> = SEEDED_PRESET_KEYS
            .iter()
            .map(|key| (key.to_string(), seed_preset(key)))
            .collect();

        Self {
            active_preset: SEEDED_PRESET_KEYS[0].to_string(),
            preset_order: SEEDED_PRESET_KEYS.iter().map(|k| k.to_string()).collect(),
            presets,
            clients: BTreeMap::new(),
            llm: LlmSettings::default(),
        }
    }
}

impl RootDocument {
    /// Keys in display order: `preset_order` first, then any remaining keys.
    pub fn ordered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.presets.len());
        for key in &self.preset_order {
            if self.presets.contains_key(key) && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        for key in self.presets.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// The stored active key if it still exists, otherwise the first listed preset.
    pub fn active_key(&self) -> &str {
        if self.presets.contains_key(&self.active_preset) {
            return &self.active_preset;
        }
        self.ordered_keys()
            .first()
            .and_then(|k| self.presets.get_key_value(k))
            .map(|(k, _)| k.as_str())
            .unwrap_or(&self.active_preset)
    }
}
