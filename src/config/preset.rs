use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// One sender profile. The map key it is stored under is its identity;
/// `name` is only for display.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub company: Company,
    pub contact: Contact,
    pub legal: Legal,
    pub bank: Bank,
    pub layout: Layout,
    pub snippets: Snippets,
    pub defaults: Defaults,
    pub quotation_number: QuotationNumberState,
    #[serde(default)]
    pub typography: Mapping,
    #[serde(default)]
    pub colors: Mapping,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Company {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    /// Filename inside the logo store once internalized, or a raw path before that.
    #[serde(default)]
    pub logo: String,
    pub show_name: bool,
    pub show_tagline: bool,
    pub show_logo: bool,
    pub logo_width: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Contact {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Legal {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub chamber_of_commerce: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Bank {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub holder: String,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub bic: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Layout {
    /// Basename of the `{template}.html` / `{template}.css` pair. Always the owning preset's key.
    #[serde(default)]
    pub template: String,
    /// top, right, bottom, left in millimetres
    #[serde(default = "default_page_margins")]
    pub page_margins: [f64; 4],
}

fn default_page_margins() -> [f64; 4] {
    [20.0, 20.0, 20.0, 20.0]
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Snippets {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub intro_text: String,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub custom_footer: String,
    #[serde(default)]
    pub signature_block: bool,
}

impl Default for Snippets {
    fn default() -> Self {
        Self {
            enabled: false,
            intro_text: String::new(),
            terms: String::new(),
            custom_footer: String::new(),
            signature_block: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VatType {
    #[serde(rename = "none")]
    NoVat,
    Kleinunternehmer,
    #[default]
    GermanVat,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Defaults {
    pub currency: String,
    pub vat_type: VatType,
    pub tax_rate: f64,
    pub payment_days: u32,
    /// Days an offer stays valid
    #[serde(default = "default_valid_days")]
    pub valid_days: u32,
    pub language: String,
}

pub(crate) fn default_valid_days() -> u32 {
    30
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            vat_type: VatType::default(),
            tax_rate: 19.0,
            payment_days: 14,
            valid_days: default_valid_days(),
            language: "de".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QuotationNumberState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub format: String,
    /// Last issued sequence value for the period in `last_reset_year`/`last_reset_month`
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub last_reset_year: Option<i32>,
    #[serde(default)]
    pub last_reset_month: Option<u32>,
    /// Day of month the last number was issued on, for reproducing `{DD}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_issued_day: Option<u32>,
}

impl QuotationNumberState {
    /// Clears the sequence so the next number starts a fresh period.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.last_reset_year = None;
        self.last_reset_month = None;
        self.last_issued_day = None;
    }
}

impl Default for QuotationNumberState {
    fn default() -> Self {
        Self {
            enabled: true,
            format: "{YYYY}-{NNN}".to_string(),
            counter: 0,
            last_reset_year: None,
            last_reset_month: None,
            last_issued_day: None,
        }
    }
}
