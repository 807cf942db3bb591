use chrono::{Datelike, Local, NaiveDate};

use crate::config::{ConfigStore, Preset, QuotationNumberState};
use crate::error::{PresetError, Result};

/// Counter tokens, longest first so `{NN}` never eats part of `{NNNN}`.
const COUNTER_TOKENS: [(&str, usize); 4] = [("{NNNN}", 4), ("{NNN}", 3), ("{NN}", 2), ("{N}", 0)];

/// Abbreviation of the company name used for `{PREFIX}`: the uppercased first
/// letter of each word, at most three of them. `QT` when there is no name.
pub fn company_prefix(company_name: &str) -> String {
    let prefix: String = company_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(3)
        .collect();
    if prefix.is_empty() {
        "QT".to_string()
    } else {
        prefix
    }
}

/// Substitute every placeholder in `format`.
pub fn format_quotation_number(
    format: &str,
    date: NaiveDate,
    counter: u32,
    company_name: &str,
) -> String {
    let mut out = format
        .replace("{YYYY}", &format!("{:04}", date.year()))
        .replace("{YY}", &format!("{:02}", date.year().rem_euclid(100)))
        .replace("{MM}", &format!("{:02}", date.month()))
        .replace("{DD}", &format!("{:02}", date.day()));

    for (token, width) in COUNTER_TOKENS {
        if out.contains(token) {
            out = out.replace(token, &format!("{counter:0width$}"));
        }
    }

    if out.contains("{PREFIX}") {
        out = out.replace("{PREFIX}", &company_prefix(company_name));
    }
    out
}

/// Whether the counter must restart before issuing a number on `today`.
/// Driven by the placeholders the format actually uses.
fn reset_due(state: &QuotationNumberState, today: NaiveDate) -> bool {
    let format = &state.format;
    let year_changed = state.last_reset_year != Some(today.year());
    let month_changed = state.last_reset_month != Some(today.month());

    let tracks_year = format.contains("{YYYY}") || format.contains("{YY}");
    let tracks_month = format.contains("{MM}");

    (tracks_year && year_changed) || (tracks_month && (year_changed || month_changed))
}

/// Issue the next number for preset `key` and persist the new counter.
///
/// Returns an empty string, without touching state, when numbering is disabled.
pub fn generate_quotation_number(store: &mut ConfigStore, key: &str) -> Result<String> {
    generate_quotation_number_on(store, key, Local::now().date_naive())
}

/// [`generate_quotation_number`] with an explicit issue date.
pub fn generate_quotation_number_on(
    store: &mut ConfigStore,
    key: &str,
    today: NaiveDate,
) -> Result<String> {
    let preset = store.preset(key)?;
    let state = &preset.quotation_number;
    if !state.enabled {
        return Ok(String::new());
    }

    let base = if reset_due(state, today) { 0 } else { state.counter };
    let counter = base.saturating_add(1);
    let number = format_quotation_number(&state.format, today, counter, &preset.company.name);

    store.commit(|doc| {
        let preset = doc
            .presets
            .get_mut(key)
            .ok_or_else(|| PresetError::PresetNotFound(key.to_string()))?;
        let state = &mut preset.quotation_number;
        state.counter = counter;
        state.last_reset_year = Some(today.year());
        state.last_reset_month = Some(today.month());
        state.last_issued_day = Some(today.day());
        Ok(())
    })?;

    tracing::info!("Issued quotation number {number} for preset '{key}'");
    Ok(number)
}

/// The number last issued for this preset, rebuilt from stored state.
///
/// Empty when numbering is disabled or nothing has been issued yet. Never
/// changes anything.
pub fn last_quotation_number(preset: &Preset) -> String {
    let state = &preset.quotation_number;
    if !state.enabled || state.counter == 0 {
        return String::new();
    }

    let today = Local::now().date_naive();
    let issued = match (state.last_reset_year, state.last_reset_month) {
        (Some(year), Some(month)) => {
            let day = state.last_issued_day.unwrap_or(1);
            NaiveDate::from_ymd_opt(year, month, day)
                .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
                .unwrap_or(today)
        }
        _ => today,
    };
    format_quotation_number(&state.format, issued, state.counter, &preset.company.name)
}

/// [`last_quotation_number`] looked up by key.
pub fn peek_quotation_number(store: &ConfigStore, key: &str) -> Result<String> {
    Ok(last_quotation_number(store.preset(key)?))
}
