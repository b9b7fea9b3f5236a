//! Parameter extraction from cleaned report text.

use std::sync::LazyLock;

use hemogram_core::{AnalysisConfig, ParameterCode, ParameterSet};
use regex::Regex;

use crate::catalogue::ReferenceCatalogue;

static NUMBER_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Values outside this window are page numbers, dates or other noise.
const READING_MIN: f64 = 0.001;
const READING_MAX: f64 = 1000.0;

/// Extract every catalogue parameter found in `text`.
///
/// Codes are tried in catalogue order and aliases in declared order. The first
/// line matching an alias supplies the value, falling back to the line right
/// after it. Codes without a usable reading are left out of the result.
pub fn extract_parameters(
    text: &str,
    catalogue: &ReferenceCatalogue,
    config: &AnalysisConfig,
) -> ParameterSet {
    let length = text.trim().chars().count();
    if length < config.min_text_length {
        tracing::debug!(
            length,
            minimum = config.min_text_length,
            "Report text too short, skipping extraction"
        );
        return ParameterSet::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut extracted = ParameterSet::new();

    for code in ParameterCode::ALL {
        if let Some(value) = find_reading(&lines, catalogue.aliases(code)) {
            tracing::debug!(code = %code, value, "Extracted parameter");
            extracted.insert(code, value);
        }
    }

    tracing::info!(
        found = extracted.len(),
        lines = lines.len(),
        "Parameter extraction finished"
    );
    extracted
}

fn find_reading(lines: &[&str], aliases: &[Regex]) -> Option<f64> {
    for alias in aliases {
        for (index, line) in lines.iter().enumerate() {
            if !alias.is_match(line) {
                continue;
            }

            if let Some(value) = first_reading(line) {
                return Some(value);
            }

            if let Some(value) = lines.get(index + 1).and_then(|next| first_reading(next)) {
                return Some(value);
            }
        }
    }
    None
}

/// First numeric token on the line that looks like a lab reading.
fn first_reading(line: &str) -> Option<f64> {
    let cleaned = line.replace(',', "");
    NUMBER_TOKEN
        .find_iter(&cleaned)
        .filter_map(|token| token.as_str().parse::<f64>().ok())
        .find(|value| is_reading(*value))
}

fn is_reading(value: f64) -> bool {
    (READING_MIN..=READING_MAX).contains(&value)
}
