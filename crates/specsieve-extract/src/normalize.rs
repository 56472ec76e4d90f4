//! Unit normalization and numeric acceptance criteria

use regex::Regex;
use specsieve_core::{AcceptanceCriterion, Comparator};
use std::sync::LazyLock;

/// Raw unit spellings and their normalized form
static UNIT_TABLE: &[(&str, &str)] = &[
    ("°C", "degC"),
    ("C", "degC"),
    ("kV/µs", "kV/us"),
    ("kV/μs", "kV/us"),
    ("kV/us", "kV/us"),
    ("µs", "us"),
    ("μs", "us"),
    ("V RMS", "V_rms"),
    ("V RMS)", "V_rms"),
    ("V RMS.", "V_rms"),
    ("V RMS,", "V_rms"),
    ("V RMS;", "V_rms"),
    ("V RMS/", "V_rms"),
    ("V RMS]", "V_rms"),
    ("kV RMS", "kV_rms"),
    ("V", "V"),
    ("kV", "kV"),
    ("kHz", "kHz"),
    ("Hz", "Hz"),
    ("rpm", "rpm"),
    ("mm/s", "mm_per_s"),
    ("m/s2", "m_per_s2"),
    ("m/s²", "m_per_s2"),
    ("mm", "mm"),
    ("bar", "bar"),
    ("%", "percent"),
    ("dB(A)", "dB(A)"),
];

/// Normalized unit and the physical dimension it measures
static DIMENSIONS: &[(&str, &str)] = &[
    ("degC", "temperature"),
    ("kV/us", "voltage_rise_rate"),
    ("us", "time"),
    ("V_rms", "voltage"),
    ("kV_rms", "voltage"),
    ("V", "voltage"),
    ("kV", "voltage"),
    ("kHz", "frequency"),
    ("Hz", "frequency"),
    ("rpm", "rotational_speed"),
    ("mm_per_s", "vibration_velocity"),
    ("m_per_s2", "acceleration"),
    ("mm", "length"),
    ("bar", "pressure"),
    ("percent", "ratio"),
    ("dB(A)", "sound_level"),
];

static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<cmp>≤|>=|≥|<=|<|>|=|==)?\s*",
        r"(?P<val>\d+(?:\.\d+)?)\s*",
        r"(?P<unit>kV/µs|kV/μs|kV/us|kV RMS|V RMS|°C|C|V|kV|kHz|Hz|rpm|mm/s|m/s²|m/s2|mm|bar|%|dB\(A\))?",
    ))
    .expect("valid number-with-unit regex")
});

/// Normalize a unit spelling; unknown units pass through trimmed
pub fn normalize_unit(raw: &str) -> String {
    let unit = raw.trim();
    UNIT_TABLE
        .iter()
        .find(|(spelling, _)| *spelling == unit)
        .map(|(_, normalized)| normalized.to_string())
        .unwrap_or_else(|| unit.to_string())
}

/// Physical dimension of a normalized unit
pub fn dimension_of(unit: &str) -> Option<&'static str> {
    DIMENSIONS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, dimension)| *dimension)
}

/// Render a value the way criterion ids expect (`2000.0`, `1.8`)
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Every number in the text, with its comparator and unit when present
///
/// Numbers without a comparator are read as `=`.
pub fn extract_criteria(text: &str) -> Vec<AcceptanceCriterion> {
    NUMBER_WITH_UNIT
        .captures_iter(text)
        .filter_map(|caps| {
            let value: f64 = caps.name("val")?.as_str().parse().ok()?;
            let comparator = caps
                .name("cmp")
                .and_then(|m| Comparator::parse(m.as_str()))
                .unwrap_or(Comparator::Equal);
            let unit = caps.name("unit").map(|m| normalize_unit(m.as_str()));
            let text = caps.get(0)?.as_str().trim().to_string();

            Some(AcceptanceCriterion {
                id: format!(
                    "numeric-{}{}",
                    format_value(value),
                    unit.as_deref().unwrap_or("")
                ),
                text,
                comparator: Some(comparator),
                value: Some(value),
                dimension: unit.as_deref().and_then(dimension_of).map(str::to_string),
                unit,
            })
        })
        .collect()
}

/// Criterion from an LSL/Target/USL cell; `None` unless the cell is a finite number
pub fn bound_criterion(
    id_prefix: &str,
    comparator: Comparator,
    raw_value: &str,
    unit: Option<&str>,
) -> Option<AcceptanceCriterion> {
    let value: f64 = raw_value.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let unit = unit.filter(|u| !u.is_empty()).map(str::to_string);
    let text = format!(
        "{} {} {}",
        comparator.symbol(),
        format_value(value),
        unit.as_deref().unwrap_or("")
    );

    Some(AcceptanceCriterion {
        id: format!("{id_prefix}-{}", comparator.symbol()),
        text: text.trim().to_string(),
        comparator: Some(comparator),
        value: Some(value),
        dimension: unit.as_deref().and_then(dimension_of).map(str::to_string),
        unit,
    })
}
