//! Decoding of the charger telemetry stream.
//!
//! The cloud pushes observations as compact `{id, value}` pairs (REST
//! endpoints return the same fields under `dataName`/`value`). This module
//! translates them into typed, annotated values using the static table in
//! [`table`]. Unknown ids are preserved rather than dropped so that flows
//! keep working when the vendor adds fields the table does not know yet.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub mod table;

pub use table::{enum_label, DataType, ObservationDefinition, OBSERVATIONS};

/// An observation as it arrives on the wire, before decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, rename = "dataName")]
    pub data_name: Option<String>,
    pub value: Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// How to match a raw observation against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Exact numeric id match (streaming messages).
    Id,
    /// Case-insensitive name match (REST state responses), trying `name`,
    /// then `alternate_name`, then `name` with underscores stripped.
    Name,
}

/// A decoded observation. Produced fresh per message, never persisted.
#[derive(Debug, Clone)]
pub struct ParsedObservation {
    pub observation_id: Option<i64>,
    pub name: Option<&'static str>,
    pub data_type: Option<DataType>,
    pub value: Value,
    /// Human label from the enum registry, when the matched field has one
    /// and the value maps. `None` means "no label available", not an error.
    pub display_text: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Set instead of failing when a JSON-typed value does not parse.
    pub parse_error: Option<String>,
}

fn matches_name(def: &ObservationDefinition, wanted: &str) -> bool {
    if def.name.eq_ignore_ascii_case(wanted) {
        return true;
    }
    if let Some(alt) = def.alternate_name {
        if alt.eq_ignore_ascii_case(wanted) {
            return true;
        }
    }
    let stripped: String = def.name.chars().filter(|c| *c != '_').collect();
    stripped.eq_ignore_ascii_case(wanted)
}

fn find_definition(raw: &RawObservation, mode: MatchMode) -> Option<&'static ObservationDefinition> {
    match mode {
        MatchMode::Id => {
            let id = raw.id?;
            OBSERVATIONS.iter().find(|def| i64::from(def.id) == id)
        }
        MatchMode::Name => {
            let wanted = raw.data_name.as_deref()?;
            // First match wins; table order is the tie-break.
            OBSERVATIONS.iter().find(|def| matches_name(def, wanted))
        }
    }
}

fn coerce_boolean(value: &Value) -> Value {
    let coerced = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    };
    Value::Bool(coerced)
}

fn coerce_double(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => value.clone(),
    }
}

fn coerce_integer(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64)),
        _ => None,
    };
    match parsed {
        Some(n) => Value::from(n),
        None => value.clone(),
    }
}

/// Decode one raw observation against the static table.
///
/// A raw message whose positive numeric id is not in the table still comes
/// back with that id, an untouched value and no annotations.
pub fn parse_observation(raw: &RawObservation, mode: MatchMode) -> ParsedObservation {
    let definition = find_definition(raw, mode);

    let mut parse_error = None;
    let (value, data_type) = match definition {
        Some(def) => {
            let coerced = match def.data_type {
                DataType::Boolean => coerce_boolean(&raw.value),
                DataType::Double => coerce_double(&raw.value),
                DataType::Integer => coerce_integer(&raw.value),
                DataType::Json => match &raw.value {
                    Value::String(s) => match serde_json::from_str::<Value>(s) {
                        Ok(parsed) => parsed,
                        Err(err) => {
                            parse_error = Some(err.to_string());
                            raw.value.clone()
                        }
                    },
                    other => other.clone(),
                },
                // Binary, Position, String and Statistics pass through.
                _ => raw.value.clone(),
            };
            (coerced, Some(def.data_type))
        }
        None => (raw.value.clone(), None),
    };

    let observation_id = match definition {
        Some(def) => Some(i64::from(def.id)),
        // Forward-compatibility fallback: keep a positive raw id so new
        // vendor fields are not dropped on the floor.
        None => raw.id.filter(|id| *id > 0),
    };

    let display_text = definition.and_then(|def| enum_label(def.id, &value));

    ParsedObservation {
        observation_id,
        name: definition.map(|def| def.name),
        data_type,
        value,
        display_text,
        unit: definition.and_then(|def| def.unit),
        timestamp: raw.timestamp,
        parse_error,
    }
}
