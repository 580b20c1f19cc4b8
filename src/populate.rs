//! Population - initial field values from a sparse record
//!
//! `record[key] ?? default` for every registered field. A JSON `null` counts
//! as absent. File fields always start with no selection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::FieldError;
use crate::fields::{FieldId, FieldKey, FieldKind, FieldRegistry, FieldValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl RecordValue {
    /// Text as an input would show it. Numbers print the way a browser
    /// input shows them: `12` not `12.0`, `0` for negative zero, and
    /// exponent form (`1e+21`, `1e-7`) outside `[1e-6, 1e21)`.
    pub fn to_text(&self) -> String {
        match self {
            RecordValue::Null => String::new(),
            RecordValue::Bool(b) => b.to_string(),
            RecordValue::Number(n) => number_text(*n),
            RecordValue::Text(s) => s.clone(),
            RecordValue::List(lines) => lines.join("\n"),
        }
    }

    pub fn to_checked(&self) -> bool {
        match self {
            RecordValue::Null => false,
            RecordValue::Bool(b) => *b,
            RecordValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RecordValue::Text(s) => !s.is_empty(),
            RecordValue::List(lines) => !lines.is_empty(),
        }
    }

    /// Shape the record value for a field of `kind`.
    pub fn to_field_value(&self, kind: FieldKind) -> FieldValue {
        match kind {
            FieldKind::Boolean => FieldValue::Checked(self.to_checked()),
            FieldKind::FileRef => FieldValue::Files(vec![]),
            _ => FieldValue::Text(self.to_text()),
        }
    }
}

impl From<&str> for RecordValue {
    fn from(s: &str) -> Self {
        RecordValue::Text(s.to_string())
    }
}

impl From<bool> for RecordValue {
    fn from(b: bool) -> Self {
        RecordValue::Bool(b)
    }
}

impl From<f64> for RecordValue {
    fn from(n: f64) -> Self {
        RecordValue::Number(n)
    }
}

impl From<Vec<&str>> for RecordValue {
    fn from(lines: Vec<&str>) -> Self {
        RecordValue::List(lines.into_iter().map(String::from).collect())
    }
}

/// Persisted field values keyed by record key (`title_size`, `side_a`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord {
    values: BTreeMap<String, RecordValue>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with(mut self, key: FieldKey, value: impl Into<RecordValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: FieldKey, value: impl Into<RecordValue>) {
        self.values.insert(key.record_key().to_string(), value.into());
    }

    /// Present and not null.
    pub fn get(&self, key: FieldKey) -> Option<&RecordValue> {
        self.values
            .get(key.record_key())
            .filter(|value| **value != RecordValue::Null)
    }

    /// Keys that name no field.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| FieldKey::ALL.iter().all(|f| f.record_key() != *k))
            .collect()
    }

    /// Every field with its default, as a complete record.
    pub fn defaults() -> Self {
        let mut record = Self::new();
        for key in FieldKey::ALL {
            if let Some(value) = default_value(key) {
                record.insert(key, value);
            }
        }
        record
    }
}

/// Documented default per field. File fields have none.
pub fn default_value(key: FieldKey) -> Option<RecordValue> {
    let value = match key {
        FieldKey::TitleSize => RecordValue::Number(12.0),
        FieldKey::TrackSize => RecordValue::Number(9.0),
        FieldKey::TypeSize => RecordValue::Number(10.0),
        FieldKey::NoteSize => RecordValue::Number(10.0),
        FieldKey::BackSize => RecordValue::Number(8.0),
        FieldKey::ShortBack => RecordValue::Bool(false),
        FieldKey::CardColor => RecordValue::from("white"),
        FieldKey::TextColor => RecordValue::from("black"),
        FieldKey::Cover => return None,
        FieldKey::Title
        | FieldKey::Subtitle
        | FieldKey::Type
        | FieldKey::NoteUpper
        | FieldKey::NoteLower => RecordValue::from(""),
        FieldKey::SideA | FieldKey::SideB => RecordValue::List(vec![]),
    };
    Some(value)
}

/// The value a field starts with for this record.
pub fn initial_value(key: FieldKey, record: &FieldRecord) -> FieldValue {
    let kind = key.kind();
    match record.get(key).cloned().or_else(|| default_value(key)) {
        Some(value) => value.to_field_value(kind),
        None => kind.empty_value(),
    }
}

/// Write initial values into every registered field. Returns the written
/// fields in registry order, ready to be notified.
pub fn populate(
    fields: &mut FieldRegistry,
    record: &FieldRecord,
) -> Result<Vec<FieldId>, FieldError> {
    for key in record.unknown_keys() {
        debug!(key, "ignoring unknown record key");
    }

    let ids: Vec<FieldId> = fields.ids().collect();
    for &id in &ids {
        let key = fields.key(id);
        fields.write(id, initial_value(key, record))?;
    }
    Ok(ids)
}

fn number_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => text,
    }
}
