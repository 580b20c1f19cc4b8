//! Transform Library
//!
//! Pure functions from field values to presentations, keyed by binding kind.
//! Transforms never touch a surface; a value they cannot interpret becomes a
//! `TransformInputError`, which the dispatcher treats as "keep what is shown".

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::fields::{FieldKind, FieldValue, SelectedFile};
use crate::outputs::Presentation;

/// Joins list entries in rendered text.
pub const LIST_SEPARATOR: &str = "&nbsp;\u{2022} ";

/// Font sizes are given in points.
pub const POINT_UNIT: &str = "pt";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformInputError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Selected file {0} is empty")]
    EmptyFile(String),

    #[error("Expected a {expected} value, got {actual}")]
    UnexpectedValue {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    TextCopy,
    Size { property: String, unit: String },
    Color { property: String },
    ClassToggle { class: String },
    ImageSource,
    List,
    MergeLists,
}

impl Transform {
    pub fn font_size() -> Self {
        Transform::Size {
            property: "font-size".to_string(),
            unit: POINT_UNIT.to_string(),
        }
    }

    pub fn color(property: &str) -> Self {
        Transform::Color {
            property: property.to_string(),
        }
    }

    pub fn class_toggle(class: &str) -> Self {
        Transform::ClassToggle {
            class: class.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::TextCopy => "text-copy",
            Transform::Size { .. } => "size-to-style",
            Transform::Color { .. } => "color-to-style",
            Transform::ClassToggle { .. } => "boolean-to-class",
            Transform::ImageSource => "file-to-image-reference",
            Transform::List => "list-to-formatted-text",
            Transform::MergeLists => "multi-field-list-merge",
        }
    }

    /// Whether a field of `kind` can feed this transform.
    pub fn accepts(&self, kind: FieldKind) -> bool {
        match self {
            Transform::TextCopy | Transform::List | Transform::MergeLists => {
                matches!(kind, FieldKind::Text | FieldKind::MultilineList)
            }
            Transform::Size { .. } => kind == FieldKind::Size,
            Transform::Color { .. } => kind == FieldKind::Color,
            Transform::ClassToggle { .. } => kind == FieldKind::Boolean,
            Transform::ImageSource => kind == FieldKind::FileRef,
        }
    }

    pub fn takes_sources(&self, count: usize) -> bool {
        match self {
            Transform::MergeLists => count >= 1,
            _ => count == 1,
        }
    }

    pub fn arity(&self) -> &'static str {
        match self {
            Transform::MergeLists => "one or more",
            _ => "exactly one",
        }
    }

    pub fn apply(&self, inputs: &[&FieldValue]) -> Result<Presentation, TransformInputError> {
        match self {
            Transform::TextCopy => Ok(Presentation::Text(copy_text(text(inputs)?))),
            Transform::Size { property, unit } => Ok(Presentation::Style {
                property: property.clone(),
                value: size_to_style(text(inputs)?, unit),
            }),
            Transform::Color { property } => Ok(Presentation::Style {
                property: property.clone(),
                value: text(inputs)?.to_string(),
            }),
            Transform::ClassToggle { class } => Ok(Presentation::Class {
                name: class.clone(),
                enabled: checked(inputs)?,
            }),
            Transform::ImageSource => image_reference(files(inputs)?).map(Presentation::Image),
            Transform::List => Ok(Presentation::Text(format_list(text(inputs)?))),
            Transform::MergeLists => {
                let sides = inputs
                    .iter()
                    .map(|value| expect_text(value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Presentation::Text(merge_lists(&sides)))
            }
        }
    }
}

fn first<'a>(inputs: &[&'a FieldValue]) -> Result<&'a FieldValue, TransformInputError> {
    inputs
        .first()
        .copied()
        .ok_or(TransformInputError::UnexpectedValue {
            expected: "field",
            actual: "nothing",
        })
}

fn expect_text<'a>(value: &'a FieldValue) -> Result<&'a str, TransformInputError> {
    value.as_text().ok_or(TransformInputError::UnexpectedValue {
        expected: "text",
        actual: value.shape(),
    })
}

fn text<'a>(inputs: &[&'a FieldValue]) -> Result<&'a str, TransformInputError> {
    expect_text(first(inputs)?)
}

fn checked(inputs: &[&FieldValue]) -> Result<bool, TransformInputError> {
    match first(inputs)? {
        FieldValue::Checked(checked) => Ok(*checked),
        other => Err(TransformInputError::UnexpectedValue {
            expected: "checked",
            actual: other.shape(),
        }),
    }
}

fn files<'a>(inputs: &[&'a FieldValue]) -> Result<&'a [SelectedFile], TransformInputError> {
    match first(inputs)? {
        FieldValue::Files(files) => Ok(files),
        other => Err(TransformInputError::UnexpectedValue {
            expected: "files",
            actual: other.shape(),
        }),
    }
}

/// Verbatim.
pub fn copy_text(text: &str) -> String {
    text.to_string()
}

/// `value` followed by `unit`. No parsing and no clamping: "12" gives
/// "12pt", "abc" gives "abcpt", "" gives "pt".
pub fn size_to_style(value: &str, unit: &str) -> String {
    format!("{}{}", value, unit)
}

/// Trim the raw text, then replace each newline and the whitespace around
/// it with `LIST_SEPARATOR`. Runs of blank lines collapse into one
/// separator.
pub fn format_list(raw: &str) -> String {
    let entries: Vec<&str> = raw
        .trim()
        .split('\n')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    entries.join(LIST_SEPARATOR)
}

/// Format each side on its own, drop sides that format to nothing, and join
/// the rest with the same separator.
pub fn merge_lists(sides: &[&str]) -> String {
    let formatted: Vec<String> = sides
        .iter()
        .map(|side| format_list(side))
        .filter(|side| !side.is_empty())
        .collect();
    formatted.join(LIST_SEPARATOR)
}

/// A `data:` URL for the first selected file.
pub fn image_reference(files: &[SelectedFile]) -> Result<String, TransformInputError> {
    let file = files.first().ok_or(TransformInputError::NoFileSelected)?;
    if file.bytes.is_empty() {
        return Err(TransformInputError::EmptyFile(file.name.clone()));
    }
    let media_type = file
        .media_type
        .as_deref()
        .unwrap_or_else(|| guess_media_type(&file.name));
    let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
    Ok(format!("data:{};base64,{}", media_type, encoded))
}

fn guess_media_type(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
