//! Field Registry - named inputs and their current values
//!
//! Fields are resolved once against the controls region using the naming
//! contract `#<prefix>-<field-key>`, where the prefix is the id of the
//! controls element. After that, values live here and nowhere else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::dom::{Document, NodeId, Selector};
use crate::error::{ConfigurationError, FieldError};
use crate::sync::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Size,
    Color,
    Boolean,
    FileRef,
    MultilineList,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Size => "size",
            FieldKind::Color => "color",
            FieldKind::Boolean => "boolean",
            FieldKind::FileRef => "file",
            FieldKind::MultilineList => "multiline list",
        }
    }

    /// The notification an edit of this kind produces.
    pub fn notification(self) -> Notification {
        match self {
            FieldKind::Boolean | FieldKind::FileRef => Notification::SelectionChanged,
            _ => Notification::ValueChanged,
        }
    }

    pub fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::Boolean, FieldValue::Checked(_))
                | (FieldKind::FileRef, FieldValue::Files(_))
                | (
                    FieldKind::Text
                        | FieldKind::Size
                        | FieldKind::Color
                        | FieldKind::MultilineList,
                    FieldValue::Text(_)
                )
        )
    }

    pub fn empty_value(self) -> FieldValue {
        match self {
            FieldKind::Boolean => FieldValue::Checked(false),
            FieldKind::FileRef => FieldValue::Files(vec![]),
            _ => FieldValue::Text(String::new()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    ValueChanged,
    SelectionChanged,
}

/// Symbolic field identifiers of the j-card controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKey {
    TitleSize,
    TrackSize,
    TypeSize,
    NoteSize,
    BackSize,
    ShortBack,
    CardColor,
    TextColor,
    Cover,
    Title,
    Subtitle,
    Type,
    NoteUpper,
    NoteLower,
    SideA,
    SideB,
}

impl FieldKey {
    pub const ALL: [FieldKey; 16] = [
        FieldKey::TitleSize,
        FieldKey::TrackSize,
        FieldKey::TypeSize,
        FieldKey::NoteSize,
        FieldKey::BackSize,
        FieldKey::ShortBack,
        FieldKey::CardColor,
        FieldKey::TextColor,
        FieldKey::Cover,
        FieldKey::Title,
        FieldKey::Subtitle,
        FieldKey::Type,
        FieldKey::NoteUpper,
        FieldKey::NoteLower,
        FieldKey::SideA,
        FieldKey::SideB,
    ];

    /// Key used in element ids.
    pub fn name(self) -> &'static str {
        match self {
            FieldKey::TitleSize => "title-size",
            FieldKey::TrackSize => "track-size",
            FieldKey::TypeSize => "type-size",
            FieldKey::NoteSize => "note-size",
            FieldKey::BackSize => "back-size",
            FieldKey::ShortBack => "short-back",
            FieldKey::CardColor => "card-color",
            FieldKey::TextColor => "text-color",
            FieldKey::Cover => "cover",
            FieldKey::Title => "title",
            FieldKey::Subtitle => "subtitle",
            FieldKey::Type => "type",
            FieldKey::NoteUpper => "note-upper",
            FieldKey::NoteLower => "note-lower",
            FieldKey::SideA => "side-a",
            FieldKey::SideB => "side-b",
        }
    }

    /// Key used in field-value records.
    pub fn record_key(self) -> &'static str {
        match self {
            FieldKey::TitleSize => "title_size",
            FieldKey::TrackSize => "track_size",
            FieldKey::TypeSize => "type_size",
            FieldKey::NoteSize => "note_size",
            FieldKey::BackSize => "back_size",
            FieldKey::ShortBack => "short_back",
            FieldKey::CardColor => "card_color",
            FieldKey::TextColor => "text_color",
            FieldKey::NoteUpper => "note_upper",
            FieldKey::NoteLower => "note_lower",
            FieldKey::SideA => "side_a",
            FieldKey::SideB => "side_b",
            other => other.name(),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FieldKey::TitleSize
            | FieldKey::TrackSize
            | FieldKey::TypeSize
            | FieldKey::NoteSize
            | FieldKey::BackSize => FieldKind::Size,
            FieldKey::ShortBack => FieldKind::Boolean,
            FieldKey::CardColor | FieldKey::TextColor => FieldKind::Color,
            FieldKey::Cover => FieldKind::FileRef,
            FieldKey::Title
            | FieldKey::Subtitle
            | FieldKey::Type
            | FieldKey::NoteUpper
            | FieldKey::NoteLower => FieldKind::Text,
            FieldKey::SideA | FieldKey::SideB => FieldKind::MultilineList,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == name || key.record_key() == name)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A file chosen through a file input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            bytes,
        }
    }

    pub fn read(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }
}

/// Current value of an input, shaped like the input itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
    Files(Vec<SelectedFile>),
}

impl FieldValue {
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Checked(_) => "checked",
            FieldValue::Files(_) => "files",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Derives element ids from field keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    prefix: String,
}

impl Naming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn element_id(&self, key: FieldKey) -> String {
        format!("{}-{}", self.prefix, key.name())
    }
}

/// Handle to a resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

#[derive(Debug)]
struct Field {
    key: FieldKey,
    element: NodeId,
    value: FieldValue,
    subscribers: Vec<Subscription>,
}

#[derive(Debug)]
pub struct FieldRegistry {
    naming: Naming,
    fields: Vec<Field>,
    index: HashMap<FieldKey, FieldId>,
}

impl FieldRegistry {
    /// Resolve every key against the inputs under `controls`.
    pub fn resolve(
        document: &Document,
        controls: NodeId,
        keys: &[FieldKey],
    ) -> Result<Self, ConfigurationError> {
        let prefix = document
            .node(controls)
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(ConfigurationError::UnnamedControls)?;
        let naming = Naming::new(prefix);

        let mut registry = Self {
            naming,
            fields: vec![],
            index: HashMap::new(),
        };

        for &key in keys {
            if registry.index.contains_key(&key) {
                continue;
            }
            let element_id = registry.naming.element_id(key);
            let element = document
                .find(controls, &Selector::id(element_id.as_str()))
                .ok_or(ConfigurationError::MissingField { key, element_id })?;

            let id = FieldId(registry.fields.len());
            registry.fields.push(Field {
                key,
                element,
                value: key.kind().empty_value(),
                subscribers: vec![],
            });
            registry.index.insert(key, id);
        }

        Ok(registry)
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn handle(&self, key: FieldKey) -> Option<FieldId> {
        self.index.get(&key).copied()
    }

    pub fn get(&self, id: FieldId) -> &FieldValue {
        &self.fields[id.0].value
    }

    pub fn value_of(&self, key: FieldKey) -> Option<&FieldValue> {
        self.handle(key).map(|id| self.get(id))
    }

    pub fn key(&self, id: FieldId) -> FieldKey {
        self.fields[id.0].key
    }

    pub fn element(&self, id: FieldId) -> NodeId {
        self.fields[id.0].element
    }

    /// Mirror the stored value onto the control element, so the controls
    /// show what was populated or edited. File selections are not
    /// representable in markup and leave the element alone.
    pub fn reflect(&self, id: FieldId, document: &mut Document) {
        let field = &self.fields[id.0];
        let node = document.node_mut(field.element);
        match &field.value {
            FieldValue::Text(text) if node.tag == "textarea" => {
                node.set_inner_html(text);
            }
            FieldValue::Text(text) => {
                node.attributes.insert("value".to_string(), text.clone());
            }
            FieldValue::Checked(true) => {
                node.attributes.insert("checked".to_string(), String::new());
            }
            FieldValue::Checked(false) => {
                node.attributes.remove("checked");
            }
            FieldValue::Files(_) => {}
        }
    }

    /// Field handles in resolution order.
    pub fn ids(&self) -> impl Iterator<Item = FieldId> {
        (0..self.fields.len()).map(FieldId)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Store a new value. Does not notify; dispatch is the engine's job.
    pub fn write(&mut self, id: FieldId, value: FieldValue) -> Result<(), FieldError> {
        let field = &mut self.fields[id.0];
        let kind = field.key.kind();
        if !kind.accepts(&value) {
            return Err(FieldError::KindMismatch {
                key: field.key,
                kind,
                actual: value.shape(),
            });
        }
        field.value = value;
        Ok(())
    }

    pub fn subscribe(&mut self, id: FieldId, subscription: Subscription) {
        let subscribers = &mut self.fields[id.0].subscribers;
        if !subscribers.contains(&subscription) {
            subscribers.push(subscription);
        }
    }

    pub fn subscribers(&self, id: FieldId) -> &[Subscription] {
        &self.fields[id.0].subscribers
    }
}
