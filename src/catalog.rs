//! Binding Catalog - the declarative field-to-output table

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ConfigurationError;
use crate::fields::{FieldKey, FieldRegistry};
use crate::outputs::{OutputKey, OutputRegistry};
use crate::transforms::Transform;

/// Position of a binding in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) usize);

impl BindingId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub sources: Vec<FieldKey>,
    pub targets: Vec<OutputKey>,
    pub transform: Transform,
}

impl Binding {
    pub fn new(sources: Vec<FieldKey>, targets: Vec<OutputKey>, transform: Transform) -> Self {
        Self {
            sources,
            targets,
            transform,
        }
    }

    fn one(source: FieldKey, target: OutputKey, transform: Transform) -> Self {
        Self::new(vec![source], vec![target], transform)
    }

    /// Sources with repeats removed, first occurrence kept.
    pub fn distinct_sources(&self) -> Vec<FieldKey> {
        let mut seen = BTreeSet::new();
        self.sources
            .iter()
            .copied()
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

/// Ordered bindings. Order is dispatch order for a single change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingCatalog {
    bindings: Vec<Binding>,
}

impl BindingCatalog {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// The j-card catalog: layout first, then content.
    pub fn jcard() -> Self {
        use FieldKey as F;
        use OutputKey as O;

        Self::new(vec![
            // layout
            Binding::one(F::TitleSize, O::TitleGroups, Transform::font_size()),
            Binding::one(F::TrackSize, O::Tracks, Transform::font_size()),
            Binding::one(F::TypeSize, O::Type, Transform::font_size()),
            Binding::one(F::NoteSize, O::NoteGroup, Transform::font_size()),
            Binding::one(F::BackSize, O::Back, Transform::font_size()),
            Binding::one(F::ShortBack, O::Root, Transform::class_toggle("short-back")),
            // content
            Binding::one(F::TextColor, O::Root, Transform::color("color")),
            Binding::one(F::CardColor, O::Boundaries, Transform::color("background-color")),
            Binding::one(F::Cover, O::Cover, Transform::ImageSource),
            Binding::one(F::Title, O::Titles, Transform::TextCopy),
            Binding::one(F::Subtitle, O::Subtitles, Transform::TextCopy),
            Binding::one(F::Type, O::Type, Transform::TextCopy),
            Binding::one(F::NoteUpper, O::NoteUpper, Transform::TextCopy),
            Binding::one(F::NoteLower, O::NoteLower, Transform::TextCopy),
            Binding::one(F::SideA, O::SideA, Transform::List),
            Binding::one(F::SideB, O::SideB, Transform::List),
            Binding::new(vec![F::SideA, F::SideB], vec![O::Tracks], Transform::MergeLists),
        ])
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| (BindingId(index), binding))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Every field the catalog reads, in first-use order.
    pub fn field_keys(&self) -> Vec<FieldKey> {
        let mut seen = BTreeSet::new();
        self.bindings
            .iter()
            .flat_map(|binding| binding.sources.iter().copied())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Every output the catalog writes, in first-use order.
    pub fn output_keys(&self) -> Vec<OutputKey> {
        let mut seen = BTreeSet::new();
        self.bindings
            .iter()
            .flat_map(|binding| binding.targets.iter().copied())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Check every binding against resolved registries before anything is
    /// subscribed.
    pub fn validate(
        &self,
        fields: &FieldRegistry,
        outputs: &OutputRegistry,
    ) -> Result<(), ConfigurationError> {
        for (id, binding) in self.iter() {
            let transform = &binding.transform;
            if !transform.takes_sources(binding.sources.len()) {
                return Err(ConfigurationError::Arity {
                    binding: id.0,
                    transform: transform.name(),
                    expected: transform.arity(),
                    actual: binding.sources.len(),
                });
            }

            for &key in &binding.sources {
                if fields.handle(key).is_none() {
                    return Err(ConfigurationError::UnknownSource { binding: id.0, key });
                }
                let kind = key.kind();
                if !transform.accepts(kind) {
                    return Err(ConfigurationError::IncompatibleKind {
                        binding: id.0,
                        key,
                        kind,
                        transform: transform.name(),
                    });
                }
            }

            for &key in &binding.targets {
                if !outputs.contains(key) {
                    return Err(ConfigurationError::UnknownTarget { binding: id.0, key });
                }
            }
        }
        Ok(())
    }
}

impl Default for BindingCatalog {
    fn default() -> Self {
        Self::jcard()
    }
}
