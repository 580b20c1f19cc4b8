//! Output Registry - named targets inside one rendering surface

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::dom::{Document, Node, NodeId, Selector};
use crate::error::ConfigurationError;

/// Where an output lives relative to the surface root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The surface root itself.
    Root,
    Class(&'static str),
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Root => f.write_str(":root"),
            Marker::Class(class) => write!(f, ".{}", class),
        }
    }
}

/// Symbolic output identifiers of the j-card template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKey {
    Root,
    Boundaries,
    Back,
    Cover,
    TitleGroups,
    Titles,
    Subtitles,
    Tracks,
    Type,
    NoteGroup,
    NoteUpper,
    NoteLower,
    SideA,
    SideB,
}

impl OutputKey {
    pub const ALL: [OutputKey; 14] = [
        OutputKey::Root,
        OutputKey::Boundaries,
        OutputKey::Back,
        OutputKey::Cover,
        OutputKey::TitleGroups,
        OutputKey::Titles,
        OutputKey::Subtitles,
        OutputKey::Tracks,
        OutputKey::Type,
        OutputKey::NoteGroup,
        OutputKey::NoteUpper,
        OutputKey::NoteLower,
        OutputKey::SideA,
        OutputKey::SideB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputKey::Root => "root",
            OutputKey::Boundaries => "boundaries",
            OutputKey::Back => "back",
            OutputKey::Cover => "cover",
            OutputKey::TitleGroups => "title-groups",
            OutputKey::Titles => "titles",
            OutputKey::Subtitles => "subtitles",
            OutputKey::Tracks => "tracks",
            OutputKey::Type => "type",
            OutputKey::NoteGroup => "note-group",
            OutputKey::NoteUpper => "note-upper",
            OutputKey::NoteLower => "note-lower",
            OutputKey::SideA => "side-a",
            OutputKey::SideB => "side-b",
        }
    }

    /// One marker per location; more than one makes a group.
    pub fn markers(self) -> &'static [Marker] {
        match self {
            OutputKey::Root => &[Marker::Root],
            OutputKey::Boundaries => &[Marker::Class("template-boundaries")],
            OutputKey::Back => &[Marker::Class("template-back")],
            OutputKey::Cover => &[Marker::Class("template-cover")],
            OutputKey::TitleGroups => &[
                Marker::Class("template-front-title-group"),
                Marker::Class("template-spine-title-group"),
            ],
            OutputKey::Titles => &[
                Marker::Class("template-front-title"),
                Marker::Class("template-spine-title"),
            ],
            OutputKey::Subtitles => &[
                Marker::Class("template-front-subtitle"),
                Marker::Class("template-spine-subtitle"),
            ],
            OutputKey::Tracks => &[Marker::Class("template-tracks")],
            OutputKey::Type => &[Marker::Class("template-type")],
            OutputKey::NoteGroup => &[Marker::Class("template-note-group")],
            OutputKey::NoteUpper => &[Marker::Class("template-note-upper")],
            OutputKey::NoteLower => &[Marker::Class("template-note-lower")],
            OutputKey::SideA => &[Marker::Class("template-side-a")],
            OutputKey::SideB => &[Marker::Class("template-side-b")],
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Single(NodeId),
    /// Same logical output shown in several places, in marker order.
    Group(Vec<NodeId>),
}

impl OutputTarget {
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            OutputTarget::Single(node) => std::slice::from_ref(node),
            OutputTarget::Group(nodes) => nodes,
        }
    }
}

/// Result of a transform, tagged by how it is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Text(String),
    Style { property: String, value: String },
    Class { name: String, enabled: bool },
    Image(String),
}

impl Presentation {
    /// Returns whether the node changed.
    pub fn apply(&self, node: &mut Node) -> bool {
        match self {
            Presentation::Text(html) => node.set_inner_html(html),
            Presentation::Style { property, value } => node.set_style(property, value),
            Presentation::Class { name, enabled } => node.set_class(name, *enabled),
            Presentation::Image(src) => node.set_src(src),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputRegistry {
    root: NodeId,
    targets: HashMap<OutputKey, OutputTarget>,
}

impl OutputRegistry {
    /// Resolve every key against the markers below `root`.
    pub fn resolve(
        document: &Document,
        root: NodeId,
        keys: &[OutputKey],
    ) -> Result<Self, ConfigurationError> {
        let mut targets = HashMap::new();

        for &key in keys {
            let mut nodes = Vec::with_capacity(key.markers().len());
            for marker in key.markers() {
                let node = match marker {
                    Marker::Root => Some(root),
                    Marker::Class(class) => document.find(root, &Selector::class(*class)),
                };
                let node = node.ok_or_else(|| ConfigurationError::MissingOutput {
                    key,
                    marker: marker.to_string(),
                })?;
                nodes.push(node);
            }

            let target = if nodes.len() == 1 {
                OutputTarget::Single(nodes[0])
            } else {
                OutputTarget::Group(nodes)
            };
            targets.insert(key, target);
        }

        Ok(Self { root, targets })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn target(&self, key: OutputKey) -> Option<&OutputTarget> {
        self.targets.get(&key)
    }

    pub fn contains(&self, key: OutputKey) -> bool {
        self.targets.contains_key(&key)
    }

    /// Write a presentation to every node of a target.
    pub fn set(
        &self,
        document: &mut Document,
        target: &OutputTarget,
        presentation: &Presentation,
    ) -> bool {
        let mut changed = false;
        for node in target.nodes() {
            changed |= presentation.apply(document.node_mut(*node));
        }
        changed
    }
}
