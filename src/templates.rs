//! Template System - page markup as an enforceable contract
//!
//! A template is the whole page: a container holding the controls, the
//! preview template and an empty print-duplicate container. Element ids and
//! marker classes inside it must follow the naming contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::dom::{Document, Node, NodeId};
use crate::fields::{FieldKey, FieldKind, Naming};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid template JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Template version {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),
}

/// One element and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Markup>,
}

impl Markup {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children.extend(children);
        self
    }

    /// Build a document with this element as its root.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new(&self.tag);
        let root = document.root();
        *document.node_mut(root) = self.to_node();
        for child in &self.children {
            child.append_to(&mut document, root);
        }
        document
    }

    fn append_to(&self, document: &mut Document, parent: NodeId) {
        let id = document.append(parent, self.to_node());
        for child in &self.children {
            child.append_to(document, id);
        }
    }

    fn to_node(&self) -> Node {
        let mut node = Node::new(self.tag.as_str());
        node.id = self.id.clone();
        node.classes = self.class.clone();
        node.attributes = self.attributes.clone();
        node.inner_html = self.html.clone();
        node
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub template_version: String,
    pub engine_min_version: String,
    pub page: Markup,
}

impl Template {
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Refuse templates written for a newer engine.
    pub fn check_engine_version(&self) -> Result<(), TemplateError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| TemplateError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&self.engine_min_version)
            .map_err(|_| TemplateError::InvalidVersion(self.engine_min_version.clone()))?;
        semver::Version::parse(&self.template_version)
            .map_err(|_| TemplateError::InvalidVersion(self.template_version.clone()))?;

        if engine_ver < min_ver {
            return Err(TemplateError::EngineVersionMismatch(
                self.template_version.clone(),
                self.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }

    /// Version-checked document for this template.
    pub fn document(&self) -> Result<Document, TemplateError> {
        self.check_engine_version()?;
        Ok(self.page.to_document())
    }

    /// The built-in cassette j-card page, container `#jcard`.
    pub fn jcard() -> Self {
        Self {
            id: "jcard".to_string(),
            name: "Cassette J-Card".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: crate::MIN_ENGINE_VERSION.to_string(),
            page: jcard_page("jcard", "controls"),
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::jcard()
    }
}

/// Control element for one field.
pub fn control(naming: &Naming, key: FieldKey) -> Markup {
    let id = naming.element_id(key);
    let input = match key.kind() {
        FieldKind::MultilineList => return Markup::new("textarea").id(&id),
        FieldKind::Text => Markup::new("input").attr("type", "text"),
        FieldKind::Size => Markup::new("input").attr("type", "number"),
        FieldKind::Color => Markup::new("input").attr("type", "text"),
        FieldKind::Boolean => Markup::new("input").attr("type", "checkbox"),
        FieldKind::FileRef => Markup::new("input")
            .attr("type", "file")
            .attr("accept", "image/*"),
    };
    input.id(&id)
}

/// The j-card preview template, without controls.
pub fn jcard_template() -> Markup {
    let div = |class: &str| Markup::new("div").class(class);

    div("template").child(
        div("template-boundaries").children([
            div("template-front").children([
                Markup::new("img").class("template-cover"),
                div("template-front-title-group").children([
                    div("template-front-title"),
                    div("template-front-subtitle"),
                ]),
                div("template-tracks"),
            ]),
            div("template-spine").children([
                div("template-spine-title-group").children([
                    div("template-spine-title"),
                    div("template-spine-subtitle"),
                ]),
                div("template-type"),
            ]),
            div("template-back").children([
                div("template-note-group").children([
                    div("template-note-upper"),
                    div("template-note-lower"),
                ]),
                div("template-side-a"),
                div("template-side-b"),
            ]),
        ]),
    )
}

/// Full page: container `#<container_id>`, controls `#<prefix>`, preview
/// and an empty `.print-duplicate`.
pub fn jcard_page(container_id: &str, prefix: &str) -> Markup {
    let naming = Naming::new(prefix);
    let controls = Markup::new("form")
        .class("controls")
        .id(prefix)
        .children(FieldKey::ALL.iter().map(|key| control(&naming, *key)));

    Markup::new("body").child(
        Markup::new("div").id(container_id).children([
            controls,
            Markup::new("div").class("preview").child(jcard_template()),
            Markup::new("div").class("print-duplicate"),
        ]),
    )
}
