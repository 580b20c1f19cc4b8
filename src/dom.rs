//! Render Document - the host surface contract
//!
//! A minimal element tree: enough structure for fields and outputs to be
//! located by id and class, copied as whole subtrees, and compared by their
//! observable state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Index of a node inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub inner_html: String,
    pub src: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add or remove a class. Returns whether membership changed.
    pub fn set_class(&mut self, class: &str, enabled: bool) -> bool {
        match (self.has_class(class), enabled) {
            (false, true) => {
                self.classes.push(class.to_string());
                true
            }
            (true, false) => {
                self.classes.retain(|c| c != class);
                true
            }
            _ => false,
        }
    }

    /// Returns whether the property value changed.
    pub fn set_style(&mut self, property: &str, value: &str) -> bool {
        if self.style.get(property).map(String::as_str) == Some(value) {
            return false;
        }
        self.style.insert(property.to_string(), value.to_string());
        true
    }

    pub fn set_inner_html(&mut self, html: &str) -> bool {
        if self.inner_html == html {
            return false;
        }
        self.inner_html = html.to_string();
        true
    }

    pub fn set_src(&mut self, src: &str) -> bool {
        if self.src.as_deref() == Some(src) {
            return false;
        }
        self.src = Some(src.to_string());
        true
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unsupported selector '{0}': expected #id or .class")]
    Unsupported(String),
}

/// `#id` or `.class`. Nothing else is part of the markup contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Id(String),
    Class(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Selector::Id(id) => node.id.as_deref() == Some(id.as_str()),
            Selector::Class(class) => node.has_class(class),
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SelectorError::Empty);
        }
        let valid = |name: &str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if let Some(name) = s.strip_prefix('#').filter(|n| valid(n)) {
            Ok(Selector::id(name))
        } else if let Some(name) = s.strip_prefix('.').filter(|n| valid(n)) {
            Ok(Selector::class(name))
        } else {
            Err(SelectorError::Unsupported(s.to_string()))
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{}", id),
            Selector::Class(class) => write!(f, ".{}", class),
        }
    }
}

/// Observable state of a subtree. Node ids are left out so that a copy
/// placed elsewhere in the document compares equal to its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node::new(root_tag)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Append a detached node under `parent`.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Depth-first, document order, `scope` included.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// First match strictly below `scope`, like `Element.querySelector`.
    pub fn find(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .skip(1)
            .find(|id| selector.matches(self.node(*id)))
    }

    /// First match anywhere, root included.
    pub fn select(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| selector.matches(self.node(*id)))
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Deep-copy `source` and append the copy under `parent`. The nodes to
    /// copy are fixed before the first append, so a `parent` inside `source`
    /// does not pick up the copy itself.
    pub fn clone_subtree(&mut self, source: NodeId, parent: NodeId) -> NodeId {
        let order = self.descendants(source);
        let mut copies: HashMap<NodeId, NodeId> = HashMap::with_capacity(order.len());
        for original in order {
            let node = self.node(original).clone();
            let target = match node.parent {
                Some(p) if original != source => copies.get(&p).copied().unwrap_or(parent),
                _ => parent,
            };
            let copy = self.append(target, node);
            copies.insert(original, copy);
        }
        copies.get(&source).copied().unwrap_or(source)
    }

    pub fn snapshot(&self, id: NodeId) -> NodeSnapshot {
        let node = self.node(id);
        NodeSnapshot {
            tag: node.tag.clone(),
            id: node.id.clone(),
            classes: node.classes.clone(),
            style: node.style.clone(),
            html: node.inner_html.clone(),
            src: node.src.clone(),
            children: node.children.iter().map(|c| self.snapshot(*c)).collect(),
        }
    }

    /// Serialize a subtree as HTML. Inner HTML is emitted as-is, children
    /// follow it.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        if let Some(element_id) = &node.id {
            push_attribute(out, "id", element_id);
        }
        if !node.classes.is_empty() {
            push_attribute(out, "class", &node.classes.join(" "));
        }
        for (name, value) in &node.attributes {
            push_attribute(out, name, value);
        }
        if !node.style.is_empty() {
            let style: Vec<_> = node
                .style
                .iter()
                .map(|(property, value)| format!("{}: {}", property, value))
                .collect();
            push_attribute(out, "style", &style.join("; "));
        }
        if let Some(src) = &node.src {
            push_attribute(out, "src", src);
        }
        out.push('>');
        if is_void(&node.tag) {
            return;
        }
        out.push_str(&node.inner_html);
        for child in &node.children {
            self.write_html(*child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "input" | "br" | "hr" | "meta" | "link")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new("body");
        let mut panel = Node::new("div");
        panel.classes.push("panel".into());
        let panel = doc.append(doc.root(), panel);
        let mut title = Node::new("span");
        title.id = Some("title".into());
        title.classes.push("title".into());
        let title = doc.append(panel, title);
        (doc, panel, title)
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!("#a-b".parse::<Selector>(), Ok(Selector::id("a-b")));
        assert_eq!(".tpl".parse::<Selector>(), Ok(Selector::class("tpl")));
        assert_eq!("".parse::<Selector>(), Err(SelectorError::Empty));
        assert!("div > span".parse::<Selector>().is_err());
        assert!("#".parse::<Selector>().is_err());
    }

    #[test]
    fn test_find_excludes_scope() {
        let (doc, panel, title) = sample();
        assert_eq!(doc.find(panel, &Selector::class("panel")), None);
        assert_eq!(doc.find(panel, &Selector::id("title")), Some(title));
        assert_eq!(doc.select(&Selector::class("panel")), Some(panel));
    }

    #[test]
    fn test_clone_subtree_is_independent() {
        let (mut doc, panel, title) = sample();
        let slot = doc.append(doc.root(), Node::new("section"));
        let copy = doc.clone_subtree(panel, slot);

        assert_eq!(doc.snapshot(copy), doc.snapshot(panel));

        doc.node_mut(title).set_inner_html("changed");
        assert_ne!(doc.snapshot(copy), doc.snapshot(panel));
        assert_eq!(doc.node(slot).children(), &[copy]);
    }

    #[test]
    fn test_clone_into_own_subtree_terminates() {
        let (mut doc, panel, title) = sample();
        let copy = doc.clone_subtree(panel, title);

        assert!(doc.is_within(copy, panel));
        assert!(!doc.is_within(panel, copy));
        // the copy holds the original panel and title only
        assert_eq!(doc.descendants(copy).len(), 2);
    }

    #[test]
    fn test_class_toggle_reports_change() {
        let mut node = Node::new("div");
        assert!(node.set_class("short-back", true));
        assert!(!node.set_class("short-back", true));
        assert!(node.set_class("short-back", false));
        assert!(!node.set_class("short-back", false));
    }

    #[test]
    fn test_to_html() {
        let (mut doc, panel, title) = sample();
        doc.node_mut(title).set_inner_html("A&nbsp;• B");
        doc.node_mut(title).set_style("font-size", "12pt");
        let mut img = Node::new("img");
        img.src = Some("data:x".into());
        doc.append(panel, img);

        assert_eq!(
            doc.to_html(panel),
            r#"<div class="panel"><span id="title" class="title" style="font-size: 12pt">A&nbsp;• B</span><img src="data:x"></div>"#
        );
    }
}
