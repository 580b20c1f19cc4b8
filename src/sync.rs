//! Surface Synchronizer - preview and print duplicate
//!
//! The duplicate is a deep copy of the preview template, taken before any
//! binding runs. Each copy gets its own Output Registry; both share one
//! catalog and one Field Registry, and never read each other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

use crate::catalog::{BindingCatalog, BindingId};
use crate::dom::{Document, NodeId, NodeSnapshot};
use crate::error::ConfigurationError;
use crate::fields::{FieldId, FieldRegistry};
use crate::hashing::surface_fingerprint;
use crate::outputs::{OutputKey, OutputRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    Preview,
    Duplicate,
}

impl SurfaceRole {
    pub const ALL: [SurfaceRole; 2] = [SurfaceRole::Preview, SurfaceRole::Duplicate];
}

impl fmt::Display for SurfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceRole::Preview => f.write_str("preview"),
            SurfaceRole::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// One binding of one surface, listening on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub surface: SurfaceRole,
    pub binding: BindingId,
}

/// A catalog applied to one surface's outputs.
#[derive(Debug)]
pub struct BoundSurface {
    role: SurfaceRole,
    outputs: OutputRegistry,
    catalog: Rc<BindingCatalog>,
}

impl BoundSurface {
    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    pub fn root(&self) -> NodeId {
        self.outputs.root()
    }

    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    /// Nodes behind an output key, empty if the key is not bound here.
    pub fn nodes(&self, key: OutputKey) -> &[NodeId] {
        self.outputs.target(key).map(|t| t.nodes()).unwrap_or(&[])
    }

    /// Evaluate one binding against current field values and write the
    /// result. Uninterpretable input leaves the outputs as they are.
    /// Returns whether any node changed.
    pub fn apply(
        &self,
        binding: BindingId,
        fields: &FieldRegistry,
        document: &mut Document,
    ) -> bool {
        let binding_def = self.catalog.get(binding);

        let inputs: Vec<_> = binding_def
            .sources
            .iter()
            .filter_map(|key| fields.value_of(*key))
            .collect();

        let presentation = match binding_def.transform.apply(&inputs) {
            Ok(presentation) => presentation,
            Err(e) => {
                debug!(
                    surface = %self.role,
                    binding = binding.index(),
                    transform = binding_def.transform.name(),
                    "keeping previous output: {}", e
                );
                return false;
            }
        };

        let mut changed = false;
        for key in &binding_def.targets {
            if let Some(target) = self.outputs.target(*key) {
                changed |= self.outputs.set(document, target, &presentation);
            }
        }

        trace!(
            surface = %self.role,
            binding = binding.index(),
            transform = binding_def.transform.name(),
            changed,
            "binding applied"
        );
        changed
    }

    pub fn snapshot(&self, document: &Document) -> NodeSnapshot {
        document.snapshot(self.root())
    }

    pub fn fingerprint(&self, document: &Document) -> Result<String, serde_json::Error> {
        surface_fingerprint(&self.snapshot(document))
    }

    pub fn to_html(&self, document: &Document) -> String {
        document.to_html(self.root())
    }
}

#[derive(Debug)]
pub struct SurfaceSynchronizer {
    catalog: Rc<BindingCatalog>,
    preview: BoundSurface,
    duplicate: BoundSurface,
}

impl SurfaceSynchronizer {
    /// Copy `template` into the empty `duplicate_container`, which must sit
    /// outside it, then resolve outputs on both copies.
    pub fn build(
        document: &mut Document,
        template: NodeId,
        duplicate_container: NodeId,
        catalog: Rc<BindingCatalog>,
    ) -> Result<Self, ConfigurationError> {
        if !document.node(duplicate_container).children().is_empty() {
            return Err(ConfigurationError::DuplicateNotEmpty {
                selector: describe(document, duplicate_container),
            });
        }

        if document.is_within(duplicate_container, template) {
            return Err(ConfigurationError::DuplicateInsideTemplate {
                selector: describe(document, duplicate_container),
            });
        }

        let duplicate_root = document.clone_subtree(template, duplicate_container);

        let keys = catalog.output_keys();
        let preview = BoundSurface {
            role: SurfaceRole::Preview,
            outputs: OutputRegistry::resolve(document, template, &keys)?,
            catalog: Rc::clone(&catalog),
        };
        let duplicate = BoundSurface {
            role: SurfaceRole::Duplicate,
            outputs: OutputRegistry::resolve(document, duplicate_root, &keys)?,
            catalog: Rc::clone(&catalog),
        };

        Ok(Self {
            catalog,
            preview,
            duplicate,
        })
    }

    pub fn catalog(&self) -> &BindingCatalog {
        &self.catalog
    }

    pub fn surface(&self, role: SurfaceRole) -> &BoundSurface {
        match role {
            SurfaceRole::Preview => &self.preview,
            SurfaceRole::Duplicate => &self.duplicate,
        }
    }

    /// Validate the catalog and subscribe every binding of both surfaces to
    /// its source fields: all preview bindings in declaration order, then
    /// all duplicate bindings.
    pub fn attach(&self, fields: &mut FieldRegistry) -> Result<(), ConfigurationError> {
        self.catalog.validate(fields, &self.preview.outputs)?;
        self.catalog.validate(fields, &self.duplicate.outputs)?;

        for surface in SurfaceRole::ALL {
            for (binding, def) in self.catalog.iter() {
                for key in def.distinct_sources() {
                    let field = fields
                        .handle(key)
                        .ok_or(ConfigurationError::UnknownSource {
                            binding: binding.index(),
                            key,
                        })?;
                    fields.subscribe(field, Subscription { surface, binding });
                }
            }
        }
        Ok(())
    }

    /// Run every subscription of the changed fields, each at most once even
    /// when several of its sources are in `changed`. Returns the number of
    /// binding applications.
    pub fn dispatch(
        &self,
        changed: &[FieldId],
        fields: &FieldRegistry,
        document: &mut Document,
    ) -> usize {
        let mut pending: Vec<Subscription> = vec![];
        for field in changed {
            for subscription in fields.subscribers(*field) {
                if !pending.contains(subscription) {
                    pending.push(*subscription);
                }
            }
        }

        for subscription in &pending {
            self.surface(subscription.surface)
                .apply(subscription.binding, fields, document);
        }
        pending.len()
    }

    pub fn is_consistent(&self, document: &Document) -> bool {
        self.preview.snapshot(document) == self.duplicate.snapshot(document)
    }
}

fn describe(document: &Document, node: NodeId) -> String {
    let node = document.node(node);
    match (&node.id, node.classes.first()) {
        (Some(id), _) => format!("#{}", id),
        (None, Some(class)) => format!(".{}", class),
        (None, None) => node.tag.clone(),
    }
}
