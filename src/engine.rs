//! J-Card Engine - single entry point
//!
//! `init` locates the page regions, copies the preview into the duplicate
//! container, resolves and validates every field and output, subscribes the
//! catalog, populates values and renders both surfaces once. Any
//! configuration problem aborts it.

use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::BindingCatalog;
use crate::dom::{Document, Node, NodeId, NodeSnapshot, Selector, SelectorError};
use crate::error::{ConfigurationError, FieldError};
use crate::fields::{FieldKey, FieldRegistry, FieldValue, SelectedFile};
use crate::outputs::OutputKey;
use crate::populate::{populate, FieldRecord};
use crate::sync::{BoundSurface, SurfaceRole, SurfaceSynchronizer};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),
}

/// Selectors of the three regions inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub controls: Selector,
    pub template: Selector,
    pub duplicate: Selector,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            controls: Selector::class("controls"),
            template: Selector::class("template"),
            duplicate: Selector::class("print-duplicate"),
        }
    }
}

/// A live j-card: fields, preview and print duplicate.
#[derive(Debug)]
pub struct JCard {
    document: Document,
    fields: FieldRegistry,
    surfaces: SurfaceSynchronizer,
    bootstrap_applications: usize,
}

/// Initialize with the j-card catalog and default layout.
pub fn init(document: Document, selector: &str, record: &FieldRecord) -> Result<JCard, EngineError> {
    JCard::init(document, selector, record)
}

impl JCard {
    pub fn init(document: Document, selector: &str, record: &FieldRecord) -> Result<Self, EngineError> {
        Self::init_with(
            document,
            selector,
            record,
            BindingCatalog::jcard(),
            &Layout::default(),
        )
    }

    pub fn init_with(
        mut document: Document,
        selector: &str,
        record: &FieldRecord,
        catalog: BindingCatalog,
        layout: &Layout,
    ) -> Result<Self, EngineError> {
        let container_selector: Selector = selector.parse()?;
        let container = document
            .select(&container_selector)
            .ok_or_else(|| ConfigurationError::MissingRegion {
                selector: container_selector.to_string(),
            })?;

        let region = |selector: &Selector| {
            document
                .find(container, selector)
                .ok_or_else(|| ConfigurationError::MissingRegion {
                    selector: selector.to_string(),
                })
        };
        let controls = region(&layout.controls)?;
        let template = region(&layout.template)?;
        let duplicate = region(&layout.duplicate)?;

        let catalog = Rc::new(catalog);
        let mut fields = FieldRegistry::resolve(&document, controls, &catalog.field_keys())?;
        let surfaces = SurfaceSynchronizer::build(&mut document, template, duplicate, catalog)?;
        surfaces.attach(&mut fields)?;

        let written = populate(&mut fields, record)?;
        for id in &written {
            fields.reflect(*id, &mut document);
            debug!(
                field = %fields.key(*id),
                notification = ?fields.key(*id).kind().notification(),
                "bootstrap notification"
            );
        }
        let bootstrap_applications = surfaces.dispatch(&written, &fields, &mut document);

        info!(
            container = %container_selector,
            prefix = fields.naming().prefix(),
            fields = fields.len(),
            bindings = surfaces.catalog().len(),
            applications = bootstrap_applications,
            "j-card initialized"
        );

        Ok(Self {
            document,
            fields,
            surfaces,
            bootstrap_applications,
        })
    }

    /// Apply a user edit and re-run the bindings that read this field.
    /// Returns the number of binding applications.
    pub fn set(&mut self, key: FieldKey, value: FieldValue) -> Result<usize, EngineError> {
        let id = self.fields.handle(key).ok_or(FieldError::Unknown(key))?;
        self.fields.write(id, value)?;
        self.fields.reflect(id, &mut self.document);
        debug!(field = %key, notification = ?key.kind().notification(), "field changed");
        Ok(self.surfaces.dispatch(&[id], &self.fields, &mut self.document))
    }

    pub fn set_text(&mut self, key: FieldKey, text: &str) -> Result<usize, EngineError> {
        self.set(key, FieldValue::Text(text.to_string()))
    }

    pub fn set_checked(&mut self, key: FieldKey, checked: bool) -> Result<usize, EngineError> {
        self.set(key, FieldValue::Checked(checked))
    }

    pub fn select_file(&mut self, key: FieldKey, file: SelectedFile) -> Result<usize, EngineError> {
        self.set(key, FieldValue::Files(vec![file]))
    }

    /// Cancelled file dialog: selection becomes empty, the image stays.
    pub fn clear_files(&mut self, key: FieldKey) -> Result<usize, EngineError> {
        self.set(key, FieldValue::Files(vec![]))
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.value_of(key)
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Host-side access. Writes made here bypass the bindings and are only
    /// undone by the next change of a field that drives the node.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn catalog(&self) -> &BindingCatalog {
        self.surfaces.catalog()
    }

    pub fn surface(&self, role: SurfaceRole) -> &BoundSurface {
        self.surfaces.surface(role)
    }

    /// Nodes behind an output on one surface.
    pub fn output(&self, role: SurfaceRole, key: OutputKey) -> Vec<&Node> {
        self.surface(role)
            .nodes(key)
            .iter()
            .map(|id| self.document.node(*id))
            .collect()
    }

    pub fn output_ids(&self, role: SurfaceRole, key: OutputKey) -> &[NodeId] {
        self.surface(role).nodes(key)
    }

    pub fn snapshot(&self, role: SurfaceRole) -> NodeSnapshot {
        self.surface(role).snapshot(&self.document)
    }

    pub fn fingerprint(&self, role: SurfaceRole) -> Result<String, serde_json::Error> {
        self.surface(role).fingerprint(&self.document)
    }

    pub fn to_html(&self, role: SurfaceRole) -> String {
        self.surface(role).to_html(&self.document)
    }

    /// Preview and duplicate show the same thing.
    pub fn is_consistent(&self) -> bool {
        self.surfaces.is_consistent(&self.document)
    }

    /// Binding applications performed by the startup render pass.
    pub fn bootstrap_applications(&self) -> usize {
        self.bootstrap_applications
    }
}
