//! J-Card Core - field-binding engine
//!
//! # Guarantees
//! 1. Every declared field and output resolves at init, or init fails
//! 2. The print duplicate is copied from the preview before anything binds
//! 3. Both surfaces are driven by one field registry and one catalog
//! 4. A change re-runs only the bindings that read the changed field
//! 5. Transient input never breaks what is already shown

pub mod catalog;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fields;
pub mod hashing;
pub mod outputs;
pub mod populate;
pub mod print;
pub mod sync;
pub mod templates;
pub mod transforms;

pub use catalog::{Binding, BindingCatalog, BindingId};
pub use dom::{Document, NodeSnapshot, Selector};
pub use engine::{init, EngineError, JCard, Layout};
pub use error::{ConfigurationError, FieldError};
pub use fields::{FieldKey, FieldKind, FieldValue, SelectedFile};
pub use hashing::{canonical_json, surface_fingerprint};
pub use outputs::{OutputKey, Presentation};
pub use populate::{FieldRecord, RecordValue};
pub use print::{PrintCopy, PrintError};
pub use sync::{BoundSurface, SurfaceRole, SurfaceSynchronizer};
pub use templates::{Markup, Template, TemplateError};
pub use transforms::{Transform, TransformInputError, LIST_SEPARATOR};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_ENGINE_VERSION: &str = "1.0.0";
