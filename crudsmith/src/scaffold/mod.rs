//! CRUD page scaffolding
//!
//! Turns field descriptors and generation options into a complete CRUD page
//! for each registered emission target.
//!
//! # Architecture
//!
//! - [`field_type`] - Field descriptors, data/element types, sanitize filters
//! - [`options`] - Generation feature flags
//! - [`metadata`] - Serde metadata documents (JSON/TOML)
//! - [`context`] - Immutable generation context threaded through emitters
//! - [`query`] - SELECT lists, filters, ORDER BY and mutation SQL
//! - [`approval`] - Draft + approval state machine
//! - [`control`] - Form control synthesizer
//! - [`ast`] - Section AST and its renderer
//! - [`target`] - Emission targets (`php`, `jsp`)
//! - [`sections`] - Section emitters
//! - [`generator`] - Page generator

pub mod approval;
pub mod ast;
pub mod context;
pub mod control;
pub mod field_type;
pub mod generator;
pub mod helpers;
pub mod metadata;
pub mod options;
pub mod query;
pub mod sections;
pub mod target;

pub use context::GenerationContext;
pub use field_type::{DataType, ElementType, FieldDescriptor, FilterKind, Relation, SanitizeFilter};
pub use generator::{generate, render_page, GeneratedFile, ScaffoldGenerator};
pub use helpers::TemplateHelpers;
pub use metadata::{EntityMetadata, MetadataFormat};
pub use options::GenerationOptions;
pub use target::{EmissionTarget, Jsp, Php, TargetRegistry};
