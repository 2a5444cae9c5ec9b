//! crudsmith: schema-driven CRUD page generator
//!
//! Given a table's column metadata and a handful of feature flags, crudsmith
//! emits a complete create/read/update/delete page for a host admin framework.
//! The page optionally routes every mutation through a two-phase
//! "draft + approval" workflow backed by a shadow table.
//!
//! # Pipeline
//!
//! 1. **Field descriptors** ([`scaffold::field_type`]) and **generation
//!    options** ([`scaffold::options`]) describe the entity.
//! 2. The **query fragment builder** ([`scaffold::query`]) derives SELECT lists,
//!    filter predicates and ORDER BY clauses from the descriptors.
//! 3. The **approval state machine** ([`scaffold::approval`]) decides which side
//!    effects each mutation has.
//! 4. The **form control synthesizer** ([`scaffold::control`]) maps descriptors
//!    to UI controls.
//! 5. **Section emitters** ([`scaffold::sections`]) build a typed section AST
//!    ([`scaffold::ast`]) which is rendered once per **emission target**
//!    ([`scaffold::target`]).
//!
//! # Quick Start
//!
//! ```rust
//! use crudsmith::scaffold::{
//!     generate, DataType, ElementType, FieldDescriptor, GenerationOptions, Php,
//! };
//!
//! let fields = vec![
//!     FieldDescriptor::new("article_id", DataType::Int).primary_key().everywhere(),
//!     FieldDescriptor::new("title", DataType::Text).required().everywhere(),
//!     FieldDescriptor::new("category_id", DataType::Int)
//!         .element(ElementType::Select)
//!         .everywhere(),
//! ];
//! let options = GenerationOptions::default().with_approval();
//!
//! let page = generate("article", &fields, &options, &Php);
//! assert!(page.contains("article_apv"));
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod scaffold;
pub mod testing;

pub use error::{CrudsmithError, Result};

/// Commonly used items
pub mod prelude {
    pub use crate::config::{CrudsmithConfig, RuntimeSettings};
    pub use crate::error::{CrudsmithError, Result};
    pub use crate::scaffold::{
        generate, DataType, ElementType, EmissionTarget, EntityMetadata, FieldDescriptor,
        FilterKind, GenerationOptions, ScaffoldGenerator, TargetRegistry,
    };
}
