//! Testing utilities for crudsmith
//!
//! This module provides helpers for checking generated pages and the
//! approval workflow they encode:
//! - [`RecordStore`] - In-memory main, shadow and trash tables driven by the
//!   approval state machine
//! - Page assertion helpers for common output patterns
//!
//! # Example
//!
//! ```rust
//! use crudsmith::scaffold::{DataType, FieldDescriptor, GenerationContext, GenerationOptions};
//! use crudsmith::testing::RecordStore;
//!
//! let fields = vec![
//!     FieldDescriptor::new("article_id", DataType::Int).primary_key(),
//!     FieldDescriptor::new("title", DataType::Text).insert().update(),
//! ];
//! let ctx = GenerationContext::new("article", &fields, GenerationOptions::default().with_approval());
//! let mut store = RecordStore::new(&ctx);
//!
//! let id = store.create(&[("title", "Hello")]);
//! assert!(store.main(id).is_some_and(|row| row.draft));
//! store.approve(id, None);
//! assert!(store.main(id).is_some_and(|row| !row.draft));
//! ```

pub mod assertions;
pub mod store;

pub use assertions::*;
pub use store::{MainRow, RecordStore, ShadowRow, TrashRow};
