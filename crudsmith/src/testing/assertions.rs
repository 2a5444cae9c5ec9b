//! Page assertion helpers for testing
//!
//! This module provides helper functions for asserting the shape of
//! generated pages in unit and integration tests.

use crate::scaffold::target::EmissionTarget;

/// Assert that every pending-flag UPDATE in the page keeps the
/// `<table>_apv_id = 0` guard
///
/// # Panics
///
/// Panics if no such statement exists or one lacks the guard
///
/// # Example
///
/// ```rust
/// use crudsmith::scaffold::{generate, DataType, FieldDescriptor, GenerationOptions, Php};
/// use crudsmith::testing::assert_pending_guarded;
///
/// let fields = vec![FieldDescriptor::new("tag_id", DataType::Int).primary_key().everywhere()];
/// let page = generate("tag", &fields, &GenerationOptions::default().with_approval(), &Php);
/// assert_pending_guarded(&page, "tag");
/// ```
pub fn assert_pending_guarded(page: &str, table: &str) {
    let marker = format!("set {table}_apv_id = ?, waiting_for = ? where");
    let guard = format!("and {table}_apv_id = 0");
    let statements: Vec<&str> = page.lines().filter(|line| line.contains(&marker)).collect();

    assert!(
        !statements.is_empty(),
        "Expected pending-flag updates for '{table}', found none"
    );
    for statement in statements {
        assert!(
            statement.contains(&guard),
            "Expected '{guard}' in pending-flag update, got '{}'",
            statement.trim()
        );
    }
}

/// Assert that code blocks of the target open and close in pairs
///
/// # Panics
///
/// Panics if the open and close tag counts differ or a block is left open
pub fn assert_blocks_balanced(page: &str, target: &dyn EmissionTarget) {
    let open = target.open_tag();
    let close = target.close_tag();
    let mut depth = 0_i64;

    for line in page.lines() {
        if line == open {
            depth += 1;
        } else if line == close {
            depth -= 1;
        }
        assert!(
            (0..=1).contains(&depth),
            "Unbalanced {} blocks near '{line}'",
            target.name()
        );
    }
    assert_eq!(depth, 0, "Unclosed {} block at end of page", target.name());
}

/// Assert that each marker appears, in the order given
///
/// # Panics
///
/// Panics if a marker is missing or appears before the previous one
pub fn assert_in_order(page: &str, markers: &[&str]) {
    let mut from = 0;
    for marker in markers {
        let Some(offset) = page[from..].find(marker) else {
            panic!("Expected '{marker}' after byte {from}");
        };
        from += offset + marker.len();
    }
}
