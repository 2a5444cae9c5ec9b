//! Generation options
//!
//! Independent feature flags for one generation call. Options are plain
//! values: build them once, hand them to the generator, never mutate them
//! mid-generation.

use serde::{Deserialize, Serialize};

/// Feature flags for a generation call
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Route every mutation through the draft + approval workflow
    pub with_approval: bool,

    /// Archive rows into `<entity>_trash` before a hard delete
    pub with_trash: bool,

    /// Store the optional `apv_note` request value on approve/reject
    pub with_note: bool,

    /// Default list order is `<primary key> DESC`
    pub default_order_descending: bool,

    /// Rows carry a `sort_order` column persisted via drag ordering
    pub manual_sort_order: bool,

    /// Quote table and column identifiers with backticks
    pub quote_identifiers: bool,
}

impl GenerationOptions {
    /// Enable the approval workflow
    #[must_use]
    pub const fn with_approval(mut self) -> Self {
        self.with_approval = true;
        self
    }

    /// Enable trash archiving
    #[must_use]
    pub const fn with_trash(mut self) -> Self {
        self.with_trash = true;
        self
    }

    /// Enable approval notes
    #[must_use]
    pub const fn with_note(mut self) -> Self {
        self.with_note = true;
        self
    }

    /// Order lists by primary key descending by default
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.default_order_descending = true;
        self
    }

    /// Enable manual sort order
    #[must_use]
    pub const fn manual_sort(mut self) -> Self {
        self.manual_sort_order = true;
        self
    }

    /// Quote identifiers
    #[must_use]
    pub const fn quoted(mut self) -> Self {
        self.quote_identifiers = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_all_off() {
        let options = GenerationOptions::default();
        assert!(!options.with_approval);
        assert!(!options.with_trash);
        assert!(!options.with_note);
        assert!(!options.default_order_descending);
        assert!(!options.manual_sort_order);
        assert!(!options.quote_identifiers);
    }

    #[test]
    fn test_builder_flags_are_independent() {
        let options = GenerationOptions::default().with_approval().manual_sort();
        assert!(options.with_approval);
        assert!(options.manual_sort_order);
        assert!(!options.with_trash);
        assert!(!options.default_order_descending);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"with_trash": true}"#).unwrap();
        assert!(options.with_trash);
        assert!(!options.with_approval);
    }
}
