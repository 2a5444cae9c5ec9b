//! Configuration management for crudsmith
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `CRUDSMITH_` prefix, `__`
//!    separates sections)
//! 2. An explicit file passed by the caller (`--config`)
//! 3. `./crudsmith.toml`
//! 4. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # crudsmith.toml
//! [generator]
//! targets = ["php", "jsp"]
//! output_dir = "./generated"
//!
//! [options]
//! with_approval = true
//! with_trash = true
//!
//! [runtime]
//! auth_include = "lib.inc/auth-admin"
//! page_size = 50
//!
//! [runtime.messages]
//! not_found = "Data tidak ditemukan"
//! ```

use crate::scaffold::options::GenerationOptions;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "crudsmith.toml";

/// Generator front-end settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Targets generated when the caller names none
    pub targets: Vec<String>,

    /// Directory generated pages are written to
    pub output_dir: PathBuf,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            targets: vec!["php".to_string()],
            output_dir: PathBuf::from("./generated"),
        }
    }
}

/// Localized messages rendered into generated pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Shown when a detail/update lookup or a list query finds nothing
    pub not_found: String,

    /// Shown when a list/detail query throws
    pub database_failure: String,

    /// Forbidden fragment shown instead of an action the user may not perform
    pub forbidden: String,

    /// Badge for rows waiting for creation approval
    pub waiting_create: String,

    /// Badge for rows waiting for update approval
    pub waiting_update: String,

    /// Badge for rows waiting for activation approval
    pub waiting_activate: String,

    /// Badge for rows waiting for deactivation approval
    pub waiting_deactivate: String,

    /// Badge for rows waiting for delete approval
    pub waiting_delete: String,

    /// Caption of the approval note field
    pub note: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            not_found: "Data not found".to_string(),
            database_failure: "Database access failed".to_string(),
            forbidden: "You are not allowed to perform this action".to_string(),
            waiting_create: "Waiting for creation approval".to_string(),
            waiting_update: "Waiting for update approval".to_string(),
            waiting_activate: "Waiting for activation approval".to_string(),
            waiting_deactivate: "Waiting for deactivation approval".to_string(),
            waiting_delete: "Waiting for delete approval".to_string(),
            note: "Note".to_string(),
        }
    }
}

/// Settings for the run-time environment generated pages execute in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Auth include path without extension; the target appends its own
    pub auth_include: String,

    /// Rows per list page
    pub page_size: u32,

    /// Localized messages
    pub messages: Messages,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            auth_include: "lib.inc/auth-with-login-form".to_string(),
            page_size: 20,
            messages: Messages::default(),
        }
    }
}

/// Complete crudsmith configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CrudsmithConfig {
    /// Generator front-end settings
    #[serde(default)]
    pub generator: GeneratorSettings,

    /// Default generation options, overridden by metadata documents and flags
    #[serde(default)]
    pub options: GenerationOptions,

    /// Run-time environment settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

impl CrudsmithConfig {
    /// Load configuration from defaults, `./crudsmith.toml`, an optional
    /// explicit file and `CRUDSMITH_*` environment variables
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use crudsmith::config::CrudsmithConfig;
    ///
    /// # fn example() -> crudsmith::Result<()> {
    /// let config = CrudsmithConfig::load(None)?;
    /// assert!(!config.generator.targets.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        Self::figment(explicit).extract().map_err(Into::into)
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Into::into)
    }

    /// The layered figment used by [`Self::load`]
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("CRUDSMITH_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CrudsmithConfig::default();
        assert_eq!(config.generator.targets, vec!["php"]);
        assert_eq!(config.runtime.page_size, 20);
        assert_eq!(config.runtime.auth_include, "lib.inc/auth-with-login-form");
        assert!(!config.options.with_approval);
    }

    #[test]
    fn test_message_defaults() {
        let messages = Messages::default();
        assert_eq!(messages.not_found, "Data not found");
        assert_eq!(messages.database_failure, "Database access failed");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[generator]
targets = ["php", "jsp"]

[options]
with_approval = true
manual_sort_order = true

[runtime]
page_size = 50

[runtime.messages]
not_found = "Data tidak ditemukan"
"#
        )
        .unwrap();

        let config = CrudsmithConfig::load_from(file.path()).unwrap();
        assert_eq!(config.generator.targets, vec!["php", "jsp"]);
        assert!(config.options.with_approval);
        assert!(config.options.manual_sort_order);
        assert!(!config.options.with_trash);
        assert_eq!(config.runtime.page_size, 50);
        assert_eq!(config.runtime.messages.not_found, "Data tidak ditemukan");
        // untouched keys keep their defaults
        assert_eq!(config.runtime.messages.forbidden, Messages::default().forbidden);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let config =
            CrudsmithConfig::load_from(Path::new("/nonexistent/crudsmith.toml")).unwrap();
        assert_eq!(config, CrudsmithConfig::default());
    }
}
