//! Starter metadata command

use anyhow::{bail, Context, Result};
use clap::Args;
use console::{style, Term};
use dialoguer::Confirm;
use std::fs;
use std::path::PathBuf;

use crate::templates::StarterTemplate;

/// Create a starter metadata document for an entity
#[derive(Debug, Clone, Args)]
pub struct NewCommand {
    /// Entity name (lowercase SQL identifier, e.g. `news_item`)
    pub entity: String,

    /// Directory to write into
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Enable the approval workflow in the starter options
    #[arg(long)]
    pub approval: bool,

    /// Overwrite existing files without asking
    #[arg(long)]
    pub force: bool,

    /// Also write a `crudsmith.toml` with the default configuration
    #[arg(long)]
    pub with_config: bool,

    /// Fail instead of prompting when a file exists
    #[arg(long)]
    pub no_input: bool,
}

impl NewCommand {
    /// Create a new command instance
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a valid identifier
    pub fn new(entity: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self> {
        let entity = entity.into();
        if !is_valid_entity_name(&entity) {
            bail!(
                "Invalid entity name: {entity}. Must be a lowercase identifier (letters, digits, underscores)"
            );
        }

        Ok(Self {
            entity,
            dir: dir.into(),
            approval: false,
            force: false,
            with_config: false,
            no_input: false,
        })
    }

    /// Execute the command, returning the written paths
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity name is invalid
    /// - A file exists and overwriting was declined
    /// - Writing a file fails
    pub fn execute(&self) -> Result<Vec<PathBuf>> {
        if !is_valid_entity_name(&self.entity) {
            bail!("Invalid entity name: {}", self.entity);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        let template = StarterTemplate::new(&self.entity, self.approval);

        let mut written = Vec::new();
        let metadata_path = self.dir.join(format!("{}.toml", self.entity));
        if self.may_write(&metadata_path)? {
            written.push(template.write_metadata(&self.dir)?);
        }
        if self.with_config {
            let config_path = self.dir.join(crudsmith::config::DEFAULT_CONFIG_FILE);
            if self.may_write(&config_path)? {
                written.push(template.write_config(&self.dir)?);
            }
        }

        self.print_success(&written);
        Ok(written)
    }

    /// Whether `path` may be (over)written
    fn may_write(&self, path: &std::path::Path) -> Result<bool> {
        if self.force || !path.exists() {
            return Ok(true);
        }
        if self.no_input || !Term::stdout().is_term() {
            bail!(
                "{} already exists. Use --force to overwrite it.",
                path.display()
            );
        }

        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        Ok(overwrite)
    }

    fn print_success(&self, written: &[PathBuf]) {
        for path in written {
            println!(
                "{} {}",
                style("Created").green().bold(),
                style(path.display()).cyan()
            );
        }
        if written.is_empty() {
            return;
        }
        println!();
        println!("{}", style("Next steps:").bold());
        println!("  {} Describe the fields in the metadata document", style("1.").cyan());
        println!("  {} Generate the page:", style("2.").cyan());
        println!(
            "     {} {}",
            style("$").dim(),
            style(format!(
                "crudsmith generate {}.toml --out ./generated",
                self.entity
            ))
            .cyan()
        );
    }
}

/// Entity names become table, column and variable names
fn is_valid_entity_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_entity_names() {
        assert!(is_valid_entity_name("article"));
        assert!(is_valid_entity_name("news_item"));
        assert!(is_valid_entity_name("page2"));
        assert!(is_valid_entity_name("_draft"));
    }

    #[test]
    fn test_invalid_entity_names() {
        assert!(!is_valid_entity_name(""));
        assert!(!is_valid_entity_name("Article"));
        assert!(!is_valid_entity_name("2page"));
        assert!(!is_valid_entity_name("news-item")); // not an SQL identifier
        assert!(!is_valid_entity_name("news item"));
    }

    #[test]
    fn test_new_command_validates_name() {
        assert!(NewCommand::new("NewsItem", ".").is_err());
        assert!(NewCommand::new("news_item", ".").is_ok());
    }

    #[test]
    fn test_existing_file_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = NewCommand::new("tag", dir.path()).unwrap();
        command.no_input = true;
        assert_eq!(command.execute().unwrap().len(), 1);
        assert!(command.execute().is_err());

        command.force = true;
        command.with_config = true;
        let written = command.execute().unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("crudsmith.toml"));
    }
}
