//! Page generation command
//!
//! Loads entity metadata (a document, a directory of documents, or inline
//! field specs), generates one page per target and writes, prints or checks
//! the result.
//!
//! # Example
//!
//! ```bash
//! crudsmith generate article.toml --target php --target jsp --out ./generated
//! crudsmith generate --entity tag --field tag_id:int:pk:all --field label:text:all
//! crudsmith generate ./metadata --out ./generated --check
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use console::{style, Emoji};
use crudsmith::config::CrudsmithConfig;
use crudsmith::scaffold::{
    EmissionTarget, EntityMetadata, FieldDescriptor, GeneratedFile, GenerationOptions,
    ScaffoldGenerator, TargetRegistry,
};
use indicatif::{ProgressBar, ProgressStyle};
use similar::TextDiff;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static SUCCESS: Emoji = Emoji("✓ ", "+ ");
static DRIFT: Emoji = Emoji("✗ ", "x ");

/// Generate CRUD pages
#[derive(Debug, Clone, Default, Args)]
pub struct GenerateCommand {
    /// Metadata document (`.toml`/`.json`) or a directory of documents
    pub metadata: Option<PathBuf>,

    /// Emission target; repeat for several (default: from configuration)
    #[arg(short, long = "target", value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Output directory; pages are printed to stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Field spec `name:type[:element][:modifier]*`, appended to the document's fields
    #[arg(short, long = "field", value_name = "SPEC")]
    pub fields: Vec<String>,

    /// Entity name; required without a metadata document
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Route mutations through the draft + approval workflow
    #[arg(long)]
    pub approval: bool,

    /// Archive rows into the trash table before hard deletes
    #[arg(long)]
    pub trash: bool,

    /// Store approval notes
    #[arg(long)]
    pub note: bool,

    /// Order the list by descending key
    #[arg(long)]
    pub desc: bool,

    /// Manual row ordering via a `sort_order` column
    #[arg(long)]
    pub manual_sort: bool,

    /// Quote identifiers with backticks
    #[arg(long)]
    pub quote: bool,

    /// Compare with the pages in the output directory instead of writing
    #[arg(long)]
    pub check: bool,
}

/// What a generate run did
#[derive(Debug, Default)]
pub struct GenerateReport {
    /// Every generated page, relative to the output directory
    pub files: Vec<GeneratedFile>,
    /// Pages written to disk
    pub written: Vec<PathBuf>,
    /// Pages whose content differs from the file on disk (`--check`)
    pub drifted: Vec<PathBuf>,
}

impl GenerateReport {
    /// Whether `--check` found no difference
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.drifted.is_empty()
    }
}

impl GenerateCommand {
    /// Execute the generate command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No metadata source was given
    /// - A metadata document or field spec is invalid
    /// - A target name is not registered
    /// - Writing or reading an output file fails
    pub fn execute(&self, config: &CrudsmithConfig) -> Result<GenerateReport> {
        let registry = TargetRegistry::builtin();
        let names = if self.targets.is_empty() {
            config.generator.targets.clone()
        } else {
            self.targets.clone()
        };
        let targets = names
            .iter()
            .map(|name| registry.get(name))
            .collect::<crudsmith::Result<Vec<&dyn EmissionTarget>>>()
            .context("Failed to resolve emission targets")?;

        let mut report = GenerateReport::default();
        for metadata in self.load_metadata()? {
            let metadata = self.apply_flags(metadata, config.options);
            let generator =
                ScaffoldGenerator::new(&metadata, config.options, config.runtime.clone());
            report
                .files
                .extend(generator.generate_all(targets.iter().copied()));
        }

        if self.check {
            let out = self
                .out
                .clone()
                .unwrap_or_else(|| config.generator.output_dir.clone());
            report.drifted = check_files(&report.files, &out)?;
        } else if let Some(out) = &self.out {
            report.written = write_files(&report.files, out)?;
        } else {
            let mut stdout = std::io::stdout().lock();
            for file in &report.files {
                stdout
                    .write_all(file.content.as_bytes())
                    .context("Failed to write to stdout")?;
            }
        }

        Ok(report)
    }

    fn load_metadata(&self) -> Result<Vec<EntityMetadata>> {
        let extra = self
            .fields
            .iter()
            .map(|spec| FieldDescriptor::parse(spec))
            .collect::<crudsmith::Result<Vec<_>>>()
            .context("Failed to parse field specs")?;

        let mut documents = match &self.metadata {
            Some(path) if path.is_dir() => load_dir(path)?,
            Some(path) => vec![EntityMetadata::load(path)
                .with_context(|| format!("Failed to load metadata: {}", path.display()))?],
            None => {
                let Some(entity) = &self.entity else {
                    bail!("Provide a metadata document or --entity with --field specs");
                };
                if extra.is_empty() {
                    bail!("At least one --field must be specified for entity '{entity}'");
                }
                return Ok(vec![EntityMetadata::from_specs(entity, &self.fields)?]);
            }
        };

        for document in &mut documents {
            if let Some(entity) = &self.entity {
                document.entity.clone_from(entity);
            }
            document.fields.extend(extra.iter().cloned());
        }
        Ok(documents)
    }

    /// Command-line flags switch options on over the document's or the
    /// configuration's values
    fn apply_flags(&self, mut metadata: EntityMetadata, defaults: GenerationOptions) -> EntityMetadata {
        let mut options = metadata.options_or(defaults);
        options.with_approval |= self.approval;
        options.with_trash |= self.trash;
        options.with_note |= self.note;
        options.default_order_descending |= self.desc;
        options.manual_sort_order |= self.manual_sort;
        options.quote_identifiers |= self.quote;
        metadata.options = Some(options);
        metadata
    }
}

/// Metadata documents in a directory, in path order
fn load_dir(dir: &Path) -> Result<Vec<EntityMetadata>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "toml" | "json"))
                && path.file_name().and_then(|name| name.to_str())
                    != Some(crudsmith::config::DEFAULT_CONFIG_FILE)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("No metadata documents found in {}", dir.display());
    }

    paths
        .iter()
        .map(|path| {
            EntityMetadata::load(path)
                .with_context(|| format!("Failed to load metadata: {}", path.display()))
        })
        .collect()
}

fn write_files(files: &[GeneratedFile], out: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create directory: {}", out.display()))?;

    let progress = ProgressBar::new(u64::try_from(files.len()).unwrap_or(u64::MAX));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.green} {pos}/{len} {msg}")
            .context("Failed to set progress style")?,
    );

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = out.join(&file.path);
        progress.set_message(file.path.display().to_string());
        fs::write(&path, &file.content)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        progress.inc(1);
        written.push(path);
    }
    progress.finish_and_clear();

    println!(
        "{} {} page(s) in {}",
        style("Generated").green().bold(),
        files.len(),
        style(out.display()).cyan()
    );
    for file in files {
        println!(
            "  {}{} ({})",
            style(SUCCESS).green(),
            style(file.path.display()).dim(),
            style(&file.description).dim()
        );
    }
    Ok(written)
}

fn check_files(files: &[GeneratedFile], out: &Path) -> Result<Vec<PathBuf>> {
    let mut drifted = Vec::new();
    for file in files {
        let path = out.join(&file.path);
        let existing = if path.exists() {
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?
        } else {
            String::new()
        };

        if existing == file.content {
            println!("  {}{}", style(SUCCESS).green(), style(path.display()).dim());
            continue;
        }

        println!("  {}{}", style(DRIFT).red(), style(path.display()).red());
        let diff = TextDiff::from_lines(&existing, &file.content);
        print!(
            "{}",
            diff.unified_diff()
                .context_radius(3)
                .header(&path.display().to_string(), "generated")
        );
        drifted.push(path);
    }
    Ok(drifted)
}
