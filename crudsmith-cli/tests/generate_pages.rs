//! Integration tests for the generate and new commands

use crudsmith::config::CrudsmithConfig;
use crudsmith_cli_lib::{GenerateCommand, NewCommand};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn starter(dir: &TempDir, entity: &str, approval: bool) -> PathBuf {
    let mut command = NewCommand::new(entity, dir.path()).unwrap();
    command.approval = approval;
    command.no_input = true;
    command.execute().unwrap().remove(0)
}

/// A starter document generates one page per target
#[test]
fn test_starter_document_generates_pages() {
    let dir = TempDir::new().unwrap();
    let metadata = starter(&dir, "tag", false);
    let out = dir.path().join("generated");

    let report = GenerateCommand {
        metadata: Some(metadata),
        targets: vec!["php".to_string(), "jsp".to_string()],
        out: Some(out.clone()),
        ..GenerateCommand::default()
    }
    .execute(&CrudsmithConfig::default())
    .unwrap();

    assert_eq!(report.written, vec![out.join("tag.php"), out.join("tag.jsp")]);
    let php = fs::read_to_string(out.join("tag.php")).unwrap();
    assert!(php.contains("<form name=\"insertform\""));
    assert!(php.contains("$permission = $cms->getPermission($_userLevel, $moduleName);"));
    assert!(!php.contains("tag_apv"));

    let jsp = fs::read_to_string(out.join("tag.jsp")).unwrap();
    assert!(jsp.starts_with("<%@ include file=\"lib.inc/auth-with-login-form.jsp\" %>"));
    assert!(jsp.contains("String permission = getPermission(_userLevel, moduleName);"));
}

/// `--check` passes on fresh output and reports hand edits
#[test]
fn test_check_reports_drift() {
    let dir = TempDir::new().unwrap();
    let metadata = starter(&dir, "article", true);
    let out = dir.path().join("generated");

    let write = GenerateCommand {
        metadata: Some(metadata),
        out: Some(out.clone()),
        ..GenerateCommand::default()
    };
    write.execute(&CrudsmithConfig::default()).unwrap();
    let page = fs::read_to_string(out.join("article.php")).unwrap();
    assert!(page.contains("article_apv"));

    let check = GenerateCommand {
        check: true,
        ..write
    };
    assert!(check.execute(&CrudsmithConfig::default()).unwrap().is_clean());

    fs::write(out.join("article.php"), page.replace("article_apv", "edited")).unwrap();
    let report = check.execute(&CrudsmithConfig::default()).unwrap();
    assert_eq!(report.drifted, vec![out.join("article.php")]);
    assert!(report.written.is_empty());
}

/// A metadata directory yields one page per document and skips the config file
#[test]
fn test_metadata_directory() {
    let dir = TempDir::new().unwrap();
    starter(&dir, "page", false);
    starter(&dir, "author", false);
    let mut command = NewCommand::new("page", dir.path()).unwrap();
    command.force = true;
    command.with_config = true;
    command.execute().unwrap();

    let out = dir.path().join("generated");
    let report = GenerateCommand {
        metadata: Some(dir.path().to_path_buf()),
        out: Some(out.clone()),
        ..GenerateCommand::default()
    }
    .execute(&CrudsmithConfig::default())
    .unwrap();

    let names: Vec<_> = report.files.iter().map(|file| file.path.clone()).collect();
    assert_eq!(names, vec![PathBuf::from("author.php"), PathBuf::from("page.php")]);
}

/// Inline field specs need no document; flags and configuration shape the page
#[test]
fn test_inline_specs_with_configuration() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("generated");
    let mut config = CrudsmithConfig::default();
    config.runtime.page_size = 5;

    GenerateCommand {
        entity: Some("tag".to_string()),
        fields: vec![
            "tag_id:int:pk:all".to_string(),
            "label:text:all".to_string(),
        ],
        trash: true,
        out: Some(out.clone()),
        ..GenerateCommand::default()
    }
    .execute(&config)
    .unwrap();

    let page = fs::read_to_string(out.join("tag.php")).unwrap();
    assert!(page.contains("limit 5 offset"));
    assert!(page.contains("tag_trash"));
}
