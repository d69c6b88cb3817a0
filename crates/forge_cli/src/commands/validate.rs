//! Validate command - validate a directory of generated files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_validate::validate_project;

#[derive(Args)]
pub struct ValidateArgs {
    /// Directory containing the files to validate
    #[arg(short, long)]
    dir: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("directory not found: {}", args.dir.display());
    }

    info!("Validating files under {}", args.dir.display());

    let mut categories: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    collect_files(&args.dir, &args.dir, &mut categories)?;

    let total: usize = categories.values().map(|files| files.len()).sum();
    if total == 0 {
        anyhow::bail!("no files found under {}", args.dir.display());
    }

    let report = validate_project(&categories).await;

    if report.valid {
        println!("Validation passed ({} files)", report.file_count);
        return Ok(());
    }

    println!(
        "Validation found {} issues in {} files:",
        report.error_count,
        report.errors.len()
    );
    for (file, errors) in &report.errors {
        for error in errors {
            println!("  {file}: {error}");
        }
        if let Some(suggestions) = report.fix_suggestions.get(file) {
            for suggestion in suggestions {
                println!("    suggestion: {suggestion}");
            }
        }
    }
    for warning in &report.warnings {
        println!("{warning}");
    }

    anyhow::bail!("validation failed with {} errors", report.error_count)
}

fn collect_files(
    root: &Path,
    dir: &Path,
    categories: &mut BTreeMap<String, BTreeMap<String, String>>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, categories)?;
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&path) else {
            // Binary or unreadable files are outside validation scope.
            continue;
        };
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        categories
            .entry(category_for(&name).to_string())
            .or_default()
            .insert(name, content);
    }
    Ok(())
}

fn category_for(name: &str) -> &'static str {
    if name.ends_with(".py") {
        "backend"
    } else if [".js", ".jsx", ".ts", ".tsx", ".html", ".htm", ".css"]
        .iter()
        .any(|ext| name.ends_with(ext))
    {
        "frontend"
    } else {
        "other"
    }
}
