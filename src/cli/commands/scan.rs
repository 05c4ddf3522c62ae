//! `docfill scan` command - Audit templates without writing anything
//!
//! Shows, for every template, how many placeholders each encoding candidate
//! yields and which candidate would be used by `generate`.

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};
use walkdir::WalkDir;

use crate::cli::helpers::{self, printable, truncate_str};
use crate::cli::GlobalOpts;
use crate::engine::selector::AttemptOutcome;
use crate::engine::{CandidateAttempt, Generator, PlaceholderInventory};

/// Extensions picked up when walking directories
const TEMPLATE_EXTENSIONS: &[&str] = &["doc", "dot"];

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// Template files or directories to scan
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Include every file when walking directories, not just .doc/.dot
    #[arg(long)]
    pub all: bool,

    /// List each template's placeholders below the table
    #[arg(long, short = 'i')]
    pub inventory: bool,
}

#[derive(Debug, Serialize)]
struct ScanEntry {
    path: PathBuf,
    encoding: String,
    encoding_fell_back: bool,
    attempts: Vec<CandidateAttempt>,
    placeholders: PlaceholderInventory,
}

pub fn run(args: ScanArgs, global: &GlobalOpts) -> Result<()> {
    let config = helpers::config(global)?;
    let generator = config.generator()?;

    let files = collect_templates(&args.paths, args.all)?;
    if files.is_empty() {
        if !global.quiet {
            println!("{} No templates found", style("!").yellow());
        }
        return Ok(());
    }

    let entries = files
        .iter()
        .map(|path| scan_file(&generator, path))
        .collect::<Result<Vec<_>>>()?;

    if helpers::print_structured(&entries, global.format)? {
        return Ok(());
    }

    println!("{}", render_table(&generator, &entries));

    if args.inventory {
        for entry in &entries {
            println!();
            println!("{}", style(entry.path.display()).cyan());
            if entry.placeholders.is_empty() {
                println!("  {}", style("(no placeholders)").dim());
            }
            for (name, found) in entry.placeholders.iter() {
                println!(
                    "  {:<32} {:<14} x{}",
                    printable(name),
                    style(found.syntax).dim(),
                    found.occurrences
                );
            }
        }
    }

    Ok(())
}

fn scan_file(generator: &Generator, path: &Path) -> Result<ScanEntry> {
    let raw = std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    let selection = generator.scan(&raw);
    tracing::debug!(
        path = %path.display(),
        encoding = %selection.candidate.label,
        placeholders = selection.inventory.len(),
        "scanned template"
    );

    Ok(ScanEntry {
        path: path.to_path_buf(),
        encoding: selection.candidate.label,
        encoding_fell_back: selection.fell_back,
        attempts: selection.attempts,
        placeholders: selection.inventory,
    })
}

fn collect_templates(paths: &[PathBuf], all: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            return Err(miette::miette!(
                code = "docfill::scan::missing",
                "no such file or directory: {}",
                path.display()
            ));
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| all || is_template(p))
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            TEMPLATE_EXTENSIONS
                .iter()
                .any(|ext| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn render_table(generator: &Generator, entries: &[ScanEntry]) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["Template".to_string()];
    header.extend(generator.candidates().iter().map(|c| c.label.clone()));
    header.push("Chosen".to_string());
    builder.push_record(header);

    for entry in entries {
        let mut row = vec![truncate_str(&entry.path.display().to_string(), 48)];
        row.extend(entry.attempts.iter().map(|attempt| match &attempt.outcome {
            AttemptOutcome::Decoded { placeholders } => placeholders.to_string(),
            AttemptOutcome::Skipped { .. } => "skipped".to_string(),
        }));
        let chosen = if entry.encoding_fell_back {
            format!("{} (default)", entry.encoding)
        } else {
            entry.encoding.clone()
        };
        row.push(chosen);
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
}
