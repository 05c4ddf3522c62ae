//! `docfill generate` command - Fill a template and write the document

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{self, join_or_dash, printable};
use crate::cli::GlobalOpts;
use crate::core::{CollisionPolicy, DirectoryDestination};
use crate::engine::{FieldValues, GenerationReport, Outcome};

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Template file (bare names are also looked up in the workspace templates/)
    pub template: PathBuf,

    /// Field value, repeatable (e.g. -s Name=Ivanov -s "Date=01.02.2024")
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Read field values from a YAML, JSON or CSV file (--set wins on conflict)
    #[arg(long, value_name = "FILE")]
    pub fields: Option<PathBuf>,

    /// Output file name (default: the template's file name)
    #[arg(long, short = 'o', value_name = "NAME")]
    pub output: Option<String>,

    /// Output directory (default: config output_dir, else workspace generated/, else .)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// What to do when the output file already exists
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Exit with an error when nothing was replaced
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: GenerateArgs, global: &GlobalOpts) -> Result<()> {
    let config = helpers::config(global)?;
    let workspace = helpers::workspace(global);

    let template = match &workspace {
        Some(ws) => ws.resolve_template(&args.template),
        None => args.template.clone(),
    };

    let fields = collect_fields(&args)?;

    let file_name = match &args.output {
        Some(name) => name.clone(),
        None => template
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| miette::miette!("template path {:?} has no file name", template))?,
    };

    let base = args
        .out_dir
        .clone()
        .unwrap_or_else(|| config.output_dir(workspace.as_ref()));
    let policy = args.on_collision.unwrap_or_else(|| config.collision_policy());
    let destination = DirectoryDestination::new(base).with_policy(policy);

    let generator = config.generator()?;
    let document = generator.generate(&template, &fields, &destination, &file_name)?;

    if !helpers::print_structured(&document.report, global.format)? && !global.quiet {
        print_summary(&document.path, &document.report);
    }

    if args.strict && document.report.is_anomaly() {
        return Err(miette::miette!(
            code = "docfill::generate::no_replacements",
            help = "compare the field names with the output of `docfill scan --inventory`",
            "no placeholder was replaced in {}",
            template.display()
        ));
    }

    Ok(())
}

fn collect_fields(args: &GenerateArgs) -> Result<FieldValues> {
    let mut fields = match &args.fields {
        Some(path) => FieldValues::load(path)?,
        None => FieldValues::new(),
    };
    let assigned = args
        .set
        .iter()
        .map(|a| FieldValues::parse_assignment(a))
        .collect::<Result<FieldValues, _>>()?;
    fields.extend(assigned);
    Ok(fields)
}

fn print_summary(path: &std::path::Path, report: &GenerationReport) {
    let marker = match report.outcome {
        Outcome::Text | Outcome::Untouched => style("✓").green(),
        Outcome::Degraded => style("!").yellow(),
        Outcome::NoReplacements => style("✗").red(),
    };
    println!(
        "{} Generated {} ({})",
        marker,
        style(path.display()).cyan(),
        report.outcome
    );

    let encoding = if report.encoding_fell_back {
        format!("{} (no placeholders found, default)", report.encoding)
    } else {
        report.encoding.clone()
    };
    println!("  {} {}", style("Encoding:").dim(), encoding);

    let placeholders: Vec<String> = report.placeholders.iter().map(|p| printable(p)).collect();
    println!(
        "  {} {}",
        style("Placeholders:").dim(),
        join_or_dash(&placeholders)
    );

    if report.fallback_triggered {
        println!(
            "  {} {} byte-level replacement(s)",
            style("Fallback:").dim(),
            report.fallback_replacements
        );
    } else {
        println!(
            "  {} {}",
            style("Replacements:").dim(),
            report.text_replacements
        );
    }

    if !report.matching.unused_fields.is_empty() {
        println!(
            "  {} {}",
            style("Unused fields:").yellow(),
            join_or_dash(&report.matching.unused_fields)
        );
    }
    if !report.matching.unresolved.is_empty() {
        let unresolved: Vec<String> = report
            .matching
            .unresolved
            .iter()
            .map(|p| printable(p))
            .collect();
        println!(
            "  {} {}",
            style("Unfilled placeholders:").yellow(),
            join_or_dash(&unresolved)
        );
    }
}

