//! `docfill config` command - Configuration management
//!
//! Provides commands to view and modify docfill configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers;
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (see `docfill config keys`)
    pub key: String,

    /// Value to set (comma-separated for `encodings`)
    pub value: String,

    /// Set in global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of workspace config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    (
        "encodings",
        "Encodings tried in priority order (e.g. windows-1251,ascii,utf-8,utf-16,ibm866)",
    ),
    (
        "fallback_encoding",
        "Single-byte encoding used for byte-level fallback",
    ),
    ("decode_policy", "lossy | strict"),
    ("output_dir", "Directory for generated documents"),
    ("on_collision", "overwrite | suffix"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = helpers::config(global)?;

    if let Some(key) = &args.key {
        check_key(key)?;
        println!("{}", effective_value(&config, key, global));
        return Ok(());
    }

    if helpers::print_structured(&config, global.format)? {
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        let explicit = match *key {
            "encodings" => config.encodings.is_some(),
            "fallback_encoding" => config.fallback_encoding.is_some(),
            "decode_policy" => config.decode_policy.is_some(),
            "output_dir" => config.output_dir.is_some(),
            _ => config.on_collision.is_some(),
        };
        print_config_value(key, &effective_value(&config, key, global), explicit);
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (DOCFILL_ENCODINGS, DOCFILL_FALLBACK_ENCODING, DOCFILL_OUTPUT_DIR)");
    println!("  2. Workspace config (.docfill/config.yaml)");
    println!("  3. Global config (~/.config/docfill/config.yaml)");

    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;

    let mut config_map = read_mapping(&config_path)?;
    let value = if args.key == "encodings" {
        serde_yml::Value::Sequence(
            args.value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| serde_yml::Value::String(s.to_string()))
                .collect(),
        )
    } else {
        serde_yml::Value::String(args.value.clone())
    };
    if let serde_yml::Value::Mapping(map) = &mut config_map {
        map.insert(serde_yml::Value::String(args.key.clone()), value);
    }

    // Reject values the loader would refuse before anything is written
    let parsed: Config = serde_yml::from_value(config_map.clone())
        .map_err(|e| miette::miette!("invalid value for '{}': {}", args.key, e))?;
    parsed.generator()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };
    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = get_global_config_path()?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    if global_path.exists() {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }

    println!();
    match helpers::workspace(global) {
        Some(workspace) => {
            let path = workspace.config_path();
            println!("  {} {}", style("Workspace:").cyan(), path.display());
            if path.exists() {
                println!("            {}", style("(exists)").green());
            } else {
                println!("            {}", style("(not created)").dim());
            }
        }
        None => println!(
            "  {} {}",
            style("Workspace:").cyan(),
            style("(not in a docfill workspace)").dim()
        ),
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'docfill config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "run `docfill config keys` to list valid keys",
            "unknown configuration key '{}'",
            key
        ))
    }
}

fn get_global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn target_path(use_global: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if use_global {
        return get_global_config_path();
    }
    helpers::workspace(global)
        .map(|ws| ws.config_path())
        .ok_or_else(|| {
            miette::miette!(
                help = "run `docfill init` or pass --global",
                "not in a docfill workspace"
            )
        })
}

fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    if Config::is_blank(&content) {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let parsed: serde_yml::Value = serde_yml::from_str(&content).map_err(|e| {
        miette::miette!(
            code = "docfill::config::parse",
            help = "fix or remove the file, then retry",
            "cannot parse {}: {}",
            path.display(),
            e
        )
    })?;
    match parsed {
        serde_yml::Value::Mapping(_) => Ok(parsed),
        serde_yml::Value::Null => Ok(serde_yml::Value::Mapping(Default::default())),
        _ => Err(miette::miette!(
            code = "docfill::config::parse",
            "{} does not hold a mapping of keys to values",
            path.display()
        )),
    }
}

fn effective_value(config: &Config, key: &str, global: &GlobalOpts) -> String {
    match key {
        "encodings" => config.encoding_labels().join(", "),
        "fallback_encoding" => config.fallback_label().to_string(),
        "decode_policy" => config.decode_policy().to_string(),
        "output_dir" => config
            .output_dir(helpers::workspace(global).as_ref())
            .display()
            .to_string(),
        _ => config.collision_policy().to_string(),
    }
}

fn print_config_value(key: &str, value: &str, explicit: bool) {
    if explicit {
        println!("  {}: {}", style(key).cyan(), style(value).yellow());
    } else {
        println!(
            "  {}: {} {}",
            style(key).cyan(),
            value,
            style("(default)").dim()
        );
    }
}
