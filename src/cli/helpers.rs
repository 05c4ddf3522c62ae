//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Workspace};

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Make decoded template text safe to print
///
/// Literals found in binary templates can carry control characters and NULs;
/// these are shown as `·` so they cannot garble the terminal.
pub fn printable(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { '·' } else { c })
        .collect()
}

/// Join names for a one-line listing, or "-" when empty
pub fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Directory where workspace discovery starts
pub fn start_dir(global: &GlobalOpts) -> Result<PathBuf> {
    match &global.workspace {
        Some(path) => Ok(path.clone()),
        None => std::env::current_dir().into_diagnostic(),
    }
}

/// Discover the workspace, if any
pub fn workspace(global: &GlobalOpts) -> Option<Workspace> {
    start_dir(global)
        .ok()
        .and_then(|dir| Workspace::discover_from(&dir).ok())
}

/// Load layered configuration relative to the workspace start directory
pub fn config(global: &GlobalOpts) -> Result<Config> {
    Ok(Config::load_from(&start_dir(global)?))
}

/// Print a serializable value in a machine format; returns false for `Auto`
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Auto => Ok(false),
    }
}
