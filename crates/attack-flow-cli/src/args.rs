//! Command-line argument definitions for the Attack Flow CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the diagram to check, optional
//! configuration and schema files, the report format, and logging verbosity.

use clap::{Parser, ValueEnum};

/// How the validation report is printed.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One rendered diagnostic per issue.
    #[default]
    Text,
    /// The report as a JSON object keyed by object id.
    Json,
}

/// Command-line arguments for the Attack Flow validator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the diagram document (JSON)
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to a template schema (JSON) replacing the built-in Attack Flow schema
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
