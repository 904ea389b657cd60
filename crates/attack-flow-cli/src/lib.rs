//! CLI logic for the Attack Flow validator.
//!
//! This module contains the core CLI logic: load configuration and schema,
//! read the diagram, validate it, and print the report.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, OutputFormat};

use std::fs;

use log::info;

use attack_flow::{Error, FlowValidator, validator::ValidationReport};

use error_adapter::issue_reportables;

/// Run the Attack Flow CLI application
///
/// This function validates the input file and prints the report to
/// stdout in the requested format. The report is returned so the caller
/// can decide the exit status; a report with warnings only is a success.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `Error` for:
/// - File I/O errors
/// - Configuration or schema loading errors
/// - Malformed diagram documents
/// - Diagrams that cannot be analyzed
pub fn run(args: &Args) -> Result<ValidationReport, Error> {
    info!(input_path = args.input; "Validating diagram");

    let app_config = config::load_config(args.config.as_ref())?;
    let schema = config::load_schema(args.schema.as_ref())?;

    let source = fs::read_to_string(&args.input)?;

    let validator = FlowValidator::new(app_config).with_schema(schema);
    let diagram = validator.load(&source)?;
    let report = validator.validate(&diagram)?;

    print!("{}", render_report(&report, args.format)?);

    info!(
        errors = report.error_count(),
        warnings = report.warning_count();
        "Validation completed"
    );

    Ok(report)
}

/// Render a report in the given format
///
/// Text output renders every issue as its own miette diagnostic, in
/// report order. An empty report renders as nothing in text form and as
/// `{}` in JSON.
///
/// # Errors
///
/// Returns `Error` if the JSON encoding fails.
pub fn render_report(report: &ValidationReport, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)
                .map_err(|err| Error::Io(err.into()))?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => {
            let reporter = miette::GraphicalReportHandler::new();
            let mut out = String::new();
            for reportable in issue_reportables(report) {
                reporter
                    .render_report(&mut out, &reportable)
                    .map_err(|err| Error::Io(std::io::Error::other(err.to_string())))?;
            }
            Ok(out)
        }
    }
}
