//! Attack Flow - semantic validation of attack flow diagrams.
//!
//! An attack flow is a diagram of adversary actions, the assets they touch,
//! conditions, operators, and free-form notes, joined by lines. This crate
//! exports such a diagram to a graph and checks it against the Attack Flow
//! rules, producing a [`ValidationReport`](validator::ValidationReport) of
//! errors and warnings keyed by object id.
//!
//! Most callers only need [`FlowValidator`]. The lower layers are public for
//! front ends that build diagrams themselves or bring their own rule set:
//!
//! - [`analyzer`] turns a diagram into a graph export.
//! - [`validator`] defines the validator contract and the report types.
//! - [`rules`] holds the Attack Flow rule set.
//! - [`loader`] reads diagrams from JSON documents.

pub mod analyzer;
pub mod config;
pub mod loader;
pub mod rules;
pub mod validator;

mod error;

pub use attack_flow_core::{diagram, graph, identifier, property, schema};

pub use error::Error;

use log::{debug, info, trace};

use attack_flow_core::{diagram::DiagramObjectModel, schema::Schema};

use config::AppConfig;
use rules::AttackFlowValidator;
use validator::{DiagramValidator, ValidationReport};

/// Entry point for loading and validating Attack Flow diagrams.
///
/// # Examples
///
/// ```rust
/// use attack_flow::{FlowValidator, config::AppConfig};
///
/// let source = r#"{
///     "objects": [
///         { "kind": "block", "id": "n1", "template": "note", "properties": { "content": "TBD" } }
///     ]
/// }"#;
///
/// let validator = FlowValidator::new(AppConfig::default());
/// let diagram = validator.load(source).expect("Failed to load");
/// let report = validator.validate(&diagram).expect("Failed to validate");
///
/// // A note must point at something.
/// assert_eq!(report.error_count(), 1);
/// ```
pub struct FlowValidator {
    config: AppConfig,
    schema: Schema,
}

impl Default for FlowValidator {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl FlowValidator {
    /// Create a validator using the built-in Attack Flow schema.
    ///
    /// # Arguments
    ///
    /// * `config` - Rule tables used when validating
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            schema: Schema::attack_flow(),
        }
    }

    /// Replace the template schema used when loading diagrams.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parse a JSON diagram document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the document is malformed or does not fit
    /// the schema.
    pub fn load(&self, source: &str) -> Result<DiagramObjectModel, Error> {
        let diagram = loader::load_diagram(&self.schema, source)?;
        trace!(diagram:?; "Loaded diagram");
        Ok(diagram)
    }

    /// Validate a diagram.
    ///
    /// Each call starts from a clean slate, so validating the same diagram
    /// twice yields equal reports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the diagram cannot be analyzed
    /// (dangling line ends, repeated ids, lists of lists).
    pub fn validate(&self, diagram: &DiagramObjectModel) -> Result<ValidationReport, Error> {
        let mut validator = AttackFlowValidator::new(self.config.validation().clone());
        let report = validator.run(diagram)?;

        info!(
            errors = report.error_count(),
            warnings = report.warning_count();
            "Diagram validated"
        );
        debug!(objects_with_issues = report.len(); "Report assembled");

        Ok(report)
    }
}
