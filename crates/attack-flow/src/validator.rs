//! The diagram validator contract.
//!
//! A validator inspects a [`DiagramObjectModel`] and files [`Issue`]s
//! against object ids in an [`IssueCollector`]. Rule violations are never
//! `Err`: they end up in the [`ValidationReport`] returned by
//! [`DiagramValidator::run`]. Only faults that make the diagram impossible
//! to analyze abort a run with a [`ValidationError`].
//!
//! Concrete rule sets implement [`DiagramValidator::validate`]; the shared
//! bookkeeping (clearing, accumulating, handing out the report) lives in
//! the provided methods.

mod issue;
mod report;

pub use issue::{Issue, Severity};
pub use report::{IssueCollector, ValidationReport};

use thiserror::Error;

use attack_flow_core::{diagram::DiagramObjectModel, identifier::Id};

use crate::analyzer::AnalysisError;

/// Faults that abort a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("object '{id}': list '{name}' contains a list")]
    NestedList { id: Id, name: String },
}

/// A rule set that can validate diagrams.
pub trait DiagramValidator {
    /// The accumulator issues are filed into.
    fn collector_mut(&mut self) -> &mut IssueCollector;

    /// Checks `diagram`, filing issues through [`add_error`](Self::add_error)
    /// and [`add_warning`](Self::add_warning).
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] only when the diagram cannot be
    /// analyzed at all.
    fn validate(&mut self, diagram: &DiagramObjectModel) -> Result<(), ValidationError>;

    /// Files an error against `id`.
    fn add_error(&mut self, id: Id, message: impl Into<String>) {
        self.collector_mut().add_error(id, message);
    }

    /// Files a warning against `id`.
    fn add_warning(&mut self, id: Id, message: impl Into<String>) {
        self.collector_mut().add_warning(id, message);
    }

    /// Validates `diagram` from a clean slate and returns what was found.
    ///
    /// Issues from a previous run are discarded first. On a fatal error
    /// the partial results are dropped as well.
    fn run(&mut self, diagram: &DiagramObjectModel) -> Result<ValidationReport, ValidationError> {
        self.collector_mut().clear();
        let outcome = self.validate(diagram);
        let report = self.collector_mut().take();
        outcome.map(|()| report)
    }
}
