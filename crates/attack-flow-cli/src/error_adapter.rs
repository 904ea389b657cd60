//! Adapters rendering validation issues and library errors through miette.
//!
//! The library's report and error types carry no terminal formatting. This
//! module wraps them in types implementing [`MietteDiagnostic`] so the CLI
//! can print each one with miette's graphical handler.
//!
//! # One Report Per Issue
//!
//! A [`ValidationReport`] becomes one [`Reportable`] per issue, in report
//! order, so every finding is rendered as its own diagnostic.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use attack_flow::{
    Error,
    identifier::Id,
    validator::{Issue, Severity, ValidationReport},
};

/// Adapter for a single validation issue.
pub struct IssueAdapter<'a> {
    /// Object the issue was filed against
    id: Id,
    /// The wrapped issue
    issue: &'a Issue,
}

impl<'a> IssueAdapter<'a> {
    /// Create a new issue adapter.
    pub fn new(id: Id, issue: &'a Issue) -> Self {
        Self { id, issue }
    }

    pub fn id(&self) -> Id {
        self.id
    }
}

impl fmt::Debug for IssueAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueAdapter")
            .field("id", &self.id)
            .field("issue", &self.issue)
            .finish()
    }
}

impl fmt::Display for IssueAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.issue.message())
    }
}

impl std::error::Error for IssueAdapter<'_> {}

impl MietteDiagnostic for IssueAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.issue.severity() {
            Severity::Error => "attack_flow::rule",
            Severity::Warning => "attack_flow::lint",
        };
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.issue.severity() {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("reported on object '{}'", self.id)))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Adapter for [`Error`] values that stop a run.
pub struct ErrorAdapter<'a>(pub &'a Error);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.0)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            Error::Io(_) => "attack_flow::io",
            Error::Load(_) => "attack_flow::load",
            Error::Validation(_) => "attack_flow::validation",
            Error::Config(_) => "attack_flow::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            Error::Validation(_) => Some(Box::new(
                "the diagram is structurally broken; fix it before validating its content",
            )),
            _ => None,
        }
    }
}

/// A reportable item that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A finding from the validation report.
    Issue(IssueAdapter<'a>),
    /// An error that stopped the run.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Issue(i) => fmt::Display::fmt(i, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Issue(_) => None,
            Reportable::Error(e) => std::error::Error::source(e),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Issue(i) => i.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Issue(i) => i.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Issue(i) => i.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Issue(i) => i.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert an [`Error`] into a list of reportable errors.
pub fn to_reportables(err: &Error) -> Vec<Reportable<'_>> {
    vec![Reportable::Error(ErrorAdapter(err))]
}

/// Convert a [`ValidationReport`] into one reportable per issue.
pub fn issue_reportables(report: &ValidationReport) -> Vec<Reportable<'_>> {
    report
        .iter()
        .flat_map(|(id, issues)| {
            issues
                .iter()
                .map(move |issue| Reportable::Issue(IssueAdapter::new(id, issue)))
        })
        .collect()
}
