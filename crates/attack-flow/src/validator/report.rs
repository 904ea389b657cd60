//! Issue accumulation and the per-run report.

use indexmap::IndexMap;
use serde::Serialize;

use attack_flow_core::identifier::Id;

use super::issue::Issue;

/// Collects issues while a validator runs.
///
/// Issues are filed per object id. Ids keep the order in which they first
/// received an issue, and each id keeps its issues in the order added.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: IndexMap<Id, Vec<Issue>>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, id: Id, message: impl Into<String>) {
        self.add(id, Issue::error(message));
    }

    pub fn add_warning(&mut self, id: Id, message: impl Into<String>) {
        self.add(id, Issue::warning(message));
    }

    pub fn add(&mut self, id: Id, issue: Issue) {
        self.issues.entry(id).or_default().push(issue);
    }

    /// Discards everything collected so far.
    pub fn clear(&mut self) {
        self.issues.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of objects with at least one issue.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Moves the collected issues into a report, leaving the collector empty.
    pub fn take(&mut self) -> ValidationReport {
        ValidationReport {
            issues: std::mem::take(&mut self.issues),
        }
    }
}

/// Issues found by one validation run, keyed by object id.
///
/// Serializes as a JSON object mapping each id to its list of issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    issues: IndexMap<Id, Vec<Issue>>,
}

impl ValidationReport {
    /// Returns `true` when nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `true` when at least one error was reported.
    pub fn has_errors(&self) -> bool {
        self.all().any(|issue| issue.severity().is_error())
    }

    pub fn error_count(&self) -> usize {
        self.all().filter(|issue| issue.severity().is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.all().filter(|issue| issue.severity().is_warning()).count()
    }

    /// Issues filed under `id`, empty if there are none.
    pub fn issues(&self, id: Id) -> &[Issue] {
        self.issues.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates ids and their issues in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &[Issue])> {
        self.issues.iter().map(|(id, issues)| (*id, issues.as_slice()))
    }

    /// Number of objects with at least one issue.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    fn all(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_preserves_order() {
        let (a, b) = (Id::new("a"), Id::new("b"));
        let mut collector = IssueCollector::new();
        collector.add_error(b, "first");
        collector.add_warning(a, "second");
        collector.add_error(b, "third");

        let report = collector.take();
        assert!(collector.is_empty());

        let ids: Vec<String> = report.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, ["b", "a"]);

        let messages: Vec<&str> = report.issues(b).iter().map(Issue::message).collect();
        assert_eq!(messages, ["first", "third"]);
    }

    #[test]
    fn test_report_counts() {
        let (a, b) = (Id::new("a"), Id::new("b"));
        let mut collector = IssueCollector::new();
        collector.add_warning(a, "edge");
        let report = collector.take();
        assert!(!report.is_empty());
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);

        collector.add_error(a, "x");
        collector.add_error(b, "y");
        collector.add_warning(b, "z");
        let report = collector.take();
        assert!(report.has_errors());
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_clear_discards_issues() {
        let mut collector = IssueCollector::new();
        collector.add_error(Id::new("a"), "x");
        collector.clear();
        assert!(collector.take().is_empty());
    }

    #[test]
    fn test_missing_id_has_no_issues() {
        let report = ValidationReport::default();
        assert!(report.issues(Id::new("nobody")).is_empty());
    }

    #[test]
    fn test_report_serializes_as_map() {
        let mut collector = IssueCollector::new();
        collector.add_warning(Id::new("l1"), "Edge should connect on both ends.");

        let json = serde_json::to_value(collector.take()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "l1": [{ "severity": "warning", "message": "Edge should connect on both ends." }]
            })
        );
    }
}
