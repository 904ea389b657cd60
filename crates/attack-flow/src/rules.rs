//! The Attack Flow rule set.
//!
//! [`AttackFlowValidator`] exports the diagram to a graph and checks every
//! node, then every edge:
//!
//! - required properties must be defined, at any depth of nesting;
//! - reference properties (`tactic_ref`, `technique_ref` by default) must
//!   look like STIX identifiers;
//! - nodes must satisfy the configured link rules (a note must point at
//!   something);
//! - edges should be latched at both ends.
//!
//! Issues for one object are filed in the order the checks run: property
//! checks in property order, each property immediately followed by its
//! reference check, then the link rules.

use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;

use attack_flow_core::{
    diagram::DiagramObjectModel,
    graph::GraphObjectExport,
    identifier::Id,
    property::{Property, PropertyValue},
};

use crate::{
    analyzer::SemanticAnalyzer,
    config::ValidationConfig,
    validator::{DiagramValidator, IssueCollector, ValidationError},
};

/// STIX 2.1 identifier (`<type>--<uuid>`) or the literal `Null`.
///
/// Alternation binds loosest, so this reads as "starts with an identifier"
/// OR "ends with `Null`", and matching is an unanchored search.
// TODO: anchor the whole alternation once existing flows have been checked against it.
const STIX_IDENTIFIER_PATTERN: &str = r"^[a-z][a-z0-9-]+[a-z0-9]--[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}|Null$";

static STIX_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(STIX_IDENTIFIER_PATTERN).expect("STIX identifier pattern is a valid regex")
});

const EDGE_UNATTACHED: &str = "Edge should connect on both ends.";

/// Returns `true` if `value` passes the reference check.
pub fn is_stix_reference(value: &str) -> bool {
    STIX_IDENTIFIER.is_match(value)
}

/// Validator for Attack Flow diagrams.
#[derive(Debug, Default)]
pub struct AttackFlowValidator {
    config: ValidationConfig,
    collector: IssueCollector,
}

impl AttackFlowValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            collector: IssueCollector::new(),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    fn validate_node(&mut self, id: Id, node: &GraphObjectExport) -> Result<(), ValidationError> {
        for (key, property) in node.props().entries() {
            self.validate_property(id, key, property)?;

            let failure = self
                .config
                .reference_field(key)
                .filter(|_| !is_stix_reference(&property.to_string()))
                .map(|field| field.message().to_string());
            if let Some(message) = failure {
                self.add_error(id, message);
            }
        }

        let failures: Vec<String> = self
            .config
            .link_rules_for(node.template())
            .filter(|rule| !rule.is_satisfied(node))
            .map(|rule| rule.message().to_string())
            .collect();
        for message in failures {
            self.add_error(id, message);
        }

        Ok(())
    }

    /// Checks one property for missing required values.
    ///
    /// `name` is the dotted path from the object's top level. Items of a
    /// list are reported under the list's own name.
    fn validate_property(
        &mut self,
        id: Id,
        name: &str,
        property: &Property,
    ) -> Result<(), ValidationError> {
        match property.value() {
            PropertyValue::Int(_)
            | PropertyValue::Float(_)
            | PropertyValue::String(_)
            | PropertyValue::Date(_)
            | PropertyValue::Enum(_) => {
                if property.descriptor().is_required() && !property.is_defined() {
                    self.add_error(id, format!("Missing required field: '{name}'"));
                }
            }
            PropertyValue::Dictionary(children) => {
                for (key, child) in children {
                    self.validate_property(id, &format!("{name}.{key}"), child)?;
                }
            }
            PropertyValue::List(items) => {
                for item in items {
                    self.validate_list_item(id, name, item)?;
                }
            }
        }
        Ok(())
    }

    fn validate_list_item(
        &mut self,
        id: Id,
        name: &str,
        item: &Property,
    ) -> Result<(), ValidationError> {
        match item.value() {
            PropertyValue::Int(_)
            | PropertyValue::Float(_)
            | PropertyValue::String(_)
            | PropertyValue::Date(_)
            | PropertyValue::Enum(_) => {
                if item.descriptor().is_required() && !item.is_defined() {
                    self.add_error(id, format!("Empty item in list: '{name}'."));
                }
            }
            PropertyValue::Dictionary(_) => self.validate_property(id, name, item)?,
            PropertyValue::List(_) => {
                return Err(ValidationError::NestedList {
                    id,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_edge(&mut self, id: Id, edge: &GraphObjectExport) {
        if edge.prev().is_empty() || edge.next().is_empty() {
            self.add_warning(id, EDGE_UNATTACHED);
        }
    }
}

impl DiagramValidator for AttackFlowValidator {
    fn collector_mut(&mut self) -> &mut IssueCollector {
        &mut self.collector
    }

    fn validate(&mut self, diagram: &DiagramObjectModel) -> Result<(), ValidationError> {
        info!("Validating diagram");
        let graph = SemanticAnalyzer::to_graph(diagram)?;

        for (id, node) in graph.nodes() {
            self.validate_node(id, node)?;
        }
        for (id, edge) in graph.edges() {
            self.validate_edge(id, edge);
        }

        debug!(objects_with_issues = self.collector.len(); "Validation finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use indexmap::IndexMap;
    use proptest::prelude::*;

    use attack_flow_core::{
        diagram::{Block, Line},
        property::PropertyDescriptor,
        schema::Schema,
    };

    use super::*;
    use crate::{
        config::{LinkDirection, LinkRule},
        validator::Issue,
    };

    const TACTIC: &str = "x-mitre-tactic--daa4cbb1-b4f4-4723-a824-7f1efd6e0592";

    fn props(template: &str, values: serde_json::Value) -> Property {
        let schema = Schema::attack_flow();
        let descriptor = schema.template(Id::new(template)).unwrap().descriptor();
        Property::from_json(&descriptor, &values).unwrap()
    }

    fn block(id: &str, template: &str, values: serde_json::Value) -> Block {
        Block::new(Id::new(id), Id::new(template), props(template, values))
    }

    fn line(id: &str) -> Line {
        Line::new(
            Id::new(id),
            Id::new("dynamic_line"),
            props("dynamic_line", serde_json::Value::Null),
        )
    }

    fn messages(issues: &[Issue]) -> Vec<String> {
        issues.iter().map(ToString::to_string).collect()
    }

    fn run(diagram: &DiagramObjectModel) -> crate::validator::ValidationReport {
        AttackFlowValidator::default().run(diagram).unwrap()
    }

    #[test]
    fn test_empty_diagram_is_valid() {
        assert!(run(&DiagramObjectModel::default()).is_empty());
    }

    #[test]
    fn test_valid_action_is_clean() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(
                None,
                block(
                    "a1",
                    "action",
                    serde_json::json!({
                        "name": "Spearphishing",
                        "tactic_ref": TACTIC,
                        "technique_ref": "Null",
                    }),
                ),
            )
            .unwrap();

        assert!(run(&diagram).is_empty());
    }

    #[test]
    fn test_absent_reference_renders_null_and_fails() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(
                None,
                block("a1", "action", serde_json::json!({ "name": "Recon" })),
            )
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("a1"))),
            [
                "error: Tactic Reference regex failure.",
                "error: Technique Reference regex failure.",
            ]
        );
    }

    #[test]
    fn test_lone_note_with_bad_reference() {
        let form = PropertyDescriptor::dictionary([("tactic_ref", PropertyDescriptor::string())]);
        let props = Property::from_json(&form, &serde_json::json!({ "tactic_ref": "bogus" })).unwrap();

        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, Block::new(Id::new("n1"), Id::new("note"), props))
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("n1"))),
            [
                "error: Tactic Reference regex failure.",
                "error: A Note must point to at least one object.",
            ]
        );
    }

    #[test]
    fn test_property_checks_precede_link_rules() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, block("n1", "note", serde_json::json!({})))
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("n1"))),
            [
                "error: Missing required field: 'content'",
                "error: A Note must point to at least one object.",
            ]
        );
    }

    #[test]
    fn test_note_with_outgoing_line_is_satisfied() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(
                None,
                block("n1", "note", serde_json::json!({ "content": "see below" })),
            )
            .unwrap();
        diagram
            .insert(
                None,
                block("s1", "asset", serde_json::json!({ "name": "Mail server" })),
            )
            .unwrap();
        diagram
            .insert(
                None,
                line("l1")
                    .with_source(Id::new("n1"))
                    .with_target(Id::new("s1")),
            )
            .unwrap();

        assert!(run(&diagram).is_empty());
    }

    #[test]
    fn test_incoming_line_does_not_satisfy_note() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(
                None,
                block("n1", "note", serde_json::json!({ "content": "x" })),
            )
            .unwrap();
        diagram
            .insert(None, block("s1", "asset", serde_json::json!({ "name": "y" })))
            .unwrap();
        diagram
            .insert(
                None,
                line("l1")
                    .with_source(Id::new("s1"))
                    .with_target(Id::new("n1")),
            )
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("n1"))),
            ["error: A Note must point to at least one object."]
        );
    }

    #[test]
    fn test_edges_are_reported_after_nodes() {
        let mut diagram = DiagramObjectModel::default();
        diagram.insert(None, line("l1")).unwrap();
        diagram
            .insert(None, block("n1", "note", serde_json::json!({ "content": "x" })))
            .unwrap();

        let report = run(&diagram);
        let ids: Vec<String> = report.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, ["n1", "l1"]);
        assert_eq!(
            messages(report.issues(Id::new("l1"))),
            ["warning: Edge should connect on both ends."]
        );
        assert!(!report.issues(Id::new("l1"))[0].severity().is_error());
    }

    #[test]
    fn test_nested_dictionary_path() {
        let mut diagram = DiagramObjectModel::default();
        let form = PropertyDescriptor::dictionary([(
            "author",
            PropertyDescriptor::dictionary([("name", PropertyDescriptor::string().required())]),
        )]);
        let props = Property::from_descriptor(&form).unwrap();
        diagram
            .insert(None, Block::new(Id::new("b1"), Id::new("asset"), props))
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("b1"))),
            ["error: Missing required field: 'author.name'"]
        );
    }

    #[test]
    fn test_list_items_report_under_list_name() {
        let form = PropertyDescriptor::dictionary([
            (
                "labels",
                PropertyDescriptor::list(PropertyDescriptor::string().required()),
            ),
            (
                "external_references",
                PropertyDescriptor::list(PropertyDescriptor::dictionary([(
                    "source_name",
                    PropertyDescriptor::string().required(),
                )])),
            ),
        ]);
        let values = serde_json::json!({
            "labels": ["ok", ""],
            "external_references": [{ "source_name": "" }],
        });
        let props = Property::from_json(&form, &values).unwrap();

        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, Block::new(Id::new("b1"), Id::new("asset"), props))
            .unwrap();

        let report = run(&diagram);
        assert_eq!(
            messages(report.issues(Id::new("b1"))),
            [
                "error: Empty item in list: 'labels'.",
                "error: Missing required field: 'external_references.source_name'",
            ]
        );
    }

    #[test]
    fn test_nested_list_is_fatal() {
        let inner = Property::new(
            PropertyDescriptor::list(PropertyDescriptor::string()),
            PropertyValue::List(Vec::new()),
        );
        let outer_descriptor = Rc::new(PropertyDescriptor::list(PropertyDescriptor::string()));
        let outer = Property::new(outer_descriptor, PropertyValue::List(vec![inner]));
        let props = Property::new(
            PropertyDescriptor::dictionary(Vec::<(String, PropertyDescriptor)>::new()),
            PropertyValue::Dictionary(IndexMap::from([("matrix".to_string(), outer)])),
        );

        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, Block::new(Id::new("b1"), Id::new("asset"), props))
            .unwrap();

        let err = AttackFlowValidator::default().run(&diagram).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NestedList {
                id: Id::new("b1"),
                name: "matrix".to_string(),
            }
        );
    }

    #[test]
    fn test_custom_link_rule() {
        let config = ValidationConfig::new(
            Vec::new(),
            vec![LinkRule::new(
                "asset",
                LinkDirection::Prev,
                1,
                "An asset must be targeted.",
            )],
        );
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, block("s1", "asset", serde_json::json!({ "name": "db" })))
            .unwrap();

        let report = AttackFlowValidator::new(config).run(&diagram).unwrap();
        assert_eq!(
            messages(report.issues(Id::new("s1"))),
            ["error: An asset must be targeted."]
        );
    }

    #[test]
    fn test_reruns_are_idempotent() {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, block("n1", "note", serde_json::json!({})))
            .unwrap();
        diagram.insert(None, line("l1")).unwrap();

        let mut validator = AttackFlowValidator::default();
        let first = validator.run(&diagram).unwrap();
        let second = validator.run(&diagram).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.error_count(), 2);
        assert_eq!(first.warning_count(), 1);
    }

    #[test]
    fn test_reference_pattern_quirks() {
        assert!(is_stix_reference(TACTIC));
        assert!(is_stix_reference("Null"));
        assert!(is_stix_reference("anything-ending-in-Null"));
        assert!(is_stix_reference(&format!("{TACTIC} trailing text")));
        assert!(!is_stix_reference("null"));
        assert!(!is_stix_reference("bogus"));
        assert!(!is_stix_reference(
            "attack-pattern-0a3ead4e-6d47-4ccb-854c-a6a4f9d96b22"
        ));
    }

    #[test]
    fn test_reference_pattern_boundaries() {
        const PATTERN: &str = "attack-pattern--c3888c66-1cf3-4c34-81c6-c9fbe75a1b4e";
        let uuid = "C3888C66-1CF3-4C34-81C6-C9FBE75A1B4E";

        assert!(is_stix_reference(PATTERN));
        assert!(is_stix_reference(&format!("abc--{uuid}")));
        assert!(!is_stix_reference(&format!("ab--{uuid}")));
        assert!(!is_stix_reference(
            "attack-pattern--c3888c66-1cf3-6c34-81c6-c9fbe75a1b4e"
        ));
        assert!(!is_stix_reference(""));

        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(
                None,
                block(
                    "a1",
                    "action",
                    serde_json::json!({
                        "name": "Phishing",
                        "tactic_ref": PATTERN,
                        "technique_ref": PATTERN,
                    }),
                ),
            )
            .unwrap();
        assert!(run(&diagram).is_empty());
    }

    fn hex(len: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec(
            proptest::sample::select(b"0123456789abcdefABCDEF".to_vec()),
            len,
        )
        .prop_map(|bytes| String::from_utf8(bytes).unwrap_or_default())
    }

    fn stix_identifier() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9-]{1,12}[a-z0-9]",
            hex(8),
            hex(4),
            1u8..=5,
            hex(3),
            prop_oneof![Just('8'), Just('9'), Just('a'), Just('b'), Just('A'), Just('B')],
            hex(3),
            hex(12),
        )
            .prop_map(|(kind, a, b, version, c, variant, d, e)| {
                format!("{kind}--{a}-{b}-{version}{c}-{variant}{d}-{e}")
            })
    }

    fn check_identifier_accepted(id: &str) -> Result<(), TestCaseError> {
        prop_assert!(is_stix_reference(id), "rejected {id}");
        Ok(())
    }

    fn check_lowercase_words_rejected(word: &str) -> Result<(), TestCaseError> {
        prop_assert!(!is_stix_reference(word), "accepted {word}");
        Ok(())
    }

    fn check_absent_reference_fails(name: &str) -> Result<(), TestCaseError> {
        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, block("a1", "action", serde_json::json!({ "name": name })))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let report = AttackFlowValidator::default()
            .run(&diagram)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(report.error_count(), 2);
        Ok(())
    }

    fn check_nested_path_attribution(keys: &[String]) -> Result<(), TestCaseError> {
        let leaf = PropertyDescriptor::string().required();
        let form = keys
            .iter()
            .rev()
            .fold(leaf, |inner, key| PropertyDescriptor::dictionary([(key.clone(), inner)]));
        let props = Property::from_descriptor(&form)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let mut diagram = DiagramObjectModel::default();
        diagram
            .insert(None, Block::new(Id::new("b1"), Id::new("asset"), props))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let report = AttackFlowValidator::default()
            .run(&diagram)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let issues = report.issues(Id::new("b1"));
        prop_assert_eq!(issues.len(), 1);
        prop_assert_eq!(
            issues[0].message(),
            format!("Missing required field: '{}'", keys.join("."))
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn nested_path_attribution(keys in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            check_nested_path_attribution(&keys)?;
        }

        #[test]
        fn identifier_accepted(id in stix_identifier()) {
            check_identifier_accepted(&id)?;
        }

        #[test]
        fn lowercase_words_rejected(word in "[a-z ]{0,40}") {
            check_lowercase_words_rejected(&word)?;
        }

        #[test]
        fn absent_reference_fails(name in "[A-Za-z][A-Za-z ]{0,20}") {
            check_absent_reference_fails(&name)?;
        }
    }
}
