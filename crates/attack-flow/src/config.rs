//! Configuration types for Attack Flow validation.
//!
//! All types implement [`serde::Deserialize`] so front ends can load them
//! from a file. Every section defaults to the built-in Attack Flow rules,
//! so an empty document is a valid configuration.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration.
//! - [`ValidationConfig`] - The rule tables used by the Attack Flow validator.
//! - [`ReferenceField`] - A property whose value must look like a STIX identifier.
//! - [`LinkRule`] - A minimum number of connections for blocks of a template.
//!
//! # Example
//!
//! ```
//! # use attack_flow::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.validation().reference_fields().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use attack_flow_core::{graph::GraphObjectExport, identifier::Id};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Validation rule tables.
    #[serde(default)]
    validation: ValidationConfig,
}

impl AppConfig {
    pub fn new(validation: ValidationConfig) -> Self {
        Self { validation }
    }

    /// Returns the validation configuration.
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }
}

/// Rule tables for the Attack Flow validator.
///
/// A table that is present in the input replaces the built-in table
/// entirely; omitted tables keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Properties checked against the STIX identifier pattern.
    #[serde(default = "default_reference_fields")]
    reference_fields: Vec<ReferenceField>,

    /// Connection requirements checked for every node.
    #[serde(default = "default_link_rules")]
    link_rules: Vec<LinkRule>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reference_fields: default_reference_fields(),
            link_rules: default_link_rules(),
        }
    }
}

impl ValidationConfig {
    pub fn new(reference_fields: Vec<ReferenceField>, link_rules: Vec<LinkRule>) -> Self {
        Self {
            reference_fields,
            link_rules,
        }
    }

    pub fn reference_fields(&self) -> &[ReferenceField] {
        &self.reference_fields
    }

    pub fn link_rules(&self) -> &[LinkRule] {
        &self.link_rules
    }

    /// Returns the first reference field registered for `key`.
    pub fn reference_field(&self, key: &str) -> Option<&ReferenceField> {
        self.reference_fields.iter().find(|field| field.key == key)
    }

    /// Returns the link rules that apply to nodes of `template`, in table order.
    pub fn link_rules_for(&self, template: Id) -> impl Iterator<Item = &LinkRule> {
        self.link_rules
            .iter()
            .filter(move |rule| rule.template == template)
    }
}

/// A property whose string form must match the STIX identifier pattern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReferenceField {
    key: String,
    message: String,
}

impl ReferenceField {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Top-level property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Error reported when the value does not match.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Which adjacency list a [`LinkRule`] counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Outgoing connections.
    #[default]
    Next,
    /// Incoming connections.
    Prev,
}

/// Requires nodes of a template to have at least `min` connections in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkRule {
    template: Id,

    #[serde(default)]
    direction: LinkDirection,

    #[serde(default = "default_min_links")]
    min: usize,

    message: String,
}

impl LinkRule {
    pub fn new(
        template: &str,
        direction: LinkDirection,
        min: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            template: Id::new(template),
            direction,
            min,
            message: message.into(),
        }
    }

    pub fn template(&self) -> Id {
        self.template
    }

    pub fn direction(&self) -> LinkDirection {
        self.direction
    }

    pub fn min(&self) -> usize {
        self.min
    }

    /// Error reported when the rule is not satisfied.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if `node` has enough connections in this rule's direction.
    pub fn is_satisfied(&self, node: &GraphObjectExport) -> bool {
        let links = match self.direction {
            LinkDirection::Next => node.next(),
            LinkDirection::Prev => node.prev(),
        };
        links.len() >= self.min
    }
}

fn default_reference_fields() -> Vec<ReferenceField> {
    vec![
        ReferenceField::new("tactic_ref", "Tactic Reference regex failure."),
        ReferenceField::new("technique_ref", "Technique Reference regex failure."),
    ]
}

fn default_link_rules() -> Vec<LinkRule> {
    vec![LinkRule::new(
        "note",
        LinkDirection::Next,
        1,
        "A Note must point to at least one object.",
    )]
}

fn default_min_links() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use attack_flow_core::property::{Property, PropertyDescriptor, PropertyValue};
    use indexmap::IndexMap;

    use super::*;

    fn node(template: &str) -> GraphObjectExport {
        let props = Property::new(
            PropertyDescriptor::dictionary(Vec::<(String, PropertyDescriptor)>::new()),
            PropertyValue::Dictionary(IndexMap::new()),
        );
        GraphObjectExport::new(Id::new(template), props)
    }

    #[test]
    fn test_default_tables() {
        let config = ValidationConfig::default();

        let field = config.reference_field("technique_ref").unwrap();
        assert_eq!(field.message(), "Technique Reference regex failure.");
        assert!(config.reference_field("name").is_none());

        let rules: Vec<_> = config.link_rules_for(Id::new("note")).collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].message(), "A Note must point to at least one object.");
        assert_eq!(config.link_rules_for(Id::new("action")).count(), 0);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.validation(), &ValidationConfig::default());
    }

    #[test]
    fn test_explicit_table_replaces_default() {
        let json = r#"{
            "validation": {
                "link_rules": [
                    { "template": "asset", "direction": "prev", "message": "Orphan asset." }
                ]
            }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        let validation = config.validation();

        assert_eq!(validation.reference_fields().len(), 2);
        assert_eq!(validation.link_rules().len(), 1);

        let rule = &validation.link_rules()[0];
        assert_eq!(rule.template(), "asset");
        assert_eq!(rule.direction(), LinkDirection::Prev);
        assert_eq!(rule.min(), 1);
    }

    #[test]
    fn test_link_rule_counts_direction() {
        let rule = LinkRule::new("note", LinkDirection::Next, 1, "m");
        assert!(!rule.is_satisfied(&node("note")));
        assert!(rule.is_satisfied(&node("note").with_next(Id::new("l1"))));
        assert!(!rule.is_satisfied(&node("note").with_prev(Id::new("l1"))));

        let rule = LinkRule::new("note", LinkDirection::Prev, 2, "m");
        let twice = node("note").with_prev(Id::new("l1")).with_prev(Id::new("l2"));
        assert!(rule.is_satisfied(&twice));
    }

    #[test]
    fn test_first_matching_reference_field_wins() {
        let config = ValidationConfig::new(
            vec![
                ReferenceField::new("tactic_ref", "first"),
                ReferenceField::new("tactic_ref", "second"),
            ],
            Vec::new(),
        );
        assert_eq!(config.reference_field("tactic_ref").unwrap().message(), "first");
    }
}
