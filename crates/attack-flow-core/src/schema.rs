//! Template schema for diagram objects.
//!
//! A [`Schema`] maps template ids (`action`, `note`, ...) to a
//! [`TemplateSchema`], which says what kind of object the template creates
//! and which properties the object carries. The schema is explicit input:
//! callers pass it to whatever builds diagram objects, nothing reads it
//! from global state.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    identifier::Id,
    property::{Property, PropertyDescriptor, PropertyError},
};

/// What a template instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// A node in the flow (action, asset, note, ...).
    Block,
    /// A connector between two blocks.
    Line,
    /// A container of other objects, including the page itself.
    Group,
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Block => write!(f, "block"),
            TemplateKind::Line => write!(f, "line"),
            TemplateKind::Group => write!(f, "group"),
        }
    }
}

/// Definition of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSchema {
    kind: TemplateKind,

    #[serde(default)]
    form: IndexMap<String, Rc<PropertyDescriptor>>,
}

impl TemplateSchema {
    /// Creates a template definition.
    pub fn new<I, K>(kind: TemplateKind, form: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyDescriptor)>,
        K: Into<String>,
    {
        Self {
            kind,
            form: form.into_iter().map(|(k, v)| (k.into(), Rc::new(v))).collect(),
        }
    }

    /// Returns the object kind this template creates.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Returns the dictionary descriptor for an object's top-level properties.
    pub fn descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor::shared_dictionary(self.form.clone())
    }

    /// Builds the top-level properties of a fresh object, using defaults.
    pub fn default_props(&self) -> Result<Property, PropertyError> {
        Property::from_descriptor(&self.descriptor())
    }
}

/// A set of templates keyed by template id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    templates: IndexMap<Id, TemplateSchema>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a template.
    pub fn with_template(mut self, id: &str, template: TemplateSchema) -> Self {
        self.templates.insert(Id::new(id), template);
        self
    }

    /// Looks up a template by id.
    pub fn template(&self, id: Id) -> Option<&TemplateSchema> {
        self.templates.get(&id)
    }

    /// Iterates templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = (Id, &TemplateSchema)> {
        self.templates.iter().map(|(id, t)| (*id, t))
    }

    /// The Attack Flow v2 template set.
    pub fn attack_flow() -> Self {
        use PropertyDescriptor as P;

        let confidence = P::enumeration([
            "speculative",
            "very-doubtful",
            "doubtful",
            "even-odds",
            "probable",
            "very-probable",
            "certain",
        ])
        .with_default_string("probable");

        let external_reference = P::dictionary([
            ("source_name", P::string().required()),
            ("description", P::string()),
            ("url", P::string()),
        ]);

        let author = P::dictionary([
            ("name", P::string().required()),
            (
                "identity_class",
                P::enumeration([
                    "individual",
                    "group",
                    "system",
                    "organization",
                    "class",
                    "unknown",
                ]),
            ),
            ("contact_information", P::string()),
        ]);

        Self::new()
            .with_template(
                "flow",
                TemplateSchema::new(
                    TemplateKind::Group,
                    [
                        ("name", P::string().required()),
                        ("description", P::string()),
                        (
                            "scope",
                            P::enumeration([
                                "incident",
                                "campaign",
                                "threat-actor",
                                "malware",
                                "attack-tree",
                                "other",
                            ])
                            .required()
                            .with_default_string("incident"),
                        ),
                        ("external_references", P::list(external_reference)),
                        ("created", P::date()),
                        ("author", author),
                    ],
                ),
            )
            .with_template(
                "action",
                TemplateSchema::new(
                    TemplateKind::Block,
                    [
                        ("name", P::string().required()),
                        ("tactic_id", P::string()),
                        ("tactic_ref", P::string()),
                        ("technique_id", P::string()),
                        ("technique_ref", P::string()),
                        ("description", P::string()),
                        ("confidence", confidence),
                        ("execution_start", P::date()),
                        ("execution_end", P::date()),
                    ],
                ),
            )
            .with_template(
                "asset",
                TemplateSchema::new(
                    TemplateKind::Block,
                    [
                        ("name", P::string().required()),
                        ("description", P::string()),
                    ],
                ),
            )
            .with_template(
                "condition",
                TemplateSchema::new(
                    TemplateKind::Block,
                    [
                        ("description", P::string().required()),
                        ("pattern", P::string()),
                        ("pattern_type", P::string()),
                        ("pattern_version", P::string()),
                        ("date", P::date()),
                    ],
                ),
            )
            .with_template(
                "or",
                TemplateSchema::new(TemplateKind::Block, Vec::<(String, P)>::new()),
            )
            .with_template(
                "and",
                TemplateSchema::new(TemplateKind::Block, Vec::<(String, P)>::new()),
            )
            .with_template(
                "note",
                TemplateSchema::new(
                    TemplateKind::Block,
                    [
                        ("abstract", P::string()),
                        ("content", P::string().required()),
                        ("authors", P::list(P::string())),
                        ("labels", P::list(P::string())),
                        ("lang", P::string()),
                    ],
                ),
            )
            .with_template(
                "dynamic_line",
                TemplateSchema::new(TemplateKind::Line, Vec::<(String, P)>::new()),
            )
    }
}
