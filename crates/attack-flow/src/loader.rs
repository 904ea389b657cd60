//! Reads diagrams from JSON documents.
//!
//! The document lists the page's objects, tagged by kind:
//!
//! ```json
//! {
//!   "page": { "id": "flow-1", "template": "flow", "properties": { "name": "Phish" } },
//!   "objects": [
//!     { "kind": "block", "id": "a1", "template": "action", "properties": { "name": "Spearphish" } },
//!     { "kind": "block", "id": "s1", "template": "asset", "properties": { "name": "Mailbox" } },
//!     { "kind": "line", "id": "l1", "template": "dynamic_line", "source": "a1", "target": "s1" },
//!     { "kind": "group", "id": "g1", "template": "flow", "children": [] }
//!   ]
//! }
//! ```
//!
//! `page` is optional and defaults to an empty `flow` page. Properties are
//! built against the schema template named by each object; keys left out
//! take their defaults. Line endpoints are copied as given, so a diagram
//! with dangling latches loads fine and is rejected later by analysis.

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use attack_flow_core::{
    diagram::{Block, DiagramError, DiagramObject, DiagramObjectModel, Group, Line},
    identifier::Id,
    property::{Property, PropertyError},
    schema::{Schema, TemplateKind},
};

/// Problems reading a diagram document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid diagram document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("object '{id}': unknown template '{template}'")]
    UnknownTemplate { id: Id, template: Id },

    #[error("object '{id}': template '{template}' creates a {expected}, not a {found}")]
    KindMismatch {
        id: Id,
        template: Id,
        expected: TemplateKind,
        found: TemplateKind,
    },

    #[error("object '{id}': {source}")]
    Property {
        id: Id,
        #[source]
        source: PropertyError,
    },

    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDiagram {
    #[serde(default)]
    page: Option<RawPage>,

    #[serde(default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    id: Id,
    template: Id,

    #[serde(default)]
    properties: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawObject {
    Block {
        id: Id,
        template: Id,
        #[serde(default)]
        properties: Value,
    },
    Line {
        id: Id,
        template: Id,
        #[serde(default)]
        properties: Value,
        #[serde(default)]
        source: Option<Id>,
        #[serde(default)]
        target: Option<Id>,
    },
    Group {
        id: Id,
        template: Id,
        #[serde(default)]
        properties: Value,
        #[serde(default)]
        children: Vec<RawObject>,
    },
}

/// Parses a JSON diagram document against `schema`.
///
/// # Errors
///
/// Fails on malformed JSON, unknown templates, templates used for the wrong
/// kind of object, property values the schema rejects, and repeated ids.
pub fn load_diagram(schema: &Schema, source: &str) -> Result<DiagramObjectModel, LoadError> {
    info!("Loading diagram");
    let raw: RawDiagram = serde_json::from_str(source)?;

    let page = match raw.page {
        Some(page) => {
            let props = build_props(
                schema,
                page.id,
                page.template,
                TemplateKind::Group,
                &page.properties,
            )?;
            Group::new(page.id, page.template, props)
        }
        None => DiagramObjectModel::default().page().clone(),
    };

    let mut diagram = DiagramObjectModel::new(page);
    for object in raw.objects {
        insert_object(schema, &mut diagram, None, object)?;
    }

    debug!(objects = diagram.subtree().count(); "Diagram loaded");
    Ok(diagram)
}

fn insert_object(
    schema: &Schema,
    diagram: &mut DiagramObjectModel,
    parent: Option<Id>,
    raw: RawObject,
) -> Result<(), LoadError> {
    match raw {
        RawObject::Block {
            id,
            template,
            properties,
        } => {
            let props = build_props(schema, id, template, TemplateKind::Block, &properties)?;
            diagram.insert(parent, Block::new(id, template, props))?;
        }
        RawObject::Line {
            id,
            template,
            properties,
            source,
            target,
        } => {
            let props = build_props(schema, id, template, TemplateKind::Line, &properties)?;
            let mut line = Line::new(id, template, props);
            if let Some(source) = source {
                line = line.with_source(source);
            }
            if let Some(target) = target {
                line = line.with_target(target);
            }
            diagram.insert(parent, DiagramObject::Line(line))?;
        }
        RawObject::Group {
            id,
            template,
            properties,
            children,
        } => {
            let props = build_props(schema, id, template, TemplateKind::Group, &properties)?;
            diagram.insert(parent, Group::new(id, template, props))?;
            for child in children {
                insert_object(schema, diagram, Some(id), child)?;
            }
        }
    }
    Ok(())
}

fn build_props(
    schema: &Schema,
    id: Id,
    template: Id,
    found: TemplateKind,
    properties: &Value,
) -> Result<Property, LoadError> {
    let definition = schema
        .template(template)
        .ok_or(LoadError::UnknownTemplate { id, template })?;

    if definition.kind() != found {
        return Err(LoadError::KindMismatch {
            id,
            template,
            expected: definition.kind(),
            found,
        });
    }

    Property::from_json(&definition.descriptor(), properties)
        .map_err(|source| LoadError::Property { id, source })
}
