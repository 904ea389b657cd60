//! The mutable diagram object model.
//!
//! This is the UI-facing side of a flow: a page ([`Group`]) holding blocks,
//! lines, and nested groups. Lines record which blocks their two ends are
//! latched to. Nothing here is validated beyond what editing needs; the
//! semantic analyzer is responsible for turning a (possibly inconsistent)
//! model into a graph.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::{
    identifier::Id,
    property::{Property, PropertyDescriptor, PropertyValue},
};

/// Errors raised by editing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("object '{0}' not found")]
    NotFound(Id),

    #[error("object '{0}' is not a line")]
    NotALine(Id),

    #[error("object '{0}' is not a block")]
    NotABlock(Id),

    #[error("object '{0}' is not a group")]
    NotAGroup(Id),

    #[error("object '{0}' already exists")]
    DuplicateId(Id),
}

/// A node of the flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: Id,
    template: Id,
    props: Property,
}

impl Block {
    pub fn new(id: Id, template: Id, props: Property) -> Self {
        Self {
            id,
            template,
            props,
        }
    }
}

/// A connector. Either end may be unattached.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    id: Id,
    template: Id,
    props: Property,
    source: Option<Id>,
    target: Option<Id>,
}

impl Line {
    pub fn new(id: Id, template: Id, props: Property) -> Self {
        Self {
            id,
            template,
            props,
            source: None,
            target: None,
        }
    }

    /// Latches the source end to `block`.
    pub fn with_source(mut self, block: Id) -> Self {
        self.source = Some(block);
        self
    }

    /// Latches the target end to `block`.
    pub fn with_target(mut self, block: Id) -> Self {
        self.target = Some(block);
        self
    }

    /// Block the source end is latched to.
    pub fn source(&self) -> Option<Id> {
        self.source
    }

    /// Block the target end is latched to.
    pub fn target(&self) -> Option<Id> {
        self.target
    }
}

/// A container of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    id: Id,
    template: Id,
    props: Property,
    children: Vec<DiagramObject>,
}

impl Group {
    pub fn new(id: Id, template: Id, props: Property) -> Self {
        Self {
            id,
            template,
            props,
            children: Vec::new(),
        }
    }

    /// Appends a child, builder style.
    pub fn with_child(mut self, child: impl Into<DiagramObject>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn template(&self) -> Id {
        self.template
    }

    pub fn props(&self) -> &Property {
        &self.props
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[DiagramObject] {
        &self.children
    }
}

/// Any object that can live on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramObject {
    Block(Block),
    Line(Line),
    Group(Group),
}

impl DiagramObject {
    pub fn id(&self) -> Id {
        match self {
            DiagramObject::Block(b) => b.id,
            DiagramObject::Line(l) => l.id,
            DiagramObject::Group(g) => g.id,
        }
    }

    pub fn template(&self) -> Id {
        match self {
            DiagramObject::Block(b) => b.template,
            DiagramObject::Line(l) => l.template,
            DiagramObject::Group(g) => g.template,
        }
    }

    /// Top-level properties (a dictionary).
    pub fn props(&self) -> &Property {
        match self {
            DiagramObject::Block(b) => &b.props,
            DiagramObject::Line(l) => &l.props,
            DiagramObject::Group(g) => &g.props,
        }
    }

    pub fn props_mut(&mut self) -> &mut Property {
        match self {
            DiagramObject::Block(b) => &mut b.props,
            DiagramObject::Line(l) => &mut l.props,
            DiagramObject::Group(g) => &mut g.props,
        }
    }
}

impl From<Block> for DiagramObject {
    fn from(block: Block) -> Self {
        DiagramObject::Block(block)
    }
}

impl From<Line> for DiagramObject {
    fn from(line: Line) -> Self {
        DiagramObject::Line(line)
    }
}

impl From<Group> for DiagramObject {
    fn from(group: Group) -> Self {
        DiagramObject::Group(group)
    }
}

/// A whole diagram: the page group and everything under it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramObjectModel {
    page: Group,
    /// Every id in use, the page's included.
    ids: HashSet<Id>,
}

impl Default for DiagramObjectModel {
    /// An empty `flow` page with no properties.
    fn default() -> Self {
        let props = Property::new(
            PropertyDescriptor::dictionary(Vec::<(String, PropertyDescriptor)>::new()),
            PropertyValue::Dictionary(IndexMap::new()),
        );
        Self::new(Group::new(Id::new("page"), Id::new("flow"), props))
    }
}

impl DiagramObjectModel {
    pub fn new(page: Group) -> Self {
        let mut ids = HashSet::from([page.id]);
        ids.extend(nested_ids(&page.children));
        Self { page, ids }
    }

    /// Returns `true` if any object in the diagram, the page included, has `id`.
    pub fn contains(&self, id: Id) -> bool {
        self.ids.contains(&id)
    }

    /// The page group.
    pub fn page(&self) -> &Group {
        &self.page
    }

    /// Iterates every object below the page, depth-first, pre-order.
    pub fn subtree(&self) -> Subtree<'_> {
        Subtree {
            stack: vec![self.page.children.iter()],
        }
    }

    /// Finds an object below the page by id.
    pub fn find(&self, id: Id) -> Option<&DiagramObject> {
        if !self.contains(id) {
            return None;
        }
        self.subtree().find(|obj| obj.id() == id)
    }

    /// Finds an object below the page by id, for editing.
    ///
    /// The object must keep its id; replace objects with [`remove`] and
    /// [`insert`] instead.
    ///
    /// [`remove`]: Self::remove
    /// [`insert`]: Self::insert
    pub fn find_mut(&mut self, id: Id) -> Option<&mut DiagramObject> {
        if !self.contains(id) {
            return None;
        }
        find_in_mut(&mut self.page.children, id)
    }

    /// Adds an object to the page (`parent == None`) or to a nested group.
    ///
    /// # Errors
    ///
    /// Fails if the object's id is already in use or `parent` is not a
    /// group. Ids nested inside an inserted group are not checked here; the
    /// semantic analyzer reports those.
    pub fn insert(
        &mut self,
        parent: Option<Id>,
        object: impl Into<DiagramObject>,
    ) -> Result<(), DiagramError> {
        let object = object.into();
        if self.contains(object.id()) {
            return Err(DiagramError::DuplicateId(object.id()));
        }

        let children = match parent {
            None => &mut self.page.children,
            Some(parent_id) => match self.find_mut(parent_id) {
                Some(DiagramObject::Group(group)) => &mut group.children,
                Some(_) => return Err(DiagramError::NotAGroup(parent_id)),
                None => return Err(DiagramError::NotFound(parent_id)),
            },
        };
        let mut added = vec![object.id()];
        if let DiagramObject::Group(group) = &object {
            added.extend(nested_ids(&group.children));
        }
        children.push(object);
        self.ids.extend(added);
        Ok(())
    }

    /// Latches (or, with `None`, unlatches) the source end of a line.
    pub fn set_source(&mut self, line: Id, block: Option<Id>) -> Result<(), DiagramError> {
        self.ensure_block(block)?;
        self.line_mut(line)?.source = block;
        Ok(())
    }

    /// Latches (or, with `None`, unlatches) the target end of a line.
    pub fn set_target(&mut self, line: Id, block: Option<Id>) -> Result<(), DiagramError> {
        self.ensure_block(block)?;
        self.line_mut(line)?.target = block;
        Ok(())
    }

    /// Removes an object (and, for groups, everything inside it).
    ///
    /// Lines latched to removed blocks are unlatched.
    pub fn remove(&mut self, id: Id) -> Option<DiagramObject> {
        let removed = remove_in(&mut self.page.children, id)?;

        let mut gone = vec![removed.id()];
        if let DiagramObject::Group(group) = &removed {
            gone.extend(nested_ids(&group.children));
        }
        unlatch_in(&mut self.page.children, &gone);
        for id in &gone {
            self.ids.remove(id);
        }
        debug!(id:?, removed = gone.len(); "Objects removed from diagram");

        Some(removed)
    }

    fn ensure_block(&self, block: Option<Id>) -> Result<(), DiagramError> {
        match block.map(|id| (id, self.find(id))) {
            None | Some((_, Some(DiagramObject::Block(_)))) => Ok(()),
            Some((id, Some(_))) => Err(DiagramError::NotABlock(id)),
            Some((id, None)) => Err(DiagramError::NotFound(id)),
        }
    }

    fn line_mut(&mut self, id: Id) -> Result<&mut Line, DiagramError> {
        match self.find_mut(id) {
            Some(DiagramObject::Line(line)) => Ok(line),
            Some(_) => Err(DiagramError::NotALine(id)),
            None => Err(DiagramError::NotFound(id)),
        }
    }
}

/// Depth-first, pre-order iterator over diagram objects.
pub struct Subtree<'a> {
    stack: Vec<std::slice::Iter<'a, DiagramObject>>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = &'a DiagramObject;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(obj) => {
                    if let DiagramObject::Group(group) = obj {
                        self.stack.push(group.children.iter());
                    }
                    return Some(obj);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

fn nested_ids(children: &[DiagramObject]) -> impl Iterator<Item = Id> + '_ {
    Subtree {
        stack: vec![children.iter()],
    }
    .map(DiagramObject::id)
}

fn find_in_mut(objects: &mut [DiagramObject], id: Id) -> Option<&mut DiagramObject> {
    for obj in objects.iter_mut() {
        if obj.id() == id {
            return Some(obj);
        }
        if let DiagramObject::Group(group) = obj {
            if let Some(found) = find_in_mut(&mut group.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_in(objects: &mut Vec<DiagramObject>, id: Id) -> Option<DiagramObject> {
    if let Some(idx) = objects.iter().position(|obj| obj.id() == id) {
        return Some(objects.remove(idx));
    }
    objects.iter_mut().find_map(|obj| match obj {
        DiagramObject::Group(group) => remove_in(&mut group.children, id),
        _ => None,
    })
}

fn unlatch_in(objects: &mut [DiagramObject], gone: &[Id]) {
    for obj in objects.iter_mut() {
        match obj {
            DiagramObject::Line(line) => {
                if line.source.is_some_and(|id| gone.contains(&id)) {
                    line.source = None;
                }
                if line.target.is_some_and(|id| gone.contains(&id)) {
                    line.target = None;
                }
            }
            DiagramObject::Group(group) => unlatch_in(&mut group.children, gone),
            DiagramObject::Block(_) => {}
        }
    }
}
