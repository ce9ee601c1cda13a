// src/engine/dom.rs
//! Minimal document tree the map and its layers render into

use crate::geo::Size;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

struct Node {
    tag: String,
    id: RefCell<String>,
    class_name: RefCell<String>,
    style: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<Element>>,
    parent: RefCell<Weak<Node>>,
}

/// Shared handle to a node in the document tree
#[derive(Clone)]
pub struct Element(Rc<Node>);

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.0.tag)
            .field("id", &*self.0.id.borrow())
            .field("class", &*self.0.class_name.borrow())
            .field("children", &self.0.children.borrow().len())
            .finish()
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Element(Rc::new(Node {
            tag: tag.to_string(),
            id: RefCell::new(String::new()),
            class_name: RefCell::new(String::new()),
            style: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
        }))
    }

    /// Create an element and optionally append it to `parent`
    pub fn create(tag: &str, class_name: &str, parent: Option<&Element>) -> Self {
        let element = Self::new(tag);
        element.set_class_name(class_name);
        if let Some(parent) = parent {
            parent.append_child(&element);
        }
        element
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn id(&self) -> String {
        self.0.id.borrow().clone()
    }

    pub fn set_id(&self, id: &str) {
        *self.0.id.borrow_mut() = id.to_string();
    }

    pub fn class_name(&self) -> String {
        self.0.class_name.borrow().clone()
    }

    pub fn set_class_name(&self, class_name: &str) {
        *self.0.class_name.borrow_mut() = class_name.to_string();
    }

    pub fn add_class(&self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut name = self.0.class_name.borrow_mut();
        if !name.is_empty() {
            name.push(' ');
        }
        name.push_str(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.class_name.borrow().split_whitespace().any(|c| c == class)
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.0.style.borrow().get(property).cloned()
    }

    pub fn set_style(&self, property: &str, value: &str) {
        self.0
            .style
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
    }

    /// Set `width`/`height` in pixels
    pub fn set_size(&self, size: Size) {
        self.set_style("width", &format!("{}px", size.x));
        self.set_style("height", &format!("{}px", size.y));
    }

    /// Pixel size from the inline `width`/`height` style, if both are set
    pub fn size(&self) -> Option<Size> {
        let parse = |value: String| value.strip_suffix("px")?.parse::<f64>().ok();
        let width = self.style("width").and_then(parse)?;
        let height = self.style("height").and_then(parse)?;
        Some(Size::new(width, height))
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    pub fn first_child(&self) -> Option<Element> {
        self.0.children.borrow().first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Element> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        let index = children.iter().position(|c| c.ptr_eq(self))?;
        children.get(index + 1).cloned()
    }

    pub fn append_child(&self, child: &Element) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference`, or at the end when `reference`
    /// is `None` or not a child of this element. A child that already has
    /// a parent is moved.
    pub fn insert_before(&self, child: &Element, reference: Option<&Element>) {
        child.detach();
        let mut children = self.0.children.borrow_mut();
        let index = reference
            .and_then(|r| children.iter().position(|c| c.ptr_eq(r)))
            .unwrap_or(children.len());
        children.insert(index, child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    /// Remove `child`; returns `false` when it was not a child
    pub fn remove_child(&self, child: &Element) -> bool {
        let mut children = self.0.children.borrow_mut();
        match children.iter().position(|c| c.ptr_eq(child)) {
            Some(index) => {
                children.remove(index);
                *child.0.parent.borrow_mut() = Weak::new();
                true
            }
            None => false,
        }
    }

    /// Remove this element from its parent, if any
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    pub fn is_attached_to(&self, parent: &Element) -> bool {
        self.parent().map_or(false, |p| p.ptr_eq(parent))
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Depth-first search of descendants by id
    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        for child in self.children() {
            if *child.0.id.borrow() == id {
                return Some(child);
            }
            if let Some(found) = child.find_by_id(id) {
                return Some(found);
            }
        }
        None
    }

    /// Depth-first search of descendants carrying `class`
    pub fn find_by_class(&self, class: &str) -> Option<Element> {
        for child in self.children() {
            if child.has_class(class) {
                return Some(child);
            }
            if let Some(found) = child.find_by_class(class) {
                return Some(found);
            }
        }
        None
    }
}

/// Root of an element tree
#[derive(Clone, Debug)]
pub struct Document {
    body: Element,
}

impl Document {
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
        }
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.body.find_by_id(id)
    }

    /// Append a sized `div` with the given id to the body
    pub fn add_container(&self, id: &str, size: Size) -> Element {
        let element = Element::create("div", "", Some(&self.body));
        element.set_id(id);
        element.set_size(size);
        element
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
