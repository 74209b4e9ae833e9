//! Host-page document model for Feedbar
//!
//! The engine runs against an unstable, third-party DOM. This module models
//! that surface as an arena-allocated element tree: nodes carry a tag name,
//! a class list, an inline style map, attributes, optional text content and
//! optional media state. In a deployed extension the same API is backed by
//! real DOM bindings; in this repository it is also the synthetic tree the
//! test-suite builds page layouts from.
//!
//! Node identity is an arena index. Removing a node only unlinks it from its
//! parent; the slot is never reused, so a [`NodeId`] held by a player session
//! stays unambiguous even after the host page drops the element.

mod events;
mod media;

pub use events::{Delivery, EventKind, EventTarget, Listener, ListenerId, Owner, PageEvent};
pub use media::MediaState;

use std::collections::{BTreeMap, VecDeque};

/// Identifier of a node in the document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single element of the host page
#[derive(Debug)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: String,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    hovered: bool,
    pub(crate) media: Option<MediaState>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            style: BTreeMap::new(),
            attrs: BTreeMap::new(),
            text: None,
            hovered: false,
            media: None,
        }
    }
}

/// The live host-page document
///
/// All navigation accessors tolerate stale or unlinked ids and return
/// `None` instead of panicking; the page may assume any shape at any moment.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,

    // Event plumbing (see events.rs)
    pub(crate) listeners: Vec<Listener>,
    pub(crate) next_listener_id: u64,
    pub(crate) queue: VecDeque<PageEvent>,

    // Document-level media capabilities and state (see media.rs)
    pub(crate) fullscreen_element: Option<NodeId>,
    pub(crate) picture_in_picture_element: Option<NodeId>,
    pub(crate) fullscreen_enabled: bool,
    pub(crate) picture_in_picture_enabled: bool,
    pub(crate) unmuted_autoplay_allowed: bool,
}

impl Document {
    /// Create an empty document with an `<html>` root and a `<body>` child
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            listeners: Vec::new(),
            next_listener_id: 0,
            queue: VecDeque::new(),
            fullscreen_element: None,
            picture_in_picture_element: None,
            fullscreen_enabled: true,
            picture_in_picture_enabled: true,
            unmuted_autoplay_allowed: false,
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        doc.root = root;
        doc.body = body;
        doc.append_child(root, body);
        doc
    }

    /// The `<html>` root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element
    pub fn body(&self) -> NodeId {
        self.body
    }

    //#region Tree construction

    /// Create a new, unlinked element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(tag));
        id
    }

    /// Append `child` as the last child of `parent`
    ///
    /// A child that is already linked somewhere else is moved.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.unlink(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Remove a node (and implicitly its subtree) from the document
    ///
    /// The arena slot stays allocated so outstanding [`NodeId`]s remain
    /// unambiguous; the node is simply no longer reachable from the root.
    pub fn remove(&mut self, id: NodeId) {
        self.unlink(id);
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.parent = None;
        }
    }

    //#endregion Tree construction

    //#region Navigation

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Whether the id refers to a node of this document
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Whether the node is still reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Tag name of a node (lowercase), or `""` for a stale id
    pub fn tag(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.tag.as_str()).unwrap_or("")
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// The n-th ancestor of a node (1 = parent)
    pub fn nth_ancestor(&self, id: NodeId, n: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..n {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Children of a node, in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// First child of a node
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Number of children of a node
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// The sibling following `id` under its parent
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// All connected `<video>` elements, in document order
    pub fn videos(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.tag(id) == "video" {
                found.push(id);
            }
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        found
    }

    //#endregion Navigation

    //#region Classes, styles, attributes, text

    /// Whether the node's class list contains `class`
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Add a class to the node's class list
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.contains(id) && !self.has_class(id, class) {
            self.node_mut(id).classes.push(class.to_string());
        }
    }

    /// Remove a class from the node's class list
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if self.contains(id) {
            self.node_mut(id).classes.retain(|c| c != class);
        }
    }

    /// Add or remove a class depending on `on`
    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    /// Read an inline style property
    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.style.get(property)).map(String::as_str)
    }

    /// Set an inline style property
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if self.contains(id) {
            self.node_mut(id)
                .style
                .insert(property.to_string(), value.to_string());
        }
    }

    /// Clear an inline style property, restoring the stylesheet value
    pub fn clear_style(&mut self, id: NodeId, property: &str) {
        if self.contains(id) {
            self.node_mut(id).style.remove(property);
        }
    }

    /// Read an attribute
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|n| n.attrs.get(name)).map(String::as_str)
    }

    /// Set an attribute
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if self.contains(id) {
            self.node_mut(id)
                .attrs
                .insert(name.to_string(), value.to_string());
        }
    }

    /// Text content of a node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.text.as_deref())
    }

    /// Replace the text content of a node
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if self.contains(id) {
            self.node_mut(id).text = Some(text.to_string());
        }
    }

    //#endregion Classes, styles, attributes, text

    //#region Hover

    /// Whether the pointer is currently over the node
    pub fn is_hovered(&self, id: NodeId) -> bool {
        self.node(id).map(|n| n.hovered).unwrap_or(false)
    }

    /// Move the pointer onto or off the node, firing enter/leave events
    pub fn set_hovered(&mut self, id: NodeId, hovered: bool) {
        if !self.contains(id) || self.node(id).map(|n| n.hovered) == Some(hovered) {
            return;
        }
        self.node_mut(id).hovered = hovered;
        let kind = if hovered {
            EventKind::MouseEnter
        } else {
            EventKind::MouseLeave
        };
        self.enqueue(PageEvent {
            target: EventTarget::Node(id),
            kind,
        });
    }

    /// Click the node
    pub fn click(&mut self, id: NodeId) {
        if self.contains(id) {
            self.enqueue(PageEvent {
                target: EventTarget::Node(id),
                kind: EventKind::Click,
            });
        }
    }

    //#endregion Hover
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let video = doc.create_video("https://cdn.example/clip.mp4");
        let overlay = doc.create_element("div");
        doc.append_child(doc.body(), outer);
        doc.append_child(outer, video);
        doc.append_child(outer, overlay);
        (doc, outer, video, overlay)
    }

    #[test]
    fn test_navigation() {
        let (doc, outer, video, overlay) = sample_doc();

        assert_eq!(doc.parent(video), Some(outer));
        assert_eq!(doc.next_sibling(video), Some(overlay));
        assert_eq!(doc.next_sibling(overlay), None);
        assert_eq!(doc.first_child(outer), Some(video));
        assert_eq!(doc.nth_ancestor(video, 1), Some(outer));
        assert_eq!(doc.nth_ancestor(video, 2), Some(doc.body()));
        assert_eq!(doc.nth_ancestor(video, 10), None);
        assert_eq!(doc.tag(video), "video");
    }

    #[test]
    fn test_videos_in_document_order() {
        let mut doc = Document::new();
        let a = doc.create_video("a.mp4");
        let wrap = doc.create_element("div");
        let b = doc.create_video("b.mp4");
        doc.append_child(doc.body(), a);
        doc.append_child(doc.body(), wrap);
        doc.append_child(wrap, b);

        assert_eq!(doc.videos(), vec![a, b]);
    }

    #[test]
    fn test_remove_disconnects_subtree() {
        let (mut doc, outer, video, _) = sample_doc();

        assert!(doc.is_connected(video));
        doc.remove(outer);
        assert!(!doc.is_connected(video));
        assert!(doc.videos().is_empty());

        // The id stays valid for lookups.
        assert_eq!(doc.tag(video), "video");
    }

    #[test]
    fn test_style_and_class_round_trip() {
        let (mut doc, outer, ..) = sample_doc();

        doc.set_style(outer, "height", "calc(100% - 32px)");
        assert_eq!(doc.style(outer, "height"), Some("calc(100% - 32px)"));
        doc.clear_style(outer, "height");
        assert_eq!(doc.style(outer, "height"), None);

        doc.add_class(outer, "fb-controls");
        doc.add_class(outer, "fb-controls");
        assert!(doc.has_class(outer, "fb-controls"));
        doc.toggle_class(outer, "fb-controls", false);
        assert!(!doc.has_class(outer, "fb-controls"));
    }

    #[test]
    fn test_hover_is_edge_triggered() {
        let (mut doc, outer, ..) = sample_doc();

        doc.set_hovered(outer, true);
        doc.set_hovered(outer, true);
        doc.set_hovered(outer, false);

        let events: Vec<_> = doc.queue.iter().map(|e| e.kind).collect();
        assert_eq!(events, vec![EventKind::MouseEnter, EventKind::MouseLeave]);
    }
}
