//! Arena-based document tree
//!
//! Nodes live in a flat arena and refer to each other through `NodeId`.
//! Ids stay valid for the lifetime of the `Document`, which makes them safe
//! keys for side tables that must not own or extend the life of the tree.

use std::collections::HashMap;

/// Stable identity of a node within one `Document`.
///
/// Ids from one document are meaningless in another; a rebuilt document
/// starts a fresh arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Element with a lowercase tag name and its attributes
    Element {
        tag: String,
        attributes: HashMap<String, String>,
    },
    /// Text leaf, content exactly as written (entities decoded)
    Text { content: String },
    /// Comment, kept so traversals can skip it explicitly
    Comment { content: String },
}

/// One node in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Document tree
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse markup into a document. Never fails; unparseable input yields
    /// an empty or partial tree.
    pub fn parse(html: &str) -> Self {
        crate::parser::HtmlParser::new(html).parse()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ---- construction / mutation ----

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(Node {
            kind: NodeKind::Element {
                tag: tag.to_lowercase(),
                attributes: HashMap::new(),
            },
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push_node(Node {
            kind: NodeKind::Text {
                content: content.to_string(),
            },
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push_node(Node {
            kind: NodeKind::Comment {
                content: content.to_string(),
            },
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Insert `child` into `parent`'s child list at `index` (clamped).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
    }

    /// Wrap `target` in a new element, which takes target's place among its
    /// former parent's children. Returns the wrapper id, or None for a
    /// detached/root target.
    pub fn wrap_node(&mut self, target: NodeId, wrapper_tag: &str) -> Option<NodeId> {
        let parent = self.get(target)?.parent?;
        let wrapper = self.create_element(wrapper_tag);

        let slot = self
            .get(parent)?
            .children
            .iter()
            .position(|&c| c == target)?;
        if let Some(node) = self.get_mut(parent) {
            node.children[slot] = wrapper;
        }
        if let Some(node) = self.get_mut(wrapper) {
            node.parent = Some(parent);
            node.children.push(target);
        }
        if let Some(node) = self.get_mut(target) {
            node.parent = Some(wrapper);
        }
        Some(wrapper)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(Node {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.get_mut(id)
        {
            attributes.insert(name.to_lowercase(), value.to_string());
        }
    }

    // ---- queries ----

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(|s| s.as_str()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        matches!(
            self.get(id),
            Some(Node {
                kind: NodeKind::Element { attributes, .. },
                ..
            }) if attributes.contains_key(name)
        )
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.get(id),
            Some(Node {
                kind: NodeKind::Element { .. },
                ..
            })
        )
    }

    /// Content of a text node; None for other kinds.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.kind {
            NodeKind::Text { content } => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Iterator over ancestors, nearest first (excluding `id` itself).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Nearest ancestor-or-self element whose tag is in `tags`.
    pub fn closest(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(tag) = self.tag_name(node) {
                if tags.contains(&tag) {
                    return Some(node);
                }
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated text of all text descendants, document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// All elements with the given tag, document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.iter()
            .filter(|&id| self.tag_name(id) == Some(tag))
            .collect()
    }

    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.iter().find(|&id| self.tag_name(id) == Some(tag))
    }

    /// The `<body>` element, or the root when the markup had none.
    pub fn body(&self) -> Option<NodeId> {
        self.first_element_by_tag("body").or(self.root)
    }

    /// Depth-first iterator over the whole document.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            doc: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Depth-first iterator over `id` and its descendants.
    pub fn descendants(&self, id: NodeId) -> DepthFirst<'_> {
        DepthFirst {
            doc: self,
            stack: vec![id],
        }
    }
}

/// Depth-first, document-order traversal.
///
/// Children are pushed in reverse so pop order matches document order.
pub struct DepthFirst<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        for &child in self.doc.children(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.parent(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("html");
        doc.set_root(root);
        let body = doc.create_element("body");
        doc.append_child(root, body);
        let p = doc.create_element("p");
        doc.append_child(body, p);
        let text = doc.create_text("hello");
        doc.append_child(p, text);
        (doc, root, p, text)
    }

    #[test]
    fn depth_first_matches_document_order() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        doc.set_root(root);
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(root, a);
        doc.append_child(root, b);
        let a1 = doc.create_text("one");
        doc.append_child(a, a1);

        let order: Vec<NodeId> = doc.iter().collect();
        assert_eq!(order, vec![root, a, a1, b]);
    }

    #[test]
    fn closest_finds_ancestor_by_tag() {
        let (doc, root, p, text) = sample();
        assert_eq!(doc.closest(text, &["p"]), Some(p));
        assert_eq!(doc.closest(text, &["html"]), Some(root));
        assert_eq!(doc.closest(text, &["table"]), None);
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let (mut doc, _, p, _) = sample();
        let em = doc.create_element("em");
        doc.append_child(p, em);
        let more = doc.create_text(" world");
        doc.append_child(em, more);
        assert_eq!(doc.text_content(p), "hello world");
    }

    #[test]
    fn wrap_node_reparents_in_place() {
        let (mut doc, _, p, _) = sample();
        let body = doc.parent(p).unwrap();
        let wrapper = doc.wrap_node(p, "div").unwrap();

        assert_eq!(doc.parent(p), Some(wrapper));
        assert_eq!(doc.parent(wrapper), Some(body));
        assert_eq!(doc.children(body), &[wrapper]);
        assert_eq!(doc.children(wrapper), &[p]);
    }

    #[test]
    fn wrap_root_is_rejected() {
        let (mut doc, root, _, _) = sample();
        assert!(doc.wrap_node(root, "div").is_none());
    }

    #[test]
    fn attributes_are_case_normalized() {
        let mut doc = Document::new();
        let el = doc.create_element("IMG");
        doc.set_attribute(el, "ALT", "Logo");
        assert_eq!(doc.tag_name(el), Some("img"));
        assert_eq!(doc.attribute(el, "alt"), Some("Logo"));
        assert!(doc.has_attribute(el, "alt"));
    }
}
