//! Arena-backed node tree produced by the markup parsers.

use markup5ever::QualName;

/// Index of a node in its [`NodeTree`].
pub type NodeId = usize;

/// An attribute with its value decoded to a `String`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name.
    pub name: QualName,
    /// Attribute value.
    pub value: String,
}

/// Element name and attributes.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Qualified element name.
    pub name: QualName,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    /// The element's local name, as written (HTML names are already lowercase).
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// Returns the value of the attribute with local name `name`.
    ///
    /// Matching is ASCII case-insensitive.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// The document root.
    Document,
    /// A document type declaration.
    Doctype {
        /// Root element name.
        name: String,
        /// Public identifier (may be empty).
        public_id: String,
        /// System identifier (may be empty).
        system_id: String,
    },
    /// An element.
    Element(ElementData),
    /// Character data.
    Text(String),
    /// A comment.
    Comment(String),
    /// A processing instruction.
    ProcessingInstruction {
        /// PI target.
        target: String,
        /// PI data.
        data: String,
    },
}

/// A node and its links.
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node, if attached.
    pub parent: Option<NodeId>,
    /// Child nodes in document order.
    pub children: Vec<NodeId>,
    /// Node payload.
    pub data: NodeData,
}

impl Node {
    /// Element data, if this node is an element.
    #[must_use]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// A parsed document tree. Node 0 is always the document.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates a tree holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// The document node.
    #[must_use]
    pub fn document(&self) -> NodeId {
        0
    }

    /// Looks up a node. Unknown ids yield `None`.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The first element child of the document.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id].as_element().is_some())
    }

    /// The document type declaration, if any.
    #[must_use]
    pub fn doctype(&self) -> Option<&NodeData> {
        self.nodes[0]
            .children
            .iter()
            .map(|&id| &self.nodes[id].data)
            .find(|data| matches!(data, NodeData::Doctype { .. }))
    }

    /// All nodes below `root` in document order, `root` excluded.
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(root) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    /// Elements below the document whose local name satisfies `matches`.
    pub fn elements_where<F>(&self, matches: F) -> Vec<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        self.descendants(self.document())
            .into_iter()
            .filter(|&id| self.nodes[id].as_element().is_some_and(&matches))
            .collect()
    }

    /// Concatenated text of every text node below `id`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|child| match &self.nodes[child].data {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.nodes.len() - 1
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    pub(crate) fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        let Some(parent) = self.nodes[sibling].parent else {
            return;
        };
        self.detach(node);
        let siblings = &mut self.nodes[parent].children;
        let index = siblings
            .iter()
            .position(|&id| id == sibling)
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.nodes[node].parent = Some(parent);
    }

    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&child| child != id);
        }
    }

    pub(crate) fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from].children);
        for &child in &children {
            self.nodes[child].parent = Some(to);
        }
        self.nodes[to].children.extend(children);
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub(crate) fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.last().copied()
    }

    pub(crate) fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let index = siblings.iter().position(|&child| child == id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Appends `text` to node `id` if it is a text node.
    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) -> bool {
        match &mut self.nodes[id].data {
            NodeData::Text(existing) => {
                existing.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Detaches every attached text node made only of whitespace.
    pub(crate) fn prune_whitespace_text(&mut self) {
        let blanks: Vec<NodeId> = self
            .descendants(self.document())
            .into_iter()
            .filter(|&id| {
                matches!(&self.nodes[id].data, NodeData::Text(text) if text.chars().all(char::is_whitespace))
            })
            .collect();
        for id in blanks {
            self.detach(id);
        }
    }
}
