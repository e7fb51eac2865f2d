//! Tree sink shared by the HTML and XML tree builders.

use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell, RefMut};

use html5ever::QualName;
use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};

use super::tree::{Attribute, ElementData, NodeData, NodeId, NodeTree};

fn to_attribute(attr: html5ever::Attribute) -> Attribute {
    Attribute {
        name: attr.name,
        value: attr.value.to_string(),
    }
}

/// Result of a parse run.
#[derive(Debug)]
pub struct ParsedMarkup {
    /// The built tree.
    pub tree: NodeTree,
    /// Parse errors reported by the tree builder, in order.
    pub errors: Vec<Cow<'static, str>>,
    /// Quirks mode chosen by the HTML tree builder.
    pub quirks_mode: QuirksMode,
}

/// Builds a [`NodeTree`] from tree builder callbacks.
pub struct NodeTreeSink {
    tree: RefCell<NodeTree>,
    errors: RefCell<Vec<Cow<'static, str>>>,
    quirks_mode: Cell<QuirksMode>,
}

impl Default for NodeTreeSink {
    fn default() -> Self {
        Self {
            tree: RefCell::new(NodeTree::new()),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }
}

impl NodeTreeSink {
    #[track_caller]
    fn tree_mut(&self) -> RefMut<'_, NodeTree> {
        self.tree.borrow_mut()
    }

    fn insert_text(&self, anchor: Option<NodeId>, text: &str) -> Option<NodeId> {
        // Adjacent text merges into the preceding text node.
        if let Some(id) = anchor
            && self.tree_mut().append_text(id, text)
        {
            return None;
        }
        Some(self.tree_mut().create(NodeData::Text(text.to_string())))
    }
}

impl TreeSink for NodeTreeSink {
    type Output = ParsedMarkup;

    type Handle = NodeId;

    type ElemName<'a>
        = Ref<'a, QualName>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        ParsedMarkup {
            tree: self.tree.into_inner(),
            errors: self.errors.into_inner(),
            quirks_mode: self.quirks_mode.get(),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.tree.borrow().document()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        // The tree builder only asks for names of handles it created as
        // elements; anything else is a builder bug.
        Ref::map(self.tree.borrow(), |tree| match tree.get(*target).map(|n| &n.data) {
            Some(NodeData::Element(element)) => &element.name,
            _ => unreachable!("elem_name called on a non-element node"),
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs.into_iter().map(to_attribute).collect();
        self.tree_mut()
            .create(NodeData::Element(ElementData { name, attrs }))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.tree_mut().create(NodeData::Comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        self.tree_mut().create(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(id) => self.tree_mut().append_child(*parent, id),
            NodeOrText::AppendText(text) => {
                let last_child = self.tree.borrow().last_child(*parent);
                if let Some(id) = self.insert_text(last_child, &text) {
                    self.tree_mut().append_child(*parent, id);
                }
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(id) => self.tree_mut().insert_before(*sibling, id),
            NodeOrText::AppendText(text) => {
                let previous = self.tree.borrow().previous_sibling(*sibling);
                if let Some(id) = self.insert_text(previous, &text) {
                    self.tree_mut().insert_before(*sibling, id);
                }
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.tree.borrow().parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let mut tree = self.tree_mut();
        let doctype = tree.create(NodeData::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
        let document = tree.document();
        tree.append_child(document, doctype);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        let mut tree = self.tree_mut();
        let Some(element) = tree.element_mut(*target) else {
            return;
        };
        for attr in attrs {
            if !element.attrs.iter().any(|a| a.name == attr.name) {
                element.attrs.push(to_attribute(attr));
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.tree_mut().detach(*target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        self.tree_mut().reparent_children(*node, *new_parent);
    }
}
