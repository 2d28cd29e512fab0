//! Reads an exemplar PLCopen document into a [`Tree`].
//!
//! The document is read with roxmltree and then copied into an owned tree so
//! that fragments can be modified and copied. Namespace declarations are
//! kept as ordinary attributes on the element that declares them, so writing
//! the tree back produces equivalent XML.
use log::debug;
use st2plcopen_dsl::{
    core::FileId,
    diagnostic::{Diagnostic, Label},
};
use st2plcopen_problems::Problem;

use crate::tree::{NodeId, Tree};

/// An exemplar document.
#[derive(Clone, Debug)]
pub struct SchemaDocument {
    tree: Tree,
    root: NodeId,
    file_id: FileId,
}

impl SchemaDocument {
    /// Parses the XML text of an exemplar document.
    pub fn parse(xml: &str, file_id: &FileId) -> Result<Self, Diagnostic> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| {
            let pos = e.pos();
            Diagnostic::problem(
                Problem::TemplateSyntaxError,
                Label::file(file_id.clone(), format!("XML parse error: {}", e)),
            )
            .with_context("line", &pos.row.to_string())
        })?;

        let mut tree = Tree::new();
        let root = copy_element(&mut tree, doc.root_element());
        debug!(
            "Read exemplar document {} with root {}",
            file_id,
            tree.name(root)
        );

        Ok(Self {
            tree,
            root,
            file_id: file_id.clone(),
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    /// Finds an element by absolute path (see [`Tree::find`]).
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.tree.find(self.root, path)
    }

    /// Finds an element by path relative to the node (see [`Tree::subfind`]).
    pub fn subfind(&self, node: NodeId, path: &str) -> Option<NodeId> {
        self.tree.subfind(node, path)
    }
}

fn copy_element(tree: &mut Tree, node: roxmltree::Node) -> NodeId {
    let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());
    let id = tree.create(&name);

    for (name, uri) in declared_namespaces(node) {
        tree.set_attribute(id, &name, &uri);
    }
    for attribute in node.attributes() {
        let name = qualified_name(node, attribute.namespace(), attribute.name());
        tree.set_attribute(id, &name, attribute.value());
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let child_id = copy_element(tree, child);
            tree.append(id, child_id);
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    // Whitespace between elements is only formatting.
    if !text.trim().is_empty() {
        tree.set_text(id, &text);
    }

    id
}

/// Returns the name with the prefix that is bound to the namespace.
fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

/// Returns the namespace declarations that are made on this element as
/// attribute name and value pairs.
fn declared_namespaces(node: roxmltree::Node) -> Vec<(String, String)> {
    let inherited: Vec<(Option<&str>, &str)> = match node.parent_element() {
        Some(parent) => parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect(),
        None => vec![],
    };

    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| match ns.name() {
            Some(prefix) => (format!("xmlns:{}", prefix), ns.uri().to_string()),
            None => (String::from("xmlns"), ns.uri().to_string()),
        })
        .collect()
}
