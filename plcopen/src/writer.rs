//! The output document and rendering it as XML text.
use log::trace;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use st2plcopen_dsl::diagnostic::Diagnostic;

use crate::{
    template::{TemplateKind, TemplateStore},
    tree::{NodeId, Tree},
};

/// A PLCopen document that is being built from templates.
#[derive(Clone, Debug)]
pub struct OutputProject {
    tree: Tree,
    root: NodeId,
    data_types: NodeId,
    pous: NodeId,
    /// The data element that holds global variable lists. Created the first
    /// time a list is added.
    global_data: Option<NodeId>,
}

impl OutputProject {
    pub(crate) fn new(tree: Tree, root: NodeId, data_types: NodeId, pous: NodeId) -> Self {
        Self {
            tree,
            root,
            data_types,
            pous,
            global_data: None,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data_types(&self) -> NodeId {
        self.data_types
    }

    pub fn pous(&self) -> NodeId {
        self.pous
    }

    /// Returns the element that holds global variable lists, adding the
    /// global data collection to the project when this is the first list.
    pub(crate) fn global_data(&mut self, store: &TemplateStore) -> Result<NodeId, Diagnostic> {
        if let Some(data) = self.global_data {
            return Ok(data);
        }

        let add_data = store.instantiate(TemplateKind::GlobalData, &mut self.tree)?;
        let data = self
            .tree
            .child(add_data, "data")
            .ok_or_else(|| Diagnostic::internal_error(file!(), line!()))?;
        self.tree.append(self.root, add_data);
        self.global_data = Some(data);
        Ok(data)
    }

    /// Renders the document as indented XML text with an XML declaration.
    pub fn to_xml(&self) -> Result<String, Diagnostic> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|_| Diagnostic::internal_error(file!(), line!()))?;
        write_element(&mut writer, &self.tree, self.root)?;

        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|_| Diagnostic::internal_error(file!(), line!()))
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, tree: &Tree, id: NodeId) -> Result<(), Diagnostic> {
    let element = tree.get(id);
    trace!("Write element {}", element.name);

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|_| Diagnostic::internal_error(file!(), line!()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|_| Diagnostic::internal_error(file!(), line!()))?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|_| Diagnostic::internal_error(file!(), line!()))?;
    }
    for child in &element.children {
        write_element(writer, tree, *child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|_| Diagnostic::internal_error(file!(), line!()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> OutputProject {
        let mut tree = Tree::new();
        let root = tree.create("project");
        tree.set_attribute(root, "xmlns", "http://www.plcopen.org/xml/tc6_0200");
        let types = tree.create_child(root, "types");
        let data_types = tree.create_child(types, "dataTypes");
        let pous = tree.create_child(types, "pous");
        OutputProject::new(tree, root, data_types, pous)
    }

    #[test]
    fn to_xml_when_empty_collections_then_self_closing() {
        let xml = project().to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<project xmlns=\"http://www.plcopen.org/xml/tc6_0200\">"));
        assert!(xml.contains("<dataTypes/>"));
        assert!(xml.contains("<pous/>"));
        assert!(xml.trim_end().ends_with("</project>"));
    }

    #[test]
    fn to_xml_when_text_has_markup_then_escaped() {
        let mut project = project();
        let pous = project.pous();
        let tree = project.tree_mut();
        let xhtml = tree.create_child(pous, "xhtml");
        tree.set_text(xhtml, "IF a < b THEN x := 'q'; END_IF");

        let xml = project.to_xml().unwrap();

        assert!(xml.contains("IF a &lt; b THEN"));
    }

    #[test]
    fn to_xml_when_attribute_has_quote_then_escaped() {
        let mut project = project();
        let pous = project.pous();
        let tree = project.tree_mut();
        let value = tree.create_child(pous, "simpleValue");
        tree.set_attribute(value, "value", "\"on\"");

        let xml = project.to_xml().unwrap();

        assert!(xml.contains("<simpleValue value=\"&quot;on&quot;\"/>"));
    }

    #[test]
    fn to_xml_when_written_then_readable_by_schema_reader() {
        let xml = project().to_xml().unwrap();

        let document = crate::schema::SchemaDocument::parse(
            &xml,
            &st2plcopen_dsl::core::FileId::default(),
        )
        .unwrap();

        assert!(document.find("/project/types/pous").is_some());
    }
}
