//! The template store holds content-erased fragments of an exemplar
//! document, one for each kind of output element.
//!
//! Output elements are only ever created by copying a template. The
//! exemplar decides the element order, the attributes that the schema
//! requires and any vendor specific children, so copying keeps the output
//! in the shape of the exemplar.
use std::collections::HashMap;

use log::debug;
use phf::phf_map;
use st2plcopen_dsl::{
    core::{FileId, SourceSpan},
    diagnostic::{Diagnostic, Label},
    ir::{StringWidth, TypeSpec},
};
use st2plcopen_problems::Problem;

use crate::{
    schema::SchemaDocument,
    tree::{NodeId, Tree},
    writer::OutputProject,
};

/// The kinds of output elements that are created from templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    StructType,
    EnumType,
    Pou,
    InputVars,
    OutputVars,
    InOutVars,
    TempVars,
    LocalVars,
    ReturnType,
    Variable,
    EnumValue,
    GlobalVars,
    GlobalData,
}

impl TemplateKind {
    /// Describes where the exemplar is found in the exemplar document.
    pub fn location(&self) -> &'static str {
        match self {
            TemplateKind::StructType => "types/dataTypes/dataType with baseType/struct",
            TemplateKind::EnumType => "types/dataTypes/dataType with baseType/enum/values",
            TemplateKind::Pou => "types/pous/pou",
            TemplateKind::InputVars => "pou/interface/inputVars",
            TemplateKind::OutputVars => "pou/interface/outputVars",
            TemplateKind::InOutVars => "pou/interface/inOutVars",
            TemplateKind::TempVars => "pou/interface/tempVars",
            TemplateKind::LocalVars => "pou/interface/localVars",
            TemplateKind::ReturnType => "pou/interface/returnType",
            TemplateKind::Variable => "variable",
            TemplateKind::EnumValue => "baseType/enum/values/value",
            TemplateKind::GlobalVars => "addData/data/globalVars",
            TemplateKind::GlobalData => "addData",
        }
    }
}

/// The interface lists, in the order they are searched for.
const INTERFACE_LISTS: [(TemplateKind, &str); 6] = [
    (TemplateKind::InputVars, "inputVars"),
    (TemplateKind::OutputVars, "outputVars"),
    (TemplateKind::InOutVars, "inOutVars"),
    (TemplateKind::TempVars, "tempVars"),
    (TemplateKind::LocalVars, "localVars"),
    (TemplateKind::ReturnType, "returnType"),
];

/// Attributes that describe the content of the exemplar rather than the
/// shape. These are removed from every template.
const CONTENT_ATTRIBUTES: [&str; 8] = [
    "name",
    "value",
    "address",
    "pouType",
    "constant",
    "retain",
    "nonretain",
    "persistent",
];

/// Elementary types that have their own element in PLCopen documents. The
/// value is the element name.
static ELEMENTARY_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "BOOL" => "BOOL",
    "BYTE" => "BYTE",
    "WORD" => "WORD",
    "DWORD" => "DWORD",
    "LWORD" => "LWORD",
    "SINT" => "SINT",
    "INT" => "INT",
    "DINT" => "DINT",
    "LINT" => "LINT",
    "USINT" => "USINT",
    "UINT" => "UINT",
    "UDINT" => "UDINT",
    "ULINT" => "ULINT",
    "REAL" => "REAL",
    "LREAL" => "LREAL",
    "TIME" => "TIME",
    "DATE" => "DATE",
    "DT" => "DT",
    "DATE_AND_TIME" => "DT",
    "TOD" => "TOD",
    "TIME_OF_DAY" => "TOD",
    "STRING" => "string",
    "WSTRING" => "wstring",
};

pub struct TemplateStore {
    /// Arena that holds the templates.
    templates: Tree,
    exemplars: HashMap<TemplateKind, NodeId>,
    /// The exemplar document without any content.
    skeleton: Tree,
    skeleton_root: NodeId,
    data_types: NodeId,
    pous: NodeId,
    file_id: FileId,
}

impl TemplateStore {
    /// Creates the templates from the exemplar document.
    ///
    /// The document must have the `types/dataTypes` and `types/pous`
    /// collections. Templates for other kinds are optional; a missing
    /// template is an error when it is first needed.
    pub fn load(document: &SchemaDocument) -> Result<Self, Diagnostic> {
        let source = document.tree();
        let file_id = document.file_id().clone();
        let required = |path: &str| {
            document.find(path).ok_or_else(|| {
                Diagnostic::problem(
                    Problem::TemplateMissing,
                    Label::file(file_id.clone(), format!("Expected element {}", path)),
                )
            })
        };
        let data_types = required("/project/types/dataTypes")?;
        let pous = required("/project/types/pous")?;

        let mut templates = Tree::new();
        let mut exemplars = HashMap::new();
        let mut add = |kind: TemplateKind, exemplar: NodeId, keep: &[&str]| {
            let id = templates.copy_from(source, exemplar);
            skeleton(&mut templates, id, keep);
            for attribute in CONTENT_ATTRIBUTES {
                templates.remove_attribute(id, attribute);
            }
            debug!("Template for {:?}", kind);
            exemplars.insert(kind, id);
        };

        // Data types
        let data_type_with = |path: &str| {
            source
                .children(data_types)
                .iter()
                .copied()
                .find(|dt| source.name(*dt) == "dataType" && source.subfind(*dt, path).is_some())
        };
        let struct_type = data_type_with("baseType/struct");
        if let Some(exemplar) = struct_type {
            add(TemplateKind::StructType, exemplar, &["baseType/struct"]);
        }
        if let Some(exemplar) = data_type_with("baseType/enum/values") {
            add(TemplateKind::EnumType, exemplar, &["baseType/enum/values"]);
            if let Some(value) = source.subfind(exemplar, "baseType/enum/values/value") {
                add(TemplateKind::EnumValue, value, &[]);
            }
        }

        // Program organization units
        if let Some(exemplar) = source.child(pous, "pou") {
            add(TemplateKind::Pou, exemplar, &["interface", "body/ST/xhtml"]);
        }
        for (kind, name) in INTERFACE_LISTS {
            if let Some(exemplar) = source.subfind(pous, &format!("pou/interface/{}", name)) {
                add(kind, exemplar, &[]);
            }
        }

        // Variables are the same in every list, so any exemplar will do.
        let variable = struct_type
            .and_then(|st| source.subfind(st, "baseType/struct/variable"))
            .or_else(|| {
                INTERFACE_LISTS.iter().find_map(|(_, name)| {
                    source.subfind(pous, &format!("pou/interface/{}/variable", name))
                })
            });
        if let Some(exemplar) = variable {
            add(TemplateKind::Variable, exemplar, &["type"]);
        }

        // Global variables
        let add_data = document.find("/project/addData");
        let global_vars = add_data.and_then(|ad| source.subfind(ad, "data/globalVars"));
        if let (Some(add_data), Some(global_vars)) = (add_data, global_vars) {
            let id = templates.copy_from(source, global_vars);
            templates.retain_children(id, |child| child.name == "addData");
            for attribute in CONTENT_ATTRIBUTES {
                templates.remove_attribute(id, attribute);
            }
            exemplars.insert(TemplateKind::GlobalVars, id);

            // The global data keeps only the data element that holds the
            // global variables.
            let holder = source.parent(global_vars);
            let position = source
                .children(add_data)
                .iter()
                .position(|c| Some(*c) == holder);
            let id = templates.copy_from(source, add_data);
            let data = position.map(|pos| templates.children(id)[pos]);
            templates.retain_children(id, |_| false);
            if let Some(data) = data {
                templates.append(id, data);
                templates.remove_children(data);
            }
            exemplars.insert(TemplateKind::GlobalData, id);
        }

        // The skeleton of the output document
        let mut skeleton_tree = Tree::new();
        let skeleton_root = skeleton_tree.copy_from(source, document.root());
        let internal = || Diagnostic::internal_error(file!(), line!());
        let data_types = skeleton_tree
            .find(skeleton_root, "/project/types/dataTypes")
            .ok_or_else(internal)?;
        let pous = skeleton_tree
            .find(skeleton_root, "/project/types/pous")
            .ok_or_else(internal)?;
        skeleton_tree.remove_children(data_types);
        skeleton_tree.remove_children(pous);
        if let Some(add_data) = skeleton_tree.find(skeleton_root, "/project/addData") {
            skeleton_tree.detach(add_data);
        }

        Ok(Self {
            templates,
            exemplars,
            skeleton: skeleton_tree,
            skeleton_root,
            data_types,
            pous,
            file_id: document.file_id().clone(),
        })
    }

    /// Returns true when the exemplar document has an exemplar for the kind.
    pub fn has(&self, kind: TemplateKind) -> bool {
        self.exemplars.contains_key(&kind)
    }

    /// Creates an empty output project in the shape of the exemplar.
    pub fn new_project(&self) -> OutputProject {
        OutputProject::new(
            self.skeleton.clone(),
            self.skeleton_root,
            self.data_types,
            self.pous,
        )
    }

    /// Copies the template into the tree. The copy is not attached to any
    /// parent.
    pub fn instantiate(&self, kind: TemplateKind, tree: &mut Tree) -> Result<NodeId, Diagnostic> {
        let template = self.exemplars.get(&kind).ok_or_else(|| {
            Diagnostic::problem(
                Problem::TemplateMissing,
                Label::file(
                    self.file_id.clone(),
                    format!("Expected an exemplar {}", kind.location()),
                ),
            )
            .with_context("kind", &format!("{:?}", kind))
        })?;
        Ok(tree.copy_from(&self.templates, *template))
    }

    /// Replaces the content of the node with the type.
    pub fn populate_type(&self, tree: &mut Tree, node: NodeId, spec: &TypeSpec) {
        tree.remove_children(node);
        match spec {
            TypeSpec::Elementary(name) => type_element(tree, node, name),
            TypeSpec::String { width, length } => {
                let name = match width {
                    StringWidth::String => "string",
                    StringWidth::WString => "wstring",
                };
                let string = tree.create_child(node, name);
                if let Some(length) = length {
                    tree.set_attribute(string, "length", length);
                }
            }
            TypeSpec::Array(array) => {
                let element = tree.create_child(node, "array");
                for bound in &array.bounds {
                    let dimension = tree.create_child(element, "dimension");
                    tree.set_attribute(dimension, "lower", &bound.lower.to_string());
                    tree.set_attribute(dimension, "upper", &bound.upper.to_string());
                }
                let base_type = tree.create_child(element, "baseType");
                type_element(tree, base_type, &array.element);
            }
        }
    }

    /// Adds the initial value to the node. Array types have one value for
    /// each element of the bracketed list.
    ///
    /// The span is the location of the declaration that has the value.
    pub fn populate_initial_value(
        &self,
        tree: &mut Tree,
        node: NodeId,
        value: &str,
        spec: &TypeSpec,
        span: &SourceSpan,
    ) -> Result<(), Diagnostic> {
        if !spec.is_array() {
            check_not_struct_initializer(value, span)?;
            let initial = tree.create_child(node, "initialValue");
            let simple = tree.create_child(initial, "simpleValue");
            tree.set_attribute(simple, "value", value);
            return Ok(());
        }

        let elements = split_array_value(value).map_err(|message| {
            Diagnostic::problem(Problem::MalformedArrayInitializer, Label::span(span, message))
                .with_context("value", value)
        })?;
        for element in &elements {
            check_not_struct_initializer(element, span)?;
        }

        let initial = tree.create_child(node, "initialValue");
        let array = tree.create_child(initial, "arrayValue");
        for element in elements {
            let wrapper = tree.create_child(array, "value");
            let simple = tree.create_child(wrapper, "simpleValue");
            tree.set_attribute(simple, "value", element);
        }
        Ok(())
    }
}

/// Adds the element for a named type: elementary types are an element of
/// their own and other types are derived.
fn type_element(tree: &mut Tree, parent: NodeId, name: &str) {
    match ELEMENTARY_TYPES.get(name.to_ascii_uppercase().as_str()) {
        Some(element) => {
            tree.create_child(parent, element);
        }
        None => {
            let derived = tree.create_child(parent, "derived");
            tree.set_attribute(derived, "name", name);
        }
    }
}

/// Empties the element except for the descendants on the paths. The element
/// at the end of each path is emptied too.
fn skeleton(tree: &mut Tree, id: NodeId, keep: &[&str]) {
    let children = tree.children(id).to_vec();
    tree.remove_children(id);

    for child in children {
        let name = tree.name(child).to_string();
        let mut matched = false;
        let mut deeper = vec![];
        for &path in keep {
            let (first, rest) = path.split_once('/').unwrap_or((path, ""));
            if first == name {
                matched = true;
                if !rest.is_empty() {
                    deeper.push(rest);
                }
            }
        }
        if matched {
            tree.append(id, child);
            skeleton(tree, child, &deeper);
        }
    }
}

/// Structure initial values such as `(x := 1, y := 2)` have no mapping,
/// neither for a variable nor for an array element.
fn check_not_struct_initializer(value: &str, span: &SourceSpan) -> Result<(), Diagnostic> {
    if value.trim_start().starts_with('(') && value.contains(":=") {
        return Err(Diagnostic::problem(
            Problem::UnsupportedInitializer,
            Label::span(span, "Structure initial value"),
        )
        .with_context("value", value));
    }
    Ok(())
}

/// Splits an array value such as `[1, 2, 3]` into the elements.
fn split_array_value(value: &str) -> Result<Vec<&str>, &'static str> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or("Array value must be enclosed in '[' and ']'")?;

    let mut elements = vec![];
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '$' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | ']' => return Err("Nested array values are not supported"),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                elements.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    elements.push(inner[start..].trim());

    if elements.iter().any(|e| e.is_empty()) {
        return Err("Array value has an empty element");
    }
    Ok(elements)
}
