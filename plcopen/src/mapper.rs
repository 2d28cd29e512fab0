//! Maps parsed components onto elements created from the templates.
use log::{debug, trace, warn};
use st2plcopen_dsl::{
    diagnostic::{Diagnostic, Label},
    ir::{Component, ComponentKind, Field, FieldKind, Qualifiers, VarDecl},
};
use st2plcopen_problems::Problem;

use crate::{
    template::{TemplateKind, TemplateStore},
    tree::{NodeId, Tree},
    writer::OutputProject,
};

/// Creates the output document for the components.
///
/// Components are added in order: data types under `types/dataTypes`,
/// program organization units under `types/pous` and global variable lists
/// under the global data collection.
pub fn map_components(
    store: &TemplateStore,
    components: &[Component],
) -> Result<OutputProject, Diagnostic> {
    let mut mapper = Mapper {
        store,
        project: store.new_project(),
    };
    for component in components {
        mapper.component(component)?;
    }
    Ok(mapper.project)
}

struct Mapper<'a> {
    store: &'a TemplateStore,
    project: OutputProject,
}

impl Mapper<'_> {
    fn component(&mut self, component: &Component) -> Result<(), Diagnostic> {
        debug!("Map {} {}", component.kind.keyword(), component.name);

        match &component.kind {
            ComponentKind::Enum { values } => self.enum_type(component, values),
            ComponentKind::Type => self.struct_type(component),
            ComponentKind::FunctionBlock => self.pou(component, "functionBlock", None),
            ComponentKind::Program => self.pou(component, "program", None),
            ComponentKind::Function { return_type } => {
                self.pou(component, "function", Some(return_type))
            }
            ComponentKind::GlobalVars {
                qualifiers,
                variables,
            } => self.global_vars(component, qualifiers, variables),
        }
    }

    fn enum_type(&mut self, component: &Component, values: &[VarDecl]) -> Result<(), Diagnostic> {
        let tree = self.project.tree_mut();
        let node = self.store.instantiate(TemplateKind::EnumType, tree)?;
        tree.set_attribute(node, "name", &component.name);
        let list = tree
            .subfind(node, "baseType/enum/values")
            .ok_or_else(|| Diagnostic::internal_error(file!(), line!()))?;

        for value in values {
            let item = self.store.instantiate(TemplateKind::EnumValue, tree)?;
            if let Some(name) = &value.name {
                tree.set_attribute(item, "name", name);
            }
            if let Some(explicit) = &value.initial_value {
                tree.set_attribute(item, "value", explicit);
            }
            tree.append(list, item);
        }

        let data_types = self.project.data_types();
        self.project.tree_mut().append(data_types, node);
        Ok(())
    }

    fn struct_type(&mut self, component: &Component) -> Result<(), Diagnostic> {
        let layout = component.struct_field().ok_or_else(|| {
            Diagnostic::problem(
                Problem::UnsupportedTypeDeclaration,
                Label::span(&component.span, "Type has no structure layout"),
            )
            .with_context("type", &component.name)
        })?;

        let tree = self.project.tree_mut();
        let node = self.store.instantiate(TemplateKind::StructType, tree)?;
        tree.set_attribute(node, "name", &component.name);
        let members = tree
            .subfind(node, "baseType/struct")
            .ok_or_else(|| Diagnostic::internal_error(file!(), line!()))?;
        self.variables(members, &layout.variables)?;

        let data_types = self.project.data_types();
        self.project.tree_mut().append(data_types, node);
        Ok(())
    }

    fn pou(
        &mut self,
        component: &Component,
        pou_type: &str,
        return_type: Option<&VarDecl>,
    ) -> Result<(), Diagnostic> {
        let tree = self.project.tree_mut();
        let pou = self.store.instantiate(TemplateKind::Pou, tree)?;
        tree.set_attribute(pou, "name", &component.name);
        tree.set_attribute(pou, "pouType", pou_type);
        let interface = tree
            .child(pou, "interface")
            .ok_or_else(|| Diagnostic::internal_error(file!(), line!()))?;

        // The return type precedes the variable lists.
        if let Some(spec) = return_type.and_then(|rt| rt.spec.as_ref()) {
            let node = self.store.instantiate(TemplateKind::ReturnType, tree)?;
            self.store.populate_type(tree, node, spec);
            tree.append(interface, node);
        }

        for field in &component.fields {
            self.interface_list(interface, component, field)?;
        }

        if !component.body.is_empty() {
            let tree = self.project.tree_mut();
            let xhtml = tree
                .subfind(pou, "body/ST/xhtml")
                .ok_or_else(|| Diagnostic::internal_error(file!(), line!()))?;
            tree.set_text(xhtml, &component.body);
        }

        let pous = self.project.pous();
        self.project.tree_mut().append(pous, pou);
        Ok(())
    }

    fn interface_list(
        &mut self,
        interface: NodeId,
        component: &Component,
        field: &Field,
    ) -> Result<(), Diagnostic> {
        let kind = match field.kind {
            FieldKind::VarInput => TemplateKind::InputVars,
            FieldKind::VarOutput => TemplateKind::OutputVars,
            FieldKind::VarInOut => TemplateKind::InOutVars,
            FieldKind::VarTemp => TemplateKind::TempVars,
            FieldKind::Var => TemplateKind::LocalVars,
            FieldKind::Method | FieldKind::Struct => {
                warn!(
                    "{} section in {} has no interface list and is not converted",
                    field.kind.keyword(),
                    component.name
                );
                return Ok(());
            }
        };

        let tree = self.project.tree_mut();
        let list = self.store.instantiate(kind, tree)?;
        set_qualifiers(self.project.tree_mut(), list, &field.qualifiers);
        self.variables(list, &field.variables)?;
        self.project.tree_mut().append(interface, list);
        Ok(())
    }

    fn global_vars(
        &mut self,
        component: &Component,
        qualifiers: &Qualifiers,
        variables: &[VarDecl],
    ) -> Result<(), Diagnostic> {
        let tree = self.project.tree_mut();
        let list = self.store.instantiate(TemplateKind::GlobalVars, tree)?;
        tree.set_attribute(list, "name", &component.name);
        set_qualifiers(tree, list, qualifiers);

        // Variables go before the auxiliary data.
        let add_data = tree.child(list, "addData");
        if let Some(add_data) = add_data {
            tree.detach(add_data);
        }
        self.variables(list, variables)?;
        if let Some(add_data) = add_data {
            self.project.tree_mut().append(list, add_data);
        }

        let holder = self.project.global_data(self.store)?;
        self.project.tree_mut().append(holder, list);
        Ok(())
    }

    /// Appends one variable element for each declaration to the parent.
    fn variables(&mut self, parent: NodeId, variables: &[VarDecl]) -> Result<(), Diagnostic> {
        for variable in variables {
            let node = self.variable(variable)?;
            self.project.tree_mut().append(parent, node);
        }
        Ok(())
    }

    fn variable(&mut self, variable: &VarDecl) -> Result<NodeId, Diagnostic> {
        trace!("Map variable {:?}", variable.name);

        let tree = self.project.tree_mut();
        let node = self.store.instantiate(TemplateKind::Variable, tree)?;
        if let Some(name) = &variable.name {
            tree.set_attribute(node, "name", name);
        }
        if let Some(address) = &variable.address {
            tree.set_attribute(node, "address", address);
        }

        match &variable.spec {
            Some(spec) => {
                let type_node = match tree.child(node, "type") {
                    Some(type_node) => type_node,
                    None => tree.create_child(node, "type"),
                };
                self.store.populate_type(tree, type_node, spec);

                if let Some(value) = &variable.initial_value {
                    self.store
                        .populate_initial_value(tree, node, value, spec, &variable.span)?;
                }
            }
            None => {
                if let Some(type_node) = tree.child(node, "type") {
                    tree.detach(type_node);
                }
            }
        }

        Ok(node)
    }
}

fn set_qualifiers(tree: &mut Tree, list: NodeId, qualifiers: &Qualifiers) {
    let flags = [
        ("constant", qualifiers.constant),
        ("retain", qualifiers.retain),
        ("nonretain", qualifiers.non_retain),
        ("persistent", qualifiers.persistent),
    ];
    for (attribute, set) in flags {
        if set {
            tree.set_attribute(list, attribute, "true");
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use st2plcopen_dsl::core::FileId;
    use st2plcopen_dsl::ir::{Subrange, TypeSpec};

    use crate::schema::SchemaDocument;

    fn store() -> TemplateStore {
        let xml = st2plcopen_test::read_template();
        let document = SchemaDocument::parse(&xml, &FileId::from_string("ecockpit.xml")).unwrap();
        TemplateStore::load(&document).unwrap()
    }

    fn map(components: &[Component]) -> OutputProject {
        map_components(&store(), components).unwrap()
    }

    fn attr<'a>(project: &'a OutputProject, node: NodeId, name: &str) -> Option<&'a str> {
        project.tree().attribute(node, name)
    }

    fn only_child(project: &OutputProject, node: NodeId) -> NodeId {
        let children = project.tree().children(node);
        assert_eq!(1, children.len());
        children[0]
    }

    #[test]
    fn map_components_when_enum_then_data_type_with_values() {
        let mut green = VarDecl::bare("GREEN");
        green.initial_value = Some(String::from("2"));
        let component = Component::new(
            "Color",
            ComponentKind::Enum {
                values: vec![VarDecl::bare("RED"), green],
            },
        );

        let project = map(&[component]);

        let data_type = only_child(&project, project.data_types());
        assert_eq!(Some("Color"), attr(&project, data_type, "name"));
        let values = project
            .tree()
            .subfind(data_type, "baseType/enum/values")
            .unwrap();
        let items = project.tree().children(values);
        assert_eq!(2, items.len());
        assert_eq!(Some("RED"), attr(&project, items[0], "name"));
        assert_eq!(None, attr(&project, items[0], "value"));
        assert_eq!(Some("GREEN"), attr(&project, items[1], "name"));
        assert_eq!(Some("2"), attr(&project, items[1], "value"));
    }

    #[test]
    fn map_components_when_struct_then_data_type_with_members() {
        let component = Component::new("Point", ComponentKind::Type).with_fields(vec![Field::new(
            FieldKind::Struct,
            vec![
                VarDecl::typed("x", TypeSpec::elementary("REAL")).with_initial_value("1.5"),
                VarDecl::typed("y", TypeSpec::elementary("REAL")),
            ],
        )]);

        let project = map(&[component]);
        let tree = project.tree();

        let data_type = only_child(&project, project.data_types());
        let members = tree.subfind(data_type, "baseType/struct").unwrap();
        let variables = tree.children(members);
        assert_eq!(2, variables.len());
        assert_eq!(Some("x"), attr(&project, variables[0], "name"));
        assert!(tree.subfind(variables[0], "type/REAL").is_some());
        let simple = tree
            .subfind(variables[0], "initialValue/simpleValue")
            .unwrap();
        assert_eq!(Some("1.5"), attr(&project, simple, "value"));
        assert_eq!(None, tree.child(variables[1], "initialValue"));
    }

    #[test]
    fn map_components_when_type_without_struct_then_unsupported() {
        let component = Component::new("Speed", ComponentKind::Type);

        let result = map_components(&store(), &[component]);

        assert_eq!("P0003", result.unwrap_err().code);
    }

    #[test]
    fn map_components_when_function_then_return_type_first_and_body() {
        let component = Component::new(
            "Add",
            ComponentKind::Function {
                return_type: VarDecl::unnamed(TypeSpec::elementary("INT")),
            },
        )
        .with_fields(vec![Field::new(
            FieldKind::VarInput,
            vec![
                VarDecl::typed("a", TypeSpec::elementary("INT")),
                VarDecl::typed("b", TypeSpec::elementary("INT")),
            ],
        )])
        .with_body("Add := a+b;");

        let project = map(&[component]);
        let tree = project.tree();

        let pou = only_child(&project, project.pous());
        assert_eq!(Some("Add"), attr(&project, pou, "name"));
        assert_eq!(Some("function"), attr(&project, pou, "pouType"));
        let interface = tree.child(pou, "interface").unwrap();
        let lists: Vec<&str> = tree
            .children(interface)
            .iter()
            .map(|c| tree.name(*c))
            .collect();
        assert_eq!(vec!["returnType", "inputVars"], lists);
        assert!(tree.subfind(interface, "returnType/INT").is_some());
        let inputs = tree.child(interface, "inputVars").unwrap();
        assert_eq!(2, tree.children(inputs).len());
        let xhtml = tree.subfind(pou, "body/ST/xhtml").unwrap();
        assert_eq!(Some("Add := a+b;"), tree.text(xhtml));
    }

    #[test]
    fn map_components_when_function_block_then_lists_in_field_order() {
        let mut locals = Field::new(
            FieldKind::Var,
            vec![VarDecl::typed("count", TypeSpec::elementary("INT"))],
        );
        locals.qualifiers.retain = true;
        let component = Component::new("Motor", ComponentKind::FunctionBlock).with_fields(vec![
            Field::new(
                FieldKind::VarOutput,
                vec![VarDecl::typed("running", TypeSpec::elementary("BOOL"))],
            ),
            locals,
            Field::new(FieldKind::Method, vec![]),
        ]);

        let project = map(&[component]);
        let tree = project.tree();

        let pou = only_child(&project, project.pous());
        assert_eq!(Some("functionBlock"), attr(&project, pou, "pouType"));
        let interface = tree.child(pou, "interface").unwrap();
        let lists: Vec<&str> = tree
            .children(interface)
            .iter()
            .map(|c| tree.name(*c))
            .collect();
        assert_eq!(vec!["outputVars", "localVars"], lists);
        let local_vars = tree.child(interface, "localVars").unwrap();
        assert_eq!(Some("true"), attr(&project, local_vars, "retain"));
        assert_eq!(None, attr(&project, local_vars, "constant"));
    }

    #[test]
    fn map_components_when_array_variable_then_dimension_and_values() {
        let component = Component::new("Main", ComponentKind::Program).with_fields(vec![Field::new(
            FieldKind::Var,
            vec![
                VarDecl::typed("x", TypeSpec::array(vec![Subrange::new(0, 2)], "INT"))
                    .with_initial_value("[1,2,3]"),
            ],
        )]);

        let project = map(&[component]);
        let tree = project.tree();

        let pou = only_child(&project, project.pous());
        let variable = tree.subfind(pou, "interface/localVars/variable").unwrap();
        let dimension = tree.subfind(variable, "type/array/dimension").unwrap();
        assert_eq!(Some("0"), attr(&project, dimension, "lower"));
        assert_eq!(Some("2"), attr(&project, dimension, "upper"));
        assert!(tree.subfind(variable, "type/array/baseType/INT").is_some());
        let values = tree
            .subfind(variable, "initialValue/arrayValue")
            .unwrap();
        let entries: Vec<Option<&str>> = tree
            .children(values)
            .iter()
            .map(|v| {
                let simple = tree.child(*v, "simpleValue").unwrap();
                tree.attribute(simple, "value")
            })
            .collect();
        assert_eq!(vec![Some("1"), Some("2"), Some("3")], entries);
    }

    #[test]
    fn map_components_when_struct_initializer_then_unsupported() {
        let component = Component::new("Main", ComponentKind::Program).with_fields(vec![Field::new(
            FieldKind::Var,
            vec![VarDecl::typed("p", TypeSpec::elementary("Point")).with_initial_value("(x := 1)")],
        )]);

        let result = map_components(&store(), &[component]);

        assert_eq!("P0009", result.unwrap_err().code);
    }

    #[test]
    fn map_components_when_array_of_struct_initializers_then_unsupported() {
        let points = TypeSpec::array(vec![Subrange::new(0, 1)], "Point");
        let component = Component::new("Main", ComponentKind::Program).with_fields(vec![Field::new(
            FieldKind::Var,
            vec![VarDecl::typed("a", points).with_initial_value("[(x := 1), (x := 2)]")],
        )]);

        let result = map_components(&store(), &[component]);

        let err = result.unwrap_err();
        assert_eq!("P0009", err.code);
        assert!(err.description().contains("value=(x := 1)"));
    }

    #[test]
    fn map_components_when_located_variable_then_address() {
        let component = Component::new("Main", ComponentKind::Program).with_fields(vec![Field::new(
            FieldKind::VarInput,
            vec![VarDecl::typed("start", TypeSpec::elementary("BOOL")).with_address("%IX0.0")],
        )]);

        let project = map(&[component]);

        let variable = project
            .tree()
            .subfind(project.pous(), "pou/interface/inputVars/variable")
            .unwrap();
        assert_eq!(Some("%IX0.0"), attr(&project, variable, "address"));
    }

    #[test]
    fn map_components_when_two_global_lists_then_one_collection() {
        let qualifiers = Qualifiers {
            constant: true,
            ..Default::default()
        };
        let first = Component::new(
            "globalVars_0",
            ComponentKind::GlobalVars {
                qualifiers,
                variables: vec![VarDecl::typed("limit", TypeSpec::elementary("INT"))
                    .with_initial_value("10")],
            },
        );
        let second = Component::new(
            "globalVars_1",
            ComponentKind::GlobalVars {
                qualifiers: Qualifiers::default(),
                variables: vec![VarDecl::typed("alarm", TypeSpec::elementary("BOOL"))],
            },
        );

        let project = map(&[first, second]);
        let tree = project.tree();

        let add_data = tree.find(project.root(), "/project/addData").unwrap();
        let data = only_child(&project, add_data);
        let lists = tree.children(data);
        assert_eq!(2, lists.len());
        assert_eq!(Some("globalVars_0"), attr(&project, lists[0], "name"));
        assert_eq!(Some("true"), attr(&project, lists[0], "constant"));
        assert_eq!(Some("globalVars_1"), attr(&project, lists[1], "name"));
        assert_eq!(None, attr(&project, lists[1], "constant"));
        let first_children: Vec<&str> = tree
            .children(lists[0])
            .iter()
            .map(|c| tree.name(*c))
            .collect();
        assert_eq!(vec!["variable", "addData"], first_children);
    }

    #[test]
    fn map_components_when_no_global_lists_then_no_add_data() {
        let project = map(&[Component::new("Main", ComponentKind::Program)]);

        assert_eq!(None, project.tree().find(project.root(), "/project/addData"));
    }

    #[test]
    fn map_components_when_parsed_resource_then_writes_xml() {
        let source = st2plcopen_test::read_shared_resource("conveyor.st");
        let components =
            st2plcopen_parser::parse_program(&source, &FileId::from_string("conveyor.st")).unwrap();

        let xml = map(&components).to_xml().unwrap();

        assert!(xml.contains("<pou name=\"Conveyor\" pouType=\"functionBlock\">"));
        assert!(xml.contains("<pou name=\"Clamp\" pouType=\"function\">"));
        assert!(xml.contains("<dataType name=\"Mode\">"));
        assert!(xml.contains("<globalVars name=\"globalVars_0\""));
    }
}
