//! An owned, index based XML element tree.
//!
//! Elements live in an arena and refer to each other by [`NodeId`]. Removing
//! an element from its parent detaches it but leaves it in the arena, so
//! identifiers remain valid for the lifetime of the tree.

/// Identifies an element in a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug, Default)]
pub struct Element {
    /// The qualified name (including any prefix).
    pub name: String,
    /// Attributes in document order, including namespace declarations.
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Element>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Creates a new element that is not attached to any parent.
    pub fn create(&mut self, name: &str) -> NodeId {
        self.nodes.push(Element {
            name: name.to_string(),
            ..Default::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a new element and appends it to the parent.
    pub fn create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let child = self.create(name);
        self.append(parent, child);
        child
    }

    pub fn get(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.get(id).name
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets the attribute, replacing the value if the attribute exists and
    /// otherwise adding it after the existing attributes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attributes = &mut self.get_mut(id).attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.get_mut(id).attributes.retain(|(key, _)| key != name);
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.get_mut(id).text = Some(text.to_string());
    }

    /// Appends the child as the last child of the parent. The child is first
    /// detached from any current parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.get_mut(child).parent = Some(parent);
        self.get_mut(parent).children.push(child);
    }

    /// Removes the element from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.get_mut(id).parent.take() {
            self.get_mut(parent).children.retain(|c| *c != id);
        }
    }

    /// Removes all children and the text of the element.
    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.get_mut(id).children);
        for child in children {
            self.get_mut(child).parent = None;
        }
        self.get_mut(id).text = None;
    }

    /// Keeps only the children for which the predicate is true.
    pub fn retain_children<F>(&mut self, id: NodeId, mut keep: F)
    where
        F: FnMut(&Element) -> bool,
    {
        let children = self.get(id).children.clone();
        for child in children {
            if !keep(self.get(child)) {
                self.detach(child);
            }
        }
    }

    /// Returns the first child element with the name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .find(|c| self.name(**c) == name)
            .copied()
    }

    /// Finds an element by absolute path such as `/project/types/pous`. The
    /// first segment must be the name of the root.
    pub fn find(&self, root: NodeId, path: &str) -> Option<NodeId> {
        let mut segments = path.trim_start_matches('/').split('/');
        let first = segments.next()?;
        if self.name(root) != first {
            return None;
        }
        let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
        self.find_segments(root, &rest)
    }

    /// Finds an element by path relative to the node, such as
    /// `interface/inputVars`. The search is depth first and returns the
    /// first element that matches the complete path.
    pub fn subfind(&self, id: NodeId, path: &str) -> Option<NodeId> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.find_segments(id, &segments)
    }

    fn find_segments(&self, id: NodeId, segments: &[&str]) -> Option<NodeId> {
        let (first, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Some(id),
        };
        self.children(id)
            .iter()
            .filter(|c| self.name(**c) == *first)
            .find_map(|c| self.find_segments(*c, rest))
    }

    /// Copies the element and all descendants from the source tree into this
    /// tree. The copy has no parent.
    pub fn copy_from(&mut self, source: &Tree, id: NodeId) -> NodeId {
        let element = source.get(id);
        let copy = self.create(&element.name);
        {
            let target = self.get_mut(copy);
            target.attributes = element.attributes.clone();
            target.text = element.text.clone();
        }
        for child in &element.children {
            let child_copy = self.copy_from(source, *child);
            self.append(copy, child_copy);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let project = tree.create("project");
        let types = tree.create_child(project, "types");
        tree.create_child(types, "dataTypes");
        let pous = tree.create_child(types, "pous");
        let first = tree.create_child(pous, "pou");
        tree.set_attribute(first, "name", "first");
        let second = tree.create_child(pous, "pou");
        tree.set_attribute(second, "name", "second");
        let interface = tree.create_child(second, "interface");
        tree.create_child(interface, "inputVars");
        (tree, project)
    }

    #[test]
    fn find_when_absolute_path_then_element() {
        let (tree, project) = sample();

        let pous = tree.find(project, "/project/types/pous").unwrap();

        assert_eq!("pous", tree.name(pous));
        assert_eq!(2, tree.children(pous).len());
    }

    #[test]
    fn find_when_root_name_differs_then_none() {
        let (tree, project) = sample();

        assert_eq!(None, tree.find(project, "/other/types"));
    }

    #[test]
    fn subfind_when_first_branch_incomplete_then_searches_next() {
        let (tree, project) = sample();
        let pous = tree.find(project, "/project/types/pous").unwrap();

        let input = tree.subfind(pous, "pou/interface/inputVars").unwrap();
        let pou = tree.parent(tree.parent(input).unwrap()).unwrap();

        assert_eq!(Some("second"), tree.attribute(pou, "name"));
    }

    #[test]
    fn remove_children_when_has_children_then_empty_and_detached() {
        let (mut tree, project) = sample();
        let pous = tree.find(project, "/project/types/pous").unwrap();
        let first = tree.children(pous)[0];

        tree.remove_children(pous);

        assert!(tree.children(pous).is_empty());
        assert_eq!(None, tree.parent(first));
    }

    #[test]
    fn copy_from_when_subtree_then_deep_copy_with_new_ids() {
        let (source, project) = sample();
        let pous = source.find(project, "/project/types/pous").unwrap();
        let mut target = Tree::new();

        let copy = target.copy_from(&source, pous);

        assert_eq!(None, target.parent(copy));
        assert_eq!(2, target.children(copy).len());
        assert!(target.subfind(copy, "pou/interface/inputVars").is_some());
    }

    #[test]
    fn set_attribute_when_exists_then_replaced_in_place() {
        let mut tree = Tree::new();
        let node = tree.create("variable");
        tree.set_attribute(node, "name", "a");
        tree.set_attribute(node, "address", "%IX0.0");
        tree.set_attribute(node, "name", "b");

        assert_eq!(
            vec![
                (String::from("name"), String::from("b")),
                (String::from("address"), String::from("%IX0.0"))
            ],
            tree.get(node).attributes
        );
    }

    #[test]
    fn append_when_attached_elsewhere_then_moved() {
        let mut tree = Tree::new();
        let a = tree.create("a");
        let b = tree.create("b");
        let c = tree.create_child(a, "c");

        tree.append(b, c);

        assert!(tree.children(a).is_empty());
        assert_eq!(&[c], tree.children(b));
    }
}
