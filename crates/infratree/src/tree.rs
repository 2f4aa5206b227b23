//! Arena of configuration nodes
//!
//! Nodes are owned by [Tree] and addressed with [NodeId]. Ownership only runs top-down: a parent refers to its
//! children through [FieldValue]s or its container entries, a child refers back through [Node::parent], which is a
//! plain index and never keeps anything alive.
//!
//! Every node knows how it hangs off its parent ([Slot]); that is what makes reference paths mirror the documents:
//!
//! | **slot**   | **path segments**           | **example**                              |
//! |------------|-----------------------------|------------------------------------------|
//! | `Child`    | `name`                      | `netenv.mynet`                           |
//! | `Field`    | `name` (the owning field)   | `network.vpc`                            |
//! | `Entry`    | `field.name`                | `vpc.segments.public`                    |
//! | `Entry2`   | `field.group.name`          | `vpc.security_groups.app.lb`             |
//! | `Item`     | `field.index`               | `lb.ingress.0`                           |
use crate::reference::SENTINEL;
use crate::resolve::Pending;
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a node is attached to its parent
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Root,
    /// entry of the parent's container
    Child,
    /// single-object field, the node is named after the field
    Field,
    /// value of a keyed mapping field
    Entry { field: String },
    /// value of a two-level keyed mapping field
    Entry2 { field: String, group: String },
    /// element of a list-of-objects field
    Item { field: String },
}

/// Content of a node field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// plain data
    Value(Value),
    /// owned single child
    Node(NodeId),
    /// owned children keyed by name
    Map(IndexMap<String, NodeId>),
    /// owned children keyed by group and name
    Map2(IndexMap<String, IndexMap<String, NodeId>>),
    /// owned children in order
    List(Vec<NodeId>),
    /// resolved reference to a node elsewhere in the tree, not owned
    Link(NodeId),
    /// resolved reference whose value is not known yet
    Pending(Pending),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Owned child nodes in this field, in order
    pub fn owned_nodes(&self) -> Vec<NodeId> {
        match self {
            FieldValue::Node(id) => vec![*id],
            FieldValue::Map(map) => map.values().copied().collect(),
            FieldValue::Map2(map) => map.values().flat_map(|m| m.values().copied()).collect(),
            FieldValue::List(list) => list.clone(),
            FieldValue::Value(_) | FieldValue::Link(_) | FieldValue::Pending(_) => vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    /// schema type, see [crate::schema::SchemaRegistry]
    pub type_name: &'static str,
    /// identifier, unique among siblings
    pub name: String,
    /// display label, independent of identity
    pub title: String,
    pub parent: Option<NodeId>,
    pub slot: Slot,
    /// `Some` for container nodes
    pub children: Option<IndexMap<String, NodeId>>,
    pub fields: IndexMap<String, FieldValue>,
    /// reference text of fields that still wait for the resolution pass
    pub deferred: IndexMap<String, String>,
    /// pre-merge values of overridden keys, diagnostics only
    pub base: Map,
    /// document this node was built from
    pub source: Option<PathBuf>,
}

impl Node {
    pub fn child(&self, key: &str) -> Option<NodeId> {
        self.children.as_ref().and_then(|c| c.get(key).copied())
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.field(name).and_then(FieldValue::as_value)
    }

    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// New tree with a container root
    pub fn new(root_type: &'static str, root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                type_name: root_type,
                name: root_name.into(),
                title: String::new(),
                parent: None,
                slot: Slot::Root,
                children: Some(IndexMap::new()),
                fields: IndexMap::new(),
                deferred: IndexMap::new(),
                base: Map::new(),
                source: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Allocate a node below `parent`
    ///
    /// The node is not reachable until the caller stores it in the parent (see [Tree::insert_child] or
    /// [FieldValue]).
    pub fn add_node(
        &mut self,
        parent: NodeId,
        slot: Slot,
        type_name: &'static str,
        name: impl Into<String>,
        container: bool,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let source = self.nodes[parent.0].source.clone();
        self.nodes.push(Node {
            type_name,
            name: name.into(),
            title: String::new(),
            parent: Some(parent),
            slot,
            children: container.then(IndexMap::new),
            fields: IndexMap::new(),
            deferred: IndexMap::new(),
            base: Map::new(),
            source,
        });
        id
    }

    /// Store `child` in the container of `parent`
    ///
    /// Returns the previous entry if `parent` already had a child named `key`.
    pub fn insert_child(&mut self, parent: NodeId, key: &str, child: NodeId) -> Option<NodeId> {
        let children = self.nodes[parent.0]
            .children
            .get_or_insert_with(IndexMap::new);
        children.insert(key.to_string(), child)
    }

    pub fn child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.node(parent).child(key)
    }

    /// Path segments from the root to `id`, the root itself contributes nothing
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut segments: Vec<String> = vec![];
        let mut current = id;

        while let Some(parent) = self.node(current).parent {
            let node = self.node(current);
            match &node.slot {
                Slot::Root => {}
                Slot::Child | Slot::Field => segments.push(node.name.clone()),
                Slot::Entry { field } => {
                    segments.push(node.name.clone());
                    segments.push(field.clone());
                }
                Slot::Entry2 { field, group } => {
                    segments.push(node.name.clone());
                    segments.push(group.clone());
                    segments.push(field.clone());
                }
                Slot::Item { field } => {
                    let index = match self.node(parent).field(field) {
                        Some(FieldValue::List(items)) => items.iter().position(|i| *i == current),
                        _ => None,
                    };
                    segments.push(index.map(|i| i.to_string()).unwrap_or_else(|| node.name.clone()));
                    segments.push(field.clone());
                }
            }
            current = parent;
        }

        segments.reverse();
        segments
    }

    /// Dotted path of a node, `.` for the root
    pub fn display_path(&self, id: NodeId) -> String {
        let path = self.path(id);
        if path.is_empty() {
            ".".to_string()
        } else {
            path.join(".")
        }
    }

    /// Reference text pointing at this node
    pub fn reference(&self, id: NodeId) -> String {
        format!("{SENTINEL} {}", self.path(id).join("."))
    }

    /// Nearest ancestor (or the node itself) satisfying `predicate`
    pub fn find_ancestor(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            if predicate(self.node(candidate)) {
                return Some(candidate);
            }
            current = self.node(candidate).parent;
        }
        None
    }

    /// Nearest ancestor of the given schema type
    pub fn ancestor_of_type(&self, id: NodeId, type_name: &str) -> Option<NodeId> {
        self.find_ancestor(id, |node| node.type_name == type_name)
    }

    /// A node is enabled unless it, or anything above it, says `enabled: false`
    ///
    /// Nodes without an `enabled` field inherit from above; the node itself must carry `enabled: true`.
    pub fn is_enabled(&self, id: NodeId) -> bool {
        if self.node(id).value("enabled").and_then(Value::as_bool) != Some(true) {
            return false;
        }

        self.find_ancestor(id, |node| {
            node.value("enabled").and_then(Value::as_bool) == Some(false)
        })
        .is_none()
    }

    /// Follow container entries and node-holding fields by name
    ///
    /// Convenience lookup for callers that know the tree layout; reference resolution has its own rules.
    pub fn lookup(&self, path: &[&str]) -> Option<NodeId> {
        let mut current = self.root();
        let mut parts = path.iter();

        while let Some(part) = parts.next() {
            if let Some(child) = self.child(current, part) {
                current = child;
                continue;
            }

            current = match self.node(current).field(part)? {
                FieldValue::Node(id) => *id,
                FieldValue::Map(map) => *map.get(*parts.next()?)?,
                FieldValue::Map2(map) => {
                    let group = map.get(*parts.next()?)?;
                    *group.get(*parts.next()?)?
                }
                FieldValue::List(list) => {
                    let index: usize = parts.next()?.parse().ok()?;
                    *list.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Nested document view of a node and everything it owns
    pub fn to_value(&self, id: NodeId) -> Value {
        let node = self.node(id);
        let mut object = Map::new();

        if !node.title.is_empty() {
            object.insert("title".to_string(), node.title.clone().into());
        }

        for (name, field) in &node.fields {
            let value: Value = match field {
                FieldValue::Value(value) => value.clone(),
                FieldValue::Node(child) => self.to_value(*child),
                FieldValue::Map(map) => map
                    .iter()
                    .map(|(key, child)| (key, self.to_value(*child)))
                    .collect(),
                FieldValue::Map2(map) => map
                    .iter()
                    .map(|(group, inner)| {
                        let inner: Value = inner
                            .iter()
                            .map(|(key, child)| (key, self.to_value(*child)))
                            .collect();
                        (group, inner)
                    })
                    .collect(),
                FieldValue::List(list) => {
                    Value::Array(list.iter().map(|child| self.to_value(*child)).collect())
                }
                FieldValue::Link(target) => self.reference(*target).into(),
                FieldValue::Pending(pending) => pending.to_string().into(),
            };
            object.insert(name.clone(), value);
        }

        for (name, raw) in &node.deferred {
            object
                .entry(name.clone())
                .or_insert_with(|| raw.clone().into());
        }

        if let Some(children) = &node.children {
            for (key, child) in children {
                object.insert(key.clone(), self.to_value(*child));
            }
        }

        Value::Object(object)
    }

    /// One line per node: dotted path and schema type, sorted by path
    pub fn outline(&self) -> String {
        let mut lines: Vec<String> = self
            .iter()
            .map(|(id, node)| format!("{} {}", self.display_path(id), node.type_name))
            .collect();
        lines.sort();
        lines.join("\n")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("Project", "demo");
        let root = tree.root();
        let netenvs = tree.add_node(root, Slot::Child, "NetworkEnvironments", "netenv", true);
        tree.insert_child(root, "netenv", netenvs);

        let vpc = tree.add_node(netenvs, Slot::Field, "Vpc", "vpc", false);
        tree.node_mut(netenvs)
            .fields
            .insert("vpc".into(), FieldValue::Node(vpc));

        let lb = tree.add_node(
            vpc,
            Slot::Entry2 {
                field: "security_groups".into(),
                group: "app".into(),
            },
            "SecurityGroup",
            "lb",
            false,
        );
        let rule = tree.add_node(
            lb,
            Slot::Item {
                field: "ingress".into(),
            },
            "IngressRule",
            "0",
            false,
        );
        tree.node_mut(lb)
            .fields
            .insert("ingress".into(), FieldValue::List(vec![rule]));
        tree.node_mut(vpc).fields.insert(
            "security_groups".into(),
            FieldValue::Map2(IndexMap::from([(
                "app".to_string(),
                IndexMap::from([("lb".to_string(), lb)]),
            )])),
        );

        (tree, vpc, lb, rule)
    }

    #[test]
    fn paths_follow_slots() {
        let (tree, vpc, lb, rule) = sample();
        assert_eq!(tree.display_path(tree.root()), ".");
        assert_eq!(tree.path(vpc), vec!["netenv", "vpc"]);
        assert_eq!(
            tree.display_path(lb),
            "netenv.vpc.security_groups.app.lb"
        );
        assert_eq!(
            tree.reference(rule),
            format!("{SENTINEL} netenv.vpc.security_groups.app.lb.ingress.0")
        );
    }

    #[test]
    fn lookup_mirrors_path() {
        let (tree, _vpc, lb, rule) = sample();
        assert_eq!(
            tree.lookup(&["netenv", "vpc", "security_groups", "app", "lb"]),
            Some(lb)
        );
        assert_eq!(
            tree.lookup(&["netenv", "vpc", "security_groups", "app", "lb", "ingress", "0"]),
            Some(rule)
        );
        assert_eq!(tree.lookup(&["netenv", "nope"]), None);
    }

    #[test]
    fn enabled_is_inherited_downwards() {
        let (mut tree, vpc, lb, _rule) = sample();
        assert!(!tree.is_enabled(lb));

        tree.node_mut(lb)
            .fields
            .insert("enabled".into(), FieldValue::Value(true.into()));
        assert!(tree.is_enabled(lb));

        tree.node_mut(vpc)
            .fields
            .insert("enabled".into(), FieldValue::Value(false.into()));
        assert!(!tree.is_enabled(lb));
    }

    #[test]
    fn ancestors() {
        let (tree, vpc, _lb, rule) = sample();
        assert_eq!(tree.ancestor_of_type(rule, "Vpc"), Some(vpc));
        assert_eq!(tree.ancestor_of_type(rule, "Account"), None);
    }
}
