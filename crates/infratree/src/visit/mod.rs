//! visitor pattern helpers and the tree walker
//!
//! [enumerate] produces every node reachable from a start node in breadth-first order, looking only at what the
//! nodes hold and at schema metadata. All enrichment passes iterate its output, so they never need to know how a
//! particular type nests its children.
mod environment_refs;
mod visit_text;
pub(crate) use environment_refs::EnvironmentRefRewriter;
pub use visit_text::VisitTextMut;

use crate::schema::SchemaRegistry;
use crate::tree::{FieldValue, NodeId, Tree};
use std::collections::VecDeque;

/// Visitor that visits is subjects mutably
pub trait VisitMut<T> {
    fn visit_mut(&mut self, value: &mut T);
}

// blanket impl for FnMut
impl<T, F> VisitMut<T> for F
where
    F: FnMut(&mut T),
{
    fn visit_mut(&mut self, value: &mut T) {
        self(value)
    }
}

/// Every node reachable from `start`, breadth first
///
/// Per node the walk queues container entries, then single-object fields, then keyed mappings, then lists of
/// objects. Read-only list fields are computed data and are not walked.
pub fn enumerate(tree: &Tree, schema: &SchemaRegistry, start: NodeId) -> Vec<NodeId> {
    let mut queue = VecDeque::from([start]);
    let mut nodes = vec![];

    while let Some(id) = queue.pop_front() {
        nodes.push(id);
        let node = tree.node(id);

        if let Some(children) = &node.children {
            queue.extend(children.values().copied());
        }

        for field in node.fields.values() {
            if let FieldValue::Node(child) = field {
                queue.push_back(*child);
            }
        }

        for field in node.fields.values() {
            if let FieldValue::Map(_) | FieldValue::Map2(_) = field {
                queue.extend(field.owned_nodes());
            }
        }

        for (name, field) in &node.fields {
            let FieldValue::List(items) = field else {
                continue;
            };
            let read_only = schema
                .field(node.type_name, name)
                .is_some_and(|descriptor| descriptor.read_only);
            if !read_only {
                queue.extend(items.iter().copied());
            }
        }
    }

    tracing::trace!(start = %start, count = nodes.len(), "enumerated nodes");
    nodes
}

/// Run `visitor` on every node reachable from `start`
pub fn visit_nodes_mut(
    tree: &mut Tree,
    schema: &SchemaRegistry,
    start: NodeId,
    visitor: &mut dyn VisitMut<crate::tree::Node>,
) {
    for id in enumerate(tree, schema, start) {
        visitor.visit_mut(tree.node_mut(id));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog;
    use crate::tree::Slot;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn count_recursive(tree: &Tree, id: NodeId) -> usize {
        let node = tree.node(id);
        let children = node.children.iter().flat_map(|c| c.values().copied());
        let owned = node.fields.values().flat_map(FieldValue::owned_nodes);
        1 + children
            .chain(owned)
            .map(|child| count_recursive(tree, child))
            .sum::<usize>()
    }

    fn sample() -> Tree {
        let mut tree = Tree::new("Project", "demo");
        let root = tree.root();

        let s3 = tree.add_node(root, Slot::Child, "S3Resource", "s3", false);
        tree.insert_child(root, "s3", s3);
        let mut buckets = indexmap::IndexMap::new();
        for name in ["logs", "assets"] {
            let slot = Slot::Entry {
                field: "buckets".into(),
            };
            let bucket = tree.add_node(s3, slot, "S3Bucket", name, false);
            let policy = tree.add_node(
                bucket,
                Slot::Item {
                    field: "policy".into(),
                },
                "S3BucketPolicy",
                "0",
                false,
            );
            tree.node_mut(bucket)
                .fields
                .insert("policy".into(), FieldValue::List(vec![policy]));
            buckets.insert(name.to_string(), bucket);
        }
        tree.node_mut(s3)
            .fields
            .insert("buckets".into(), FieldValue::Map(buckets));

        let accounts = tree.add_node(root, Slot::Child, "Accounts", "accounts", true);
        tree.insert_child(root, "accounts", accounts);
        let master = tree.add_node(accounts, Slot::Child, "Account", "master", false);
        tree.insert_child(accounts, "master", master);
        tree
    }

    #[test]
    fn enumerates_everything_once() {
        let tree = sample();
        let schema = catalog::builtin();
        let nodes = enumerate(&tree, &schema, tree.root());
        assert_eq!(nodes.len(), count_recursive(&tree, tree.root()));
        assert_eq!(nodes.len(), tree.len());

        let mut unique = nodes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), nodes.len());
    }

    #[test]
    fn breadth_first_order() {
        let tree = sample();
        let schema = catalog::builtin();
        let paths: Vec<String> = enumerate(&tree, &schema, tree.root())
            .into_iter()
            .map(|id| tree.display_path(id))
            .collect();
        assert_eq!(
            paths,
            vec![
                ".",
                "s3",
                "accounts",
                "s3.buckets.logs",
                "s3.buckets.assets",
                "accounts.master",
                "s3.buckets.logs.policy.0",
                "s3.buckets.assets.policy.0",
            ]
        );
    }

    #[test]
    fn read_only_lists_are_skipped() {
        let mut tree = Tree::new("Project", "demo");
        let root = tree.root();
        let alarm = tree.add_node(root, Slot::Child, "CloudWatchAlarm", "cpu", false);
        tree.insert_child(root, "cpu", alarm);
        let stray = tree.add_node(alarm, Slot::Child, "Metric", "stray", false);
        tree.node_mut(alarm)
            .fields
            .insert("notification_groups".into(), FieldValue::List(vec![stray]));

        let schema = catalog::builtin();
        assert_eq!(enumerate(&tree, &schema, root), vec![root, alarm]);
    }

    #[test]
    fn visit_all_nodes() {
        let mut tree = sample();
        let schema = catalog::builtin();
        let root = tree.root();
        let mut visited = 0;
        visit_nodes_mut(&mut tree, &schema, root, &mut |node: &mut crate::tree::Node| {
            node.fields
                .insert("visited".into(), FieldValue::Value(Value::Boolean(true)));
            visited += 1;
        });
        assert_eq!(visited, tree.len());
        assert!(tree.iter().all(|(_, node)| node.value("visited").is_some()));
    }
}
