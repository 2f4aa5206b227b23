//! provisioning outputs
//!
//! After a deployment the provisioning side records what it created under `Outputs/`, one document per namespace,
//! mirroring reference paths from the namespace on. Known values are leaves of the form `{__name__: <value>}`:
//!
//! ```yaml
//! # Outputs/netenv.yaml
//! netenv:
//!   mynet:
//!     prod:
//!       us-west-2:
//!         network:
//!           vpc:
//!             id:
//!               __name__: vpc-0123
//! ```
//!
//! Global resources and services sit directly below the project root, so their recorded paths start with `resource`
//! or `service` in front of the tree path:
//!
//! ```yaml
//! # Outputs/resource.yaml
//! resource:
//!   s3:
//!     buckets:
//!       logs:
//!         name:
//!           __name__: demo-logs-a1b2
//! ```
//!
//! The snapshot is read-only during a load. It fills in pending references and patches `resource_name` /
//! `resource_fullname` back into the tree.
use crate::documents::ProjectDocuments;
use crate::error::Result;
use crate::merge::merge;
use crate::schema::SchemaRegistry;
use crate::tree::{FieldValue, NodeId, Tree};
use crate::value::Value;
use crate::visit;

/// Key of an output leaf
pub const NAME_KEY: &str = "__name__";

#[derive(Debug, Default, Clone)]
pub struct OutputSnapshot {
    root: Value,
}

impl OutputSnapshot {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Every document of the `Outputs` directory, merged in file name order
    pub fn load(documents: &mut ProjectDocuments) -> Result<Self> {
        let mut root = Value::Null;
        for document in documents.load_directory("Outputs")? {
            root = merge(&root, &document.value);
        }
        Ok(Self { root })
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// First output leaf met while walking down `parts`
    pub fn lookup(&self, parts: &[String]) -> Option<&Value> {
        let mut current = &self.root;
        for part in parts {
            current = current.get(part)?;
            if let Some(value) = leaf(current) {
                return Some(value);
            }
        }
        None
    }

    /// Value stored exactly at `path`, leaf or not
    pub fn get(&self, path: &[String]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.root, |current, part| current.get(part))
    }
}

/// `{__name__: value}` and nothing else
fn leaf(value: &Value) -> Option<&Value> {
    let object = value.as_object()?;
    match (object.len(), object.get(NAME_KEY)) {
        (1, Some(value)) => Some(value),
        _ => None,
    }
}

fn name_at<'v>(value: &'v Value, key: Option<&str>) -> Option<&'v Value> {
    let value = match key {
        Some(key) => value.get(key)?,
        None => value,
    };
    value.get(NAME_KEY)
}

/// Snapshot paths a node's outputs may be recorded under
fn recorded_paths(tree: &Tree, id: NodeId) -> Vec<Vec<String>> {
    let path = tree.path(id);
    let Some(top) = path.first() else {
        return vec![];
    };
    if matches!(top.as_str(), "netenv" | "accounts") {
        return vec![path];
    }

    ["resource", "service"]
        .into_iter()
        .map(|namespace| {
            std::iter::once(namespace.to_string())
                .chain(path.iter().cloned())
                .collect()
        })
        .collect()
}

/// Copy recorded names onto the nodes they belong to
///
/// Only types that declare `resource_name` / `resource_fullname` are touched. Returns how many fields were set.
#[tracing::instrument(level = "trace", skip_all)]
pub fn patch_outputs(tree: &mut Tree, schema: &SchemaRegistry, snapshot: &OutputSnapshot) -> usize {
    if snapshot.is_empty() {
        return 0;
    }

    let mut patched = 0;
    for id in visit::enumerate(tree, schema, tree.root()) {
        let type_name = tree.node(id).type_name;
        let paths = recorded_paths(tree, id);
        let Some(recorded) = paths.iter().find_map(|path| snapshot.get(path)) else {
            continue;
        };

        let name = name_at(recorded, None).or_else(|| name_at(recorded, Some("name")));
        let fullname = name_at(recorded, Some("fullname"));

        for (field, value) in [("resource_name", name), ("resource_fullname", fullname)] {
            let Some(value) = value else {
                continue;
            };
            if !schema.has_field(type_name, field) {
                continue;
            }

            tracing::debug!(node = %tree.display_path(id), field, %value, "patched from outputs");
            tree.node_mut(id)
                .fields
                .insert(field.to_string(), FieldValue::Value(value.clone()));
            patched += 1;
        }
    }

    patched
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog;
    use crate::tree::Slot;
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    fn parts(text: &str) -> Vec<String> {
        text.split('.').map(str::to_string).collect()
    }

    #[test]
    fn lookup_stops_at_first_leaf() {
        let snapshot = OutputSnapshot::from_value(yaml(
            "resource:\n  s3:\n    buckets:\n      logs:\n        name:\n          __name__: demo-logs",
        ));
        assert_eq!(
            snapshot.lookup(&parts("resource.s3.buckets.logs.name")),
            Some(&Value::from("demo-logs"))
        );
        assert_eq!(
            snapshot.lookup(&parts("resource.s3.buckets.logs.name.extra")),
            Some(&Value::from("demo-logs"))
        );
        assert_eq!(snapshot.lookup(&parts("resource.s3.buckets.logs")), None);
        assert_eq!(snapshot.lookup(&parts("resource.s3.buckets.other")), None);
        assert_eq!(snapshot.lookup(&parts("s3.buckets.logs.name")), None);
    }

    #[test]
    fn leaf_needs_to_be_alone() {
        let snapshot = OutputSnapshot::from_value(yaml("a:\n  __name__: x\n  other: y"));
        assert_eq!(snapshot.lookup(&parts("a")), None);
    }

    #[test]
    fn patches_declared_fields_only() {
        let schema = catalog::builtin();
        let mut tree = Tree::new("Project", "demo");
        let root = tree.root();
        let s3 = tree.add_node(root, Slot::Child, "S3Resource", "s3", false);
        tree.insert_child(root, "s3", s3);
        let logs = tree.add_node(
            s3,
            Slot::Entry {
                field: "buckets".into(),
            },
            "S3Bucket",
            "logs",
            false,
        );
        tree.node_mut(s3).fields.insert(
            "buckets".into(),
            FieldValue::Map([("logs".to_string(), logs)].into_iter().collect()),
        );

        let snapshot = OutputSnapshot::from_value(yaml(
            r#"
resource:
  s3:
    __name__: not-a-resource
    buckets:
      logs:
        name: {__name__: demo-logs}
        fullname: {__name__: arn-ish/demo-logs}
"#,
        ));

        assert_eq!(patch_outputs(&mut tree, &schema, &snapshot), 2);
        assert_eq!(tree.node(logs).str_value("resource_name"), Some("demo-logs"));
        assert_eq!(
            tree.node(logs).str_value("resource_fullname"),
            Some("arn-ish/demo-logs")
        );
        assert_eq!(tree.node(s3).value("resource_name"), None);
    }
}
