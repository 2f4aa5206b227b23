//! reference resolution
//!
//! [Resolver::resolve] dispatches on the namespace of a [Reference]:
//!
//! | **namespace** | **starting point**                     | **then**                          |
//! |---------------|----------------------------------------|-----------------------------------|
//! | `resource`    | `s3.buckets.<name>` or root `<category>` | generic descent                 |
//! | `netenv`      | `netenv.<name>.<env>.<region>`         | generic descent                   |
//! | `accounts`    | `accounts.<name>`                      | the account's own vocabulary      |
//! | `service`     | root `<service>`                       | descent into `applications`, else own vocabulary |
//! | `function`    | injected [FunctionProvider]            | memoized per execution context    |
//!
//! Generic descent follows container entries and node-holding fields for as long as the parts allow. The remaining
//! parts become [Reference::tail] and are handed to the target's [ReferenceTarget](crate::schema::ReferenceTarget).
//!
//! A field that still holds reference text, or a pending result of one, is resolved through that reference. This
//! keeps the outcome independent of the order deferred fields are resolved in. Circular chains are invalid.
//!
//! Values only known after provisioning come back as [Resolved::Pending]; before giving up the resolver consults the
//! [OutputSnapshot] at the full reference path, namespace included.
use crate::error::{Error, Result};
use crate::outputs::OutputSnapshot;
use crate::reference::{Namespace, Reference};
use crate::schema::SchemaRegistry;
use crate::tree::{FieldValue, NodeId, Tree};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Outcome of resolving a reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    Node(NodeId),
    /// the value exists only once the target has been provisioned
    Pending(Pending),
}

impl Resolved {
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolved::Pending(_))
    }
}

/// Placeholder for a value that is not known at load time
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    /// raw reference text
    pub reference: String,
    /// node the reference landed on, if any
    pub node: Option<NodeId>,
}

impl std::fmt::Display for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reference)
    }
}

/// Account and region a `function` reference is evaluated in
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_new::new)]
pub struct ExecutionContext {
    pub account: String,
    pub region: String,
}

/// Evaluates `function` references, e.g. looking up the latest machine image
pub trait FunctionProvider {
    fn call(&self, reference: &Reference, context: &ExecutionContext) -> Result<Value>;
}

// blanket impl for Fn
impl<F> FunctionProvider for F
where
    F: Fn(&Reference, &ExecutionContext) -> Result<Value>,
{
    fn call(&self, reference: &Reference, context: &ExecutionContext) -> Result<Value> {
        self(reference, context)
    }
}

/// Cache of `function` results, keyed by reference text and execution context
pub type FunctionMemo = HashMap<(String, ExecutionContext), Value>;

#[derive(derive_new::new)]
pub struct Resolver<'a> {
    schema: &'a SchemaRegistry,
    outputs: &'a OutputSnapshot,
    functions: Option<&'a dyn FunctionProvider>,
    execution_context: Option<&'a ExecutionContext>,
    memo: &'a mut FunctionMemo,
    /// references being resolved, outermost first
    #[new(default)]
    chain: Vec<String>,
}

#[derive(Clone, Copy)]
enum Cursor<'t> {
    Node(NodeId),
    Map(&'t IndexMap<String, NodeId>),
    Map2(&'t IndexMap<String, IndexMap<String, NodeId>>),
    List(&'t [NodeId]),
}

impl<'a> Resolver<'a> {
    pub fn resolve_text(&mut self, tree: &Tree, text: &str) -> Result<Resolved> {
        let mut reference = Reference::parse(text);
        self.resolve(tree, &mut reference)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(reference = %reference.raw))]
    pub fn resolve(&mut self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        if self.chain.contains(&reference.raw) {
            return Err(Error::invalid_reference(
                &reference.raw,
                format!("Circular reference: {} -> {}", self.chain.join(" -> "), reference.raw),
            ));
        }

        self.chain.push(reference.raw.clone());
        let resolved = self.resolve_in_chain(tree, reference);
        self.chain.pop();
        resolved
    }

    fn resolve_in_chain(&mut self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        if reference.namespace.is_known() {
            reference.check()?;
        }

        let resolved = match reference.namespace.clone() {
            Namespace::Resource => self.resolve_resource(tree, reference)?,
            Namespace::Netenv => self.resolve_netenv(tree, reference)?,
            Namespace::Accounts => self.resolve_account(tree, reference)?,
            Namespace::Service => self.resolve_service(tree, reference)?,
            Namespace::Function => self.resolve_function(reference)?,
            Namespace::Other(namespace) => return Err(Error::UnsupportedReferenceType(namespace)),
        };

        // the target field still waits on a reference of its own
        let resolved = match resolved {
            Resolved::Pending(pending) if pending.reference != reference.raw => {
                tracing::trace!(through = %pending.reference, "following reference");
                self.resolve_text(tree, &pending.reference)?
            }
            resolved => resolved,
        };
        reference.target = Some(resolved.clone());

        let Resolved::Pending(pending) = resolved else {
            tracing::trace!(?resolved, "resolved");
            return Ok(resolved);
        };

        match self.outputs.lookup(&reference.parts) {
            Some(value) => {
                tracing::debug!(reference = %reference.raw, %value, "resolved from outputs");
                Ok(Resolved::Value(value.clone()))
            }
            None => {
                tracing::debug!(reference = %reference.raw, "pending");
                Ok(Resolved::Pending(pending))
            }
        }
    }

    fn resolve_resource(&mut self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        let category = required_part(reference, 1)?;
        let start = root_child(tree, reference, category)?;

        if category != "s3" {
            return self.descend_to_target(tree, start, reference, 2);
        }

        if reference.part(2) != Some("buckets") {
            return Err(Error::invalid_reference(
                &reference.raw,
                "S3 references continue with 'buckets.<name>'",
            ));
        }
        let bucket_name = required_part(reference, 3)?;
        let bucket = match tree.node(start).field("buckets") {
            Some(FieldValue::Map(buckets)) => buckets.get(bucket_name).copied(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::invalid_reference(&reference.raw, format!("Unable to find bucket '{bucket_name}'"))
        })?;
        self.descend_to_target(tree, bucket, reference, 4)
    }

    fn resolve_netenv(&mut self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        let mut node = root_child(tree, reference, "netenv")?;
        for index in 1..=3 {
            let key = required_part(reference, index)?;
            node = tree.child(node, key).ok_or_else(|| {
                Error::invalid_reference(
                    &reference.raw,
                    format!("Unable to find '{key}' in '{}'", tree.display_path(node)),
                )
            })?;
        }
        self.descend_to_target(tree, node, reference, 4)
    }

    fn resolve_account(&self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        let accounts = root_child(tree, reference, "accounts")?;
        let name = required_part(reference, 1)?;
        let account = tree.child(accounts, name).ok_or_else(|| {
            Error::invalid_reference(&reference.raw, format!("Unable to find account '{name}'"))
        })?;
        reference.tail = reference.parts[2..].to_vec();
        self.local_ref(tree, account, reference)
    }

    fn resolve_service(&mut self, tree: &Tree, reference: &mut Reference) -> Result<Resolved> {
        let name = required_part(reference, 1)?;
        let service = root_child(tree, reference, name)?;

        if reference.part(4) == Some("applications") {
            return self.descend_to_target(tree, service, reference, 4);
        }
        reference.tail = reference.parts[2..].to_vec();
        self.local_ref(tree, service, reference)
    }

    fn resolve_function(&mut self, reference: &Reference) -> Result<Resolved> {
        let pending = || {
            Resolved::Pending(Pending {
                reference: reference.raw.clone(),
                node: None,
            })
        };
        let (Some(functions), Some(context)) = (self.functions, self.execution_context) else {
            tracing::debug!(reference = %reference.raw, "no function provider or execution context");
            return Ok(pending());
        };

        let key = (reference.raw.clone(), context.clone());
        if let Some(value) = self.memo.get(&key) {
            return Ok(Resolved::Value(value.clone()));
        }

        tracing::info!(reference = %reference.raw, account = %context.account, region = %context.region, "calling function");
        let value = functions.call(reference, context)?;
        self.memo.insert(key, value.clone());
        Ok(Resolved::Value(value))
    }

    /// Walk down from `start` consuming `reference.parts[index..]`, then let the node found complete the reference
    pub fn descend_to_target(
        &mut self,
        tree: &Tree,
        start: NodeId,
        reference: &mut Reference,
        index: usize,
    ) -> Result<Resolved> {
        let mut cursor = Cursor::Node(start);
        let mut index = index;

        while let Some(part) = reference.parts.get(index) {
            let next = match cursor {
                Cursor::Node(id) => {
                    let node = tree.node(id);
                    match node.child(part) {
                        Some(child) => Some(Cursor::Node(child)),
                        None => match node.field(part) {
                            Some(FieldValue::Node(child) | FieldValue::Link(child)) => {
                                Some(Cursor::Node(*child))
                            }
                            Some(FieldValue::Map(map)) => Some(Cursor::Map(map)),
                            Some(FieldValue::Map2(map)) => Some(Cursor::Map2(map)),
                            Some(FieldValue::List(list)) => Some(Cursor::List(list)),
                            Some(FieldValue::Pending(pending)) => {
                                self.follow(tree, &pending.reference)?.map(Cursor::Node)
                            }
                            None => match node.deferred.get(part.as_str()) {
                                Some(raw) => self.follow(tree, raw)?.map(Cursor::Node),
                                None => None,
                            },
                            // plain data ends the walk
                            Some(FieldValue::Value(_)) => None,
                        },
                    }
                }
                Cursor::Map(map) => map.get(part).copied().map(Cursor::Node),
                Cursor::Map2(map) => map.get(part).map(Cursor::Map),
                Cursor::List(list) => part
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| list.get(i))
                    .copied()
                    .map(Cursor::Node),
            };

            match next {
                Some(next) => {
                    cursor = next;
                    index += 1;
                }
                None => break,
            }
        }

        let Cursor::Node(target) = cursor else {
            let part = reference.part(index.saturating_sub(1)).unwrap_or_default();
            return Err(Error::invalid_reference(
                &reference.raw,
                format!("Reference ends inside the collection '{part}'"),
            ));
        };

        reference.tail = reference.parts[index.min(reference.parts.len())..].to_vec();
        tracing::trace!(target = %tree.display_path(target), tail = %reference.tail_text(), "descended");
        self.local_ref(tree, target, reference)
    }

    /// Node a deferred field leads to, if it leads to one
    fn follow(&mut self, tree: &Tree, raw: &str) -> Result<Option<NodeId>> {
        match self.resolve_text(tree, raw)? {
            Resolved::Node(id) => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    fn local_ref(&self, tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        let type_name = tree.node(node).type_name;
        let target = self.schema.target(type_name).ok_or_else(|| {
            Error::invalid_reference(
                &reference.raw,
                format!("Invalid reference for object type '{type_name}'"),
            )
        })?;
        target.resolve_local_ref(tree, node, reference)
    }
}

fn required_part<'r>(reference: &'r Reference, index: usize) -> Result<&'r str> {
    reference.part(index).ok_or_else(|| {
        Error::invalid_reference(&reference.raw, format!("Reference is missing part {index}"))
    })
}

fn root_child(tree: &Tree, reference: &Reference, key: &str) -> Result<NodeId> {
    tree.child(tree.root(), key).ok_or_else(|| {
        Error::invalid_reference(&reference.raw, format!("Unable to find '{key}' in the project"))
    })
}

/// Local reference vocabularies of the built-in types
pub mod targets {
    use super::{Pending, Resolved};
    use crate::error::{Error, Result};
    use crate::reference::Reference;
    use crate::tree::{FieldValue, NodeId, Tree};

    /// attributes only known once the resource exists
    const PROVISIONED: &[&str] = &["arn", "id", "url", "dns"];

    fn pending(reference: &Reference, node: NodeId) -> Resolved {
        Resolved::Pending(Pending {
            reference: reference.raw.clone(),
            node: Some(node),
        })
    }

    /// Current content of a field
    ///
    /// A field still waiting on its reference comes back pending on that reference.
    fn field_value(tree: &Tree, node: NodeId, name: &str) -> Option<Resolved> {
        let current = tree.node(node);
        let resolved = match current.field(name) {
            Some(FieldValue::Value(value)) => Resolved::Value(value.clone()),
            Some(FieldValue::Node(id) | FieldValue::Link(id)) => Resolved::Node(*id),
            Some(FieldValue::Pending(pending)) => Resolved::Pending(pending.clone()),
            Some(FieldValue::Map(_) | FieldValue::Map2(_) | FieldValue::List(_)) => Resolved::Node(node),
            None => Resolved::Pending(Pending {
                reference: current.deferred.get(name)?.clone(),
                node: Some(node),
            }),
        };
        Some(resolved)
    }

    fn unknown(tree: &Tree, node: NodeId, reference: &Reference) -> Error {
        Error::invalid_reference(
            &reference.raw,
            format!(
                "'{}' is not known to object type '{}'",
                reference.tail_text(),
                tree.node(node).type_name
            ),
        )
    }

    pub fn account(tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        let tail: Vec<&str> = reference.tail.iter().map(String::as_str).collect();
        let field = match tail.as_slice() {
            [] | ["id"] => "account_id",
            [field] => *field,
            _ => return Err(unknown(tree, node, reference)),
        };
        field_value(tree, node, field).ok_or_else(|| unknown(tree, node, reference))
    }

    pub fn network(tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        match reference.tail.as_slice() {
            [] => Ok(Resolved::Node(node)),
            [field] => field_value(tree, node, field).ok_or_else(|| unknown(tree, node, reference)),
            _ => Err(unknown(tree, node, reference)),
        }
    }

    pub fn vpc(_tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        match reference.tail.as_slice() {
            [] => Ok(Resolved::Node(node)),
            [part] if part == "vpc" => Ok(Resolved::Node(node)),
            _ => Ok(pending(reference, node)),
        }
    }

    pub fn private_hosted_zone(_tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        match reference.tail.as_slice() {
            [] => Ok(Resolved::Node(node)),
            [part] if part == "private_hosted_zone" => Ok(Resolved::Node(node)),
            _ => Ok(pending(reference, node)),
        }
    }

    pub fn segment(tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        match reference.tail.as_slice() {
            [] => Ok(Resolved::Node(node)),
            [cidr] if cidr.starts_with("az") && cidr.ends_with("_cidr") => {
                Ok(field_value(tree, node, cidr).unwrap_or_else(|| pending(reference, node)))
            }
            _ => Ok(pending(reference, node)),
        }
    }

    /// Provisioned resources: names once patched from outputs, identifiers only after provisioning
    pub fn resource(tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        let current = tree.node(node);
        let tail: Vec<&str> = reference.tail.iter().map(String::as_str).collect();

        match tail.as_slice() {
            [] => Ok(Resolved::Node(node)),
            ["name"] => Ok(current
                .str_value("resource_name")
                .map(|name| Resolved::Value(name.into()))
                .unwrap_or_else(|| pending(reference, node))),
            ["fullname"] => Ok(current
                .str_value("resource_fullname")
                .map(|name| Resolved::Value(name.into()))
                .unwrap_or_else(|| pending(reference, node))),
            [attribute] if PROVISIONED.contains(attribute) => Ok(pending(reference, node)),
            [field] => field_value(tree, node, field).ok_or_else(|| unknown(tree, node, reference)),
            _ => Err(unknown(tree, node, reference)),
        }
    }
}
