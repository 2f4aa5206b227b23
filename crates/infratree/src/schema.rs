//! schema registry
//!
//! Static description of every node type: which fields it has, how each field is coerced and validated, and how
//! nested objects are constructed. The loader, the walker and the resolver only ever ask this registry; none of them
//! know about concrete types.
//!
//! Fields are declared on **capabilities** (named, reusable field sets that may extend other capabilities) and on the
//! types themselves. A type's effective field set is the union over [SchemaRegistry::most_specific_capabilities],
//! where the first declaration of a field name wins.
use crate::error::{Result, ValidationError};
use crate::reference::Reference;
use crate::resolve::Resolved;
use crate::tree::{NodeId, Tree};
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

pub type Validator = fn(&Value) -> std::result::Result<(), ValidationError>;
pub type Invariant = fn(&Tree, NodeId) -> std::result::Result<(), ValidationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// text loaded from a file, relative to the document being read
    FileReference,
    /// `a, b, c` or a list, stored as a list of text
    CommaList,
    Integer,
    Float,
    Boolean,
    List,
    Dict,
    Object,
    /// reference text; `str_ok` also admits plain text
    Reference { str_ok: bool },
}

impl FieldKind {
    /// Kinds that may be backed by a construction [Strategy]
    pub fn is_structural(&self) -> bool {
        matches!(self, FieldKind::List | FieldKind::Dict | FieldKind::Object)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub required: bool,
    pub validator: Option<Validator>,
    /// computed by enrichment passes, never walked or set from documents by the walker
    pub read_only: bool,
}

/// Start a field declaration
pub fn field(name: &'static str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        default: None,
        required: false,
        validator: None,
        read_only: false,
    }
}

impl FieldDescriptor {
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Check the shape of a coerced value against the declared kind
    pub fn check_kind(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        let ok = match self.kind {
            FieldKind::Text | FieldKind::FileReference => matches!(value, Value::String(_)),
            FieldKind::CommaList | FieldKind::List => matches!(value, Value::Array(_)),
            FieldKind::Integer => matches!(value, Value::Integer(_)),
            FieldKind::Float => matches!(value, Value::Decimal(_) | Value::Integer(_)),
            FieldKind::Boolean => matches!(value, Value::Boolean(_)),
            FieldKind::Dict | FieldKind::Object => matches!(value, Value::Object(_)),
            FieldKind::Reference { str_ok } => match value {
                Value::String(text) => str_ok || crate::reference::is_reference(text),
                _ => false,
            },
        };

        if ok {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "expected {:?}, found {}",
                self.kind,
                value.kind()
            )))
        }
    }
}

/// How a structural field turns its config into child nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// one child, named after the field
    Object(&'static str),
    /// mapping of name to child
    NamedMap(&'static str),
    /// ordered children, named by index
    ObjectList(&'static str),
    /// mapping of group to name to child
    TwoLevelMap(&'static str),
    /// one container child named after the field, holding the items by name
    Container {
        container: &'static str,
        item: &'static str,
    },
    /// like [Strategy::Container], the item type is selected by the item's `type:` in `registry`
    Discriminated {
        container: &'static str,
        registry: &'static str,
    },
    /// list of scalars coerced as `kind`
    ScalarList(FieldKind),
    /// alarm sets named from the alarm catalog, overridden per alarm
    AlarmSets,
    /// log sets from the logging catalog, merged with local additions
    LogSets,
}

/// Node types that can complete a reference pointing at them
pub trait ReferenceTarget {
    /// Interpret [Reference::tail] relative to `node`
    fn resolve_local_ref(&self, tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved>;
}

// blanket impl for Fn
impl<F> ReferenceTarget for F
where
    F: Fn(&Tree, NodeId, &Reference) -> Result<Resolved>,
{
    fn resolve_local_ref(&self, tree: &Tree, node: NodeId, reference: &Reference) -> Result<Resolved> {
        self(tree, node, reference)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Capability {
    pub name: &'static str,
    pub extends: Vec<&'static str>,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone)]
pub struct TypeSchema {
    pub name: &'static str,
    pub capabilities: Vec<&'static str>,
    pub fields: Vec<FieldDescriptor>,
    /// identity comes from the container key, a `name` in config is ignored
    pub keyed: bool,
    pub container: bool,
    pub invariants: Vec<Invariant>,
}

impl TypeSchema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            capabilities: vec![],
            fields: vec![],
            keyed: true,
            container: false,
            invariants: vec![],
        }
    }

    pub fn capability(mut self, name: &'static str) -> Self {
        self.capabilities.push(name);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// identity is read from the `name` field of the config
    pub fn unkeyed(mut self) -> Self {
        self.keyed = false;
        self
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn invariant(mut self, invariant: Invariant) -> Self {
        self.invariants.push(invariant);
        self
    }
}

#[derive(Default)]
pub struct SchemaRegistry {
    capabilities: HashMap<&'static str, Capability>,
    types: IndexMap<&'static str, TypeSchema>,
    strategies: HashMap<&'static str, IndexMap<&'static str, Strategy>>,
    discriminators: HashMap<&'static str, IndexMap<&'static str, &'static str>>,
    targets: HashMap<&'static str, Box<dyn ReferenceTarget>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("capabilities", &self.capabilities.len())
            .field("types", &self.types.len())
            .field("strategies", &self.strategies.values().map(IndexMap::len).sum::<usize>())
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn add_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability.name, capability);
    }

    pub fn add_type(&mut self, schema: TypeSchema) {
        self.types.insert(schema.name, schema);
    }

    /// Register a construction strategy for `field` of `owner`, a type or capability name
    pub fn add_strategy(&mut self, owner: &'static str, field: &'static str, strategy: Strategy) {
        self.strategies.entry(owner).or_default().insert(field, strategy);
    }

    /// Register the type selected by `discriminator` in the named registry
    pub fn add_discriminated(
        &mut self,
        registry: &'static str,
        discriminator: &'static str,
        type_name: &'static str,
    ) {
        self.discriminators
            .entry(registry)
            .or_default()
            .insert(discriminator, type_name);
    }

    pub fn add_target(&mut self, type_name: &'static str, target: impl ReferenceTarget + 'static) {
        self.targets.insert(type_name, Box::new(target));
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeSchema> {
        self.types.get(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }

    /// Capabilities of a type, most specific first, each listed once
    pub fn most_specific_capabilities(&self, type_name: &str) -> Vec<&'static str> {
        let mut seen: IndexSet<&'static str> = IndexSet::new();
        let Some(schema) = self.get(type_name) else {
            return vec![];
        };

        let mut pending: Vec<&'static str> = schema.capabilities.iter().rev().copied().collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(capability) = self.capabilities.get(name) {
                pending.extend(capability.extends.iter().rev());
            }
        }

        seen.into_iter().collect()
    }

    /// Effective fields of a type: its own, then those of its capabilities
    pub fn fields(&self, type_name: &str) -> Vec<&FieldDescriptor> {
        let mut fields: IndexMap<&'static str, &FieldDescriptor> = IndexMap::new();

        let own = self.get(type_name).map(|schema| schema.fields.iter());
        let inherited = self
            .most_specific_capabilities(type_name)
            .into_iter()
            .filter_map(|name| self.capabilities.get(name))
            .flat_map(|capability| capability.fields.iter());

        for descriptor in own.into_iter().flatten().chain(inherited) {
            fields.entry(descriptor.name).or_insert(descriptor);
        }

        fields.into_values().collect()
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDescriptor> {
        self.fields(type_name)
            .into_iter()
            .find(|descriptor| descriptor.name == field_name)
    }

    /// Strategy for a field: registered on the type itself, else on the most specific capability
    pub fn strategy(&self, type_name: &str, field_name: &str) -> Option<&Strategy> {
        let schema = self.get(type_name)?;
        std::iter::once(schema.name)
            .chain(self.most_specific_capabilities(type_name))
            .find_map(|owner| self.strategies.get(owner)?.get(field_name))
    }

    pub fn discriminated(&self, registry: &str, discriminator: &str) -> Option<&'static str> {
        self.discriminators
            .get(registry)
            .and_then(|types| types.get(discriminator).copied())
    }

    pub fn target(&self, type_name: &str) -> Option<&dyn ReferenceTarget> {
        self.targets.get(type_name).map(Box::as_ref)
    }

    /// Whether the type declares a field of that name
    pub fn has_field(&self, type_name: &str, field_name: &str) -> bool {
        self.field(type_name, field_name).is_some()
    }
}
