//! object graph loader
//!
//! [apply] populates one node from its effective config. Each field goes through the same pipeline:
//!
//! 1. file references are replaced by the file's content
//! 2. comma lists are split
//! 3. numbers are widened to floats, scalars are stringified for text fields
//! 4. reference text is stored as is (reference fields) or parked in [Node::deferred](crate::tree::Node::deferred)
//! 5. structural fields are built through their [Strategy]
//! 6. everything else is checked against the field and copied
//!
//! Any failure aborts the load with an error naming the document, field, type and value.
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::project::LoadContext;
use crate::reference::{self, Reference};
use crate::schema::{FieldDescriptor, FieldKind, Strategy};
use crate::tree::{FieldValue, NodeId, Slot, Tree};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::path::Path;

/// Allocate a node of `type_name` below `parent` and apply `config` to it
///
/// The caller still has to store the returned node in `parent`.
pub fn create(
    tree: &mut Tree,
    ctx: &LoadContext,
    parent: NodeId,
    slot: Slot,
    type_name: &str,
    name: &str,
    config: &Value,
) -> Result<NodeId> {
    let schema = ctx.schema.get(type_name).ok_or_else(|| {
        Error::invalid_file(ctx.source(), format!("Unknown object type '{type_name}'"))
    })?;

    let id = tree.add_node(parent, slot, schema.name, name, schema.container);
    if let Some(path) = &ctx.read_file_path {
        tree.node_mut(id).source = Some(path.clone());
    }
    apply(tree, ctx, id, config)?;
    Ok(id)
}

/// Create a container child of `parent` and store it there under `key`
pub fn create_child(
    tree: &mut Tree,
    ctx: &LoadContext,
    parent: NodeId,
    type_name: &str,
    key: &str,
    config: &Value,
) -> Result<NodeId> {
    let id = create(tree, ctx, parent, Slot::Child, type_name, key, config)?;
    tree.insert_child(parent, key, id);
    Ok(id)
}

/// Populate `node` from `config` under control of its schema
#[tracing::instrument(level = "trace", skip_all, fields(node = %node))]
pub fn apply(tree: &mut Tree, ctx: &LoadContext, node: NodeId, config: &Value) -> Result<()> {
    let type_name = tree.node(node).type_name;
    let schema = ctx.schema.get(type_name).ok_or_else(|| {
        Error::invalid_file(ctx.source(), format!("Unknown object type '{type_name}'"))
    })?;

    let empty = Map::new();
    let config = match config {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(Error::invalid_file(
                ctx.source(),
                format!(
                    "Expected a mapping for object type '{type_name}' at '{}', found {}",
                    tree.display_path(node),
                    other.kind()
                ),
            ))
        }
    };

    let fields = ctx.schema.fields(type_name);
    if let Some(unused) = config
        .keys()
        .find(|key| !fields.iter().any(|descriptor| descriptor.name == key.as_str()))
    {
        return Err(Error::UnusedProjectField {
            path: ctx.read_file_path.clone(),
            field: unused.clone(),
            node_type: type_name.to_string(),
        });
    }

    for descriptor in &fields {
        let Some(value) = config.get(descriptor.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        match descriptor.name {
            // identity comes from the container key
            "name" if schema.keyed => continue,
            "name" => tree.node_mut(node).name = value.to_string(),
            "title" => {
                tree.node_mut(node).title = value.to_string();
                continue;
            }
            _ => {}
        }

        apply_field(tree, ctx, node, descriptor, value)?;
    }

    for descriptor in &fields {
        let current = tree.node(node);
        let is_set = current.fields.contains_key(descriptor.name)
            || current.deferred.contains_key(descriptor.name)
            || match descriptor.name {
                "name" => schema.keyed || !current.name.is_empty(),
                "title" => !current.title.is_empty(),
                _ => false,
            };
        if is_set {
            continue;
        }

        if let Some(default) = &descriptor.default {
            tree.node_mut(node)
                .fields
                .insert(descriptor.name.to_string(), FieldValue::Value(default.clone()));
        } else if descriptor.required {
            return Err(Error::invalid_file(
                ctx.source(),
                format!(
                    "Missing required field '{}' for object type '{type_name}' at '{}'",
                    descriptor.name,
                    tree.display_path(node)
                ),
            ));
        }
    }

    for invariant in &schema.invariants {
        invariant(tree, node).map_err(|reason| {
            Error::invalid_file(
                ctx.source(),
                format!(
                    "Invalid config for object type '{type_name}' at '{}'\nReason: {reason}",
                    tree.display_path(node)
                ),
            )
        })?;
    }

    Ok(())
}

fn invalid_field(
    ctx: &LoadContext,
    type_name: &str,
    field: &str,
    value: &Value,
    reason: impl std::fmt::Display,
) -> Error {
    Error::invalid_file(
        ctx.source(),
        format!(
            "Invalid config for field '{field}' for object type '{type_name}'.\nValue supplied: {value}\nReason: {reason}"
        ),
    )
}

fn apply_field(
    tree: &mut Tree,
    ctx: &LoadContext,
    node: NodeId,
    descriptor: &FieldDescriptor,
    raw: &Value,
) -> Result<()> {
    let type_name = tree.node(node).type_name;
    let name = descriptor.name;
    let value = coerce(ctx, descriptor, raw)?;
    tracing::trace!(field = name, kind = value.kind(), "apply field");

    if let Value::String(text) = &value {
        if reference::is_reference(text) {
            let target = tree.node_mut(node);
            if matches!(descriptor.kind, FieldKind::Reference { .. }) {
                target.fields.insert(name.to_string(), FieldValue::Value(value));
            } else {
                target.deferred.insert(name.to_string(), text.clone());
            }
            return Ok(());
        }

        if reference::looks_like_reference(text) {
            // warns about the malformed text, the value stays plain text
            let _ = Reference::parse(text);
        }
    }

    let strategy = match descriptor.kind.is_structural() {
        true => ctx.schema.strategy(type_name, name),
        false => None,
    };

    let value = match strategy {
        None => value,
        Some(Strategy::ScalarList(kind)) => scalar_list(ctx, type_name, descriptor, *kind, &value)?,
        Some(strategy) => {
            let built = construct(tree, ctx, node, name, strategy, &value)?;
            tree.node_mut(node).fields.insert(name.to_string(), built);
            return Ok(());
        }
    };

    let invalid = |reason| invalid_field(ctx, type_name, name, &value, reason);
    descriptor.check_kind(&value).map_err(invalid)?;
    if let Some(validator) = descriptor.validator {
        validator(&value).map_err(invalid)?;
    }

    tree.node_mut(node)
        .fields
        .insert(name.to_string(), FieldValue::Value(value));
    Ok(())
}

/// Steps 1 to 3 of the pipeline
fn coerce(ctx: &LoadContext, descriptor: &FieldDescriptor, value: &Value) -> Result<Value> {
    let coerced = match (descriptor.kind, value) {
        (FieldKind::FileReference, Value::String(path)) => {
            let base = ctx
                .read_file_path
                .as_deref()
                .and_then(Path::parent)
                .unwrap_or(Path::new(""));
            let path = base.join(path);
            tracing::debug!(path = %path.display(), field = descriptor.name, "loading file reference");
            let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            Value::String(content)
        }
        (FieldKind::CommaList, Value::String(list)) => Value::Array(
            list.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        (FieldKind::Float, Value::Integer(int)) => Value::Decimal(*int as f64),
        (FieldKind::Text, Value::Integer(_) | Value::Decimal(_) | Value::Boolean(_)) => {
            Value::String(value.to_string())
        }
        _ => value.clone(),
    };
    Ok(coerced)
}

fn scalar_list(
    ctx: &LoadContext,
    type_name: &str,
    descriptor: &FieldDescriptor,
    kind: FieldKind,
    value: &Value,
) -> Result<Value> {
    let items = value.as_array().ok_or_else(|| {
        invalid_field(ctx, type_name, descriptor.name, value, "expected a list")
    })?;

    let item_descriptor = crate::schema::field(descriptor.name, kind);
    items
        .iter()
        .map(|item| {
            let item = coerce(ctx, &item_descriptor, item)?;
            item_descriptor
                .check_kind(&item)
                .map_err(|reason| invalid_field(ctx, type_name, descriptor.name, &item, reason))?;
            Ok(item)
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn expect_map<'v>(
    ctx: &LoadContext,
    tree: &Tree,
    node: NodeId,
    field: &str,
    value: &'v Value,
) -> Result<&'v Map> {
    value.as_object().ok_or_else(|| {
        invalid_field(ctx, tree.node(node).type_name, field, value, "expected a mapping")
    })
}

/// Step 5: build child nodes for a structural field
#[tracing::instrument(level = "trace", skip_all, fields(field = field))]
fn construct(
    tree: &mut Tree,
    ctx: &LoadContext,
    node: NodeId,
    field: &str,
    strategy: &Strategy,
    value: &Value,
) -> Result<FieldValue> {
    tracing::debug!(?strategy, field, "construct");

    let built = match strategy {
        Strategy::Object(type_name) => {
            FieldValue::Node(create(tree, ctx, node, Slot::Field, type_name, field, value)?)
        }
        Strategy::NamedMap(type_name) => {
            let mut children = IndexMap::new();
            for (key, config) in expect_map(ctx, tree, node, field, value)? {
                let slot = Slot::Entry {
                    field: field.to_string(),
                };
                let child = create(tree, ctx, node, slot, type_name, key, config)?;
                children.insert(key.clone(), child);
            }
            FieldValue::Map(children)
        }
        Strategy::ObjectList(type_name) => {
            let items = value.as_array().ok_or_else(|| {
                invalid_field(ctx, tree.node(node).type_name, field, value, "expected a list")
            })?;
            let mut children = Vec::with_capacity(items.len());
            for (index, config) in items.iter().enumerate() {
                let slot = Slot::Item {
                    field: field.to_string(),
                };
                let name = index.to_string();
                children.push(create(tree, ctx, node, slot, type_name, &name, config)?);
            }
            FieldValue::List(children)
        }
        Strategy::TwoLevelMap(type_name) => {
            let mut groups = IndexMap::new();
            for (group, entries) in expect_map(ctx, tree, node, field, value)? {
                let mut children = IndexMap::new();
                for (key, config) in expect_map(ctx, tree, node, field, entries)? {
                    let slot = Slot::Entry2 {
                        field: field.to_string(),
                        group: group.clone(),
                    };
                    children.insert(key.clone(), create(tree, ctx, node, slot, type_name, key, config)?);
                }
                groups.insert(group.clone(), children);
            }
            FieldValue::Map2(groups)
        }
        Strategy::Container { container, item } => {
            let holder = create(tree, ctx, node, Slot::Field, container, field, &Value::Null)?;
            for (key, config) in expect_map(ctx, tree, node, field, value)? {
                create_child(tree, ctx, holder, item, key, config)?;
            }
            FieldValue::Node(holder)
        }
        Strategy::Discriminated {
            container,
            registry,
        } => {
            let holder = create(tree, ctx, node, Slot::Field, container, field, &Value::Null)?;
            for (key, config) in expect_map(ctx, tree, node, field, value)? {
                let type_name = discriminated_type(ctx, registry, key, config)?;
                create_child(tree, ctx, holder, type_name, key, config)?;
            }
            FieldValue::Node(holder)
        }
        Strategy::AlarmSets => FieldValue::Node(alarm_sets(tree, ctx, node, field, value)?),
        Strategy::LogSets => FieldValue::Node(log_sets(tree, ctx, node, field, value)?),
        Strategy::ScalarList(kind) => {
            let type_name = tree.node(node).type_name;
            let descriptor = crate::schema::field("", *kind);
            FieldValue::Value(scalar_list(ctx, type_name, &descriptor, *kind, value)?)
        }
    };

    Ok(built)
}

fn discriminated_type(
    ctx: &LoadContext,
    registry: &str,
    key: &str,
    config: &Value,
) -> Result<&'static str> {
    let Some(discriminator) = config.get("type").and_then(Value::as_str) else {
        return Err(Error::invalid_file(
            ctx.source(),
            format!("No type for resource '{key}'.\n\nConfiguration section:\n{config}"),
        ));
    };

    ctx.schema
        .discriminated(registry, discriminator)
        .ok_or_else(|| {
            Error::invalid_file(
                ctx.source(),
                format!(
                    "No mapping for type '{discriminator}' for resource named '{key}'\n\nConfiguration section:\n{config}"
                ),
            )
        })
}

/// Alarm sets are named by the caller and defined in the alarm catalog of the owning resource's type
fn alarm_sets(
    tree: &mut Tree,
    ctx: &LoadContext,
    node: NodeId,
    field: &str,
    value: &Value,
) -> Result<NodeId> {
    let local = expect_map(ctx, tree, node, field, value)?;
    let resource_type = tree
        .node(node)
        .parent
        .and_then(|parent| tree.node(parent).str_value("type"))
        .unwrap_or_default()
        .to_string();

    let sets = create(tree, ctx, node, Slot::Field, "AlarmSets", field, &Value::Null)?;
    for (set_name, overrides) in local {
        let catalog = ctx
            .monitor
            .alarms
            .get(&resource_type)
            .and_then(|sets| sets.get(set_name))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::invalid_file(
                    ctx.source(),
                    format!(
                        "No alarm set '{set_name}' for resource type '{resource_type}' in MonitorConfig/AlarmSets"
                    ),
                )
            })?;

        let mut set_config = Map::new();
        set_config.insert("resource_type".into(), resource_type.clone().into());
        if let Some(notifications) = overrides.get("notifications") {
            set_config.insert("notifications".into(), notifications.clone());
        }
        let set = create_child(tree, ctx, sets, "AlarmSet", set_name, &Value::Object(set_config))?;

        if let Some(unknown) = overrides
            .as_object()
            .into_iter()
            .flat_map(|o| o.keys())
            .find(|key| key.as_str() != "notifications" && !catalog.contains_key(key.as_str()))
        {
            return Err(Error::invalid_file(
                ctx.source(),
                format!("Alarm '{unknown}' is not part of alarm set '{set_name}' for resource type '{resource_type}'"),
            ));
        }

        for (alarm_name, alarm_config) in catalog {
            let config = match overrides.get(alarm_name) {
                Some(local) => merge(alarm_config, local),
                None => alarm_config.clone(),
            };
            create_child(tree, ctx, set, "CloudWatchAlarm", alarm_name, &config)?;
        }
    }

    Ok(sets)
}

/// Log sets of the logging catalog, merged with the caller's additions
fn log_sets(
    tree: &mut Tree,
    ctx: &LoadContext,
    node: NodeId,
    field: &str,
    value: &Value,
) -> Result<NodeId> {
    let catalog = ctx
        .monitor
        .logging
        .get("cw_logging")
        .and_then(|logging| logging.get("log_sets"))
        .cloned()
        .unwrap_or_default();
    let merged = merge(&catalog, value);

    let sets = create(tree, ctx, node, Slot::Field, "CloudWatchLogSets", field, &Value::Null)?;
    for (name, config) in expect_map(ctx, tree, node, field, &merged)? {
        create_child(tree, ctx, sets, "CloudWatchLogSet", name, config)?;
    }
    Ok(sets)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog;
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    fn ctx() -> LoadContext {
        LoadContext::new(catalog::builtin(), "/nonexistent".into())
    }

    fn load(type_name: &str, config: &str) -> Result<(Tree, NodeId)> {
        let ctx = ctx();
        let mut tree = Tree::new("Project", "test");
        let root = tree.root();
        let id = create_child(&mut tree, &ctx, root, type_name, "subject", &yaml(config))?;
        Ok((tree, id))
    }

    #[test]
    fn unused_field_is_named() {
        let err = load("Segment", "az1_cidr: 10.0.0.0/24\nbogus: 1").unwrap_err();
        match err {
            Error::UnusedProjectField {
                field, node_type, ..
            } => {
                assert_eq!(field, "bogus");
                assert_eq!(node_type, "Segment");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn defaults_and_title() {
        let (tree, id) = load("Segment", "title: Public\naz1_cidr: 10.0.1.0/24").unwrap();
        let node = tree.node(id);
        assert_eq!(node.title, "Public");
        assert_eq!(node.name, "subject");
        assert_eq!(node.value("internet_access"), Some(&Value::Boolean(false)));
        assert_eq!(node.value("enabled"), Some(&Value::Boolean(false)));
        assert_eq!(node.str_value("az1_cidr"), Some("10.0.1.0/24"));
        assert_eq!(node.value("az2_cidr"), None);
    }

    #[test]
    fn keyed_types_ignore_config_name() {
        let (tree, id) = load("Segment", "name: other").unwrap();
        assert_eq!(tree.node(id).name, "subject");
    }

    #[test]
    fn scalar_coercion() {
        let (tree, id) = load(
            "CloudWatchAlarm",
            "classification: health\nmetric_name: 404\nthreshold: 10\nperiod: 300",
        )
        .unwrap();
        let node = tree.node(id);
        assert_eq!(node.str_value("metric_name"), Some("404"));
        assert_eq!(node.value("threshold"), Some(&Value::Decimal(10.0)));
        assert_eq!(node.value("period"), Some(&Value::Integer(300)));
    }

    #[test]
    fn comma_list() {
        let (tree, id) = load(
            "IamUserPermissionAdministrator",
            "type: Administrator\naccounts: master, dev ,prod",
        )
        .unwrap();
        assert_eq!(
            tree.node(id).value("accounts"),
            Some(&vec!["master", "dev", "prod"].into())
        );
    }

    #[test]
    fn references_are_deferred_unless_reference_only() {
        let (tree, id) = load(
            "LBApplication",
            "type: LBApplication\nsegment: infra.ref netenv.mynet.network.vpc.segments.public\naccess_logs_bucket: infra.ref resource.s3.buckets.logs",
        )
        .unwrap();
        let node = tree.node(id);
        assert_eq!(node.value("segment"), None);
        assert_eq!(
            node.deferred.get("segment").map(String::as_str),
            Some("infra.ref netenv.mynet.network.vpc.segments.public")
        );
        assert_eq!(
            node.str_value("access_logs_bucket"),
            Some("infra.ref resource.s3.buckets.logs")
        );
    }

    #[test]
    fn reference_only_field_rejects_text() {
        let err = load("Network", "aws_account: master").unwrap_err();
        assert!(matches!(err, Error::InvalidProjectFile { .. }), "{err:?}");
    }

    #[test]
    fn validator_failure_names_field_and_value() {
        let err = load("Segment", "az1_cidr: nope").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'az1_cidr'"), "{message}");
        assert!(message.contains("'Segment'"), "{message}");
        assert!(message.contains("nope"), "{message}");
    }

    #[test]
    fn type_mismatch_is_invalid() {
        let err = load("Segment", "internet_access: [1]").unwrap_err();
        assert!(matches!(err, Error::InvalidProjectFile { .. }));
    }

    #[test]
    fn required_field_missing() {
        let err = load("S3Bucket", "type: S3Bucket").unwrap_err();
        assert!(err.to_string().contains("bucket_name"), "{err}");
    }

    #[test]
    fn security_group_rule_invariant() {
        let err = load(
            "SecurityGroup",
            "ingress:\n  - {protocol: tcp, port: 80, from_port: 80, to_port: 80}",
        )
        .unwrap_err();
        assert!(
            err.to_string()
                .contains("Both 'port' and 'to_port/from_port' must not have values."),
            "{err}"
        );
    }

    #[test]
    fn nested_strategies_build_paths() {
        let (tree, id) = load(
            "Vpc",
            r#"
cidr: 10.0.0.0/16
segments:
  public: {az1_cidr: 10.0.1.0/24}
security_groups:
  app:
    lb:
      ingress:
        - {protocol: tcp, port: 443, cidr_ip: 0.0.0.0/0}
private_hosted_zone:
  domain_name: internal.example.com
"#,
        )
        .unwrap();

        let lb = tree
            .lookup(&["subject", "security_groups", "app", "lb"])
            .unwrap();
        assert_eq!(tree.node(lb).type_name, "SecurityGroup");

        let rule = tree
            .lookup(&["subject", "security_groups", "app", "lb", "ingress", "0"])
            .unwrap();
        assert_eq!(tree.display_path(rule), "subject.security_groups.app.lb.ingress.0");
        assert_eq!(tree.node(rule).value("from_port"), Some(&Value::Integer(-1)));

        let zone = tree.lookup(&["subject", "private_hosted_zone"]).unwrap();
        assert_eq!(tree.node(zone).parent, Some(id));
    }

    #[test]
    fn discriminated_resources() {
        let (tree, _) = load(
            "ResourceGroup",
            r#"
order: 1
resources:
  web:
    type: ASG
    instance_type: t3.small
  topic:
    type: SNSTopic
"#,
        )
        .unwrap();
        let web = tree.lookup(&["subject", "resources", "web"]).unwrap();
        assert_eq!(tree.node(web).type_name, "ASG");
        let topic = tree.lookup(&["subject", "resources", "topic"]).unwrap();
        assert_eq!(tree.node(topic).type_name, "SNSTopic");
    }

    #[test]
    fn unknown_discriminator_names_resource() {
        let err = load("ResourceGroup", "order: 1\nresources: {db: {type: RDS}}").unwrap_err();
        assert!(
            err.to_string()
                .contains("No mapping for type 'RDS' for resource named 'db'"),
            "{err}"
        );

        let err = load("ResourceGroup", "order: 1\nresources: {db: {}}").unwrap_err();
        assert!(err.to_string().contains("No type for resource 'db'"), "{err}");
    }

    #[test]
    fn alarm_sets_come_from_the_catalog() {
        let mut ctx = ctx();
        ctx.monitor.alarms = yaml(
            r#"
ASG:
  instance-health:
    CPUHigh:
      classification: performance
      metric_name: CPUUtilization
      threshold: 90
    StatusCheck:
      classification: health
      metric_name: StatusCheckFailed
"#,
        );

        let mut tree = Tree::new("Project", "test");
        let root = tree.root();
        let config = yaml(
            r#"
type: ASG
monitoring:
  alarm_sets:
    instance-health:
      notifications:
        ops: {groups: [ops]}
      CPUHigh:
        threshold: 95
"#,
        );
        create_child(&mut tree, &ctx, root, "ASG", "web", &config).unwrap();

        let set = tree
            .lookup(&["web", "monitoring", "alarm_sets", "instance-health"])
            .unwrap();
        assert_eq!(tree.node(set).str_value("resource_type"), Some("ASG"));
        assert!(tree.node(set).field("notifications").is_some());

        let cpu = tree.child(set, "CPUHigh").unwrap();
        assert_eq!(tree.node(cpu).value("threshold"), Some(&Value::Decimal(95.0)));
        let status = tree.child(set, "StatusCheck").unwrap();
        assert_eq!(tree.node(status).str_value("severity"), Some("low"));
    }

    #[test]
    fn unknown_alarm_set() {
        let err = load(
            "ASG",
            "type: ASG\nmonitoring:\n  alarm_sets:\n    missing: {}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("No alarm set 'missing'"), "{err}");
    }

    #[test]
    fn log_sets_merge_catalog_and_local() {
        let mut ctx = ctx();
        ctx.monitor.logging = yaml(
            r#"
cw_logging:
  log_sets:
    cloud:
      expire_events_after_days: 30
"#,
        );
        let mut tree = Tree::new("Project", "test");
        let root = tree.root();
        let config = yaml("log_sets:\n  app:\n    expire_events_after_days: 7");
        create_child(&mut tree, &ctx, root, "MonitorConfig", "monitoring", &config).unwrap();

        let sets = tree.lookup(&["monitoring", "log_sets"]).unwrap();
        let names: Vec<_> = tree
            .node(sets)
            .children
            .as_ref()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(names, vec!["cloud", "app"]);
    }

    #[test]
    fn file_reference_is_relative_to_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("handler.py"), "def handler(): pass\n").unwrap();

        let mut ctx = ctx();
        ctx.read_file_path = Some(dir.path().join("doc.yaml"));
        let mut tree = Tree::new("Project", "test");
        let root = tree.root();
        let id = create_child(
            &mut tree,
            &ctx,
            root,
            "LambdaFunctionCode",
            "code",
            &yaml("zipfile: handler.py"),
        )
        .unwrap();
        assert_eq!(
            tree.node(id).str_value("zipfile"),
            Some("def handler(): pass\n")
        );
    }

    #[test]
    fn lambda_code_needs_a_source() {
        let err = load("LambdaFunctionCode", "s3_key: code.zip").unwrap_err();
        assert!(err.to_string().contains("Either zipfile or s3_bucket"), "{err}");
    }
}
