//! cross-cutting checks over a fully built tree
use crate::schema::SchemaRegistry;
use crate::tree::{FieldValue, NodeId, Tree};
use crate::value::Value;
use crate::visit;
use indexmap::IndexSet;

#[derive(derive_new::new, Debug, Default)]
pub struct ConsistencyIssues {
    #[new(default)]
    issues: Vec<Issue>,
}

impl ConsistencyIssues {
    pub fn log(&mut self, issue: Issue) {
        tracing::trace!(?issue, "issue found");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(Issue::is_fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| !issue.is_fatal())
    }
}

impl std::error::Error for ConsistencyIssues {}

/// Every fatal issue, one per line
impl std::fmt::Display for ConsistencyIssues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fatal = self.issues.iter().filter(|issue| issue.is_fatal());
        if let Some(first) = fatal.next() {
            write!(f, "{first}")?;
        }
        for issue in fatal {
            write!(f, "\n{issue}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    NoNotificationGroups,
    AlarmWithoutNotifications {
        alarm: String,
        application: String,
    },
    UnknownNotificationGroup {
        alarm: String,
        application: String,
        group: String,
    },
}

impl Issue {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Issue::UnknownNotificationGroup { .. })
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::NoNotificationGroups => {
                f.write_str("No NotificationGroups configured, alarm notifications are not checked")
            }
            Issue::AlarmWithoutNotifications { alarm, application } => write!(
                f,
                "Alarm {alarm} for app {application} does not have any notifications."
            ),
            Issue::UnknownNotificationGroup {
                alarm,
                application,
                group,
            } => write!(
                f,
                "Alarm {alarm} for app {application} notifies to group '{group}' which does not belong in Notification service group names."
            ),
        }
    }
}

/// Compute each alarm's notification groups and check them against the declared groups
///
/// Only enabled applications of region tiers are checked. The computed groups are stored on the alarm's
/// `notification_groups`.
#[tracing::instrument(level = "trace", skip_all)]
pub fn check_notifications(tree: &mut Tree, schema: &SchemaRegistry) -> ConsistencyIssues {
    let mut issues = ConsistencyIssues::new();
    let root = tree.root();

    let Some(groups) = tree.child(root, "notificationgroups") else {
        issues.log(Issue::NoNotificationGroups);
        return issues;
    };
    let declared: IndexSet<String> = tree
        .node(groups)
        .children
        .iter()
        .flat_map(|children| children.keys().cloned())
        .collect();

    let applications: Vec<NodeId> = visit::enumerate(tree, schema, root)
        .into_iter()
        .filter(|id| tree.node(*id).type_name == "Application")
        .filter(|id| tree.ancestor_of_type(*id, "EnvironmentRegion").is_some())
        .filter(|id| tree.is_enabled(*id))
        .collect();

    for application in applications {
        let alarms: Vec<NodeId> = visit::enumerate(tree, schema, application)
            .into_iter()
            .filter(|id| tree.node(*id).type_name == "CloudWatchAlarm")
            .collect();

        for alarm in alarms {
            let alarm_groups = notification_groups(tree, alarm, application);
            let alarm_path = tree.display_path(alarm);
            let application_path = tree.display_path(application);

            if alarm_groups.is_empty() {
                issues.log(Issue::AlarmWithoutNotifications {
                    alarm: alarm_path.clone(),
                    application: application_path.clone(),
                });
            }
            for group in alarm_groups.iter().filter(|group| !declared.contains(*group)) {
                issues.log(Issue::UnknownNotificationGroup {
                    alarm: alarm_path.clone(),
                    application: application_path.clone(),
                    group: group.clone(),
                });
            }

            let stored = Value::Array(alarm_groups.into_iter().map(Value::String).collect());
            tree.node_mut(alarm)
                .fields
                .insert("notification_groups".to_string(), FieldValue::Value(stored));
        }
    }

    issues
}

/// Groups from the alarm, its alarm set, the enclosing monitoring config and the application, in that order
///
/// A notification restricted to a classification or severity only applies to matching alarms.
fn notification_groups(tree: &Tree, alarm: NodeId, application: NodeId) -> IndexSet<String> {
    let alarm_node = tree.node(alarm);
    let classification = alarm_node.str_value("classification");
    let severity = alarm_node.str_value("severity");

    let mut levels = vec![alarm];
    levels.extend(alarm_node.parent);
    levels.extend(tree.ancestor_of_type(alarm, "MonitorConfig"));
    levels.push(application);

    let mut groups = IndexSet::new();
    for level in levels {
        let Some(FieldValue::Node(notifications)) = tree.node(level).field("notifications") else {
            continue;
        };
        let children = tree.node(*notifications).children.iter().flat_map(|c| c.values());
        for notification in children.map(|id| tree.node(*id)) {
            let applies = |field: &str, actual: Option<&str>| match notification.str_value(field) {
                Some(wanted) => Some(wanted) == actual,
                None => true,
            };
            if !applies("classification", classification) || !applies("severity", severity) {
                continue;
            }

            let names = notification.value("groups").and_then(Value::as_array);
            groups.extend(names.into_iter().flatten().filter_map(Value::as_str).map(str::to_string));
        }
    }
    groups
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog;
    use crate::loader::create_child;
    use crate::project::LoadContext;
    use crate::value::yaml;
    use pretty_assertions::assert_eq;

    fn tree_with_alarm(notifications: &str) -> (Tree, SchemaRegistry) {
        let mut ctx = LoadContext::new(catalog::builtin(), "/nonexistent".into());
        ctx.monitor.alarms = yaml(
            "ASG:\n  basic:\n    CPU:\n      classification: performance\n      severity: critical\n      metric_name: CPUUtilization",
        );

        let mut tree = Tree::new("Project", "demo");
        let root = tree.root();
        let groups = create_child(&mut tree, &ctx, root, "NotificationGroups", "notificationgroups", &Value::Null).unwrap();
        create_child(&mut tree, &ctx, groups, "SnsTopic", "ops", &Value::Null).unwrap();

        let env = create_child(&mut tree, &ctx, root, "Environment", "prod", &Value::Null).unwrap();
        let region = create_child(&mut tree, &ctx, env, "EnvironmentRegion", "us-west-2", &yaml("enabled: true")).unwrap();
        let config = yaml(&format!(
            r#"
enabled: true
{notifications}
groups:
  site:
    order: 1
    resources:
      web:
        type: ASG
        monitoring:
          alarm_sets:
            basic: {{}}
"#
        ));
        create_child(&mut tree, &ctx, region, "Application", "app", &config).unwrap();

        let schema = std::mem::take(&mut ctx.schema);
        (tree, schema)
    }

    fn alarm_groups(tree: &Tree) -> Value {
        let alarm = tree
            .iter()
            .find(|(_, node)| node.type_name == "CloudWatchAlarm")
            .map(|(id, _)| id)
            .unwrap();
        tree.node(alarm).value("notification_groups").cloned().unwrap()
    }

    #[test]
    fn known_groups_pass() {
        let (mut tree, schema) = tree_with_alarm("notifications:\n  app: {groups: [ops]}");
        let issues = check_notifications(&mut tree, &schema);
        assert!(issues.issues().is_empty(), "{:?}", issues.issues());
        assert_eq!(alarm_groups(&tree), yaml("[ops]"));
    }

    #[test]
    fn unknown_group_is_fatal() {
        let (mut tree, schema) = tree_with_alarm("notifications:\n  app: {groups: [ops, pager]}");
        let issues = check_notifications(&mut tree, &schema);
        assert!(issues.has_fatal());
        assert!(issues.to_string().contains("'pager'"), "{issues}");
    }

    #[test]
    fn filtered_notifications_and_missing_groups() {
        let (mut tree, schema) =
            tree_with_alarm("notifications:\n  app: {groups: [ops], classification: health}");
        let issues = check_notifications(&mut tree, &schema);
        assert!(!issues.has_fatal());
        assert!(matches!(
            issues.issues(),
            [Issue::AlarmWithoutNotifications { .. }]
        ));
        assert_eq!(alarm_groups(&tree), yaml("[]"));
    }
}
