//! built-in schema catalogue
//!
//! Everything the loader knows about concrete node types comes from here, as data for the
//! [SchemaRegistry](crate::schema::SchemaRegistry).
pub mod validators;

use crate::resolve::targets;
use crate::schema::{field, Capability, FieldDescriptor, FieldKind, SchemaRegistry, Strategy, TypeSchema};
use crate::value::Value;
use FieldKind::*;

const REF: FieldKind = Reference { str_ok: false };
const REF_OR_TEXT: FieldKind = Reference { str_ok: true };

/// Resource kinds selectable by `type:` inside a resource group
pub const RESOURCE_KINDS: &[(&str, &str)] = &[
    ("ASG", "ASG"),
    ("LBApplication", "LBApplication"),
    ("S3Bucket", "S3Bucket"),
    ("SNSTopic", "SNSTopic"),
    ("Lambda", "Lambda"),
    ("ACM", "ACM"),
];

/// IAM user permission kinds selectable by `type:`
pub const PERMISSION_KINDS: &[(&str, &str)] = &[
    ("Administrator", "IamUserPermissionAdministrator"),
    ("CodeCommit", "IamUserPermissionCodeCommit"),
];

fn capability(
    name: &'static str,
    extends: &[&'static str],
    fields: Vec<FieldDescriptor>,
) -> Capability {
    Capability {
        name,
        extends: extends.to_vec(),
        fields,
    }
}

fn with(schema: TypeSchema, fields: Vec<FieldDescriptor>) -> TypeSchema {
    fields.into_iter().fold(schema, TypeSchema::field)
}

fn scalar_list(name: &'static str) -> FieldDescriptor {
    field(name, List)
}

/// The built-in `ec2core` metric every ASG collects
pub fn ec2core_metric() -> Value {
    [
        ("name", Value::from("ec2core")),
        ("collection_interval", Value::Integer(60)),
        (
            "measurements",
            vec!["cpu", "disk", "diskio", "mem", "net", "swap"].into(),
        ),
    ]
    .into_iter()
    .collect()
}

/// Registry populated with every built-in type
pub fn builtin() -> SchemaRegistry {
    let mut registry = SchemaRegistry::default();
    capabilities(&mut registry);
    project(&mut registry);
    networks(&mut registry);
    applications(&mut registry);
    resources(&mut registry);
    monitoring(&mut registry);
    logging(&mut registry);
    global_resources(&mut registry);
    reference_targets(&mut registry);
    registry
}

fn capabilities(registry: &mut SchemaRegistry) {
    registry.add_capability(capability(
        "Named",
        &[],
        vec![field("name", Text), field("title", Text)],
    ));
    registry.add_capability(capability(
        "Deployable",
        &[],
        vec![field("enabled", Boolean).default(false)],
    ));
    registry.add_capability(capability(
        "Notifiable",
        &[],
        vec![field("notifications", Object)],
    ));
    registry.add_strategy(
        "Notifiable",
        "notifications",
        Strategy::Container {
            container: "AlarmNotifications",
            item: "AlarmNotification",
        },
    );
    registry.add_capability(capability(
        "Resource",
        &["Named", "Deployable"],
        vec![
            field("type", Text),
            field("resource_name", Text).read_only(),
            field("resource_fullname", Text).read_only(),
            field("order", Integer).default(0),
            field("change_protected", Boolean).default(false),
        ],
    ));
    registry.add_capability(capability(
        "Monitorable",
        &[],
        vec![field("monitoring", Object)],
    ));
    registry.add_strategy("Monitorable", "monitoring", Strategy::Object("MonitorConfig"));
    registry.add_capability(capability(
        "ServiceAccountRegion",
        &[],
        vec![
            field("account", REF),
            field("region", Text).validator(validators::region),
        ],
    ));
    registry.add_capability(capability(
        "LogRetention",
        &[],
        vec![field("expire_events_after_days", Text).validator(validators::log_retention)],
    ));
    registry.add_capability(capability(
        "PortProtocol",
        &[],
        vec![field("port", Integer), field("protocol", Text)],
    ));
    registry.add_capability(capability(
        "SecurityGroupRule",
        &["Named"],
        vec![
            field("cidr_ip", Text)
                .default("")
                .validator(validators::cidr_or_blank),
            field("cidr_ip_v6", Text).default(""),
            field("description", Text).default(""),
            field("from_port", Integer).default(-1),
            field("to_port", Integer).default(-1),
            field("port", Integer).default(-1),
            field("protocol", Text),
        ],
    ));
    registry.add_capability(capability(
        "Alarm",
        &["Named", "Deployable", "Notifiable"],
        vec![
            field("classification", Text)
                .required()
                .validator(validators::alarm_classification),
            field("severity", Text)
                .default("low")
                .validator(validators::alarm_severity),
            field("description", Text),
            field("runbook_url", Text),
            field("notification_groups", List).read_only(),
        ],
    ));
    registry.add_capability(capability(
        "IamUserPermission",
        &["Named", "Deployable"],
        vec![field("type", Text).required(), field("accounts", CommaList)],
    ));
    registry.add_capability(capability(
        "NetworkFields",
        &[],
        vec![
            field("availability_zones", Integer).default(0),
            field("aws_account", REF),
            field("vpc", Object),
        ],
    ));
    registry.add_strategy("NetworkFields", "vpc", Strategy::Object("Vpc"));
}

fn project(registry: &mut SchemaRegistry) {
    registry.add_type(with(
        TypeSchema::new("Project").unkeyed().container(),
        vec![
            field("name", Text).required(),
            field("title", Text),
            field("description", Text),
            field("active_regions", List).validator(validators::regions),
            field("project_version", Text).read_only(),
        ],
    ));
    registry.add_strategy("Project", "active_regions", Strategy::ScalarList(Text));

    registry.add_type(with(
        TypeSchema::new("Credentials"),
        vec![
            field("aws_access_key_id", Text),
            field("aws_secret_access_key", Text),
            field("aws_default_region", Text).validator(validators::region),
            field("master_account_id", Text).validator(validators::digits),
            field("master_admin_iam_username", Text),
            field("admin_iam_role_name", Text),
            field("mfa_session_expiry_secs", Integer).default(60 * 60),
            field("assume_role_session_expiry_secs", Integer).default(60 * 60),
        ],
    ));

    registry.add_type(TypeSchema::new("Accounts").container());
    registry.add_type(with(
        TypeSchema::new("Account")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("account_type", Text).default("AWS"),
            field("account_id", Text).validator(validators::digits),
            field("admin_delegate_role_name", Text),
            field("is_master", Boolean).default(false),
            field("region", Text)
                .default("us-west-2")
                .validator(validators::region),
            field("root_email", Text).validator(validators::email),
            scalar_list("organization_account_ids"),
            field("admin_iam_users", Dict),
        ],
    ));
    registry.add_strategy(
        "Account",
        "organization_account_ids",
        Strategy::ScalarList(Text),
    );
    registry.add_strategy("Account", "admin_iam_users", Strategy::NamedMap("AdminIamUser"));
    registry.add_type(with(
        TypeSchema::new("AdminIamUser")
            .capability("Named")
            .capability("Deployable"),
        vec![field("username", Text).required()],
    ));
}

fn networks(registry: &mut SchemaRegistry) {
    registry.add_type(TypeSchema::new("NetworkEnvironments").container());
    registry.add_type(
        TypeSchema::new("NetworkEnvironment")
            .capability("Named")
            .capability("Deployable")
            .capability("NetworkFields")
            .container(),
    );
    registry.add_type(TypeSchema::new("Environment").capability("Named").container());
    for tier in ["EnvironmentDefault", "EnvironmentRegion"] {
        registry.add_type(with(
            TypeSchema::new(tier).capability("Named").capability("Deployable"),
            vec![field("network", Object), field("applications", Object)],
        ));
    }
    registry.add_type(
        TypeSchema::new("Network")
            .capability("Named")
            .capability("Deployable")
            .capability("NetworkFields"),
    );

    registry.add_type(with(
        TypeSchema::new("Vpc")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("cidr", Text).validator(validators::cidr),
            field("enable_dns_hostnames", Boolean).default(false),
            field("enable_dns_support", Boolean).default(false),
            field("enable_internet_gateway", Boolean).default(false),
            field("nat_gateway", Dict),
            field("vpn_gateway", Dict),
            field("private_hosted_zone", Object),
            field("security_groups", Dict),
            field("segments", Dict),
            field("peering", Dict),
        ],
    ));
    registry.add_strategy("Vpc", "nat_gateway", Strategy::NamedMap("NatGateway"));
    registry.add_strategy("Vpc", "vpn_gateway", Strategy::NamedMap("VpnGateway"));
    registry.add_strategy(
        "Vpc",
        "private_hosted_zone",
        Strategy::Object("PrivateHostedZone"),
    );
    registry.add_strategy("Vpc", "security_groups", Strategy::TwoLevelMap("SecurityGroup"));
    registry.add_strategy("Vpc", "segments", Strategy::NamedMap("Segment"));
    registry.add_strategy("Vpc", "peering", Strategy::NamedMap("VpcPeering"));

    registry.add_type(with(
        TypeSchema::new("NatGateway")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("availability_zone", Text).default("all"),
            field("segment", REF),
            scalar_list("default_route_segments"),
        ],
    ));
    registry.add_strategy(
        "NatGateway",
        "default_route_segments",
        Strategy::ScalarList(REF),
    );
    registry.add_type(
        TypeSchema::new("VpnGateway")
            .capability("Named")
            .capability("Deployable"),
    );
    registry.add_type(with(
        TypeSchema::new("PrivateHostedZone")
            .capability("Named")
            .capability("Deployable"),
        vec![field("domain_name", Text), scalar_list("vpc_associations")],
    ));
    registry.add_strategy(
        "PrivateHostedZone",
        "vpc_associations",
        Strategy::ScalarList(Text),
    );
    registry.add_type(with(
        TypeSchema::new("Segment")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("az1_cidr", Text).validator(validators::cidr_or_blank),
            field("az2_cidr", Text).validator(validators::cidr_or_blank),
            field("az3_cidr", Text).validator(validators::cidr_or_blank),
            field("internet_access", Boolean).default(false),
        ],
    ));
    registry.add_type(with(
        TypeSchema::new("SecurityGroup")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("group_name", Text).default(""),
            field("group_description", Text).default(""),
            field("ingress", List),
            field("egress", List),
            field("resource_name", Text).read_only(),
        ],
    ));
    registry.add_strategy("SecurityGroup", "ingress", Strategy::ObjectList("IngressRule"));
    registry.add_strategy("SecurityGroup", "egress", Strategy::ObjectList("EgressRule"));
    registry.add_type(with(
        TypeSchema::new("IngressRule")
            .capability("SecurityGroupRule")
            .invariant(validators::security_group_ports),
        vec![field("source_security_group", REF_OR_TEXT)],
    ));
    registry.add_type(with(
        TypeSchema::new("EgressRule")
            .capability("SecurityGroupRule")
            .invariant(validators::security_group_ports),
        vec![field("destination_security_group", REF_OR_TEXT)],
    ));

    registry.add_type(with(
        TypeSchema::new("VpcPeering")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("peer_account_id", Text).validator(validators::digits),
            field("peer_region", Text).validator(validators::region),
            field("peer_role_name", Text),
            field("peer_vpcid", Text),
            field("routing", List),
        ],
    ));
    registry.add_strategy("VpcPeering", "routing", Strategy::ObjectList("VpcPeeringRoute"));
    registry.add_type(with(
        TypeSchema::new("VpcPeeringRoute"),
        vec![
            field("segment", REF),
            field("cidr", Text).validator(validators::cidr),
        ],
    ));
}

fn applications(registry: &mut SchemaRegistry) {
    registry.add_type(TypeSchema::new("ApplicationEngines").container());
    registry.add_type(with(
        TypeSchema::new("Application")
            .capability("Named")
            .capability("Deployable")
            .capability("Notifiable")
            .capability("Monitorable"),
        vec![field("order", Integer).default(0), field("groups", Object)],
    ));
    registry.add_strategy(
        "Application",
        "groups",
        Strategy::Container {
            container: "ResourceGroups",
            item: "ResourceGroup",
        },
    );
    registry.add_type(TypeSchema::new("ResourceGroups").container());
    registry.add_type(with(
        TypeSchema::new("ResourceGroup")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("order", Integer).required(),
            field("dns_enabled", Boolean).default(true),
            field("resources", Object),
        ],
    ));
    registry.add_strategy(
        "ResourceGroup",
        "resources",
        Strategy::Discriminated {
            container: "Resources",
            registry: "resources",
        },
    );
    registry.add_type(TypeSchema::new("Resources").container());
}

fn resources(registry: &mut SchemaRegistry) {
    for (discriminator, type_name) in RESOURCE_KINDS {
        registry.add_discriminated("resources", discriminator, type_name);
    }

    registry.add_type(with(
        TypeSchema::new("ASG")
            .capability("Resource")
            .capability("Monitorable"),
        vec![
            field("desired_capacity", Integer).default(1),
            field("min_instances", Integer).default(1),
            field("max_instances", Integer).default(2),
            field("instance_ami", REF_OR_TEXT),
            field("instance_type", Text),
            field("instance_key_pair", REF_OR_TEXT),
            field("segment", REF_OR_TEXT),
            scalar_list("security_groups"),
            scalar_list("target_groups"),
            scalar_list("termination_policies"),
            field("health_check_type", Text)
                .default("EC2")
                .validator(validators::health_check_type),
            field("health_check_grace_period_secs", Integer).default(300),
            field("cooldown_secs", Integer).default(300),
            field("associate_public_ip_address", Boolean).default(false),
            field("user_data_script", Text).default(""),
            field("update_policy_max_batch_size", Integer).default(1),
            field("update_policy_min_instances_in_service", Integer).default(1),
        ],
    ));
    registry.add_strategy("ASG", "security_groups", Strategy::ScalarList(REF));
    registry.add_strategy("ASG", "target_groups", Strategy::ScalarList(REF));
    registry.add_strategy("ASG", "termination_policies", Strategy::ScalarList(Text));

    registry.add_type(with(
        TypeSchema::new("LBApplication")
            .capability("Resource")
            .capability("Monitorable"),
        vec![
            field("scheme", Text),
            scalar_list("security_groups"),
            field("segment", Text),
            field("idle_timeout_secs", Integer).default(60),
            field("enable_access_logs", Boolean).default(false),
            field("access_logs_bucket", REF),
            field("access_logs_prefix", Text),
            field("dns", List),
            field("listeners", Dict),
            field("target_groups", Dict),
        ],
    ));
    registry.add_strategy("LBApplication", "security_groups", Strategy::ScalarList(REF));
    registry.add_strategy("LBApplication", "dns", Strategy::ObjectList("Dns"));
    registry.add_strategy("LBApplication", "listeners", Strategy::NamedMap("Listener"));
    registry.add_strategy(
        "LBApplication",
        "target_groups",
        Strategy::NamedMap("TargetGroup"),
    );
    registry.add_type(with(
        TypeSchema::new("TargetGroup")
            .capability("Resource")
            .capability("PortProtocol"),
        vec![
            field("health_check_interval", Integer),
            field("health_check_timeout", Integer),
            field("healthy_threshold", Integer),
            field("unhealthy_threshold", Integer),
            field("health_check_http_code", Text),
            field("health_check_path", Text).default("/"),
            field("connection_drain_timeout", Integer),
        ],
    ));
    registry.add_type(TypeSchema::new("PortProtocol").capability("PortProtocol"));
    registry.add_type(with(
        TypeSchema::new("Listener")
            .capability("Named")
            .capability("PortProtocol"),
        vec![
            field("redirect", Object),
            scalar_list("ssl_certificates"),
            field("target_group", Text),
            field("rules", Dict),
        ],
    ));
    registry.add_strategy("Listener", "redirect", Strategy::Object("PortProtocol"));
    registry.add_strategy("Listener", "ssl_certificates", Strategy::ScalarList(REF));
    registry.add_strategy("Listener", "rules", Strategy::NamedMap("ListenerRule"));
    registry.add_type(with(
        TypeSchema::new("ListenerRule")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("rule_type", Text),
            field("priority", Integer).default(1),
            field("host", Text),
            field("redirect_host", Text),
            field("target_group", Text),
        ],
    ));
    registry.add_type(with(
        TypeSchema::new("Dns"),
        vec![
            field("hosted_zone", REF_OR_TEXT),
            field("domain_name", REF_OR_TEXT),
            field("ssl_certificate", REF),
        ],
    ));

    registry.add_type(with(
        TypeSchema::new("S3Bucket")
            .capability("Resource")
            .capability("ServiceAccountRegion"),
        vec![
            field("bucket_name", Text).required(),
            field("deletion_policy", Text).default("delete"),
            field("versioning", Boolean).default(false),
            field("cloudfront_origin", Boolean).default(false),
            field("policy", List),
        ],
    ));
    registry.add_strategy("S3Bucket", "policy", Strategy::ObjectList("S3BucketPolicy"));
    registry.add_type(with(
        TypeSchema::new("S3BucketPolicy"),
        vec![
            scalar_list("aws"),
            scalar_list("action"),
            field("effect", Text).default("Deny"),
            field("principal", Dict),
            scalar_list("resource_suffix"),
            field("condition", Dict),
        ],
    ));
    for list in ["aws", "action", "resource_suffix"] {
        registry.add_strategy("S3BucketPolicy", list, Strategy::ScalarList(Text));
    }

    registry.add_type(with(
        TypeSchema::new("SNSTopic").capability("Resource"),
        vec![
            field("display_name", Text),
            field("cross_account_access", Boolean).default(false),
            field("subscriptions", List),
        ],
    ));
    registry.add_strategy(
        "SNSTopic",
        "subscriptions",
        Strategy::ObjectList("SnsTopicSubscription"),
    );
    registry.add_type(with(
        TypeSchema::new("SnsTopicSubscription"),
        vec![
            field("protocol", Text)
                .default("email")
                .validator(validators::subscription_protocol),
            field("endpoint", REF_OR_TEXT),
        ],
    ));

    registry.add_type(with(
        TypeSchema::new("Lambda")
            .capability("Resource")
            .capability("Monitorable"),
        vec![
            field("description", Text).required(),
            field("code", Object),
            field("environment", Object),
            field("handler", Text).required(),
            field("memory_size", Integer).default(128),
            field("runtime", Text).default("python3.7"),
            field("timeout", Integer),
            scalar_list("layers"),
        ],
    ));
    registry.add_strategy("Lambda", "code", Strategy::Object("LambdaFunctionCode"));
    registry.add_strategy("Lambda", "environment", Strategy::Object("LambdaEnvironment"));
    registry.add_strategy("Lambda", "layers", Strategy::ScalarList(Text));
    registry.add_type(with(
        TypeSchema::new("LambdaFunctionCode").invariant(validators::lambda_code_source),
        vec![
            field("zipfile", FileReference),
            field("s3_bucket", REF_OR_TEXT),
            field("s3_key", Text),
        ],
    ));
    registry.add_type(with(
        TypeSchema::new("LambdaEnvironment"),
        vec![field("variables", List)],
    ));
    registry.add_strategy(
        "LambdaEnvironment",
        "variables",
        Strategy::ObjectList("LambdaVariable"),
    );
    registry.add_type(with(
        TypeSchema::new("LambdaVariable"),
        vec![field("key", Text).required(), field("value", Text).required()],
    ));

    registry.add_type(with(
        TypeSchema::new("ACM").capability("Resource"),
        vec![
            field("domain_name", Text),
            scalar_list("subject_alternative_names"),
            field("external_resource", Boolean).default(false),
        ],
    ));
    registry.add_strategy(
        "ACM",
        "subject_alternative_names",
        Strategy::ScalarList(Text),
    );
}

fn monitoring(registry: &mut SchemaRegistry) {
    registry.add_type(with(
        TypeSchema::new("MonitorConfig")
            .capability("Named")
            .capability("Deployable")
            .capability("Notifiable"),
        vec![
            field("collection_interval", Integer).default(60),
            field("metrics", List),
            scalar_list("asg_metrics").validator(validators::asg_metrics),
            field("alarm_sets", Dict),
            field("log_sets", Dict),
        ],
    ));
    registry.add_strategy("MonitorConfig", "metrics", Strategy::ObjectList("Metric"));
    registry.add_strategy("MonitorConfig", "asg_metrics", Strategy::ScalarList(Text));
    registry.add_strategy("MonitorConfig", "alarm_sets", Strategy::AlarmSets);
    registry.add_strategy("MonitorConfig", "log_sets", Strategy::LogSets);
    registry.add_type(with(
        TypeSchema::new("Metric").unkeyed(),
        vec![
            field("name", Text).required(),
            scalar_list("measurements"),
            field("collection_interval", Integer),
        ],
    ));
    registry.add_strategy("Metric", "measurements", Strategy::ScalarList(Text));

    registry.add_type(TypeSchema::new("AlarmSets").container());
    registry.add_type(with(
        TypeSchema::new("AlarmSet")
            .capability("Named")
            .capability("Notifiable")
            .container(),
        vec![field("resource_type", Text)],
    ));
    registry.add_type(with(
        TypeSchema::new("CloudWatchAlarm").capability("Alarm"),
        vec![
            field("metric_name", Text).required(),
            field("namespace", Text),
            field("period", Integer).validator(validators::alarm_period),
            field("evaluation_periods", Integer),
            field("threshold", Float),
            field("comparison_operator", Text).validator(validators::comparison_operator),
            field("statistic", Text),
            field("extended_statistic", Text),
            field("treat_missing_data", Text),
            field("dimensions", List),
            field("enable_ok_actions", Boolean).default(false),
            field("enable_insufficient_data_actions", Boolean).default(false),
            field("resource_name", Text).read_only(),
        ],
    ));
    registry.add_strategy("CloudWatchAlarm", "dimensions", Strategy::ObjectList("Dimension"));
    registry.add_type(with(
        TypeSchema::new("Dimension").unkeyed(),
        vec![field("name", Text).required(), field("value", REF_OR_TEXT)],
    ));

    registry.add_type(TypeSchema::new("AlarmNotifications").container());
    registry.add_type(with(
        TypeSchema::new("AlarmNotification"),
        vec![
            scalar_list("groups").required(),
            field("classification", Text).validator(validators::alarm_classification),
            field("severity", Text).validator(validators::alarm_severity),
        ],
    ));
    registry.add_strategy("AlarmNotification", "groups", Strategy::ScalarList(Text));

    registry.add_type(
        TypeSchema::new("NotificationGroups")
            .capability("Named")
            .capability("ServiceAccountRegion")
            .container(),
    );
    registry.add_type(with(
        TypeSchema::new("SnsTopic").capability("Resource"),
        vec![
            field("display_name", Text),
            field("cross_account_access", Boolean).default(false),
            field("subscriptions", List),
        ],
    ));
    registry.add_strategy(
        "SnsTopic",
        "subscriptions",
        Strategy::ObjectList("SnsTopicSubscription"),
    );
}

fn logging(registry: &mut SchemaRegistry) {
    let container = |container: &'static str, item: &'static str| Strategy::Container { container, item };

    registry.add_type(with(
        TypeSchema::new("CloudWatchLogging")
            .capability("Named")
            .capability("Deployable")
            .capability("LogRetention"),
        vec![field("log_sets", Dict)],
    ));
    registry.add_strategy(
        "CloudWatchLogging",
        "log_sets",
        container("CloudWatchLogSets", "CloudWatchLogSet"),
    );
    registry.add_type(TypeSchema::new("CloudWatchLogSets").container());
    registry.add_type(with(
        TypeSchema::new("CloudWatchLogSet")
            .capability("Named")
            .capability("LogRetention"),
        vec![field("log_groups", Dict)],
    ));
    registry.add_strategy(
        "CloudWatchLogSet",
        "log_groups",
        container("CloudWatchLogGroups", "CloudWatchLogGroup"),
    );
    registry.add_type(TypeSchema::new("CloudWatchLogGroups").container());
    registry.add_type(with(
        TypeSchema::new("CloudWatchLogGroup")
            .capability("Named")
            .capability("LogRetention"),
        vec![
            field("log_group_name", Text).default(""),
            field("metric_filters", Dict),
            field("sources", Dict),
        ],
    ));
    registry.add_strategy(
        "CloudWatchLogGroup",
        "metric_filters",
        container("MetricFilters", "MetricFilter"),
    );
    registry.add_strategy(
        "CloudWatchLogGroup",
        "sources",
        container("CloudWatchLogSources", "CloudWatchLogSource"),
    );
    registry.add_type(TypeSchema::new("CloudWatchLogSources").container());
    registry.add_type(with(
        TypeSchema::new("CloudWatchLogSource")
            .capability("Named")
            .capability("LogRetention"),
        vec![
            field("path", Text).required(),
            field("log_stream_name", Text),
            field("multi_line_start_pattern", Text),
            field("timestamp_format", Text),
            field("timezone", Text)
                .default("Local")
                .validator(validators::agent_timezone),
        ],
    ));
    registry.add_type(TypeSchema::new("MetricFilters").container());
    registry.add_type(with(
        TypeSchema::new("MetricFilter").capability("Named"),
        vec![
            field("filter_pattern", Text),
            field("metric_transformations", List),
        ],
    ));
    registry.add_strategy(
        "MetricFilter",
        "metric_transformations",
        Strategy::ObjectList("MetricTransformation"),
    );
    registry.add_type(with(
        TypeSchema::new("MetricTransformation"),
        vec![
            field("default_value", Float),
            field("metric_name", Text).required(),
            field("metric_namespace", Text),
            field("metric_value", Text).required(),
        ],
    ));
}

fn global_resources(registry: &mut SchemaRegistry) {
    registry.add_type(with(
        TypeSchema::new("S3Resource").capability("Named"),
        vec![field("buckets", Dict)],
    ));
    registry.add_strategy("S3Resource", "buckets", Strategy::NamedMap("S3Bucket"));

    registry.add_type(with(
        TypeSchema::new("IamResource").capability("Named"),
        vec![field("users", Dict)],
    ));
    registry.add_strategy("IamResource", "users", Strategy::NamedMap("IamUser"));
    registry.add_type(with(
        TypeSchema::new("IamUser")
            .capability("Named")
            .capability("Deployable"),
        vec![
            field("account", REF).required(),
            field("username", Text),
            field("description", Text),
            field("console_access_enabled", Boolean).default(false),
            field("programmatic_access", Object),
            field("permissions", Dict),
            field("account_whitelist", CommaList),
        ],
    ));
    registry.add_strategy(
        "IamUser",
        "programmatic_access",
        Strategy::Object("IamUserProgrammaticAccess"),
    );
    registry.add_strategy(
        "IamUser",
        "permissions",
        Strategy::Discriminated {
            container: "IamUserPermissions",
            registry: "permissions",
        },
    );
    registry.add_type(with(
        TypeSchema::new("IamUserProgrammaticAccess").capability("Deployable"),
        vec![
            field("access_key_1_version", Integer).default(0),
            field("access_key_2_version", Integer).default(0),
        ],
    ));
    registry.add_type(TypeSchema::new("IamUserPermissions").container());
    for (discriminator, type_name) in PERMISSION_KINDS {
        registry.add_discriminated("permissions", discriminator, type_name);
    }
    registry.add_type(with(
        TypeSchema::new("IamUserPermissionAdministrator").capability("IamUserPermission"),
        vec![field("read_only", Boolean).default(false)],
    ));
    registry.add_type(with(
        TypeSchema::new("IamUserPermissionCodeCommit").capability("IamUserPermission"),
        vec![field("repositories", List)],
    ));
    registry.add_strategy(
        "IamUserPermissionCodeCommit",
        "repositories",
        Strategy::ObjectList("IamUserPermissionCodeCommitRepository"),
    );
    registry.add_type(with(
        TypeSchema::new("IamUserPermissionCodeCommitRepository"),
        vec![
            field("codecommit", REF),
            field("permission", Text).validator(validators::codecommit_permission),
            field("console_access_enabled", Boolean).default(false),
            field("public_ssh_key", Text),
        ],
    ));

    registry.add_type(with(
        TypeSchema::new("Ec2Resource").capability("Named"),
        vec![field("keypairs", Dict)],
    ));
    registry.add_strategy("Ec2Resource", "keypairs", Strategy::NamedMap("Ec2KeyPair"));
    registry.add_type(with(
        TypeSchema::new("Ec2KeyPair")
            .capability("Named")
            .capability("ServiceAccountRegion"),
        vec![field("keypair_name", Text).required()],
    ));
}

fn reference_targets(registry: &mut SchemaRegistry) {
    registry.add_target("Account", targets::account);
    registry.add_target("Network", targets::network);
    registry.add_target("NetworkEnvironment", targets::network);
    registry.add_target("Vpc", targets::vpc);
    registry.add_target("PrivateHostedZone", targets::private_hosted_zone);
    registry.add_target("Segment", targets::segment);
    for type_name in [
        "SecurityGroup",
        "ASG",
        "LBApplication",
        "TargetGroup",
        "S3Bucket",
        "SNSTopic",
        "SnsTopic",
        "Lambda",
        "ACM",
        "IamUser",
        "Ec2KeyPair",
        "CloudWatchAlarm",
        "NotificationGroups",
    ] {
        registry.add_target(type_name, targets::resource);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strategies_reference_known_types() {
        let registry = builtin();
        for schema in registry.types() {
            for descriptor in registry.fields(schema.name) {
                let referenced: Vec<&str> = match registry.strategy(schema.name, descriptor.name) {
                    Some(
                        Strategy::Object(t)
                        | Strategy::NamedMap(t)
                        | Strategy::ObjectList(t)
                        | Strategy::TwoLevelMap(t),
                    ) => vec![*t],
                    Some(Strategy::Container { container, item }) => vec![*container, *item],
                    Some(Strategy::Discriminated { container, .. }) => vec![*container],
                    _ => vec![],
                };
                for type_name in referenced {
                    assert!(
                        registry.get(type_name).is_some(),
                        "{}.{} refers to unknown type {type_name}",
                        schema.name,
                        descriptor.name
                    );
                }
            }
        }
    }

    #[test]
    fn structural_fields_without_strategy_are_plain_data() {
        let registry = builtin();
        assert_eq!(registry.strategy("S3BucketPolicy", "principal"), None);
        assert_eq!(
            registry.strategy("ASG", "monitoring"),
            Some(&Strategy::Object("MonitorConfig"))
        );
    }

    #[test]
    fn discriminators() {
        let registry = builtin();
        assert_eq!(registry.discriminated("resources", "ASG"), Some("ASG"));
        assert_eq!(
            registry.discriminated("permissions", "CodeCommit"),
            Some("IamUserPermissionCodeCommit")
        );
        assert_eq!(registry.discriminated("resources", "RDS"), None);
    }

    #[test]
    fn ec2core() {
        let metric = ec2core_metric();
        assert_eq!(metric.get("name"), Some(&Value::from("ec2core")));
    }
}
