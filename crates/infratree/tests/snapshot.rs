//! Snapshot tests
//!
//! Loads the project in /tests/fixtures/demo and compares the outline of the loaded tree.

use infratree::{LoadOptions, ProjectLoader};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn demo_outline() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("INFRATREE_LOG"))
        .with_writer(std::io::stderr)
        .try_init();

    let mut loader = ProjectLoader::new(fixture("demo"), LoadOptions::default());
    let tree = loader.load_all().expect("demo project loads");

    insta::assert_snapshot!(tree.outline(), @r"
    . Project
    accounts Accounts
    accounts.master Account
    iam IamResource
    iam.users.deployer IamUser
    iam.users.deployer.permissions IamUserPermissions
    iam.users.deployer.permissions.admin IamUserPermissionAdministrator
    iam.users.deployer.programmatic_access IamUserProgrammaticAccess
    netenv NetworkEnvironments
    netenv.mynet NetworkEnvironment
    netenv.mynet.prod Environment
    netenv.mynet.prod.default EnvironmentDefault
    netenv.mynet.prod.default.applications ApplicationEngines
    netenv.mynet.prod.default.applications.app Application
    netenv.mynet.prod.default.applications.app.groups ResourceGroups
    netenv.mynet.prod.default.applications.app.groups.site ResourceGroup
    netenv.mynet.prod.default.applications.app.groups.site.resources Resources
    netenv.mynet.prod.default.applications.app.groups.site.resources.lb LBApplication
    netenv.mynet.prod.default.applications.app.groups.site.resources.web ASG
    netenv.mynet.prod.default.applications.app.groups.site.resources.web.monitoring MonitorConfig
    netenv.mynet.prod.default.applications.app.groups.site.resources.web.monitoring.alarm_sets AlarmSets
    netenv.mynet.prod.default.applications.app.groups.site.resources.web.monitoring.alarm_sets.instance-health AlarmSet
    netenv.mynet.prod.default.applications.app.groups.site.resources.web.monitoring.alarm_sets.instance-health.CPUHigh CloudWatchAlarm
    netenv.mynet.prod.default.applications.app.groups.site.resources.web.monitoring.metrics.0 Metric
    netenv.mynet.prod.default.applications.app.notifications AlarmNotifications
    netenv.mynet.prod.default.applications.app.notifications.app AlarmNotification
    netenv.mynet.prod.default.network Network
    netenv.mynet.prod.default.network.vpc Vpc
    netenv.mynet.prod.default.network.vpc.segments.private Segment
    netenv.mynet.prod.default.network.vpc.segments.public Segment
    netenv.mynet.prod.us-west-2 EnvironmentRegion
    netenv.mynet.prod.us-west-2.applications ApplicationEngines
    netenv.mynet.prod.us-west-2.applications.app Application
    netenv.mynet.prod.us-west-2.applications.app.groups ResourceGroups
    netenv.mynet.prod.us-west-2.applications.app.groups.site ResourceGroup
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources Resources
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.lb LBApplication
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web ASG
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web.monitoring MonitorConfig
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web.monitoring.alarm_sets AlarmSets
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web.monitoring.alarm_sets.instance-health AlarmSet
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web.monitoring.alarm_sets.instance-health.CPUHigh CloudWatchAlarm
    netenv.mynet.prod.us-west-2.applications.app.groups.site.resources.web.monitoring.metrics.0 Metric
    netenv.mynet.prod.us-west-2.applications.app.notifications AlarmNotifications
    netenv.mynet.prod.us-west-2.applications.app.notifications.app AlarmNotification
    netenv.mynet.prod.us-west-2.network Network
    netenv.mynet.prod.us-west-2.network.vpc Vpc
    netenv.mynet.prod.us-west-2.network.vpc.segments.private Segment
    netenv.mynet.prod.us-west-2.network.vpc.segments.public Segment
    netenv.mynet.vpc Vpc
    netenv.mynet.vpc.segments.private Segment
    netenv.mynet.vpc.segments.public Segment
    notificationgroups NotificationGroups
    notificationgroups.ops SnsTopic
    notificationgroups.ops.subscriptions.0 SnsTopicSubscription
    s3 S3Resource
    s3.buckets.logs S3Bucket
    ");
}
