//! project loading
//!
//! [ProjectLoader::load_all] reads a project directory in a fixed order:
//!
//! 1. `project-version.txt` must match the model version (major and minor)
//! 2. `project.yaml` becomes the tree root
//! 3. `.credentials.yaml`, if present and readable by its owner only
//! 4. `MonitorConfig/` catalogs: alarm sets, logging, notification groups
//! 5. `Accounts/`, one document per account
//! 6. `NetworkEnvironments/`, one document per network environment with its tiers
//! 7. `Resources/`, global resources by document name
//! 8. `Services/`, one document per registered [ServicePlugin]
//!
//! Once the whole tree exists, enrichment passes run over it: deferred references are resolved, ASGs receive
//! the built-in `ec2core` metric and provisioned names are patched back from `Outputs/`. A final consistency check
//! validates alarm notifications.
use crate::catalog;
use crate::consistency::{self, Issue};
use crate::documents::{Document, ProjectDocuments};
use crate::error::{Error, Result};
use crate::loader::{self, create_child};
use crate::merge::{annotate_base, merge};
use crate::outputs::{self, OutputSnapshot};
use crate::reference::REGIONS;
use crate::resolve::{ExecutionContext, FunctionMemo, FunctionProvider, Resolved, Resolver};
use crate::schema::SchemaRegistry;
use crate::tree::{FieldValue, NodeId, Slot, Tree};
use crate::value::{Map, Value};
use crate::visit::{self, EnvironmentRefRewriter, VisitTextMut};
use indexmap::map::Entry;
use std::path::{Path, PathBuf};

pub const PROJECT_VERSION_FILE: &str = "project-version.txt";

/// Major and minor version of this crate, the version of the model it implements
pub fn model_version() -> (u64, u64) {
    let major = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or_default();
    let minor = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or_default();
    (major, minor)
}

fn parse_version(text: &str) -> Option<(u64, u64)> {
    let mut parts = text.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Catalogs read from `MonitorConfig/`, consulted while constructing monitoring nodes
#[derive(Debug, Default, Clone)]
pub struct MonitorCatalogs {
    /// resource type, then alarm set name, then alarm name
    pub alarms: Value,
    /// the whole `Logging` document
    pub logging: Value,
}

/// State of a single load, threaded through every loader call
#[derive(Debug, derive_new::new)]
pub struct LoadContext {
    pub schema: SchemaRegistry,
    pub project_dir: PathBuf,
    /// document currently being read
    #[new(default)]
    pub read_file_path: Option<PathBuf>,
    #[new(default)]
    pub monitor: MonitorCatalogs,
    #[new(default)]
    pub outputs: OutputSnapshot,
    #[new(default)]
    pub memo: FunctionMemo,
    #[new(default)]
    pub warnings: Vec<String>,
}

impl LoadContext {
    pub fn source(&self) -> Option<&Path> {
        self.read_file_path.as_deref()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Contributes a sub-tree from a `Services/<name>.yaml` document
pub trait ServicePlugin {
    /// document name, the lower-cased name is the key below the root
    fn name(&self) -> &str;

    fn load(&self, tree: &mut Tree, ctx: &LoadContext, config: &Value) -> Result<NodeId>;
}

/// Builds the service document as a node of one schema type
#[derive(Debug, derive_new::new)]
pub struct SchemaServicePlugin {
    name: String,
    type_name: &'static str,
}

impl ServicePlugin for SchemaServicePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, tree: &mut Tree, ctx: &LoadContext, config: &Value) -> Result<NodeId> {
        let root = tree.root();
        create_child(tree, ctx, root, self.type_name, &self.name.to_lowercase(), config)
    }
}

#[derive(derive_new::new)]
pub struct LoadOptions {
    #[new(value = "catalog::builtin()")]
    pub schema: SchemaRegistry,
    #[new(default)]
    pub function_provider: Option<Box<dyn FunctionProvider>>,
    #[new(default)]
    pub execution_context: Option<ExecutionContext>,
    #[new(default)]
    pub service_plugins: Vec<Box<dyn ServicePlugin>>,
    #[new(value = "model_version()")]
    pub model_version: (u64, u64),
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadOptions {
    /// Replace the built-in schema, e.g. to register service types
    pub fn with_schema(mut self, schema: SchemaRegistry) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_function_provider(mut self, provider: impl FunctionProvider + 'static) -> Self {
        self.function_provider = Some(Box::new(provider));
        self
    }

    pub fn with_execution_context(mut self, context: ExecutionContext) -> Self {
        self.execution_context = Some(context);
        self
    }

    pub fn with_service_plugin(mut self, plugin: impl ServicePlugin + 'static) -> Self {
        self.service_plugins.push(Box::new(plugin));
        self
    }

    pub fn with_model_version(mut self, major: u64, minor: u64) -> Self {
        self.model_version = (major, minor);
        self
    }
}

/// One tier of an environment, with everything it is merged from
struct Tier<'c> {
    env: &'c str,
    name: &'c str,
    /// the tier's own document section
    config: &'c Value,
    /// the environment's `default` section
    default: &'c Value,
    /// the network environment's base `network`
    network: &'c Value,
    /// the network environment's base `applications`
    applications: &'c Value,
}

impl Tier<'_> {
    fn is_default(&self) -> bool {
        self.name == "default"
    }

    fn section(config: &Value, key: &str) -> Value {
        config.get(key).cloned().unwrap_or_default()
    }
}

pub struct ProjectLoader {
    documents: ProjectDocuments,
    ctx: LoadContext,
    function_provider: Option<Box<dyn FunctionProvider>>,
    execution_context: Option<ExecutionContext>,
    service_plugins: Vec<Box<dyn ServicePlugin>>,
    model_version: (u64, u64),
}

impl ProjectLoader {
    pub fn new(project_dir: impl Into<PathBuf>, options: LoadOptions) -> Self {
        let project_dir = project_dir.into();
        Self {
            documents: ProjectDocuments::new(project_dir.clone()),
            ctx: LoadContext::new(options.schema, project_dir),
            function_provider: options.function_provider,
            execution_context: options.execution_context,
            service_plugins: options.service_plugins,
            model_version: options.model_version,
        }
    }

    pub fn context(&self) -> &LoadContext {
        &self.ctx
    }

    /// Non-fatal problems found during the load
    pub fn warnings(&self) -> &[String] {
        &self.ctx.warnings
    }

    /// Resolver over the state of this load
    pub fn resolver(&mut self) -> Resolver<'_> {
        Resolver::new(
            &self.ctx.schema,
            &self.ctx.outputs,
            self.function_provider.as_deref(),
            self.execution_context.as_ref(),
            &mut self.ctx.memo,
        )
    }

    /// Resolve reference text against a loaded tree
    pub fn resolve(&mut self, tree: &Tree, text: &str) -> Result<Resolved> {
        self.resolver().resolve_text(tree, text)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn load_all(&mut self) -> Result<Tree> {
        tracing::info!(path = %self.documents.root().display(), "loading project");

        let version = self.check_version()?;
        let mut tree = self.load_project(&version)?;
        self.load_credentials(&mut tree)?;
        self.load_monitor_config(&mut tree)?;
        self.load_accounts(&mut tree)?;
        self.load_network_environments(&mut tree)?;
        self.load_resources(&mut tree)?;
        self.load_services(&mut tree)?;
        self.ctx.read_file_path = None;

        self.ctx.outputs = OutputSnapshot::load(&mut self.documents)?;
        self.resolve_deferred(&mut tree)?;
        self.add_computed_metrics(&mut tree)?;
        let patched = outputs::patch_outputs(&mut tree, &self.ctx.schema, &self.ctx.outputs);
        tracing::debug!(patched, "patched provisioned names");

        self.check_consistency(&mut tree)?;

        tracing::info!(
            nodes = tree.len(),
            documents = self.documents.sources().len(),
            "project loaded"
        );
        Ok(tree)
    }

    fn read(&mut self, path: &Path) -> Result<Document> {
        let document = self.documents.load_file(path)?;
        self.ctx.read_file_path = Some(document.path.clone());
        Ok(document)
    }

    fn read_directory(&mut self, dir: &str) -> Result<Vec<Document>> {
        self.documents.load_directory(dir)
    }

    fn check_version(&mut self) -> Result<String> {
        let path = self.documents.root().join(PROJECT_VERSION_FILE);
        if !path.is_file() {
            return Err(Error::invalid_file(
                Some(path.as_path()),
                format!("Missing {PROJECT_VERSION_FILE}, the project version must be declared"),
            ));
        }

        let declared = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(&path, e))?
            .trim()
            .to_string();
        let (major, minor) = self.model_version;
        if parse_version(&declared) != Some((major, minor)) {
            return Err(Error::VersionMismatch {
                project: declared,
                model: format!("{major}.{minor}"),
            });
        }

        tracing::debug!(version = %declared, "project version");
        Ok(declared)
    }

    fn load_project(&mut self, version: &str) -> Result<Tree> {
        let path = self.documents.find("project").ok_or_else(|| {
            Error::invalid_file(
                Some(self.documents.root().join("project.yaml").as_path()),
                "Missing project document",
            )
        })?;
        let document = self.read(&path)?;

        let mut tree = Tree::new("Project", "");
        let root = tree.root();
        tree.node_mut(root).source = Some(document.path.clone());
        loader::apply(&mut tree, &self.ctx, root, &document.value)?;
        tree.node_mut(root).fields.insert(
            "project_version".to_string(),
            FieldValue::Value(version.into()),
        );

        for (key, type_name) in [
            ("accounts", "Accounts"),
            ("netenv", "NetworkEnvironments"),
            ("s3", "S3Resource"),
        ] {
            create_child(&mut tree, &self.ctx, root, type_name, key, &Value::Null)?;
        }
        Ok(tree)
    }

    fn load_credentials(&mut self, tree: &mut Tree) -> Result<()> {
        let Some(path) = self.documents.find(".credentials") else {
            tracing::debug!("no credentials document");
            return Ok(());
        };

        check_credentials_mode(&path)?;
        let document = self.read(&path)?;
        let root = tree.root();
        create_child(tree, &self.ctx, root, "Credentials", "credentials", &document.value)?;
        Ok(())
    }

    fn load_monitor_config(&mut self, tree: &mut Tree) -> Result<()> {
        let root = tree.root();
        for document in self.read_directory("MonitorConfig")? {
            self.ctx.read_file_path = Some(document.path.clone());

            match document.stem.as_str() {
                "AlarmSets" => self.ctx.monitor.alarms = document.value,
                "Logging" => {
                    if let Some(logging) = document.value.get("cw_logging") {
                        create_child(tree, &self.ctx, root, "CloudWatchLogging", "cw_logging", logging)?;
                    }
                    self.ctx.monitor.logging = document.value;
                }
                "NotificationGroups" => self.load_notification_groups(tree, &document)?,
                other => self.ctx.warn(format!("Skipping unknown MonitorConfig document '{other}'")),
            }
        }
        Ok(())
    }

    fn load_notification_groups(&mut self, tree: &mut Tree, document: &Document) -> Result<()> {
        let Some(groups) = document.value.get("groups").and_then(Value::as_object) else {
            return Err(Error::invalid_file(
                Some(document.path.as_path()),
                "NotificationGroups does not have a top-level `groups:`.",
            ));
        };

        let mut config = document.value.as_object().cloned().unwrap_or_default();
        config.shift_remove("groups");

        let root = tree.root();
        let container = create_child(
            tree,
            &self.ctx,
            root,
            "NotificationGroups",
            "notificationgroups",
            &Value::Object(config),
        )?;
        for (name, group) in groups {
            create_child(tree, &self.ctx, container, "SnsTopic", name, group)?;
        }
        Ok(())
    }

    fn load_accounts(&mut self, tree: &mut Tree) -> Result<()> {
        let accounts = root_child(tree, "accounts")?;
        for document in self.read_directory("Accounts")? {
            self.ctx.read_file_path = Some(document.path.clone());
            create_child(tree, &self.ctx, accounts, "Account", &document.stem, &document.value)?;
        }
        Ok(())
    }

    fn load_network_environments(&mut self, tree: &mut Tree) -> Result<()> {
        for document in self.read_directory("NetworkEnvironments")? {
            self.ctx.read_file_path = Some(document.path.clone());
            self.load_network_environment(tree, &document)?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(netenv = %document.stem))]
    fn load_network_environment(&mut self, tree: &mut Tree, document: &Document) -> Result<()> {
        let config = &document.value;
        let Some(network) = config.get("network").filter(|network| !network.is_null()) else {
            self.ctx.warn(format!(
                "Network environment '{}' has no network, skipping",
                document.stem
            ));
            return Ok(());
        };

        let netenvs = root_child(tree, "netenv")?;
        let netenv = create_child(tree, &self.ctx, netenvs, "NetworkEnvironment", &document.stem, network)?;

        let applications = config.get("applications").unwrap_or(&Value::Null);
        let Some(environments) = config.get("environments").and_then(Value::as_object) else {
            return Ok(());
        };

        for (env_name, env_config) in environments {
            let env_config = env_config.as_object().ok_or_else(|| {
                Error::invalid_file(
                    self.ctx.source(),
                    format!("Environment '{env_name}' must be a mapping"),
                )
            })?;

            if let Some(tier) = env_config
                .keys()
                .find(|key| !matches!(key.as_str(), "title" | "default") && !REGIONS.contains(&key.as_str()))
            {
                return Err(Error::invalid_file(
                    self.ctx.source(),
                    format!("Environment region name is not valid: {tier} in environment {env_name}"),
                ));
            }

            let default = env_config.get("default").unwrap_or(&Value::Null);
            if default.get("network").is_none() {
                return Err(Error::invalid_file(
                    self.ctx.source(),
                    format!("Default Environment {env_name} must have base network config"),
                ));
            }

            let title: Value = env_config
                .get("title")
                .map(|title| [("title", title.clone())].into_iter().collect())
                .unwrap_or_default();
            let env = create_child(tree, &self.ctx, netenv, "Environment", env_name, &title)?;

            for (tier_name, tier_config) in env_config {
                if tier_name == "title" {
                    continue;
                }
                let tier = Tier {
                    env: env_name,
                    name: tier_name,
                    config: tier_config,
                    default,
                    network,
                    applications,
                };
                self.load_environment_tier(tree, env, &tier)?;
            }
        }

        Ok(())
    }

    /// Instantiate one tier: base, then `default`, then the region
    fn load_environment_tier(&mut self, tree: &mut Tree, env: NodeId, tier: &Tier) -> Result<()> {
        tracing::debug!(env = tier.env, tier = tier.name, "merging environment tier");

        let (type_name, merged) = match tier.is_default() {
            true => ("EnvironmentDefault", tier.default.clone()),
            false => ("EnvironmentRegion", merge(tier.default, tier.config)),
        };

        let mut fields: Map = merged.as_object().cloned().unwrap_or_default();
        fields.shift_remove("network");
        fields.shift_remove("applications");
        let node = create_child(tree, &self.ctx, env, type_name, tier.name, &Value::Object(fields))?;

        let default_network = Tier::section(tier.default, "network");
        let below = merge(tier.network, &default_network);
        let (network_config, override_config, base_config) = match tier.is_default() {
            true => (below, default_network, tier.network.clone()),
            false => {
                let region_network = Tier::section(tier.config, "network");
                (merge(&below, &region_network), region_network, below)
            }
        };
        let network = loader::create(tree, &self.ctx, node, Slot::Field, "Network", "network", &network_config)?;
        annotate_base(tree, network, &override_config, &base_config);
        tree.node_mut(node)
            .fields
            .insert("network".to_string(), FieldValue::Node(network));

        let engines = loader::create(
            tree,
            &self.ctx,
            node,
            Slot::Field,
            "ApplicationEngines",
            "applications",
            &Value::Null,
        )?;
        tree.node_mut(node)
            .fields
            .insert("applications".to_string(), FieldValue::Node(engines));

        let tier_applications = merged.get("applications").and_then(Value::as_object);
        for app_name in tier_applications.into_iter().flat_map(|apps| apps.keys()) {
            let base_app = tier.applications.get(app_name).ok_or_else(|| {
                Error::invalid_file(
                    self.ctx.source(),
                    format!(
                        "Application '{app_name}' of environment '{}' is not defined in the base applications",
                        tier.env
                    ),
                )
            })?;

            let default_app = Tier::section(&Tier::section(tier.default, "applications"), app_name);
            let below = merge(base_app, &default_app);
            let (app_config, override_config, base_config) = match tier.is_default() {
                true => (below, default_app, base_app.clone()),
                false => {
                    let region_app = Tier::section(&Tier::section(tier.config, "applications"), app_name);
                    (merge(&below, &region_app), region_app, below)
                }
            };

            let app = create_child(tree, &self.ctx, engines, "Application", app_name, &app_config)?;
            annotate_base(tree, app, &override_config, &base_config);
        }

        if !tier.is_default() {
            let mut rewriter = EnvironmentRefRewriter::new(tier.env, tier.name);
            for id in visit::enumerate(tree, &self.ctx.schema, node) {
                tree.node_mut(id).visit_text_mut(&mut rewriter);
            }
        }

        Ok(())
    }

    fn load_resources(&mut self, tree: &mut Tree) -> Result<()> {
        let root = tree.root();
        for document in self.read_directory("Resources")? {
            self.ctx.read_file_path = Some(document.path.clone());

            match document.stem.as_str() {
                "S3" => {
                    let s3 = root_child(tree, "s3")?;
                    loader::apply(tree, &self.ctx, s3, &document.value)?;
                }
                "IAM" => {
                    create_child(tree, &self.ctx, root, "IamResource", "iam", &document.value)?;
                }
                "EC2" => {
                    create_child(tree, &self.ctx, root, "Ec2Resource", "ec2", &document.value)?;
                }
                other => self.ctx.warn(format!("Skipping unsupported global resource document '{other}'")),
            }
        }
        Ok(())
    }

    fn load_services(&mut self, tree: &mut Tree) -> Result<()> {
        let plugins = std::mem::take(&mut self.service_plugins);
        let mut outcome = Ok(());

        for plugin in &plugins {
            let Some(path) = self.documents.find(&format!("Services/{}", plugin.name())) else {
                tracing::debug!(service = plugin.name(), "no service document");
                continue;
            };

            outcome = self
                .read(&path)
                .and_then(|document| plugin.load(tree, &self.ctx, &document.value).map(|_| ()));
            if outcome.is_err() {
                break;
            }
        }

        self.service_plugins = plugins;
        outcome
    }

    /// Resolve every deferred reference, pending results keep their deferred text
    ///
    /// Everything of a network environment outside its region tiers (the base network, `default` tiers) is a
    /// template for the regions and keeps its unspecialized references.
    fn resolve_deferred(&mut self, tree: &mut Tree) -> Result<()> {
        let ids: Vec<NodeId> = visit::enumerate(tree, &self.ctx.schema, tree.root())
            .into_iter()
            .filter(|id| !is_template(tree, *id))
            .collect();
        let mut resolver = self.resolver();
        let (mut resolved, mut pending) = (0, 0);

        for id in ids {
            let deferred: Vec<(String, String)> = tree
                .node(id)
                .deferred
                .iter()
                .map(|(field, raw)| (field.clone(), raw.clone()))
                .collect();

            for (field, raw) in deferred {
                let value = match resolver.resolve_text(tree, &raw)? {
                    Resolved::Value(value) => FieldValue::Value(value),
                    Resolved::Node(target) => FieldValue::Link(target),
                    Resolved::Pending(marker) => {
                        pending += 1;
                        tree.node_mut(id).fields.insert(field, FieldValue::Pending(marker));
                        continue;
                    }
                };

                resolved += 1;
                let node = tree.node_mut(id);
                node.fields.insert(field.clone(), value);
                node.deferred.shift_remove(&field);
            }
        }

        tracing::debug!(resolved, pending, "resolved deferred references");
        Ok(())
    }

    /// ASGs collect the built-in `ec2core` metric first
    fn add_computed_metrics(&mut self, tree: &mut Tree) -> Result<()> {
        let asgs: Vec<NodeId> = visit::enumerate(tree, &self.ctx.schema, tree.root())
            .into_iter()
            .filter(|id| tree.node(*id).type_name == "ASG")
            .collect();
        let metric = catalog::ec2core_metric();

        for asg in &asgs {
            let existing = match tree.node(*asg).field("monitoring") {
                Some(FieldValue::Node(monitoring)) => Some(*monitoring),
                _ => None,
            };
            let monitoring = match existing {
                Some(monitoring) => monitoring,
                None => {
                    let monitoring = loader::create(
                        tree,
                        &self.ctx,
                        *asg,
                        Slot::Field,
                        "MonitorConfig",
                        "monitoring",
                        &Value::Null,
                    )?;
                    tree.node_mut(*asg)
                        .fields
                        .insert("monitoring".to_string(), FieldValue::Node(monitoring));
                    monitoring
                }
            };

            let slot = Slot::Item {
                field: "metrics".to_string(),
            };
            let id = loader::create(tree, &self.ctx, monitoring, slot, "Metric", "ec2core", &metric)?;

            match tree.node_mut(monitoring).fields.entry("metrics".to_string()) {
                Entry::Occupied(mut entry) => match entry.get_mut() {
                    FieldValue::List(metrics) => metrics.insert(0, id),
                    other => *other = FieldValue::List(vec![id]),
                },
                Entry::Vacant(entry) => {
                    entry.insert(FieldValue::List(vec![id]));
                }
            }
        }

        tracing::debug!(count = asgs.len(), "added computed metrics");
        Ok(())
    }

    fn check_consistency(&mut self, tree: &mut Tree) -> Result<()> {
        let issues = consistency::check_notifications(tree, &self.ctx.schema);
        for issue in issues.warnings() {
            match issue {
                Issue::NoNotificationGroups => tracing::debug!("{issue}"),
                _ => self.ctx.warn(issue.to_string()),
            }
        }

        if issues.has_fatal() {
            return Err(Error::invalid_file(None, issues.to_string()));
        }
        Ok(())
    }
}

/// Part of a network environment that only exists to be merged into region tiers
fn is_template(tree: &Tree, id: NodeId) -> bool {
    tree.ancestor_of_type(id, "NetworkEnvironment").is_some()
        && tree.ancestor_of_type(id, "EnvironmentRegion").is_none()
}

fn root_child(tree: &Tree, key: &str) -> Result<NodeId> {
    tree.child(tree.root(), key)
        .ok_or_else(|| Error::invalid_file(None, format!("Project has no '{key}' node")))
}

#[cfg(unix)]
fn check_credentials_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.permissions().mode() & 0o777 != 0o400 {
        return Err(Error::PermissionError {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_credentials_mode(_path: &Path) -> Result<()> {
    Ok(())
}
