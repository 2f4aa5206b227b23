//! # infratree - typed infrastructure configuration trees
//!
//! Loads a directory of YAML documents describing cloud infrastructure into one typed, cross-referenced tree.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `infratree` works internally.
//!
//! ### Project layout
//!
//! A project is a directory of YAML documents:
//!
//! ```text
//! project.yaml              the root: name, title, active regions
//! project-version.txt       model version the project was written for
//! .credentials.yaml         optional, must only be readable by its owner
//! MonitorConfig/            AlarmSets, Logging, NotificationGroups catalogs
//! Accounts/<name>.yaml      one per account
//! NetworkEnvironments/      one per network environment, with environments and their regions
//! Resources/                global resources: S3, IAM, EC2
//! Services/<Name>.yaml      documents read by service plugins
//! Outputs/                  values recorded by the provisioning side
//! ```
//!
//! Documents are read through [documents::ProjectDocuments], which lists directories in sorted order and keeps the
//! path of every file it read so errors can point at it.
//!
//! ### Values and merging
//!
//! Raw configuration stays a [value::Value] until it is turned into nodes. Environments are written as tiers
//! (base, `default`, region) that are combined with [merge::merge]: mappings merge key by key, anything else is
//! replaced by the higher tier.
//!
//! ### Schema
//!
//! The loader knows nothing about concrete node types. Every type is described in a [schema::SchemaRegistry]: its
//! fields (kind, default, validator, required), the capability sets it inherits fields from, how nested objects are
//! built ([schema::Strategy]) and how references descend into it ([schema::ReferenceTarget]). The built-in
//! types live in [catalog].
//!
//! ### The tree
//!
//! Nodes live in an arena ([tree::Tree]) and are addressed by [tree::NodeId]. A parent owns its children through
//! container entries or node-valued fields ([tree::FieldValue]); the link back to the parent is just an id. Each
//! node remembers the [tree::Slot] it sits in, which is enough to rebuild its path:
//!
//! | **slot**                           | **path segments**          |
//! |------------------------------------|----------------------------|
//! | container child                    | `name`                     |
//! | single object field                | `field`                    |
//! | keyed mapping (`segments: {a: }`)  | `field.key`                |
//! | two level mapping                  | `field.group.key`          |
//! | list of objects                    | `field.index`              |
//!
//! ### References
//!
//! A string of the form `infra.ref <namespace>.<path>` is a [reference::Reference]. While loading, fields holding a
//! reference are deferred. After the whole project is loaded [resolve::Resolver] walks each reference down the tree;
//! types registered as reference targets interpret the remaining path (`.arn`, `.id`, ...). Values that only exist
//! after provisioning resolve to [resolve::Resolved::Pending] unless [outputs::OutputSnapshot] has recorded them.
//!
//! ### Loading
//!
//! [project::ProjectLoader::load_all] drives the whole thing, see the [project] module for the order. The individual
//! nodes are built by [loader::apply].
//!
//! ### Walking
//!
//! [visit::enumerate] lists every node below a start node using only what nodes hold and schema metadata. Enrichment
//! passes and [consistency] checks are written against it.
//!
pub mod catalog;
pub mod consistency;
pub mod documents;
pub mod error;
pub mod loader;
pub mod merge;
pub mod outputs;
pub mod project;
pub mod reference;
pub mod resolve;
pub mod schema;
pub mod tree;
pub mod value;
pub mod visit;

pub use error::{Error, Result};
pub use project::{LoadOptions, ProjectLoader};
pub use tree::{NodeId, Tree};
pub use value::Value;
