//! infratree cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; infratree ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a project and print the whole tree
    Load(LoadCommand),

    /// Load a project and resolve one reference
    ///
    /// Prints `pending` when the value is only known after provisioning
    #[command(alias = "ref")]
    Resolve(ResolveCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct LoadCommand {
    #[clap(flatten)]
    pub project: ProjectArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[clap(flatten)]
    pub project: ProjectArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Reference to resolve, e.g. "infra.ref netenv.mynet.prod.us-west-2.network.vpc"
    pub reference: String,
}

#[derive(Parser, Debug)]
pub struct ProjectArgs {
    /// Project directory
    #[clap(short = 'p', long = "project", default_value = ".")]
    pub directory: PathBuf,

    /// Account passed to `function` references
    #[clap(long = "account", requires("region"))]
    pub account: Option<String>,

    /// Region passed to `function` references
    #[clap(long = "region", requires("account"))]
    pub region: Option<String>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[clap(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Path and type of every node, sorted by path
    Outline,
    /// The raw node arena
    Nodes,
}
