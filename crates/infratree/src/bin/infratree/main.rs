mod cli;

use infratree::resolve::{ExecutionContext, Resolved};
use infratree::value::Value;
use infratree::{LoadOptions, ProjectLoader, Tree};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("INFRATREE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Load(load_cli) => load(load_cli),
        cli::Command::Resolve(resolve_cli) => resolve(resolve_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn load(cli: cli::LoadCommand) -> anyhow::Result<()> {
    let (_, tree) = load_project(&cli.project)?;
    output(&cli.output, &tree.to_value(tree.root()))
}

pub fn resolve(cli: cli::ResolveCommand) -> anyhow::Result<()> {
    let (mut loader, tree) = load_project(&cli.project)?;

    anyhow::ensure!(
        infratree::reference::is_reference(&cli.reference),
        "Not a reference: {}",
        cli.reference
    );

    let value = match loader.resolve(&tree, &cli.reference)? {
        Resolved::Value(value) => value,
        Resolved::Node(id) => tree.to_value(id),
        Resolved::Pending(pending) => {
            tracing::info!(reference = %pending, "value is only known after provisioning");
            Value::from("pending")
        }
    };

    output(&cli.output, &value)
}

fn load_project(args: &cli::ProjectArgs) -> anyhow::Result<(ProjectLoader, Tree)> {
    let mut options = LoadOptions::default();
    if let (Some(account), Some(region)) = (&args.account, &args.region) {
        options = options.with_execution_context(ExecutionContext::new(account.clone(), region.clone()));
    }

    let mut loader = ProjectLoader::new(&args.directory, options);
    let tree = loader.load_all()?;

    for warning in loader.warnings() {
        eprintln!("warning: {warning}");
    }

    Ok((loader, tree))
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (infratree-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    let (_, tree) = load_project(&cli.project)?;

    match cli.command {
        Outline => println!("{}", tree.outline()),
        Nodes => println!("{tree:#?}"),
    }

    Ok(())
}
