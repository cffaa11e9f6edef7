mod commands;
mod utils;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gatewire")]
#[command(
    about = "Declare an API Gateway -> VPC link -> internal NLB -> EC2 stack and deploy it with CloudFormation",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the stack file
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Stack file (default: discovered stack.kdl)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
    /// Target AWS account id
    #[arg(long, env = "GATEWIRE_ACCOUNT", global = true)]
    pub account: Option<String>,
    /// Target AWS region
    #[arg(long, env = "GATEWIRE_REGION", global = true)]
    pub region: Option<String>,
    /// AWS CLI / SDK profile
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,
    /// Stack name
    #[arg(long, env = "GATEWIRE_STACK", global = true)]
    pub stack_name: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials and machine images in the target account
    Bootstrap,
    /// Synthesize and deploy the stack
    Deploy {
        /// Deploy without asking (otherwise only the plan is shown)
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete the deployed stack
    Destroy {
        /// Delete without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the CloudFormation template
    Synth {
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: TemplateFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the declarations in order and check the stack
    Validate,
    /// Compare the stack with what is deployed
    Diff,
    /// Show the outputs of the last deploy
    Outputs {
        /// Ask CloudFormation instead of reading local state
        #[arg(long)]
        refresh: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // logs go to stderr so synth output stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("gatewire {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project_root = std::env::current_dir()?;
    let loaded = utils::load_config(&cli.target)?;

    match cli.command {
        Commands::Bootstrap => commands::bootstrap::handle(&loaded, &project_root).await?,
        Commands::Deploy { yes } => commands::deploy::handle(&loaded, &project_root, yes).await?,
        Commands::Destroy { yes } => {
            commands::destroy::handle(&loaded, &project_root, yes).await?
        }
        Commands::Synth { format, out } => commands::synth::handle(&loaded, format, out)?,
        Commands::Validate => commands::validate::handle(&loaded)?,
        Commands::Diff => commands::diff::handle(&loaded, &project_root).await?,
        Commands::Outputs { refresh } => {
            commands::outputs::handle(&loaded, &project_root, refresh).await?
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
