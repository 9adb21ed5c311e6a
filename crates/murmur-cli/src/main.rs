use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;
mod render;
mod runtime;

use runtime::GlobalOpts;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "murmur - a group chat with a roster of simulated personas", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the personas (default)
    Chat,
    /// Have every persona weigh in on a topic, then exit
    Discuss {
        /// Topic to discuss
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
    },
    /// List the persona roster
    Personas,
    /// List the configured models and their fallback chains
    Models,
    /// Write default settings and roster files
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "murmur=warn",
        1 => "murmur=info",
        _ => "murmur=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Turns go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(&cli.opts).await?,
        Commands::Discuss { topic } => commands::discuss::run(&cli.opts, &topic.join(" ")).await?,
        Commands::Personas => commands::personas::run(&cli.opts).await?,
        Commands::Models => commands::models::run(&cli.opts).await?,
        Commands::Init { force } => commands::init::run(&cli.opts, force).await?,
    }

    Ok(())
}
