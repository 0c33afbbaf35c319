use clap::{Parser, Subcommand};

use crate::{compute::ComputeArgs, report::print_modes};

mod compute;
mod input;
mod report;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute distances from every property to every active interest point
    #[command(visible_alias = "c")]
    Compute {
        #[command(flatten)]
        args: ComputeArgs,
    },
    /// List the supported transportation modes and their HERE names
    Modes,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Compute { args }) => compute::run(args).await?,
        Some(Commands::Modes) => print_modes(),
        None => {}
    }

    Ok(())
}
