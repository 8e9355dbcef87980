//! xtask bundles the tools used to prepare and dry-run Ethereum bridge deployments.

use crate::{
    checkpoint::Checkpoint, deploy::Deploy, generate_validator_set::GenerateValidatorSet,
};

use clap::Parser as _;
use eyre::Context;
use tracing_subscriber::EnvFilter;

mod checkpoint;
mod deploy;
mod generate_validator_set;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.action {
        Action::GenerateValidatorSet(args) => {
            args.run().wrap_err("failed generating validator set")
        }
        Action::Checkpoint(args) => args.run().wrap_err("failed computing checkpoint"),
        Action::Deploy(args) => args.run().wrap_err("failed to deploy bridge contracts"),
    }
}

#[derive(Debug, clap::Parser)]
#[command(author)]
#[command(version)]
#[command(about)]
#[command(long_about = None)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, clap::Subcommand)]
enum Action {
    GenerateValidatorSet(GenerateValidatorSet),
    Checkpoint(Checkpoint),
    Deploy(Deploy),
}
