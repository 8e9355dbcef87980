use std::path::PathBuf;

use ethbridge_precompiles::{
    genesis::{DeploymentConfig, deploy},
    storage::hashmap::HashMapStorageProvider,
};
use eyre::WrapErr as _;

/// Dry-runs a deployment against in-memory state and prints the resulting addresses and
/// checkpoints.
#[derive(Debug, clap::Parser)]
pub(crate) struct Deploy {
    /// Deployment config file
    #[arg(long)]
    config: PathBuf,

    #[arg(long, default_value_t = 1)]
    chain_id: u64,

    /// Writes the deployment summary to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Deploy {
    pub(crate) fn run(self) -> eyre::Result<()> {
        let config = DeploymentConfig::load(&self.config)?;
        let mut storage = HashMapStorageProvider::new(self.chain_id);
        let deployment = deploy(&mut storage, &config)?;

        let json = serde_json::to_string_pretty(&deployment)
            .wrap_err("failed encoding deployment as JSON")?;
        match &self.output {
            Some(path) => std::fs::write(path, json)
                .wrap_err_with(|| format!("failed writing deployment to `{}`", path.display()))?,
            None => println!("{json}"),
        }
        Ok(())
    }
}
