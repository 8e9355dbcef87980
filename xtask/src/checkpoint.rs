use std::path::PathBuf;

use alloy::primitives::U256;
use ethbridge_precompiles::{
    checkpoint::{BRIDGE_NAMESPACE, GOVERNANCE_NAMESPACE},
    genesis::ValidatorSetConfig,
    validator_set::compute_threshold,
};

/// Prints the checkpoint a contract stores for a validator set, with its total power and
/// signing threshold.
#[derive(Debug, clap::Parser)]
pub(crate) struct Checkpoint {
    /// JSON file holding the `address -> power` map
    #[arg(long)]
    validator_set: PathBuf,

    #[arg(long, value_enum)]
    namespace: Namespace,

    #[arg(long, default_value_t = 0)]
    nonce: u64,

    #[arg(long, default_value_t = 1)]
    version: u64,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Namespace {
    Bridge,
    Governance,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => BRIDGE_NAMESPACE,
            Self::Governance => GOVERNANCE_NAMESPACE,
        }
    }
}

impl Checkpoint {
    pub(crate) fn run(self) -> eyre::Result<()> {
        let set = ValidatorSetConfig::load(&self.validator_set)?;
        set.validate(self.namespace.as_str())?;

        let hash = set.checkpoint(
            U256::from(self.version),
            self.namespace.as_str(),
            U256::from(self.nonce),
        );
        println!("checkpoint: {hash}");
        println!("total power: {}", set.total_power());
        println!("threshold: {}", compute_threshold(&set.powers()));
        Ok(())
    }
}
