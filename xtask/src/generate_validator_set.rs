use std::{collections::BTreeMap, path::PathBuf};

use alloy::{
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};
use ethbridge_precompiles::{genesis::ValidatorSetConfig, validator_set::normalize_powers};
use eyre::{WrapErr as _, ensure};
use rand::{Rng as _, SeedableRng as _};
use tracing::info;

/// Generates a validator set with random weights normalized to the expected total power.
#[derive(Debug, clap::Parser)]
pub(crate) struct GenerateValidatorSet {
    /// Number of validators in the set
    #[arg(long)]
    validators: usize,

    /// A fixed seed to generate all signing keys. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Output file for the `address -> power` map
    #[arg(short, long)]
    output: PathBuf,

    /// Output file for the `address -> private key` map
    #[arg(long)]
    keys_output: Option<PathBuf>,
}

impl GenerateValidatorSet {
    pub(crate) fn run(self) -> eyre::Result<()> {
        ensure!(self.validators > 0, "a validator set needs at least one validator");

        let mut rng = rand::rngs::StdRng::seed_from_u64(
            self.seed.unwrap_or_else(rand::random::<u64>),
        );
        let mut keys = BTreeMap::<Address, B256>::new();
        while keys.len() < self.validators {
            let secret = B256::from(rng.random::<[u8; 32]>());
            // out-of-range scalars are vanishingly rare, draw again
            let Ok(signer) = PrivateKeySigner::from_bytes(&secret) else {
                continue;
            };
            keys.insert(signer.address(), secret);
        }

        let weights: Vec<u64> = (0..self.validators)
            .map(|_| rng.random_range(1..=100))
            .collect();
        let powers = normalize_powers(&weights);
        let config: ValidatorSetConfig = keys
            .keys()
            .copied()
            .zip(powers.iter().map(|power| power.to::<u64>()))
            .collect();
        config.validate("generated")?;

        write_json(&self.output, &config)?;
        if let Some(path) = &self.keys_output {
            write_json(path, &keys)?;
        }

        info!(
            validators = self.validators,
            total_power = %config.total_power(),
            output = %self.output.display(),
            "Generated validator set"
        );
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).wrap_err("failed encoding JSON")?;
    std::fs::write(path, json)
        .wrap_err_with(|| format!("failed writing to file `{}`", path.display()))
}
