//! Deployment of the bridge contracts from a JSON configuration.

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, B256, U256};
use ethbridge_contracts::precompiles::{
    BRIDGE_ADDRESS, GOVERNANCE_ADDRESS, HUB_ADDRESS, VAULT_ADDRESS, ValidatorSetArgs,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::{
    bridge::{Bridge, BridgeInit},
    checkpoint::compute_checkpoint,
    error::EthBridgeError,
    governance::{Governance, GovernanceInit},
    hub::{BRIDGE_CONTRACT, GOVERNANCE_CONTRACT, Hub, IHub, VAULT_CONTRACT},
    storage::StorageProvider,
    validator_set::{is_normalized, total_power},
    vault::Vault,
};

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} validator set is empty")]
    EmptyValidatorSet(&'static str),

    #[error("{name} validator set has total power {total}, expected 2^32 ± 10")]
    UnnormalizedValidatorSet { name: &'static str, total: U256 },

    #[error("owner must not be the zero address")]
    ZeroOwner,

    #[error("contract addresses must be non-zero and distinct")]
    InvalidAddresses,

    #[error("contract initialization failed: {0}")]
    Contract(#[from] EthBridgeError),
}

/// Validator addresses with their voting power, in signing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorSetConfig(pub IndexMap<Address, u64>);

impl ValidatorSetConfig {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        read_json(path)
    }

    pub fn validators(&self) -> Vec<Address> {
        self.0.keys().copied().collect()
    }

    pub fn powers(&self) -> Vec<U256> {
        self.0.values().map(|power| U256::from(*power)).collect()
    }

    pub fn total_power(&self) -> U256 {
        total_power(&self.powers())
    }

    /// Checks the set is usable as the validator set called `name`.
    pub fn validate(&self, name: &'static str) -> Result<(), GenesisError> {
        if self.0.is_empty() {
            return Err(GenesisError::EmptyValidatorSet(name));
        }
        if !is_normalized(&self.powers()) {
            return Err(GenesisError::UnnormalizedValidatorSet {
                name,
                total: self.total_power(),
            });
        }
        Ok(())
    }

    pub fn checkpoint(&self, version: U256, namespace: &str, nonce: U256) -> B256 {
        compute_checkpoint(version, namespace, &self.validators(), &self.powers(), nonce)
    }

    pub fn args(&self, nonce: U256) -> ValidatorSetArgs {
        ValidatorSetArgs {
            validators: self.validators(),
            powers: self.powers(),
            nonce,
        }
    }
}

impl FromIterator<(Address, u64)> for ValidatorSetConfig {
    fn from_iter<T: IntoIterator<Item = (Address, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentAddresses {
    pub hub: Address,
    pub bridge: Address,
    pub governance: Address,
    pub vault: Address,
}

impl Default for DeploymentAddresses {
    fn default() -> Self {
        Self {
            hub: HUB_ADDRESS,
            bridge: BRIDGE_ADDRESS,
            governance: GOVERNANCE_ADDRESS,
            vault: VAULT_ADDRESS,
        }
    }
}

impl DeploymentAddresses {
    fn validate(&self) -> Result<(), GenesisError> {
        let all = [self.hub, self.bridge, self.governance, self.vault];
        let distinct = all
            .iter()
            .enumerate()
            .all(|(i, addr)| !all[..i].contains(addr));
        if !distinct || all.iter().any(|addr| addr.is_zero()) {
            return Err(GenesisError::InvalidAddresses);
        }
        Ok(())
    }
}

const fn default_version() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(default = "default_version")]
    pub version: u64,
    /// Registers the contracts until deployment completes.
    pub owner: Address,
    pub bridge_validator_set: ValidatorSetConfig,
    #[serde(default)]
    pub next_bridge_validator_set: Option<ValidatorSetConfig>,
    pub governance_validator_set: ValidatorSetConfig,
    /// Bridge cap of each whitelisted token.
    #[serde(default)]
    pub token_whitelist: IndexMap<Address, U256>,
    #[serde(default)]
    pub addresses: DeploymentAddresses,
}

impl DeploymentConfig {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        read_json(path)
    }

    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.owner.is_zero() {
            return Err(GenesisError::ZeroOwner);
        }
        self.addresses.validate()?;
        self.bridge_validator_set.validate("bridge")?;
        if let Some(next) = &self.next_bridge_validator_set {
            next.validate("next bridge")?;
        }
        self.governance_validator_set.validate("governance")
    }
}

/// Contracts and initial checkpoints of a completed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub version: u64,
    pub addresses: DeploymentAddresses,
    pub bridge_validator_set_hash: B256,
    pub next_bridge_validator_set_hash: B256,
    pub governance_validator_set_hash: B256,
}

/// Initializes every contract of `config` and registers them in the hub.
///
/// Nothing is written when any step fails.
pub fn deploy<S: StorageProvider>(
    storage: &mut S,
    config: &DeploymentConfig,
) -> Result<Deployment, GenesisError> {
    config.validate()?;

    let checkpoint = storage.checkpoint();
    match initialize_contracts(storage, config) {
        Ok(deployment) => {
            storage.checkpoint_commit(checkpoint);
            info!(
                hub = %deployment.addresses.hub,
                bridge = %deployment.addresses.bridge,
                governance = %deployment.addresses.governance,
                vault = %deployment.addresses.vault,
                "Deployed bridge contracts"
            );
            Ok(deployment)
        }
        Err(err) => {
            storage.checkpoint_revert(checkpoint);
            Err(err.into())
        }
    }
}

fn initialize_contracts<S: StorageProvider>(
    storage: &mut S,
    config: &DeploymentConfig,
) -> Result<Deployment, EthBridgeError> {
    let addresses = config.addresses;
    let version = U256::from(config.version);

    Hub::new(addresses.hub, storage).initialize(config.owner)?;
    Vault::new(addresses.vault, storage).initialize(addresses.hub)?;

    let mut bridge = Bridge::new(addresses.bridge, storage);
    bridge.initialize(BridgeInit {
        version,
        validators: config.bridge_validator_set.validators(),
        powers: config.bridge_validator_set.powers(),
        next_validator_set: config
            .next_bridge_validator_set
            .as_ref()
            .map(|next| (next.validators(), next.powers())),
        tokens: config.token_whitelist.keys().copied().collect(),
        token_caps: config.token_whitelist.values().copied().collect(),
        hub: addresses.hub,
    })?;
    let bridge_validator_set_hash = bridge.current_validator_set_hash()?;
    let next_bridge_validator_set_hash = bridge.next_validator_set_hash()?;

    let mut governance = Governance::new(addresses.governance, storage);
    governance.initialize(GovernanceInit {
        version,
        validators: config.governance_validator_set.validators(),
        powers: config.governance_validator_set.powers(),
        hub: addresses.hub,
    })?;
    let governance_validator_set_hash = governance.validator_set_hash()?;

    let mut hub = Hub::new(addresses.hub, storage);
    for (name, addr) in [
        (GOVERNANCE_CONTRACT, addresses.governance),
        (BRIDGE_CONTRACT, addresses.bridge),
        (VAULT_CONTRACT, addresses.vault),
    ] {
        debug!(%name, %addr, "Registering contract");
        hub.add_contract(
            config.owner,
            IHub::addContractCall {
                name: name.to_string(),
                addr,
            },
        )?;
    }
    hub.complete_contract_init(config.owner)?;

    Ok(Deployment {
        version: config.version,
        addresses,
        bridge_validator_set_hash,
        next_bridge_validator_set_hash,
        governance_validator_set_hash,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GenesisError> {
    let contents = std::fs::read_to_string(path).map_err(|source| GenesisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| GenesisError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
