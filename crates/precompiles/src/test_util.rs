//! Test utilities for contract dispatch and multisig testing

use crate::{
    Precompile,
    bridge::Bridge,
    checkpoint::compute_checkpoint,
    error::Result,
    genesis::{
        Deployment, DeploymentAddresses, DeploymentConfig, GenesisError, ValidatorSetConfig, deploy,
    },
    governance::Governance,
    hub::Hub,
    storage::hashmap::HashMapStorageProvider,
    token::Token,
    validator_set::normalize_powers,
    vault::Vault,
};
use alloy::{
    primitives::{Address, B256, Bytes, Signature as EcdsaSignature, U256},
    signers::{SignerSync, local::PrivateKeySigner},
    sol_types::SolError,
};
use ethbridge_contracts::precompiles::{Signature, UnknownFunctionSelector, ValidatorSetArgs};

/// Whitelist cap of every token deployed by [`TestEnv`].
pub const TOKEN_CAP: u64 = 1_000_000;
/// Balance of every token held by the vault in [`TestEnv`].
pub const VAULT_FUNDS: u64 = 1_000_000;
/// Balance of every token held by [`TestEnv::user`].
pub const USER_FUNDS: u64 = 10_000;

/// Checks that all selectors in an interface have dispatch handlers.
///
/// Calls each selector with dummy parameters and checks for `UnknownFunctionSelector` reverts.
/// Returns unsupported selectors as `(selector_bytes, function_name)` tuples.
pub fn check_selector_coverage<P: Precompile>(
    precompile: &mut P,
    selectors: &[[u8; 4]],
    interface_name: &str,
    name_lookup: impl Fn([u8; 4]) -> Option<&'static str>,
) -> Vec<([u8; 4], &'static str)> {
    let mut unsupported_selectors = Vec::new();

    for selector in selectors.iter() {
        let mut calldata = selector.to_vec();
        // Add some dummy data for functions that require parameters
        calldata.extend_from_slice(&[0u8; 32]);

        let result = precompile.call(&Bytes::from(calldata), Address::ZERO);
        let is_unsupported = matches!(&result, Ok(output)
            if output.reverted && UnknownFunctionSelector::abi_decode(&output.bytes).is_ok());

        if is_unsupported && let Some(name) = name_lookup(*selector) {
            unsupported_selectors.push((*selector, name));
        }
    }

    // Print unsupported selectors for visibility
    if !unsupported_selectors.is_empty() {
        eprintln!("Unsupported {interface_name} selectors:");
        for (selector, name) in &unsupported_selectors {
            eprintln!("  - {name} ({selector:?})");
        }
    }

    unsupported_selectors
}

/// Asserts that multiple selector coverage checks all pass (no unsupported selectors).
///
/// Takes an iterator of unsupported selector results and panics if any are found.
pub fn assert_full_coverage(results: impl IntoIterator<Item = Vec<([u8; 4], &'static str)>>) {
    let all_unsupported: Vec<_> = results
        .into_iter()
        .flat_map(|r| r.into_iter())
        .map(|(_, name)| name)
        .collect();

    assert!(
        all_unsupported.is_empty(),
        "Found {} unsupported selectors: {:?}",
        all_unsupported.len(),
        all_unsupported
    );
}

/// Converts an alloy signature into the `(r, s, v)` form the contracts take.
pub fn to_abi_signature(signature: &EcdsaSignature) -> Signature {
    Signature {
        r: B256::from(signature.r()),
        s: B256::from(signature.s()),
        v: 27 + signature.v() as u8,
    }
}

/// Validator set backed by local keys.
#[derive(Debug, Clone)]
pub struct TestValidators {
    pub signers: Vec<PrivateKeySigner>,
    pub powers: Vec<U256>,
}

impl TestValidators {
    /// `n` validators sharing the total power equally.
    pub fn equal(n: usize) -> Self {
        Self::weighted(&vec![1; n])
    }

    /// Validators with `raw` weights normalized, largest first.
    pub fn weighted(raw: &[u64]) -> Self {
        Self {
            signers: raw.iter().map(|_| PrivateKeySigner::random()).collect(),
            powers: normalize_powers(raw),
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(PrivateKeySigner::address).collect()
    }

    pub fn args(&self, nonce: U256) -> ValidatorSetArgs {
        ValidatorSetArgs {
            validators: self.addresses(),
            powers: self.powers.clone(),
            nonce,
        }
    }

    pub fn checkpoint(&self, version: U256, namespace: &str, nonce: U256) -> B256 {
        compute_checkpoint(version, namespace, &self.addresses(), &self.powers, nonce)
    }

    pub fn config(&self) -> ValidatorSetConfig {
        self.addresses()
            .into_iter()
            .zip(&self.powers)
            .map(|(address, power)| (address, power.to::<u64>()))
            .collect()
    }

    /// Every validator signs `message` as a personal message.
    pub fn sign(&self, message: B256) -> alloy::signers::Result<Vec<Signature>> {
        self.sign_subset(message, self.signers.len())
    }

    /// The first `count` validators sign `message`, the others leave an empty signature.
    pub fn sign_subset(
        &self,
        message: B256,
        count: usize,
    ) -> alloy::signers::Result<Vec<Signature>> {
        self.signers
            .iter()
            .enumerate()
            .map(|(i, signer)| {
                if i < count {
                    Ok(to_abi_signature(&signer.sign_message_sync(message.as_slice())?))
                } else {
                    Ok(Signature::default())
                }
            })
            .collect()
    }
}

/// Deployed bridge with funded tokens, backed by a [`HashMapStorageProvider`].
#[derive(Debug)]
pub struct TestEnv {
    pub storage: HashMapStorageProvider,
    pub owner: Address,
    pub hub: Address,
    pub bridge: Address,
    pub governance: Address,
    pub vault: Address,
    pub bridge_validators: TestValidators,
    pub governance_validators: TestValidators,
    /// Whitelisted tokens, funded in the vault and in the user's account.
    pub tokens: Vec<Address>,
    pub user: Address,
    pub deployment: Deployment,
}

impl TestEnv {
    /// Deployment with ten equal bridge and governance validators and two tokens.
    pub fn new() -> std::result::Result<Self, GenesisError> {
        Self::with_validators(TestValidators::equal(10), TestValidators::equal(10))
    }

    pub fn with_validators(
        bridge_validators: TestValidators,
        governance_validators: TestValidators,
    ) -> std::result::Result<Self, GenesisError> {
        let mut storage = HashMapStorageProvider::new(1);
        let owner = Address::random();
        let user = Address::random();
        let tokens = vec![Address::random(), Address::random()];
        let addresses = DeploymentAddresses::default();

        let config = DeploymentConfig {
            version: 1,
            owner,
            bridge_validator_set: bridge_validators.config(),
            next_bridge_validator_set: None,
            governance_validator_set: governance_validators.config(),
            token_whitelist: tokens
                .iter()
                .map(|token| (*token, U256::from(TOKEN_CAP)))
                .collect(),
            addresses,
        };
        let deployment = deploy(&mut storage, &config)?;

        for token in &tokens {
            Token::new(*token, &mut storage).initialize(
                &[addresses.vault, user],
                &[U256::from(VAULT_FUNDS), U256::from(USER_FUNDS)],
            )?;
        }

        Ok(Self {
            storage,
            owner,
            hub: addresses.hub,
            bridge: addresses.bridge,
            governance: addresses.governance,
            vault: addresses.vault,
            bridge_validators,
            governance_validators,
            tokens,
            user,
            deployment,
        })
    }

    pub fn hub_contract(&mut self) -> Hub<'_, HashMapStorageProvider> {
        Hub::new(self.hub, &mut self.storage)
    }

    pub fn bridge_contract(&mut self) -> Bridge<'_, HashMapStorageProvider> {
        Bridge::new(self.bridge, &mut self.storage)
    }

    pub fn governance_contract(&mut self) -> Governance<'_, HashMapStorageProvider> {
        Governance::new(self.governance, &mut self.storage)
    }

    pub fn vault_contract(&mut self) -> Vault<'_, HashMapStorageProvider> {
        Vault::new(self.vault, &mut self.storage)
    }

    pub fn token(&mut self, address: Address) -> Token<'_, HashMapStorageProvider> {
        Token::new(address, &mut self.storage)
    }

    pub fn balance_of(&mut self, token: Address, account: Address) -> Result<U256> {
        self.token(token).balance_of(account)
    }
}
