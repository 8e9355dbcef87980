pub mod dispatch;

pub use ethbridge_contracts::precompiles::{GovernanceError, GovernanceEvent, IGovernance};

use alloy::primitives::{Address, B256, IntoLogData, U256};
use ethbridge_contracts::precompiles::{Signature, ValidatorSetArgs};
use tracing::trace;

use crate::{
    bridge::{Bridge, BridgeError, IBridge},
    checkpoint::{
        ADD_CONTRACT_ACTION, GOVERNANCE_NAMESPACE, UPGRADE_CONTRACT_ACTION, compute_checkpoint,
        contract_message, update_bridge_whitelist_message, update_validators_set_message,
        upgrade_bridge_contract_message, validator_set_checkpoint, withdraw_message,
    },
    error::{EthBridgeError, Result},
    hub::{BRIDGE_CONTRACT, Hub, IHub, VAULT_CONTRACT},
    nonce::NonceLedger,
    storage::{StorageOps, StorageProvider},
    validator_set::{ValidatorSetArgsExt, is_normalized},
    vault::{IVault, Vault},
};

mod slots {
    use alloy::primitives::{U256, uint};

    pub(super) const HUB: U256 = uint!(0_U256);
    pub(super) const VERSION: U256 = uint!(1_U256);
    pub(super) const VALIDATOR_SET_HASH: U256 = uint!(2_U256);
    pub(super) const VALIDATOR_SET_NONCE: U256 = uint!(3_U256);
    pub(super) const WITHDRAW_NONCE: U256 = uint!(4_U256);
    pub(super) const WHITELIST_NONCE: U256 = uint!(5_U256);
}

/// Parameters governance is deployed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GovernanceInit {
    pub version: U256,
    pub validators: Vec<Address>,
    pub powers: Vec<U256>,
    pub hub: Address,
}

/// Validator-controlled administration of the bridge.
///
/// Registry edits, validator set rotations and whitelist changes are signed by the current
/// bridge validator set. Withdrawals from the vault are signed by governance's own set.
#[derive(Debug)]
pub struct Governance<'a, S: StorageProvider> {
    address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Governance<'a, S> {
    pub fn new(address: Address, storage: &'a mut S) -> Self {
        Self { address, storage }
    }

    pub fn initialize(&mut self, init: GovernanceInit) -> Result<()> {
        trace!(
            address=%self.address,
            version=%init.version,
            validators=init.validators.len(),
            "Initializing governance"
        );

        if !self.hub()?.is_zero() {
            return Err(GovernanceError::already_initialized().into());
        }
        if init.hub.is_zero() {
            return Err(GovernanceError::invalid_address().into());
        }
        if init.version > U256::from(u8::MAX) {
            return Err(GovernanceError::invalid_version().into());
        }
        if init.validators.len() != init.powers.len() {
            return Err(GovernanceError::malformed_input().into());
        }
        if !is_normalized(&init.powers) {
            return Err(GovernanceError::invalid_voting_power_threshold().into());
        }

        let hash = compute_checkpoint(
            init.version,
            GOVERNANCE_NAMESPACE,
            &init.validators,
            &init.powers,
            U256::ZERO,
        );
        self.write(slots::HUB, init.hub)?;
        self.write(slots::VERSION, init.version)?;
        self.write(slots::VALIDATOR_SET_HASH, hash)
    }

    // View functions
    pub fn hub(&mut self) -> Result<Address> {
        self.read(slots::HUB)
    }

    pub fn version(&mut self) -> Result<U256> {
        self.read(slots::VERSION)
    }

    pub fn validator_set_hash(&mut self) -> Result<B256> {
        self.read(slots::VALIDATOR_SET_HASH)
    }

    pub fn validator_set_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::VALIDATOR_SET_NONCE)
    }

    pub fn withdraw_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::WITHDRAW_NONCE)
    }

    pub fn whitelist_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::WHITELIST_NONCE)
    }

    fn message_version(&mut self) -> Result<u8> {
        Ok(self.version()?.to_be_bytes::<32>()[31])
    }

    fn registered(&mut self, name: &str) -> Result<Address> {
        let hub = self.hub()?;
        Hub::new(hub, &mut *self.storage).get_contract(name)
    }

    /// Checks that `args` lines up with `signatures` and commits to governance's own set.
    fn check_own_set(&mut self, args: &ValidatorSetArgs, signatures: &[Signature]) -> Result<()> {
        if !args.is_well_formed(Some(signatures)) {
            return Err(GovernanceError::malformed_input().into());
        }
        let version = self.version()?;
        if validator_set_checkpoint(version, GOVERNANCE_NAMESPACE, args)
            != self.validator_set_hash()?
        {
            return Err(GovernanceError::invalid_validator_set_hash().into());
        }
        Ok(())
    }

    /// Whether the governance validators signed `messageHash` with a quorum.
    pub fn authorize(&mut self, call: IGovernance::authorizeCall) -> Result<bool> {
        self.check_own_set(&call.validatorSetArgs, &call.signatures)?;
        Ok(call
            .validatorSetArgs
            .tally(&call.signatures, call.messageHash)
            .has_quorum())
    }

    /// Requires a quorum of the current bridge validator set over `message_hash`.
    fn authorize_by_bridge(
        &mut self,
        validator_set_args: ValidatorSetArgs,
        signatures: Vec<Signature>,
        message_hash: B256,
    ) -> Result<()> {
        let bridge = self.registered(BRIDGE_CONTRACT)?;
        let authorized = Bridge::new(bridge, &mut *self.storage)
            .authorize(IBridge::authorizeCall {
                validatorSetArgs: validator_set_args,
                signatures,
                messageHash: message_hash,
            })
            .map_err(|err| match err {
                EthBridgeError::Bridge(BridgeError::MismatchArrayLength(_)) => {
                    GovernanceError::malformed_input().into()
                }
                EthBridgeError::Bridge(BridgeError::InvalidValidatorSetHash(_)) => {
                    GovernanceError::invalid_validator_set_hash().into()
                }
                err => err,
            })?;

        if !authorized {
            return Err(GovernanceError::unauthorized().into());
        }
        Ok(())
    }

    /// Rotates governance's own set and stages the next bridge set.
    ///
    /// The bridge adopts the staged set once its current validators sign the rotation.
    pub fn update_validators_set(
        &mut self,
        call: IGovernance::updateValidatorsSetCall,
    ) -> Result<()> {
        if !call
            .currentValidatorSetArgs
            .is_well_formed(Some(&call.signatures))
        {
            return Err(GovernanceError::malformed_input().into());
        }

        let nonce = self.next_nonce(slots::VALIDATOR_SET_NONCE)?;
        let message = update_validators_set_message(
            self.message_version()?,
            call.bridgeValidatorSetHash,
            call.governanceValidatorSetHash,
            nonce,
        );
        self.authorize_by_bridge(call.currentValidatorSetArgs, call.signatures, message)?;

        trace!(
            address=%self.address,
            %nonce,
            bridge=%call.bridgeValidatorSetHash,
            governance=%call.governanceValidatorSetHash,
            "Rotating validator sets"
        );
        self.write(slots::VALIDATOR_SET_HASH, call.governanceValidatorSetHash)?;
        self.write(slots::VALIDATOR_SET_NONCE, nonce)?;
        self.emit(GovernanceEvent::ValidatorSetUpdate(IGovernance::ValidatorSetUpdate {
            validatorSetNonce: nonce,
            bridgeValidatorSetHash: call.bridgeValidatorSetHash,
            governanceValidatorSetHash: call.governanceValidatorSetHash,
        }))?;

        let bridge = self.registered(BRIDGE_CONTRACT)?;
        Bridge::new(bridge, &mut *self.storage).update_next_validator_set_hash(
            self.address,
            IBridge::updateNextValidatorSetHashCall {
                nextValidatorSetHash: call.bridgeValidatorSetHash,
            },
        )
    }

    pub fn upgrade_contract(&mut self, call: IGovernance::upgradeContractCall) -> Result<()> {
        if call.addr.is_zero() {
            return Err(GovernanceError::invalid_address().into());
        }
        // the bridge moves its funds on upgrade, see `upgrade_bridge_contract`
        if call.name == BRIDGE_CONTRACT {
            return Err(GovernanceError::invalid_contract_name().into());
        }

        let message = contract_message(
            self.message_version()?,
            UPGRADE_CONTRACT_ACTION,
            &call.name,
            call.addr,
        );
        self.authorize_by_bridge(call.validators, call.signatures, message)?;

        trace!(address=%self.address, name=%call.name, addr=%call.addr, "Upgrading contract");
        self.emit(GovernanceEvent::ContractUpgraded(IGovernance::ContractUpgraded {
            name: call.name.clone(),
            addr: call.addr,
        }))?;
        self.hub_upgrade(call.name, call.addr)
    }

    pub fn add_contract(&mut self, call: IGovernance::addContractCall) -> Result<()> {
        if call.addr.is_zero() {
            return Err(GovernanceError::invalid_address().into());
        }

        let message = contract_message(
            self.message_version()?,
            ADD_CONTRACT_ACTION,
            &call.name,
            call.addr,
        );
        self.authorize_by_bridge(call.validators, call.signatures, message)?;

        trace!(address=%self.address, name=%call.name, addr=%call.addr, "Adding contract");
        self.emit(GovernanceEvent::ContractAdded(IGovernance::ContractAdded {
            name: call.name.clone(),
            addr: call.addr,
        }))?;
        let hub = self.hub()?;
        Hub::new(hub, &mut *self.storage).add_contract(
            self.address,
            IHub::addContractCall {
                name: call.name,
                addr: call.addr,
            },
        )
    }

    /// Replaces the bridge, moving the listed token balances it holds to the new bridge.
    pub fn upgrade_bridge_contract(
        &mut self,
        call: IGovernance::upgradeBridgeContractCall,
    ) -> Result<()> {
        if call.addr.is_zero() {
            return Err(GovernanceError::invalid_address().into());
        }

        let message = upgrade_bridge_contract_message(self.message_version()?, call.addr);
        self.authorize_by_bridge(call.validators, call.signatures, message)?;

        trace!(
            address=%self.address,
            addr=%call.addr,
            tokens=call.tokens.len(),
            "Upgrading bridge"
        );
        self.emit(GovernanceEvent::ContractUpgraded(IGovernance::ContractUpgraded {
            name: BRIDGE_CONTRACT.to_string(),
            addr: call.addr,
        }))?;

        let bridge = self.registered(BRIDGE_CONTRACT)?;
        Bridge::new(bridge, &mut *self.storage).withdraw(
            self.address,
            IBridge::withdrawCall {
                tokens: call.tokens,
                to: call.addr,
            },
        )?;
        self.hub_upgrade(BRIDGE_CONTRACT.to_string(), call.addr)
    }

    fn hub_upgrade(&mut self, name: String, addr: Address) -> Result<()> {
        let hub = self.hub()?;
        Hub::new(hub, &mut *self.storage)
            .upgrade_contract(self.address, IHub::upgradeContractCall { name, addr })
    }

    /// Sweeps the listed vault balances to `to`, signed by governance's own set.
    pub fn withdraw(&mut self, call: IGovernance::withdrawCall) -> Result<()> {
        if call.to.is_zero() {
            return Err(GovernanceError::invalid_address().into());
        }
        self.check_own_set(&call.validators, &call.signatures)?;

        let withdraw_nonce = self.withdraw_nonce()?;
        let message = withdraw_message(
            self.message_version()?,
            &call.validators,
            call.to,
            &call.tokens,
            withdraw_nonce,
        );
        if !call.validators.tally(&call.signatures, message).has_quorum() {
            return Err(GovernanceError::unauthorized().into());
        }

        trace!(
            address=%self.address,
            nonce=%withdraw_nonce,
            to=%call.to,
            tokens=call.tokens.len(),
            "Withdrawing from vault"
        );
        self.bump_nonce(slots::WITHDRAW_NONCE)?;
        self.emit(GovernanceEvent::Withdraw(IGovernance::Withdraw {
            withdrawNonce: withdraw_nonce,
            to: call.to,
            tokens: call.tokens.clone(),
        }))?;

        let vault = self.registered(VAULT_CONTRACT)?;
        Vault::new(vault, &mut *self.storage).withdraw(
            self.address,
            IVault::withdrawCall {
                tokens: call.tokens,
                to: call.to,
            },
        )
    }

    /// Replaces the bridge whitelist caps of the listed tokens.
    pub fn update_bridge_whitelist(
        &mut self,
        call: IGovernance::updateBridgeWhitelistCall,
    ) -> Result<()> {
        if !call.validators.is_well_formed(Some(&call.signatures))
            || call.tokens.len() != call.tokensCap.len()
        {
            return Err(GovernanceError::malformed_input().into());
        }

        let whitelist_nonce = self.whitelist_nonce()?;
        let message = update_bridge_whitelist_message(
            self.message_version()?,
            &call.tokens,
            &call.tokensCap,
            whitelist_nonce,
        );
        self.authorize_by_bridge(call.validators, call.signatures, message)?;

        trace!(
            address=%self.address,
            nonce=%whitelist_nonce,
            tokens=call.tokens.len(),
            "Updating bridge whitelist"
        );
        self.bump_nonce(slots::WHITELIST_NONCE)?;
        self.emit(GovernanceEvent::BridgeWhitelistUpdate(IGovernance::BridgeWhitelistUpdate {
            whitelistNonce: whitelist_nonce,
            tokens: call.tokens.clone(),
            tokensCap: call.tokensCap.clone(),
        }))?;

        let bridge = self.registered(BRIDGE_CONTRACT)?;
        Bridge::new(bridge, &mut *self.storage).update_token_whitelist(
            self.address,
            IBridge::updateTokenWhitelistCall {
                tokens: call.tokens,
                tokensCap: call.tokensCap,
            },
        )
    }

    fn emit(&mut self, event: GovernanceEvent) -> Result<()> {
        self.storage.emit_event(self.address, event.into_log_data())
    }
}

impl<S: StorageProvider> StorageOps for Governance<'_, S> {
    fn sstore(&mut self, slot: U256, value: U256) -> Result<()> {
        self.storage.sstore(self.address, slot, value)
    }

    fn sload(&mut self, slot: U256) -> Result<U256> {
        self.storage.sload(self.address, slot)
    }
}
