pub mod dispatch;
#[cfg(test)]
mod tests;

pub use ethbridge_contracts::precompiles::{
    BridgeError, BridgeEvent, IBridge, Signature, ValidatorSetArgs,
};

use alloy::primitives::{Address, B256, IntoLogData, U256};
use tracing::{debug, trace};

use crate::{
    checkpoint::{
        BRIDGE_NAMESPACE, batch_transfer_message, compute_checkpoint, transfer_leaf,
        validator_set_checkpoint,
    },
    error::{EthBridgeError, Result},
    hub::{GOVERNANCE_CONTRACT, Hub, VAULT_CONTRACT},
    merkle::verify_multi_proof,
    nonce::{NonceLedger, is_next},
    storage::{StorageOps, StorageProvider, slots::address_mapping_slot},
    token::{IToken, Token},
    validator_set::{Tally, ValidatorSetArgsExt, is_normalized},
    vault::{IVault, Vault, sweep},
};

mod slots {
    use alloy::primitives::{U256, uint};

    pub(super) const HUB: U256 = uint!(0_U256);
    pub(super) const VERSION: U256 = uint!(1_U256);
    pub(super) const CURRENT_VALIDATOR_SET_HASH: U256 = uint!(2_U256);
    pub(super) const VALIDATOR_SET_NONCE: U256 = uint!(3_U256);
    pub(super) const NEXT_VALIDATOR_SET_HASH: U256 = uint!(4_U256);
    pub(super) const BATCH_NONCE: U256 = uint!(5_U256);
    pub(super) const TRANSFER_TO_NAMADA_NONCE: U256 = uint!(6_U256);
    pub(super) const TOKEN_WHITELIST: U256 = uint!(7_U256);
}

/// Parameters the bridge is deployed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeInit {
    pub version: U256,
    pub validators: Vec<Address>,
    pub powers: Vec<U256>,
    /// Set the validators are expected to rotate to first, committed at nonce 1.
    pub next_validator_set: Option<(Vec<Address>, Vec<U256>)>,
    pub tokens: Vec<Address>,
    pub token_caps: Vec<U256>,
    pub hub: Address,
}

/// Entry point of transfers between Ethereum and Namada.
///
/// Outbound transfers are pulled from the caller into the vault within the whitelist caps.
/// Inbound batches are released from the vault once the current bridge validator set signs
/// them, either as flat arrays or as a Merkle root with a multiproof for the settled subset.
#[derive(Debug)]
pub struct Bridge<'a, S: StorageProvider> {
    address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Bridge<'a, S> {
    pub fn new(address: Address, storage: &'a mut S) -> Self {
        Self { address, storage }
    }

    pub fn initialize(&mut self, init: BridgeInit) -> Result<()> {
        trace!(
            address=%self.address,
            version=%init.version,
            validators=init.validators.len(),
            "Initializing bridge"
        );

        if !self.hub()?.is_zero() {
            return Err(BridgeError::already_initialized().into());
        }
        if init.hub.is_zero() {
            return Err(BridgeError::invalid_address().into());
        }
        if init.version > U256::from(u8::MAX) {
            return Err(BridgeError::invalid_version().into());
        }
        if init.validators.len() != init.powers.len() {
            return Err(BridgeError::mismatch_array_length().into());
        }
        if init.tokens.len() != init.token_caps.len() {
            return Err(BridgeError::invalid_token_whitelist().into());
        }
        if !is_normalized(&init.powers) {
            return Err(BridgeError::invalid_voting_power_threshold().into());
        }

        let next_hash = match &init.next_validator_set {
            Some((validators, powers)) => {
                if validators.len() != powers.len() {
                    return Err(BridgeError::mismatch_array_length().into());
                }
                if !is_normalized(powers) {
                    return Err(BridgeError::invalid_voting_power_threshold().into());
                }
                compute_checkpoint(
                    init.version,
                    BRIDGE_NAMESPACE,
                    validators,
                    powers,
                    U256::from(1),
                )
            }
            None => B256::ZERO,
        };
        let current_hash = compute_checkpoint(
            init.version,
            BRIDGE_NAMESPACE,
            &init.validators,
            &init.powers,
            U256::ZERO,
        );

        self.write(slots::HUB, init.hub)?;
        self.write(slots::VERSION, init.version)?;
        self.write(slots::CURRENT_VALIDATOR_SET_HASH, current_hash)?;
        self.write(slots::NEXT_VALIDATOR_SET_HASH, next_hash)?;
        for (token, cap) in init.tokens.into_iter().zip(init.token_caps) {
            self.write(whitelist_slot(token), cap)?;
        }
        Ok(())
    }

    // View functions
    pub fn hub(&mut self) -> Result<Address> {
        self.read(slots::HUB)
    }

    pub fn version(&mut self) -> Result<U256> {
        self.read(slots::VERSION)
    }

    pub fn current_validator_set_hash(&mut self) -> Result<B256> {
        self.read(slots::CURRENT_VALIDATOR_SET_HASH)
    }

    pub fn validator_set_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::VALIDATOR_SET_NONCE)
    }

    pub fn next_validator_set_hash(&mut self) -> Result<B256> {
        self.read(slots::NEXT_VALIDATOR_SET_HASH)
    }

    pub fn batch_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::BATCH_NONCE)
    }

    pub fn transfer_to_namada_nonce(&mut self) -> Result<U256> {
        self.nonce(slots::TRANSFER_TO_NAMADA_NONCE)
    }

    /// Amount of `token` that may still be bridged to Namada.
    pub fn token_whitelist_amount(&mut self, token: Address) -> Result<U256> {
        self.read(whitelist_slot(token))
    }

    /// Version as it appears in signed messages.
    fn message_version(&mut self) -> Result<u8> {
        Ok(self.version()?.to_be_bytes::<32>()[31])
    }

    fn registered(&mut self, name: &str) -> Result<Address> {
        let hub = self.hub()?;
        Hub::new(hub, &mut *self.storage).get_contract(name)
    }

    /// Checks that `args` lines up with `signatures` and commits to the current set.
    fn check_current_set(
        &mut self,
        args: &ValidatorSetArgs,
        signatures: &[Signature],
    ) -> Result<()> {
        if !args.is_well_formed(Some(signatures)) {
            return Err(BridgeError::mismatch_array_length().into());
        }
        let version = self.version()?;
        if validator_set_checkpoint(version, BRIDGE_NAMESPACE, args)
            != self.current_validator_set_hash()?
        {
            return Err(BridgeError::invalid_validator_set_hash().into());
        }
        Ok(())
    }

    /// Whether the current bridge validators signed `messageHash` with a quorum.
    ///
    /// Reverts on malformed or stale validator sets and returns `false` on missing power.
    pub fn authorize(&mut self, call: IBridge::authorizeCall) -> Result<bool> {
        self.check_current_set(&call.validatorSetArgs, &call.signatures)?;
        Ok(call
            .validatorSetArgs
            .tally(&call.signatures, call.messageHash)
            .has_quorum())
    }

    pub fn update_validator_set(&mut self, call: IBridge::updateValidatorSetCall) -> Result<()> {
        let IBridge::updateValidatorSetCall {
            currentValidatorSetArgs: current,
            newValidatorSetArgs: new,
            signatures,
        } = call;

        if !current.is_well_formed(Some(&signatures)) || !new.is_well_formed(None) {
            return Err(BridgeError::mismatch_array_length().into());
        }
        if !is_next(current.nonce, new.nonce) {
            return Err(BridgeError::invalid_validator_set_nonce().into());
        }
        self.check_current_set(&current, &signatures)?;
        if !is_normalized(&new.powers) {
            return Err(BridgeError::not_enough_voting_power().into());
        }

        let new_hash = validator_set_checkpoint(self.version()?, BRIDGE_NAMESPACE, &new);
        let next_hash = self.next_validator_set_hash()?;
        if !next_hash.is_zero() && next_hash != new_hash {
            return Err(BridgeError::invalid_next_validator_set_hash().into());
        }
        check_tally(current.tally(&signatures, new_hash))?;

        trace!(address=%self.address, nonce=%new.nonce, %new_hash, "Rotating bridge validator set");
        self.write(slots::CURRENT_VALIDATOR_SET_HASH, new_hash)?;
        self.write(slots::VALIDATOR_SET_NONCE, new.nonce)?;
        self.write(slots::NEXT_VALIDATOR_SET_HASH, B256::ZERO)?;
        self.emit(BridgeEvent::ValidatorSetUpdate(IBridge::ValidatorSetUpdate {
            validatorSetNonce: new.nonce,
            validatorSetHash: new_hash,
        }))
    }

    fn check_governance(&mut self, sender: Address) -> Result<()> {
        if sender != self.registered(GOVERNANCE_CONTRACT)? {
            return Err(BridgeError::invalid_caller().into());
        }
        Ok(())
    }

    pub fn update_next_validator_set_hash(
        &mut self,
        sender: Address,
        call: IBridge::updateNextValidatorSetHashCall,
    ) -> Result<()> {
        self.check_governance(sender)?;

        trace!(
            address=%self.address,
            next=%call.nextValidatorSetHash,
            "Staging next bridge validator set"
        );
        self.write(slots::NEXT_VALIDATOR_SET_HASH, call.nextValidatorSetHash)?;
        self.emit(BridgeEvent::NextValidatorSetUpdate(IBridge::NextValidatorSetUpdate {
            nextValidatorSetHash: call.nextValidatorSetHash,
        }))
    }

    pub fn update_token_whitelist(
        &mut self,
        sender: Address,
        call: IBridge::updateTokenWhitelistCall,
    ) -> Result<()> {
        self.check_governance(sender)?;
        if call.tokens.len() != call.tokensCap.len() {
            return Err(BridgeError::invalid_token_whitelist().into());
        }

        for (token, cap) in call.tokens.into_iter().zip(call.tokensCap) {
            trace!(address=%self.address, %token, %cap, "Updating token whitelist");
            self.write(whitelist_slot(token), cap)?;
            self.emit(BridgeEvent::WhitelistUpdate(IBridge::WhitelistUpdate { token, cap }))?;
        }
        Ok(())
    }

    /// Sweeps balances held at the bridge address itself.
    pub fn withdraw(&mut self, sender: Address, call: IBridge::withdrawCall) -> Result<()> {
        self.check_governance(sender)?;
        if call.to.is_zero() {
            return Err(BridgeError::invalid_address().into());
        }

        for token in call.tokens {
            sweep(&mut *self.storage, token, self.address, call.to)?;
        }
        Ok(())
    }

    /// Settles the disclosed transfers of a signed Merkle batch.
    ///
    /// Transfers carrying a fee also pay `fee` of `feeFrom` to the relayer submitting them.
    pub fn transfer_to_erc(
        &mut self,
        sender: Address,
        call: IBridge::transferToERCCall,
    ) -> Result<()> {
        if !self.is_next_nonce(slots::BATCH_NONCE, call.batchNonce)? {
            return Err(BridgeError::invalid_batch_nonce().into());
        }
        if call.transfers.is_empty() {
            return Err(BridgeError::invalid_batch().into());
        }
        self.check_current_set(&call.validatorSetArgs, &call.signatures)?;
        check_tally(call.validatorSetArgs.tally(&call.signatures, call.poolRoot))?;

        let version = self.message_version()?;
        let leaves: Vec<B256> = call
            .transfers
            .iter()
            .map(|transfer| transfer_leaf(version, transfer, call.batchNonce))
            .collect();
        verify_multi_proof(call.poolRoot, &leaves, &call.proof, &call.proofFlags).map_err(
            |err| {
                debug!(address=%self.address, %err, "Rejecting transfer batch proof");
                EthBridgeError::from(BridgeError::invalid_transfers_proof())
            },
        )?;

        trace!(
            address=%self.address,
            nonce=%call.batchNonce,
            transfers=call.transfers.len(),
            "Settling transfer batch"
        );
        self.write(slots::BATCH_NONCE, call.batchNonce)?;

        let mut payouts = Vec::with_capacity(call.transfers.len());
        for transfer in &call.transfers {
            payouts.push(IVault::VaultTransfer {
                token: transfer.from,
                to: transfer.to,
                amount: transfer.amount,
            });
            if !transfer.fee.is_zero() {
                payouts.push(IVault::VaultTransfer {
                    token: transfer.feeFrom,
                    to: sender,
                    amount: transfer.fee,
                });
            }
        }
        self.pay_out(payouts)?;

        self.emit(BridgeEvent::TransferToERC(IBridge::TransferToERC {
            nonce: call.batchNonce,
            transfers: call.transfers,
        }))
    }

    /// Settles a signed batch submitted as parallel `froms`, `tos` and `amounts` arrays,
    /// where `froms` holds the token of each transfer.
    pub fn batch_transfer_to_erc(
        &mut self,
        call: IBridge::batchTransferToERCCall,
    ) -> Result<()> {
        if !self.is_next_nonce(slots::BATCH_NONCE, call.batchNonce)? {
            return Err(BridgeError::invalid_batch_nonce().into());
        }
        if call.froms.is_empty()
            || call.froms.len() != call.tos.len()
            || call.froms.len() != call.amounts.len()
        {
            return Err(BridgeError::invalid_batch().into());
        }
        self.check_current_set(&call.validatorSetArgs, &call.signatures)?;

        let message = batch_transfer_message(
            self.message_version()?,
            &call.froms,
            &call.tos,
            &call.amounts,
            call.batchNonce,
            self.current_validator_set_hash()?,
        );
        check_tally(call.validatorSetArgs.tally(&call.signatures, message))?;

        trace!(
            address=%self.address,
            nonce=%call.batchNonce,
            transfers=call.froms.len(),
            "Settling flat transfer batch"
        );
        self.write(slots::BATCH_NONCE, call.batchNonce)?;

        let mut payouts = Vec::with_capacity(call.froms.len());
        let mut transfers = Vec::with_capacity(call.froms.len());
        for ((token, to), amount) in call.froms.into_iter().zip(call.tos).zip(call.amounts) {
            payouts.push(IVault::VaultTransfer { token, to, amount });
            transfers.push(IBridge::Erc20Transfer {
                from: token,
                to,
                amount,
                feeFrom: Address::ZERO,
                fee: U256::ZERO,
            });
        }
        self.pay_out(payouts)?;

        self.emit(BridgeEvent::TransferToERC(IBridge::TransferToERC {
            nonce: call.batchNonce,
            transfers,
        }))
    }

    fn pay_out(&mut self, transfers: Vec<IVault::VaultTransfer>) -> Result<()> {
        let vault = self.registered(VAULT_CONTRACT)?;
        Vault::new(vault, &mut *self.storage)
            .batch_transfer_to_erc20(self.address, IVault::batchTransferToERC20Call { transfers })
    }

    /// Pulls each transfer from the caller into the vault.
    ///
    /// Transfers of tokens that are not whitelisted, that exceed the remaining cap or that the
    /// token refuses are skipped. Only accepted transfers consume cap and appear in the event.
    /// When every transfer is skipped the call still succeeds, but emits nothing and keeps the
    /// nonce, so relayers never observe an empty batch.
    pub fn transfer_to_namada(
        &mut self,
        sender: Address,
        call: IBridge::transferToNamadaCall,
    ) -> Result<()> {
        if call.transfers.is_empty() {
            return Err(BridgeError::invalid_batch().into());
        }

        let vault = self.registered(VAULT_CONTRACT)?;
        let mut accepted = Vec::with_capacity(call.transfers.len());
        for transfer in call.transfers {
            let token = transfer.from;
            let cap = self.token_whitelist_amount(token)?;
            if cap.is_zero() {
                debug!(
                    address=%self.address,
                    %token,
                    "Skipping transfer of token that is not whitelisted"
                );
                continue;
            }
            if transfer.amount.is_zero() {
                debug!(address=%self.address, %token, "Skipping empty transfer");
                continue;
            }
            if transfer.amount > cap {
                debug!(
                    address=%self.address,
                    %token,
                    %cap,
                    amount=%transfer.amount,
                    "Skipping transfer over the whitelist cap"
                );
                continue;
            }

            let checkpoint = self.storage.checkpoint();
            let pulled = self
                .write(whitelist_slot(token), cap - transfer.amount)
                .and_then(|()| {
                    Token::new(token, &mut *self.storage).transfer_from(
                        self.address,
                        IToken::transferFromCall {
                            from: sender,
                            to: vault,
                            amount: transfer.amount,
                        },
                    )
                });
            match pulled {
                Ok(_) => {
                    self.storage.checkpoint_commit(checkpoint);
                    accepted.push(transfer);
                }
                Err(err @ EthBridgeError::Fatal(_)) => {
                    self.storage.checkpoint_revert(checkpoint);
                    return Err(err);
                }
                Err(err) => {
                    self.storage.checkpoint_revert(checkpoint);
                    debug!(
                        address=%self.address,
                        %token,
                        %err,
                        "Skipping transfer the token refused"
                    );
                }
            }
        }

        if accepted.is_empty() {
            return Ok(());
        }
        let nonce = self.bump_nonce(slots::TRANSFER_TO_NAMADA_NONCE)?;
        trace!(
            address=%self.address,
            %nonce,
            transfers=accepted.len(),
            "Bridging transfers to Namada"
        );
        self.emit(BridgeEvent::TransferToNamada(IBridge::TransferToNamada {
            nonce,
            transfers: accepted,
            confirmations: call.confirmations,
        }))
    }

    fn emit(&mut self, event: BridgeEvent) -> Result<()> {
        self.storage.emit_event(self.address, event.into_log_data())
    }
}

/// Rejects a tally carrying a bad signature before looking at its power.
fn check_tally(tally: Tally) -> Result<()> {
    if tally.bad_signature {
        return Err(BridgeError::invalid_validator_set_signature().into());
    }
    if tally.power < tally.threshold {
        return Err(BridgeError::not_enough_voting_power().into());
    }
    Ok(())
}

fn whitelist_slot(token: Address) -> U256 {
    address_mapping_slot(token, slots::TOKEN_WHITELIST)
}

impl<S: StorageProvider> StorageOps for Bridge<'_, S> {
    fn sstore(&mut self, slot: U256, value: U256) -> Result<()> {
        self.storage.sstore(self.address, slot, value)
    }

    fn sload(&mut self, slot: U256) -> Result<U256> {
        self.storage.sload(self.address, slot)
    }
}
