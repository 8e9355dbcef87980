use super::Governance;
use crate::{
    CallResult, Precompile, dispatch_call, mutate_void, settle, storage::StorageProvider, view,
};
use alloy::{primitives::Address, sol_types::SolInterface};
use ethbridge_contracts::precompiles::IGovernance::IGovernanceCalls;

impl<S: StorageProvider> Precompile for Governance<'_, S> {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult {
        let checkpoint = self.storage.checkpoint();
        let result = dispatch_call(calldata, IGovernanceCalls::abi_decode, |call| match call {
            // View functions
            IGovernanceCalls::validatorSetHash(c) => view(c, |_| self.validator_set_hash()),
            IGovernanceCalls::validatorSetNonce(c) => view(c, |_| self.validator_set_nonce()),
            IGovernanceCalls::withdrawNonce(c) => view(c, |_| self.withdraw_nonce()),
            IGovernanceCalls::whitelistNonce(c) => view(c, |_| self.whitelist_nonce()),
            IGovernanceCalls::authorize(c) => view(c, |c| self.authorize(c)),

            // Mutating functions, open to any relayer
            IGovernanceCalls::updateValidatorsSet(c) => {
                mutate_void(c, msg_sender, |_, c| self.update_validators_set(c))
            }
            IGovernanceCalls::upgradeContract(c) => {
                mutate_void(c, msg_sender, |_, c| self.upgrade_contract(c))
            }
            IGovernanceCalls::addContract(c) => {
                mutate_void(c, msg_sender, |_, c| self.add_contract(c))
            }
            IGovernanceCalls::upgradeBridgeContract(c) => {
                mutate_void(c, msg_sender, |_, c| self.upgrade_bridge_contract(c))
            }
            IGovernanceCalls::withdraw(c) => mutate_void(c, msg_sender, |_, c| self.withdraw(c)),
            IGovernanceCalls::updateBridgeWhitelist(c) => {
                mutate_void(c, msg_sender, |_, c| self.update_bridge_whitelist(c))
            }
        });
        settle(&mut *self.storage, checkpoint, result)
    }
}
