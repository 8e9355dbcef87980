use super::Vault;
use crate::{CallResult, Precompile, dispatch_call, mutate_void, settle, storage::StorageProvider};
use alloy::{primitives::Address, sol_types::SolInterface};
use ethbridge_contracts::precompiles::IVault::IVaultCalls;

impl<S: StorageProvider> Precompile for Vault<'_, S> {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult {
        let checkpoint = self.storage.checkpoint();
        let result = dispatch_call(calldata, IVaultCalls::abi_decode, |call| match call {
            IVaultCalls::batchTransferToERC20(c) => {
                mutate_void(c, msg_sender, |s, c| self.batch_transfer_to_erc20(s, c))
            }
            IVaultCalls::withdraw(c) => mutate_void(c, msg_sender, |s, c| self.withdraw(s, c)),
        });
        settle(&mut *self.storage, checkpoint, result)
    }
}
