use super::Bridge;
use crate::{
    CallResult, Precompile, dispatch_call, mutate_void, settle, storage::StorageProvider, view,
};
use alloy::{primitives::Address, sol_types::SolInterface};
use ethbridge_contracts::precompiles::IBridge::IBridgeCalls;

impl<S: StorageProvider> Precompile for Bridge<'_, S> {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult {
        let checkpoint = self.storage.checkpoint();
        let result = dispatch_call(calldata, IBridgeCalls::abi_decode, |call| match call {
            // View functions
            IBridgeCalls::currentValidatorSetHash(c) => {
                view(c, |_| self.current_validator_set_hash())
            }
            IBridgeCalls::validatorSetNonce(c) => view(c, |_| self.validator_set_nonce()),
            IBridgeCalls::nextValidatorSetHash(c) => view(c, |_| self.next_validator_set_hash()),
            IBridgeCalls::batchNonce(c) => view(c, |_| self.batch_nonce()),
            IBridgeCalls::transferToNamadaNonce(c) => {
                view(c, |_| self.transfer_to_namada_nonce())
            }
            IBridgeCalls::tokenWhitelistAmount(c) => {
                view(c, |c| self.token_whitelist_amount(c.token))
            }
            IBridgeCalls::authorize(c) => view(c, |c| self.authorize(c)),

            // Mutating functions
            IBridgeCalls::updateValidatorSet(c) => {
                mutate_void(c, msg_sender, |_, c| self.update_validator_set(c))
            }
            IBridgeCalls::updateNextValidatorSetHash(c) => {
                mutate_void(c, msg_sender, |s, c| self.update_next_validator_set_hash(s, c))
            }
            IBridgeCalls::updateTokenWhitelist(c) => {
                mutate_void(c, msg_sender, |s, c| self.update_token_whitelist(s, c))
            }
            IBridgeCalls::withdraw(c) => mutate_void(c, msg_sender, |s, c| self.withdraw(s, c)),
            IBridgeCalls::transferToERC(c) => {
                mutate_void(c, msg_sender, |s, c| self.transfer_to_erc(s, c))
            }
            IBridgeCalls::batchTransferToERC(c) => {
                mutate_void(c, msg_sender, |_, c| self.batch_transfer_to_erc(c))
            }
            IBridgeCalls::transferToNamada(c) => {
                mutate_void(c, msg_sender, |s, c| self.transfer_to_namada(s, c))
            }
        });
        settle(&mut *self.storage, checkpoint, result)
    }
}
