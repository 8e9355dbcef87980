use super::Token;
use crate::{CallResult, Precompile, dispatch_call, mutate, settle, storage::StorageProvider, view};
use alloy::{primitives::Address, sol_types::SolInterface};
use ethbridge_contracts::precompiles::IToken::ITokenCalls;

impl<S: StorageProvider> Precompile for Token<'_, S> {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult {
        let checkpoint = self.storage.checkpoint();
        let result = dispatch_call(calldata, ITokenCalls::abi_decode, |call| match call {
            // View functions
            ITokenCalls::totalSupply(c) => view(c, |_| self.total_supply()),
            ITokenCalls::balanceOf(c) => view(c, |c| self.balance_of(c.account)),
            ITokenCalls::allowance(c) => view(c, |c| self.allowance(c.owner, c.spender)),

            // Mutating functions
            ITokenCalls::transfer(c) => mutate(c, msg_sender, |s, c| self.transfer(s, c)),
            ITokenCalls::approve(c) => mutate(c, msg_sender, |s, c| self.approve(s, c)),
            ITokenCalls::transferFrom(c) => {
                mutate(c, msg_sender, |s, c| self.transfer_from(s, c))
            }
        });
        settle(&mut *self.storage, checkpoint, result)
    }
}
