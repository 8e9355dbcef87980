use super::Hub;
use crate::{
    CallResult, Precompile, dispatch_call, mutate_void, settle, storage::StorageProvider, view,
};
use alloy::{primitives::Address, sol_types::SolInterface};
use ethbridge_contracts::precompiles::IHub::IHubCalls;

impl<S: StorageProvider> Precompile for Hub<'_, S> {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult {
        let checkpoint = self.storage.checkpoint();
        let result = dispatch_call(calldata, IHubCalls::abi_decode, |call| match call {
            // View functions
            IHubCalls::owner(c) => view(c, |_| self.owner()),
            IHubCalls::initialized(c) => view(c, |_| self.initialized()),
            IHubCalls::getContract(c) => view(c, |c| self.get_contract(&c.name)),

            // Mutating functions
            IHubCalls::addContract(c) => mutate_void(c, msg_sender, |s, c| self.add_contract(s, c)),
            IHubCalls::upgradeContract(c) => {
                mutate_void(c, msg_sender, |s, c| self.upgrade_contract(s, c))
            }
            IHubCalls::completeContractInit(c) => {
                mutate_void(c, msg_sender, |s, _| self.complete_contract_init(s))
            }
        });
        settle(&mut *self.storage, checkpoint, result)
    }
}
