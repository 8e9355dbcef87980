pub mod dispatch;

pub use ethbridge_contracts::precompiles::{HubError, HubEvent, IHub};

use alloy::primitives::{Address, IntoLogData, U256};
use tracing::trace;

use crate::{
    error::Result,
    storage::{
        StorageOps, StorageProvider,
        slots::{address_mapping_slot, mapping_slot},
    },
};

pub const BRIDGE_CONTRACT: &str = "bridge";
pub const GOVERNANCE_CONTRACT: &str = "governance";
pub const VAULT_CONTRACT: &str = "vault";

mod slots {
    use alloy::primitives::{U256, uint};

    pub(super) const OWNER: U256 = uint!(0_U256);
    pub(super) const INITIALIZED: U256 = uint!(1_U256);
    pub(super) const CONTRACTS: U256 = uint!(2_U256);
    pub(super) const REGISTERED: U256 = uint!(3_U256);
}

/// Who may edit the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubPhase {
    /// Deployment is in progress and the owner registers the contracts.
    Uninitialized { owner: Address },
    /// Deployment is complete and only the registered governance contract edits entries.
    Initialized { governance: Address },
}

/// Name to address registry of the bridge contracts.
#[derive(Debug)]
pub struct Hub<'a, S: StorageProvider> {
    address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Hub<'a, S> {
    pub fn new(address: Address, storage: &'a mut S) -> Self {
        Self { address, storage }
    }

    pub fn initialize(&mut self, owner: Address) -> Result<()> {
        trace!(address=%self.address, %owner, "Initializing hub");
        if !self.owner()?.is_zero() {
            return Err(HubError::already_initialized().into());
        }
        self.write(slots::OWNER, owner)
    }

    pub fn owner(&mut self) -> Result<Address> {
        self.read(slots::OWNER)
    }

    pub fn initialized(&mut self) -> Result<bool> {
        self.read(slots::INITIALIZED)
    }

    pub fn phase(&mut self) -> Result<HubPhase> {
        Ok(if self.initialized()? {
            HubPhase::Initialized {
                governance: self.get_contract(GOVERNANCE_CONTRACT)?,
            }
        } else {
            HubPhase::Uninitialized {
                owner: self.owner()?,
            }
        })
    }

    /// Address registered under `name`, or zero.
    pub fn get_contract(&mut self, name: &str) -> Result<Address> {
        self.read(mapping_slot(name, slots::CONTRACTS))
    }

    fn is_registered(&mut self, addr: Address) -> Result<bool> {
        self.read(address_mapping_slot(addr, slots::REGISTERED))
    }

    fn check_mutator(&mut self, sender: Address) -> Result<()> {
        match self.phase()? {
            HubPhase::Uninitialized { owner } if owner != sender => {
                Err(HubError::caller_is_not_owner().into())
            }
            HubPhase::Initialized { governance } if governance != sender => {
                Err(HubError::invalid_caller_address().into())
            }
            _ => Ok(()),
        }
    }

    pub fn add_contract(&mut self, sender: Address, call: IHub::addContractCall) -> Result<()> {
        self.check_mutator(sender)?;

        if call.addr.is_zero() {
            return Err(HubError::invalid_contract_address().into());
        }
        if !self.get_contract(&call.name)?.is_zero() {
            return Err(HubError::contract_name_already_exist().into());
        }
        if self.is_registered(call.addr)? {
            return Err(HubError::invalid_duplicate_address().into());
        }

        trace!(address=%self.address, name=%call.name, addr=%call.addr, "Adding contract");
        self.write(mapping_slot(&call.name, slots::CONTRACTS), call.addr)?;
        self.write(address_mapping_slot(call.addr, slots::REGISTERED), true)?;
        self.emit(HubEvent::ContractAdded(IHub::ContractAdded {
            name: call.name,
            addr: call.addr,
        }))
    }

    pub fn upgrade_contract(
        &mut self,
        sender: Address,
        call: IHub::upgradeContractCall,
    ) -> Result<()> {
        self.check_mutator(sender)?;

        let previous = self.get_contract(&call.name)?;
        if previous.is_zero() {
            return Err(HubError::invalid_contract_address().into());
        }
        if call.addr.is_zero() {
            return Err(HubError::invalid_address().into());
        }
        if previous == call.addr {
            return Err(HubError::address_must_be_different().into());
        }
        if self.is_registered(call.addr)? {
            return Err(HubError::invalid_duplicate_address().into());
        }

        trace!(
            address=%self.address,
            name=%call.name,
            %previous,
            addr=%call.addr,
            "Upgrading contract"
        );
        self.write(mapping_slot(&call.name, slots::CONTRACTS), call.addr)?;
        self.write(address_mapping_slot(previous, slots::REGISTERED), false)?;
        self.write(address_mapping_slot(call.addr, slots::REGISTERED), true)?;
        self.emit(HubEvent::ContractUpgraded(IHub::ContractUpgraded {
            name: call.name,
            previous,
            addr: call.addr,
        }))
    }

    /// Hands the registry over to the registered governance contract.
    pub fn complete_contract_init(&mut self, sender: Address) -> Result<()> {
        match self.phase()? {
            HubPhase::Uninitialized { owner } if owner == sender => {}
            _ => return Err(HubError::caller_is_not_owner().into()),
        }

        let governance = self.get_contract(GOVERNANCE_CONTRACT)?;
        if governance.is_zero() {
            return Err(HubError::governance_contract_must_be_set().into());
        }

        trace!(address=%self.address, %governance, "Completing contract init");
        self.write(slots::INITIALIZED, true)?;
        self.emit(HubEvent::ContractInitCompleted(IHub::ContractInitCompleted {
            governance,
        }))
    }

    fn emit(&mut self, event: HubEvent) -> Result<()> {
        self.storage.emit_event(self.address, event.into_log_data())
    }
}

impl<S: StorageProvider> StorageOps for Hub<'_, S> {
    fn sstore(&mut self, slot: U256, value: U256) -> Result<()> {
        self.storage.sstore(self.address, slot, value)
    }

    fn sload(&mut self, slot: U256) -> Result<U256> {
        self.storage.sload(self.address, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hashmap::HashMapStorageProvider;

    fn add(
        hub: &mut Hub<'_, HashMapStorageProvider>,
        sender: Address,
        name: &str,
        addr: Address,
    ) -> Result<()> {
        hub.add_contract(
            sender,
            IHub::addContractCall {
                name: name.to_string(),
                addr,
            },
        )
    }

    fn upgrade(
        hub: &mut Hub<'_, HashMapStorageProvider>,
        sender: Address,
        name: &str,
        addr: Address,
    ) -> Result<()> {
        hub.upgrade_contract(
            sender,
            IHub::upgradeContractCall {
                name: name.to_string(),
                addr,
            },
        )
    }

    #[test]
    fn test_owner_registers_before_init() -> eyre::Result<()> {
        let mut storage = HashMapStorageProvider::new(1);
        let owner = Address::random();
        let mut hub = Hub::new(Address::random(), &mut storage);
        hub.initialize(owner)?;

        let bridge = Address::random();
        add(&mut hub, owner, BRIDGE_CONTRACT, bridge)?;
        assert_eq!(hub.get_contract(BRIDGE_CONTRACT)?, bridge);
        assert_eq!(hub.get_contract("missing")?, Address::ZERO);

        assert_eq!(
            add(&mut hub, Address::random(), "test", Address::random()),
            Err(HubError::caller_is_not_owner().into())
        );
        assert_eq!(
            hub.initialize(Address::random()),
            Err(HubError::already_initialized().into())
        );
        Ok(())
    }

    #[test]
    fn test_add_rejections() -> eyre::Result<()> {
        let mut storage = HashMapStorageProvider::new(1);
        let owner = Address::random();
        let mut hub = Hub::new(Address::random(), &mut storage);
        hub.initialize(owner)?;

        let vault = Address::random();
        add(&mut hub, owner, VAULT_CONTRACT, vault)?;

        assert_eq!(
            add(&mut hub, owner, VAULT_CONTRACT, Address::random()),
            Err(HubError::contract_name_already_exist().into())
        );
        assert_eq!(
            add(&mut hub, owner, "test", vault),
            Err(HubError::invalid_duplicate_address().into())
        );
        assert_eq!(
            add(&mut hub, owner, "test", Address::ZERO),
            Err(HubError::invalid_contract_address().into())
        );
        Ok(())
    }

    #[test]
    fn test_upgrade_rejections() -> eyre::Result<()> {
        let mut storage = HashMapStorageProvider::new(1);
        let owner = Address::random();
        let mut hub = Hub::new(Address::random(), &mut storage);
        hub.initialize(owner)?;

        let vault = Address::random();
        add(&mut hub, owner, VAULT_CONTRACT, vault)?;

        assert_eq!(
            upgrade(&mut hub, owner, "test", Address::random()),
            Err(HubError::invalid_contract_address().into())
        );
        assert_eq!(
            upgrade(&mut hub, owner, VAULT_CONTRACT, Address::ZERO),
            Err(HubError::invalid_address().into())
        );
        assert_eq!(
            upgrade(&mut hub, owner, VAULT_CONTRACT, vault),
            Err(HubError::address_must_be_different().into())
        );

        let new_vault = Address::random();
        upgrade(&mut hub, owner, VAULT_CONTRACT, new_vault)?;
        assert_eq!(hub.get_contract(VAULT_CONTRACT)?, new_vault);

        // the replaced address is free again
        add(&mut hub, owner, "legacy", vault)?;
        Ok(())
    }

    #[test]
    fn test_complete_init_hands_over_to_governance() -> eyre::Result<()> {
        let mut storage = HashMapStorageProvider::new(1);
        let owner = Address::random();
        let governance = Address::random();
        let mut hub = Hub::new(Address::random(), &mut storage);
        hub.initialize(owner)?;

        assert_eq!(
            hub.complete_contract_init(owner),
            Err(HubError::governance_contract_must_be_set().into())
        );
        add(&mut hub, owner, GOVERNANCE_CONTRACT, governance)?;
        assert_eq!(
            hub.complete_contract_init(Address::random()),
            Err(HubError::caller_is_not_owner().into())
        );

        hub.complete_contract_init(owner)?;
        assert_eq!(hub.phase()?, HubPhase::Initialized { governance });

        assert_eq!(
            add(&mut hub, owner, "test", Address::random()),
            Err(HubError::invalid_caller_address().into())
        );
        assert_eq!(
            hub.complete_contract_init(owner),
            Err(HubError::caller_is_not_owner().into())
        );
        add(&mut hub, governance, "test", Address::random())?;

        // a governance upgrade moves the registry to the new governance
        let next_governance = Address::random();
        upgrade(&mut hub, governance, GOVERNANCE_CONTRACT, next_governance)?;
        assert_eq!(
            add(&mut hub, governance, "other", Address::random()),
            Err(HubError::invalid_caller_address().into())
        );
        Ok(())
    }
}
