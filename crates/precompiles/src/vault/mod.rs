pub mod dispatch;

pub use ethbridge_contracts::precompiles::{IVault, VaultError};

use alloy::primitives::{Address, U256};
use tracing::trace;

use crate::{
    error::Result,
    hub::{BRIDGE_CONTRACT, GOVERNANCE_CONTRACT, Hub},
    storage::{StorageOps, StorageProvider},
    token::{IToken, Token},
};

mod slots {
    use alloy::primitives::{U256, uint};

    pub(super) const HUB: U256 = uint!(0_U256);
}

/// Custody of every token bridged to Namada.
///
/// Payouts are only accepted from the contract the hub currently registers as the bridge,
/// so upgrading the bridge entry hands custody over without moving funds.
#[derive(Debug)]
pub struct Vault<'a, S: StorageProvider> {
    address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Vault<'a, S> {
    pub fn new(address: Address, storage: &'a mut S) -> Self {
        Self { address, storage }
    }

    pub fn initialize(&mut self, hub: Address) -> Result<()> {
        trace!(address=%self.address, %hub, "Initializing vault");
        if !self.read::<Address>(slots::HUB)?.is_zero() {
            return Err(VaultError::already_initialized().into());
        }
        if hub.is_zero() {
            return Err(VaultError::invalid_address().into());
        }
        self.write(slots::HUB, hub)
    }

    fn registered(&mut self, name: &str) -> Result<Address> {
        let hub = self.read(slots::HUB)?;
        Hub::new(hub, &mut *self.storage).get_contract(name)
    }

    pub fn batch_transfer_to_erc20(
        &mut self,
        sender: Address,
        call: IVault::batchTransferToERC20Call,
    ) -> Result<()> {
        if sender != self.registered(BRIDGE_CONTRACT)? {
            return Err(VaultError::invalid_caller().into());
        }

        for transfer in call.transfers {
            trace!(
                address=%self.address,
                token=%transfer.token,
                to=%transfer.to,
                amount=%transfer.amount,
                "Paying out"
            );
            Token::new(transfer.token, &mut *self.storage).transfer(
                self.address,
                IToken::transferCall {
                    to: transfer.to,
                    amount: transfer.amount,
                },
            )?;
        }
        Ok(())
    }

    pub fn withdraw(&mut self, sender: Address, call: IVault::withdrawCall) -> Result<()> {
        if sender != self.registered(GOVERNANCE_CONTRACT)? {
            return Err(VaultError::invalid_caller().into());
        }
        if call.to.is_zero() {
            return Err(VaultError::invalid_address().into());
        }

        for token in call.tokens {
            sweep(&mut *self.storage, token, self.address, call.to)?;
        }
        Ok(())
    }
}

/// Moves the full `token` balance of `holder` to `to`.
pub(crate) fn sweep<S: StorageProvider>(
    storage: &mut S,
    token: Address,
    holder: Address,
    to: Address,
) -> Result<()> {
    let mut token = Token::new(token, storage);
    let balance = token.balance_of(holder)?;
    if balance.is_zero() {
        return Ok(());
    }

    trace!(token=%token.address(), %holder, %to, %balance, "Sweeping balance");
    token.transfer(holder, IToken::transferCall { to, amount: balance })?;
    Ok(())
}

impl<S: StorageProvider> StorageOps for Vault<'_, S> {
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
    use crate::{
        hub::{IHub, VAULT_CONTRACT},
        storage::hashmap::HashMapStorageProvider,
    };

    struct Setup {
        storage: HashMapStorageProvider,
        vault: Address,
        bridge: Address,
        governance: Address,
        token: Address,
    }

    fn setup() -> eyre::Result<Setup> {
        let mut storage = HashMapStorageProvider::new(1);
        let (hub, vault, bridge, governance, token) = (
            Address::random(),
            Address::random(),
            Address::random(),
            Address::random(),
            Address::random(),
        );
        let owner = Address::random();

        let mut registry = Hub::new(hub, &mut storage);
        registry.initialize(owner)?;
        for (name, addr) in [
            (BRIDGE_CONTRACT, bridge),
            (GOVERNANCE_CONTRACT, governance),
            (VAULT_CONTRACT, vault),
        ] {
            registry.add_contract(
                owner,
                IHub::addContractCall {
                    name: name.to_string(),
                    addr,
                },
            )?;
        }

        Vault::new(vault, &mut storage).initialize(hub)?;
        Token::new(token, &mut storage).initialize(&[vault], &[U256::from(1_000)])?;

        Ok(Setup {
            storage,
            vault,
            bridge,
            governance,
            token,
        })
    }

    #[test]
    fn test_initialize_once() -> eyre::Result<()> {
        let Setup {
            mut storage, vault, ..
        } = setup()?;

        let mut custody = Vault::new(vault, &mut storage);
        assert_eq!(
            custody.initialize(Address::random()),
            Err(VaultError::already_initialized().into())
        );

        let mut fresh = Vault::new(Address::random(), &mut storage);
        assert_eq!(
            fresh.initialize(Address::ZERO),
            Err(VaultError::invalid_address().into())
        );
        Ok(())
    }

    #[test]
    fn test_only_bridge_pays_out() -> eyre::Result<()> {
        let Setup {
            mut storage,
            vault,
            bridge,
            governance,
            token,
        } = setup()?;
        let recipient = Address::random();
        let call = IVault::batchTransferToERC20Call {
            transfers: vec![IVault::VaultTransfer {
                token,
                to: recipient,
                amount: U256::from(300),
            }],
        };

        let mut custody = Vault::new(vault, &mut storage);
        assert_eq!(
            custody.batch_transfer_to_erc20(governance, call.clone()),
            Err(VaultError::invalid_caller().into())
        );
        custody.batch_transfer_to_erc20(bridge, call)?;

        let mut token = Token::new(token, &mut storage);
        assert_eq!(token.balance_of(recipient)?, U256::from(300));
        assert_eq!(token.balance_of(vault)?, U256::from(700));
        Ok(())
    }

    #[test]
    fn test_only_governance_withdraws() -> eyre::Result<()> {
        let Setup {
            mut storage,
            vault,
            bridge,
            governance,
            token,
        } = setup()?;
        let recipient = Address::random();
        let empty_token = Address::random();
        let call = IVault::withdrawCall {
            tokens: vec![token, empty_token],
            to: recipient,
        };

        let mut custody = Vault::new(vault, &mut storage);
        assert_eq!(
            custody.withdraw(bridge, call.clone()),
            Err(VaultError::invalid_caller().into())
        );
        assert_eq!(
            custody.withdraw(
                governance,
                IVault::withdrawCall {
                    tokens: vec![token],
                    to: Address::ZERO,
                }
            ),
            Err(VaultError::invalid_address().into())
        );
        custody.withdraw(governance, call)?;

        let mut token = Token::new(token, &mut storage);
        assert_eq!(token.balance_of(recipient)?, U256::from(1_000));
        assert_eq!(token.balance_of(vault)?, U256::ZERO);
        Ok(())
    }
}
