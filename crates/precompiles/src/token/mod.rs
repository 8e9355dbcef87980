pub mod dispatch;

pub use ethbridge_contracts::precompiles::{IToken, TokenError, TokenEvent};

use alloy::primitives::{Address, IntoLogData, U256};
use tracing::trace;

use crate::{
    error::{EthBridgeError, Result},
    storage::{
        StorageOps, StorageProvider,
        slots::{address_mapping_slot, double_mapping_slot},
    },
};

mod slots {
    use alloy::primitives::{U256, uint};

    pub(super) const TOTAL_SUPPLY: U256 = uint!(0_U256);
    pub(super) const BALANCES: U256 = uint!(1_U256);
    pub(super) const ALLOWANCES: U256 = uint!(2_U256);
}

/// ERC-20 token bridged through the vault.
#[derive(Debug)]
pub struct Token<'a, S: StorageProvider> {
    address: Address,
    storage: &'a mut S,
}

impl<'a, S: StorageProvider> Token<'a, S> {
    pub fn new(address: Address, storage: &'a mut S) -> Self {
        Self { address, storage }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Mints the initial supply to `holders`.
    pub fn initialize(&mut self, holders: &[Address], amounts: &[U256]) -> Result<()> {
        trace!(address=%self.address, holders = holders.len(), "Initializing token");

        let mut supply = self.total_supply()?;
        for (holder, amount) in holders.iter().zip(amounts) {
            supply = supply
                .checked_add(*amount)
                .ok_or_else(|| EthBridgeError::Fatal("token supply overflow".into()))?;
            let balance = self.balance_of(*holder)?;
            self.write(address_mapping_slot(*holder, slots::BALANCES), balance + *amount)?;
            self.emit(TokenEvent::Transfer(IToken::Transfer {
                from: Address::ZERO,
                to: *holder,
                amount: *amount,
            }))?;
        }
        self.write(slots::TOTAL_SUPPLY, supply)
    }

    // View functions
    pub fn total_supply(&mut self) -> Result<U256> {
        self.read(slots::TOTAL_SUPPLY)
    }

    pub fn balance_of(&mut self, account: Address) -> Result<U256> {
        self.read(address_mapping_slot(account, slots::BALANCES))
    }

    pub fn allowance(&mut self, owner: Address, spender: Address) -> Result<U256> {
        self.read(double_mapping_slot(owner, spender, slots::ALLOWANCES))
    }

    // State-changing functions
    pub fn approve(&mut self, msg_sender: Address, call: IToken::approveCall) -> Result<bool> {
        self.write(
            double_mapping_slot(msg_sender, call.spender, slots::ALLOWANCES),
            call.amount,
        )?;
        self.emit(TokenEvent::Approval(IToken::Approval {
            owner: msg_sender,
            spender: call.spender,
            amount: call.amount,
        }))?;
        Ok(true)
    }

    pub fn transfer(&mut self, msg_sender: Address, call: IToken::transferCall) -> Result<bool> {
        self.move_balance(msg_sender, call.to, call.amount)?;
        Ok(true)
    }

    pub fn transfer_from(
        &mut self,
        msg_sender: Address,
        call: IToken::transferFromCall,
    ) -> Result<bool> {
        let allowed = self.allowance(call.from, msg_sender)?;
        if call.amount > allowed {
            return Err(TokenError::insufficient_allowance().into());
        }

        // an unlimited allowance is never consumed
        if allowed != U256::MAX {
            self.write(
                double_mapping_slot(call.from, msg_sender, slots::ALLOWANCES),
                allowed - call.amount,
            )?;
        }

        self.move_balance(call.from, call.to, call.amount)?;
        Ok(true)
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        if to.is_zero() {
            return Err(TokenError::invalid_recipient().into());
        }

        let from_balance = self.balance_of(from)?;
        if amount > from_balance {
            return Err(TokenError::insufficient_balance(from_balance, amount).into());
        }
        self.write(address_mapping_slot(from, slots::BALANCES), from_balance - amount)?;

        let to_balance = self.balance_of(to)?;
        let new_to_balance = to_balance
            .checked_add(amount)
            .ok_or_else(|| EthBridgeError::Fatal("token balance overflow".into()))?;
        self.write(address_mapping_slot(to, slots::BALANCES), new_to_balance)?;

        self.emit(TokenEvent::Transfer(IToken::Transfer { from, to, amount }))
    }

    fn emit(&mut self, event: TokenEvent) -> Result<()> {
        self.storage.emit_event(self.address, event.into_log_data())
    }
}

impl<S: StorageProvider> StorageOps for Token<'_, S> {
    fn sstore(&mut self, slot: U256, value: U256) -> Result<()> {
        self.storage.sstore(self.address, slot, value)
    }

    fn sload(&mut self, slot: U256) -> Result<U256> {
        self.storage.sload(self.address, slot)
    }
}
