//! Strictly sequential counters kept in contract storage.
//!
//! Every counter class (validator set, batch, withdraw, whitelist) lives in its own slot and
//! only moves forward one step at a time, so a signed payload bound to `current + 1` can be
//! applied exactly once.

use alloy::primitives::U256;

use crate::{
    error::{EthBridgeError, Result},
    storage::StorageOps,
};

/// Whether `proposed` is exactly one past `current`.
pub fn is_next(current: U256, proposed: U256) -> bool {
    current.checked_add(U256::from(1)) == Some(proposed)
}

pub trait NonceLedger: StorageOps {
    fn nonce(&mut self, slot: U256) -> Result<U256> {
        self.read(slot)
    }

    /// Whether `proposed` may be the next value of the counter in `slot`.
    fn is_next_nonce(&mut self, slot: U256, proposed: U256) -> Result<bool> {
        Ok(is_next(self.nonce(slot)?, proposed))
    }

    /// Value the counter in `slot` takes on its next step.
    fn next_nonce(&mut self, slot: U256) -> Result<U256> {
        self.nonce(slot)?
            .checked_add(U256::from(1))
            .ok_or_else(|| EthBridgeError::Fatal("nonce overflow".into()))
    }

    /// Advances the counter in `slot` by one and returns the new value.
    fn bump_nonce(&mut self, slot: U256) -> Result<U256> {
        let next = self.next_nonce(slot)?;
        self.write(slot, next)?;
        Ok(next)
    }
}

impl<T: StorageOps> NonceLedger for T {}
