pub mod hashmap;
pub mod slots;

use alloy::primitives::{Address, B256, LogData, U256};

use crate::error::Result;

/// Opaque marker returned by [`StorageProvider::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageCheckpoint(pub(crate) usize);

/// World state seen by the bridge contracts: word-addressed storage per account, an event
/// log, and a revert journal with nested checkpoints.
pub trait StorageProvider {
    fn chain_id(&self) -> u64;
    fn sstore(&mut self, address: Address, key: U256, value: U256) -> Result<()>;
    fn sload(&mut self, address: Address, key: U256) -> Result<U256>;
    fn emit_event(&mut self, address: Address, event: LogData) -> Result<()>;

    /// Opens a checkpoint. Every checkpoint must be closed by exactly one of
    /// [`Self::checkpoint_commit`] or [`Self::checkpoint_revert`], innermost first.
    fn checkpoint(&mut self) -> StorageCheckpoint;
    fn checkpoint_commit(&mut self, checkpoint: StorageCheckpoint);
    /// Undoes every write and event since `checkpoint` was opened.
    fn checkpoint_revert(&mut self, checkpoint: StorageCheckpoint);
}

/// Storage access scoped to a single contract account.
pub trait StorageOps {
    fn sstore(&mut self, slot: U256, value: U256) -> Result<()>;
    fn sload(&mut self, slot: U256) -> Result<U256>;

    fn read<T: StorableValue>(&mut self, slot: U256) -> Result<T> {
        self.sload(slot).map(T::from_word)
    }

    fn write<T: StorableValue>(&mut self, slot: U256, value: T) -> Result<()> {
        self.sstore(slot, value.into_word())
    }
}

/// Values that fit a single storage word.
pub trait StorableValue: Sized {
    fn into_word(self) -> U256;
    fn from_word(word: U256) -> Self;
}

impl StorableValue for U256 {
    fn into_word(self) -> U256 {
        self
    }

    fn from_word(word: U256) -> Self {
        word
    }
}

impl StorableValue for B256 {
    fn into_word(self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    fn from_word(word: U256) -> Self {
        Self::new(word.to_be_bytes())
    }
}

impl StorableValue for Address {
    fn into_word(self) -> U256 {
        U256::from_be_slice(self.as_slice())
    }

    fn from_word(word: U256) -> Self {
        let bytes: [u8; 32] = word.to_be_bytes();
        Self::from_slice(&bytes[12..])
    }
}

impl StorableValue for bool {
    fn into_word(self) -> U256 {
        U256::from(self as u8)
    }

    fn from_word(word: U256) -> Self {
        !word.is_zero()
    }
}
