use std::collections::HashMap;

use alloy::primitives::{Address, LogData, U256};

use crate::{
    error::Result,
    storage::{StorageCheckpoint, StorageProvider},
};

#[derive(Debug)]
enum JournalEntry {
    StorageChanged {
        address: Address,
        key: U256,
        previous: Option<U256>,
    },
    EventEmitted {
        address: Address,
    },
}

/// In-memory world state with a revert journal.
#[derive(Debug, Default)]
pub struct HashMapStorageProvider {
    internals: HashMap<(Address, U256), U256>,
    events: HashMap<Address, Vec<LogData>>,
    journal: Vec<JournalEntry>,
    depth: usize,
    chain_id: u64,
}

impl HashMapStorageProvider {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    /// Events emitted by `address`, oldest first.
    pub fn events(&self, address: Address) -> &[LogData] {
        self.events.get(&address).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of non-zero storage words held by `address`.
    pub fn storage_len(&self, address: Address) -> usize {
        self.internals
            .iter()
            .filter(|((account, _), value)| *account == address && !value.is_zero())
            .count()
    }
}

impl StorageProvider for HashMapStorageProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sstore(&mut self, address: Address, key: U256, value: U256) -> Result<()> {
        let previous = self.internals.insert((address, key), value);
        if self.depth > 0 {
            self.journal.push(JournalEntry::StorageChanged {
                address,
                key,
                previous,
            });
        }
        Ok(())
    }

    fn sload(&mut self, address: Address, key: U256) -> Result<U256> {
        Ok(self
            .internals
            .get(&(address, key))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    fn emit_event(&mut self, address: Address, event: LogData) -> Result<()> {
        self.events.entry(address).or_default().push(event);
        if self.depth > 0 {
            self.journal.push(JournalEntry::EventEmitted { address });
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> StorageCheckpoint {
        self.depth += 1;
        StorageCheckpoint(self.journal.len())
    }

    fn checkpoint_commit(&mut self, _checkpoint: StorageCheckpoint) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn checkpoint_revert(&mut self, checkpoint: StorageCheckpoint) {
        while self.journal.len() > checkpoint.0 {
            match self.journal.pop() {
                Some(JournalEntry::StorageChanged {
                    address,
                    key,
                    previous,
                }) => match previous {
                    Some(value) => {
                        self.internals.insert((address, key), value);
                    }
                    None => {
                        self.internals.remove(&(address, key));
                    }
                },
                Some(JournalEntry::EventEmitted { address }) => {
                    if let Some(events) = self.events.get_mut(&address) {
                        events.pop();
                    }
                }
                None => break,
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }
}
