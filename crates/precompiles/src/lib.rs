//! Native implementations of the Ethereum bridge contracts.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub use error::{EthBridgeError, IntoCallResult, Result};

pub mod storage;

pub mod checkpoint;
pub mod merkle;
pub mod nonce;
pub mod validator_set;

pub mod bridge;
pub mod genesis;
pub mod governance;
pub mod hub;
pub mod token;
pub mod vault;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_util;

#[cfg(test)]
use alloy::sol_types::SolInterface;
use alloy::{
    primitives::{Address, Bytes},
    sol_types::SolCall,
};

pub use ethbridge_contracts::precompiles::{
    BRIDGE_ADDRESS, GOVERNANCE_ADDRESS, HUB_ADDRESS, VAULT_ADDRESS,
};

use crate::storage::{StorageCheckpoint, StorageProvider};

/// Output of a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutput {
    /// ABI-encoded return data, or the ABI-encoded error when `reverted`.
    pub bytes: Bytes,
    pub reverted: bool,
}

impl CallOutput {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            reverted: false,
        }
    }

    pub fn new_reverted(bytes: Bytes) -> Self {
        Self {
            bytes,
            reverted: true,
        }
    }
}

/// Failure that aborts execution instead of reverting it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("fatal: {0}")]
    Fatal(String),
    #[error("{0}")]
    Other(String),
}

pub type CallResult = std::result::Result<CallOutput, CallError>;

pub trait Precompile {
    fn call(&mut self, calldata: &[u8], msg_sender: Address) -> CallResult;
}

/// Closes the checkpoint opened for a call, discarding every write and event unless the
/// call succeeded.
#[inline]
fn settle<S: StorageProvider>(
    storage: &mut S,
    checkpoint: StorageCheckpoint,
    result: CallResult,
) -> CallResult {
    match &result {
        Ok(output) if !output.reverted => storage.checkpoint_commit(checkpoint),
        _ => storage.checkpoint_revert(checkpoint),
    }
    result
}

#[inline]
fn view<T: SolCall>(call: T, f: impl FnOnce(T) -> Result<T::Return>) -> CallResult {
    f(call).into_call_result(|ret| T::abi_encode_returns(&ret).into())
}

#[inline]
fn mutate<T: SolCall>(
    call: T,
    sender: Address,
    f: impl FnOnce(Address, T) -> Result<T::Return>,
) -> CallResult {
    f(sender, call).into_call_result(|ret| T::abi_encode_returns(&ret).into())
}

#[inline]
fn mutate_void<T: SolCall>(
    call: T,
    sender: Address,
    f: impl FnOnce(Address, T) -> Result<()>,
) -> CallResult {
    f(sender, call).into_call_result(|()| Bytes::new())
}

/// Helper function to return an unknown function selector error.
/// Returns an ABI-encoded UnknownFunctionSelector error with the selector.
#[inline]
pub fn unknown_selector(selector: [u8; 4]) -> CallResult {
    Err::<(), _>(EthBridgeError::UnknownFunctionSelector(selector))
        .into_call_result(|()| Bytes::new())
}

/// Helper function to decode calldata and dispatch it.
#[inline]
fn dispatch_call<T>(
    calldata: &[u8],
    decode: impl FnOnce(&[u8]) -> core::result::Result<T, alloy::sol_types::Error>,
    f: impl FnOnce(T) -> CallResult,
) -> CallResult {
    if calldata.len() < 4 {
        return Ok(CallOutput::new_reverted(Bytes::new()));
    }

    match decode(calldata) {
        Ok(call) => f(call),
        Err(alloy::sol_types::Error::UnknownSelector { selector, .. }) => {
            unknown_selector(*selector)
        }
        Err(_) => Ok(CallOutput::new_reverted(Bytes::new())),
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub fn expect_revert<E>(result: &CallResult, expected_error: E)
where
    E: alloy::sol_types::SolInterface + PartialEq + std::fmt::Debug,
{
    match result {
        Ok(result) => {
            assert!(result.reverted, "expected reverted output");
            let decoded = E::abi_decode(&result.bytes).unwrap();
            assert_eq!(decoded, expected_error);
        }
        Err(other) => {
            panic!("expected reverted output, got: {other:?}");
        }
    }
}
