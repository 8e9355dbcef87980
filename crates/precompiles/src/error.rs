use alloy::{
    primitives::Bytes,
    sol_types::{SolError, SolInterface},
};
use ethbridge_contracts::precompiles::{
    BridgeError, GovernanceError, HubError, TokenError, UnknownFunctionSelector, VaultError,
};

use crate::{CallError, CallOutput, CallResult};

/// Top-level error type for all bridge contract operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EthBridgeError {
    /// Error from the bridge
    #[error("Bridge error: {0:?}")]
    Bridge(BridgeError),

    /// Error from governance
    #[error("Governance error: {0:?}")]
    Governance(GovernanceError),

    /// Error from the contract registry
    #[error("Hub error: {0:?}")]
    Hub(HubError),

    /// Error from the vault
    #[error("Vault error: {0:?}")]
    Vault(VaultError),

    /// Error from a bridged token
    #[error("Token error: {0:?}")]
    Token(TokenError),

    /// Calldata carried a selector no handler is registered for
    #[error("Unknown function selector: {0:?}")]
    UnknownFunctionSelector([u8; 4]),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Result type alias for bridge contract operations
pub type Result<T> = std::result::Result<T, EthBridgeError>;

impl From<BridgeError> for EthBridgeError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err)
    }
}

impl From<GovernanceError> for EthBridgeError {
    fn from(err: GovernanceError) -> Self {
        Self::Governance(err)
    }
}

impl From<HubError> for EthBridgeError {
    fn from(err: HubError) -> Self {
        Self::Hub(err)
    }
}

impl From<VaultError> for EthBridgeError {
    fn from(err: VaultError) -> Self {
        Self::Vault(err)
    }
}

impl From<TokenError> for EthBridgeError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl EthBridgeError {
    /// ABI-encoded revert payload, or `None` for errors that abort the call instead of
    /// reverting it.
    pub fn revert_bytes(&self) -> Option<Bytes> {
        let bytes = match self {
            Self::Bridge(e) => e.abi_encode(),
            Self::Governance(e) => e.abi_encode(),
            Self::Hub(e) => e.abi_encode(),
            Self::Vault(e) => e.abi_encode(),
            Self::Token(e) => e.abi_encode(),
            Self::UnknownFunctionSelector(selector) => UnknownFunctionSelector {
                selector: (*selector).into(),
            }
            .abi_encode(),
            Self::Fatal(_) => return None,
        };
        Some(bytes.into())
    }
}

/// Extension trait to convert `Result<T, EthBridgeError>` into a [`CallResult`]
pub trait IntoCallResult<T> {
    fn into_call_result(self, encode_ok: impl FnOnce(T) -> Bytes) -> CallResult;
}

impl<T> IntoCallResult<T> for Result<T> {
    fn into_call_result(self, encode_ok: impl FnOnce(T) -> Bytes) -> CallResult {
        match self {
            Ok(res) => Ok(CallOutput::new(encode_ok(res))),
            Err(err) => match err.revert_bytes() {
                Some(bytes) => Ok(CallOutput::new_reverted(bytes)),
                None => Err(CallError::Fatal(err.to_string())),
            },
        }
    }
}
