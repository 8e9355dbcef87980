//! Packed preimages of every message the validator sets sign.
//!
//! Layouts follow `abi.encodePacked`: scalars take their natural width, strings are raw
//! UTF-8 and array elements are left-padded to 32 bytes.

use alloy::primitives::{Address, B256, U256, keccak256};
use ethbridge_contracts::precompiles::{IBridge, ValidatorSetArgs};

pub const BRIDGE_NAMESPACE: &str = "bridge";
pub const GOVERNANCE_NAMESPACE: &str = "governance";
pub const TRANSFER_NAMESPACE: &str = "transfer";

pub const UPDATE_VALIDATORS_SET_ACTION: &str = "updateValidatorsSet";
pub const UPGRADE_CONTRACT_ACTION: &str = "upgradeContract";
pub const ADD_CONTRACT_ACTION: &str = "addContract";
pub const UPGRADE_BRIDGE_CONTRACT_ACTION: &str = "upgradeBridgeContract";
pub const WITHDRAW_ACTION: &str = "withdraw";
pub const UPDATE_BRIDGE_WHITELIST_ACTION: &str = "updateBridgeWhitelist";

/// `abi.encodePacked` buffer.
#[derive(Debug, Clone, Default)]
pub struct PackedEncoder {
    buf: Vec<u8>,
}

impl PackedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uint8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn uint256(mut self, value: U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    pub fn bytes32(mut self, value: B256) -> Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    pub fn address(mut self, value: Address) -> Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn address_array(mut self, values: &[Address]) -> Self {
        for value in values {
            self.buf.extend_from_slice(value.into_word().as_slice());
        }
        self
    }

    pub fn uint256_array(mut self, values: &[U256]) -> Self {
        for value in values {
            self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        }
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn hash(&self) -> B256 {
        keccak256(&self.buf)
    }
}

/// Commitment to a validator set in `namespace`.
pub fn compute_checkpoint(
    version: U256,
    namespace: &str,
    validators: &[Address],
    powers: &[U256],
    nonce: U256,
) -> B256 {
    PackedEncoder::new()
        .uint256(version)
        .string(namespace)
        .address_array(validators)
        .uint256_array(powers)
        .uint256(nonce)
        .hash()
}

/// Checkpoint of a submitted validator set descriptor.
pub fn validator_set_checkpoint(version: U256, namespace: &str, args: &ValidatorSetArgs) -> B256 {
    compute_checkpoint(version, namespace, &args.validators, &args.powers, args.nonce)
}

/// Leaf of a signed transfer batch. The batch nonce binds the leaf to its batch.
pub fn transfer_leaf(version: u8, transfer: &IBridge::Erc20Transfer, batch_nonce: U256) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(TRANSFER_NAMESPACE)
        .address(transfer.from)
        .address(transfer.to)
        .uint256(transfer.amount)
        .address(transfer.feeFrom)
        .uint256(transfer.fee)
        .uint256(batch_nonce)
        .hash()
}

/// Message of a transfer batch submitted as flat arrays.
pub fn batch_transfer_message(
    version: u8,
    froms: &[Address],
    tos: &[Address],
    amounts: &[U256],
    batch_nonce: U256,
    current_validator_set_hash: B256,
) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(TRANSFER_NAMESPACE)
        .address_array(froms)
        .address_array(tos)
        .uint256_array(amounts)
        .uint256(batch_nonce)
        .bytes32(current_validator_set_hash)
        .hash()
}

pub fn update_validators_set_message(
    version: u8,
    bridge_validator_set_hash: B256,
    governance_validator_set_hash: B256,
    nonce: U256,
) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(UPDATE_VALIDATORS_SET_ACTION)
        .bytes32(bridge_validator_set_hash)
        .bytes32(governance_validator_set_hash)
        .uint256(nonce)
        .hash()
}

/// Message of a registry edit. `action` is [`UPGRADE_CONTRACT_ACTION`] or
/// [`ADD_CONTRACT_ACTION`].
pub fn contract_message(version: u8, action: &str, name: &str, addr: Address) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(action)
        .string(name)
        .address(addr)
        .hash()
}

pub fn upgrade_bridge_contract_message(version: u8, addr: Address) -> B256 {
    contract_message(version, UPGRADE_BRIDGE_CONTRACT_ACTION, BRIDGE_NAMESPACE, addr)
}

pub fn withdraw_message(
    version: u8,
    validator_set: &ValidatorSetArgs,
    to: Address,
    tokens: &[Address],
    withdraw_nonce: U256,
) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(WITHDRAW_ACTION)
        .address_array(&validator_set.validators)
        .uint256_array(&validator_set.powers)
        .uint256(validator_set.nonce)
        .address(to)
        .address_array(tokens)
        .uint256(withdraw_nonce)
        .hash()
}

pub fn update_bridge_whitelist_message(
    version: u8,
    tokens: &[Address],
    caps: &[U256],
    whitelist_nonce: U256,
) -> B256 {
    PackedEncoder::new()
        .uint8(version)
        .string(UPDATE_BRIDGE_WHITELIST_ACTION)
        .address_array(tokens)
        .uint256_array(caps)
        .uint256(whitelist_nonce)
        .hash()
}
