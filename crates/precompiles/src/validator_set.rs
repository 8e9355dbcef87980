//! Weighted multisignature authorization against a validator set.

use alloy::primitives::{
    Address, B256, Signature as EcdsaSignature, U256, eip191_hash_message, uint,
};
use ethbridge_contracts::precompiles::{Signature, ValidatorSetArgs};

/// Total voting power of a normalized validator set.
pub const TOTAL_VOTING_POWER: U256 = uint!(4294967296_U256);

/// Rounding slack accepted on [`TOTAL_VOTING_POWER`].
pub const VOTING_POWER_TOLERANCE: U256 = uint!(10_U256);

pub fn total_power(powers: &[U256]) -> U256 {
    powers
        .iter()
        .fold(U256::ZERO, |acc, power| acc.saturating_add(*power))
}

/// Power needed for a quorum: two thirds of the total, rounded to the nearest integer.
pub fn compute_threshold(powers: &[U256]) -> U256 {
    // 2 * sum / 3 never ends in exactly .5, so rounding half up is rounding to nearest
    (total_power(powers).saturating_mul(uint!(2_U256)) + uint!(1_U256)) / uint!(3_U256)
}

/// Whether `powers` sum to [`TOTAL_VOTING_POWER`] within [`VOTING_POWER_TOLERANCE`].
pub fn is_normalized(powers: &[U256]) -> bool {
    let total = total_power(powers);
    let deviation = if total > TOTAL_VOTING_POWER {
        total - TOTAL_VOTING_POWER
    } else {
        TOTAL_VOTING_POWER - total
    };
    deviation <= VOTING_POWER_TOLERANCE
}

/// Scales raw weights so they sum to exactly [`TOTAL_VOTING_POWER`], sorted largest first.
///
/// The rounding residue is assigned to the largest weight.
pub fn normalize_powers(raw: &[u64]) -> Vec<U256> {
    let total: u128 = raw.iter().map(|w| *w as u128).sum();
    if total == 0 {
        return Vec::new();
    }

    let target = TOTAL_VOTING_POWER.to::<u128>();
    let mut powers: Vec<u128> = raw
        .iter()
        .map(|w| (*w as u128 * target * 2 + total) / (total * 2))
        .collect();
    powers.sort_unstable_by(|a, b| b.cmp(a));

    let assigned: u128 = powers.iter().sum();
    if let Some(largest) = powers.first_mut() {
        *largest = (*largest + target).saturating_sub(assigned);
    }
    powers.sort_unstable_by(|a, b| b.cmp(a));
    powers.into_iter().map(U256::from).collect()
}

/// Recovers the address that signed `message_hash` as an Ethereum personal message.
///
/// Returns `None` for any `v` other than 27 or 28 and for signatures that do not recover.
pub fn recover_signer(message_hash: B256, signature: &Signature) -> Option<Address> {
    let parity = match signature.v {
        27 => false,
        28 => true,
        _ => return None,
    };
    let signature = EcdsaSignature::new(
        U256::from_be_bytes(signature.r.0),
        U256::from_be_bytes(signature.s.0),
        parity,
    );
    signature
        .recover_address_from_prehash(&eip191_hash_message(message_hash))
        .ok()
}

/// Whether a validator left its position unsigned: `r` and `s` are both zero.
pub fn is_absent(signature: &Signature) -> bool {
    signature.r.is_zero() && signature.s.is_zero()
}

/// Power collected from a set of positioned signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub power: U256,
    pub threshold: U256,
    /// Set when a present signature does not recover to the validator at its position.
    pub bad_signature: bool,
}

impl Tally {
    pub fn has_quorum(&self) -> bool {
        !self.bad_signature && self.power >= self.threshold
    }
}

/// Sums the power of every validator whose positioned signature recovers to them.
///
/// Absent signatures count for nothing. A present signature that is malformed or belongs to
/// someone else flags the tally as bad. The tally never stops early. Callers check that the
/// slices have equal lengths.
pub fn tally(
    validators: &[Address],
    powers: &[U256],
    signatures: &[Signature],
    message_hash: B256,
) -> Tally {
    let mut power = U256::ZERO;
    let mut bad_signature = false;
    for ((validator, validator_power), signature) in validators.iter().zip(powers).zip(signatures)
    {
        if is_absent(signature) {
            continue;
        }
        match recover_signer(message_hash, signature) {
            Some(signer) if signer == *validator => power = power.saturating_add(*validator_power),
            _ => bad_signature = true,
        }
    }

    Tally {
        power,
        threshold: compute_threshold(powers),
        bad_signature,
    }
}

/// Structural checks on a submitted validator set descriptor.
pub trait ValidatorSetArgsExt {
    /// Whether validators, powers and (when given) signatures line up.
    fn is_well_formed(&self, signatures: Option<&[Signature]>) -> bool;

    fn tally(&self, signatures: &[Signature], message_hash: B256) -> Tally;
}

impl ValidatorSetArgsExt for ValidatorSetArgs {
    fn is_well_formed(&self, signatures: Option<&[Signature]>) -> bool {
        self.validators.len() == self.powers.len()
            && signatures.is_none_or(|signatures| signatures.len() == self.validators.len())
    }

    fn tally(&self, signatures: &[Signature], message_hash: B256) -> Tally {
        tally(&self.validators, &self.powers, signatures, message_hash)
    }
}
