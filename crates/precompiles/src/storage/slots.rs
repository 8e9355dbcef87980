use alloy::primitives::{Address, U256, keccak256};

/// Storage slot of `mapping[key]` for a mapping declared at `mapping_slot`.
///
/// `key` is hashed as given: value-type keys must already be padded to 32 bytes, string and
/// bytes keys are passed unpadded.
pub fn mapping_slot<T: AsRef<[u8]>>(key: T, mapping_slot: U256) -> U256 {
    let key = key.as_ref();
    let mut data = Vec::with_capacity(key.len() + 32);
    data.extend_from_slice(key);
    data.extend_from_slice(&mapping_slot.to_be_bytes::<32>());
    U256::from_be_bytes(keccak256(&data).0)
}

/// Storage slot of `mapping[key]` for an address-keyed mapping.
pub fn address_mapping_slot(key: Address, slot: U256) -> U256 {
    mapping_slot(key.into_word(), slot)
}

/// Storage slot of `mapping[key1][key2]` for a double address-keyed mapping.
pub fn double_mapping_slot(key1: Address, key2: Address, base_slot: U256) -> U256 {
    let intermediate_slot = address_mapping_slot(key1, base_slot);
    address_mapping_slot(key2, intermediate_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, uint};

    #[test]
    fn test_mapping_slot_matches_solidity_layout() {
        // keccak256(abi.encode(address(0x01), uint256(0)))
        let key = address!("0x0000000000000000000000000000000000000001");
        let mut preimage = [0u8; 64];
        preimage[31] = 1;
        let expected = U256::from_be_bytes(keccak256(preimage).0);

        assert_eq!(address_mapping_slot(key, uint!(0_U256)), expected);
    }

    #[test]
    fn test_string_keys_are_not_padded() {
        let slot = uint!(2_U256);
        let mut preimage = b"bridge".to_vec();
        preimage.extend_from_slice(&slot.to_be_bytes::<32>());

        assert_eq!(
            mapping_slot("bridge", slot),
            U256::from_be_bytes(keccak256(&preimage).0)
        );
        assert_ne!(mapping_slot("bridge", slot), mapping_slot("vault", slot));
    }

    #[test]
    fn test_double_mapping_slot_is_ordered() {
        let (a, b) = (Address::random(), Address::random());
        assert_ne!(
            double_mapping_slot(a, b, uint!(1_U256)),
            double_mapping_slot(b, a, uint!(1_U256))
        );
    }
}
