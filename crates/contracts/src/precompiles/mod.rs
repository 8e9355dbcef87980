pub mod bridge;
pub mod common_errors;
pub mod hub;
pub mod token;
pub mod vault;

use alloy_primitives::{Address, address};
pub use bridge::*;
pub use common_errors::*;
pub use hub::*;
pub use token::*;
pub use vault::*;

pub const HUB_ADDRESS: Address = address!("0x4B1B000000000000000000000000000000000000");
pub const BRIDGE_ADDRESS: Address = address!("0xB41D6E0000000000000000000000000000000000");
pub const GOVERNANCE_ADDRESS: Address = address!("0x6060000000000000000000000000000000000000");
pub const VAULT_ADDRESS: Address = address!("0x7A01700000000000000000000000000000000000");
