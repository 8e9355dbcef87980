//! Ethereum bridge contract interfaces and well-known deployment addresses.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod precompiles;

pub use precompiles::*;
