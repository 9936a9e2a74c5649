//! Utility functions for the multicaller.
//!
//! - [`conversion`] - JSON <-> ABI value conversions, hex encoding
//! - [`hash`] - `keccak256(abi.encode(...))` parameter hashing
//! - [`text`] - message truncation for logs and propagated errors

mod conversion;
mod hash;
mod text;

pub use conversion::{hex_encode, json_to_sol_value, sol_value_to_json};
pub use hash::{hash_data, hash_param};
pub use text::{truncate_message, MAX_ERROR_MESSAGE_LENGTH};
