//! Conversions between JSON values and dynamically typed ABI values.
//!
//! Requests and results cross process and worker boundaries as JSON, so call
//! parameters arrive as [`Value`]s and decoded return data leaves as
//! [`Value`]s. Integers travel as decimal strings to avoid precision loss.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::hex;
use serde_json::Value;

use crate::multicall::EncodeError;

// ============================================
// Hex Encoding
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ============================================
// ABI -> JSON
// ============================================

/// Render a decoded ABI value as JSON.
///
/// - `uint`/`int` -> decimal string
/// - `address` -> EIP-55 checksummed string
/// - `bytes`/`bytesN`/`function` -> 0x-prefixed hex
/// - arrays and tuples -> JSON arrays, recursively
pub fn sol_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex_encode(&word[..*size])),
        DynSolValue::Address(address) => Value::String(address.to_checksum(None)),
        DynSolValue::Function(function) => Value::String(hex_encode(function.as_slice())),
        DynSolValue::Bytes(bytes) => Value::String(hex_encode(bytes)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(sol_value_to_json).collect())
        },
        #[allow(unreachable_patterns)]
        other => match other.as_tuple() {
            Some(items) => Value::Array(items.iter().map(sol_value_to_json).collect()),
            None => Value::Null,
        },
    }
}

// ============================================
// JSON -> ABI
// ============================================

/// Coerce a JSON parameter into a value of the given ABI type.
///
/// Scalars are accepted as strings, numbers or booleans and parsed with the
/// type's own string coercion. Arrays and tuples must be JSON arrays.
pub fn json_to_sol_value(ty: &DynSolType, value: &Value) -> Result<DynSolValue, EncodeError> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => items
            .iter()
            .map(|item| json_to_sol_value(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(EncodeError::InvalidArgument(format!(
                    "expected {} items for {}, got {}",
                    len,
                    ty,
                    items.len()
                )));
            }
            items
                .iter()
                .map(|item| json_to_sol_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        },
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(EncodeError::InvalidArgument(format!(
                    "expected {} fields for {}, got {}",
                    types.len(),
                    ty,
                    items.len()
                )));
            }
            types
                .iter()
                .zip(items)
                .map(|(ty, item)| json_to_sol_value(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        },
        (_, Value::String(s)) => coerce_str(ty, s),
        (_, Value::Number(n)) => coerce_str(ty, &n.to_string()),
        (_, Value::Bool(b)) => coerce_str(ty, if *b { "true" } else { "false" }),
        _ => Err(EncodeError::InvalidArgument(format!(
            "cannot encode {} as {}",
            value, ty
        ))),
    }
}

fn coerce_str(ty: &DynSolType, s: &str) -> Result<DynSolValue, EncodeError> {
    ty.coerce_str(s)
        .map_err(|e| EncodeError::InvalidArgument(format!("cannot encode {:?} as {}: {}", s, ty, e)))
}
