//! Parameter hashing for keyed storage lookups.
//!
//! Some reader methods take `bytes32` keys that are derived on-chain as
//! `keccak256(abi.encode(...))`. Callers pass the pre-image as a
//! `(types, values)` pair and the encoder replaces it with the hash.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, B256};
use serde_json::Value;

use crate::multicall::EncodeError;
use crate::utils::json_to_sol_value;

/// Compute `keccak256(abi.encode(values...))` for the given types.
///
/// `types` is either a single type string (with `values` the single value) or
/// an array of type strings with a matching array of values.
///
/// # Example
/// ```ignore
/// let key = hash_data(&json!(["address", "string"]), &json!([market, "MAX_PNL"]))?;
/// ```
pub fn hash_data(types: &Value, values: &Value) -> Result<B256, EncodeError> {
    let pairs: Vec<(&Value, &Value)> = match (types, values) {
        (Value::Array(types), Value::Array(values)) => {
            if types.len() != values.len() {
                return Err(EncodeError::InvalidHashParam(format!(
                    "{} types for {} values",
                    types.len(),
                    values.len()
                )));
            }
            types.iter().zip(values).collect()
        },
        (Value::String(_), value) => vec![(types, value)],
        _ => {
            return Err(EncodeError::InvalidHashParam(format!(
                "expected a type or list of types, got {}",
                types
            )))
        },
    };

    let encoded = pairs
        .into_iter()
        .map(|(ty, value)| {
            let ty: DynSolType = ty
                .as_str()
                .ok_or_else(|| EncodeError::InvalidHashParam(format!("invalid type {}", ty)))?
                .parse()
                .map_err(|e| EncodeError::InvalidHashParam(format!("{}", e)))?;
            json_to_sol_value(&ty, value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keccak256(DynSolValue::Tuple(encoded).abi_encode_params()))
}

/// Hash a single `[types, values]` parameter pair.
pub fn hash_param(param: &Value) -> Result<B256, EncodeError> {
    match param {
        Value::Array(pair) if pair.len() == 2 => hash_data(&pair[0], &pair[1]),
        _ => Err(EncodeError::InvalidHashParam(format!(
            "expected a [types, values] pair, got {}",
            param
        ))),
    }
}
