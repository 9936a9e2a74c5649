//! Maps the flat positional response back onto logical identity.
//!
//! Never fails: anything that cannot be decoded becomes a failed outcome in
//! its own slot.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use alloy::sol_types::decode_revert_reason;
use serde_json::Value;

use crate::multicall::encoder::{EncodedCall, EncodedRequest, ReturnShape};
use crate::multicall::{CallFailure, CallOutcome, MulticallResult, OriginalKey};
use crate::utils::{hex_encode, sol_value_to_json};

/// Raw per-slot response, aligned with the encoded calls.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResponse {
    /// Call succeeded; ABI-encoded return data
    Success(Bytes),
    /// Call reverted; raw revert data
    Reverted(Bytes),
    /// Call never produced return data (not encoded, not answered)
    Failed(CallFailure),
}

/// Build the [`MulticallResult`] from positional responses.
pub fn reconcile(encoded: &EncodedRequest, responses: Vec<CallResponse>) -> MulticallResult {
    let mut result = MulticallResult::new();
    let mut responses = responses.into_iter();

    for (key, call) in encoded.keys.iter().zip(&encoded.calls) {
        let response = responses.next().unwrap_or_else(|| {
            CallResponse::Failed(CallFailure::new("missing response for call"))
        });

        let outcome = match response {
            CallResponse::Success(data) => decode_return(call, &data),
            CallResponse::Reverted(data) => Err(decode_revert(&call.abi, &data)),
            CallResponse::Failed(failure) => Err(failure),
        };

        match outcome {
            Ok(return_values) => record(&mut result, key, return_values, None),
            Err(failure) => {
                result.success = false;
                result
                    .errors
                    .entry(key.contract_key.clone())
                    .or_default()
                    .insert(key.call_key.clone(), failure.clone());
                record(&mut result, key, Vec::new(), Some(failure));
            },
        }
    }

    result
}

fn record(
    result: &mut MulticallResult,
    key: &OriginalKey,
    return_values: Vec<Value>,
    error: Option<CallFailure>,
) {
    result.data.entry(key.contract_key.clone()).or_default().insert(
        key.call_key.clone(),
        CallOutcome {
            contract_key: key.contract_key.clone(),
            call_key: key.call_key.clone(),
            return_values,
            success: error.is_none(),
            error,
        },
    );
}

fn decode_return(call: &EncodedCall, data: &[u8]) -> Result<Vec<Value>, CallFailure> {
    let Some(function) = &call.function else {
        return Err(CallFailure::new(format!("{} was not encoded", call.method_name)));
    };

    let decoded = function.abi_decode_output(data).map_err(|e| CallFailure {
        message: format!("failed to decode {} output: {}", call.method_name, e),
        error_name: None,
        args: Vec::new(),
        data: Some(Bytes::copy_from_slice(data)),
    })?;

    Ok(normalize(call.return_shape, &decoded))
}

/// Shape decoded outputs into `returnValues`.
///
/// A single struct output is unpacked into its components and a single array
/// output into its elements; every other shape is the list of outputs.
pub fn normalize(shape: ReturnShape, decoded: &[DynSolValue]) -> Vec<Value> {
    match (shape, decoded) {
        (ReturnShape::Composite, [single]) => match single.as_tuple() {
            Some(fields) => fields.iter().map(sol_value_to_json).collect(),
            None => vec![sol_value_to_json(single)],
        },
        (ReturnShape::Sequence, [single]) => match single {
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                items.iter().map(sol_value_to_json).collect()
            },
            other => vec![sol_value_to_json(other)],
        },
        _ => decoded.iter().map(sol_value_to_json).collect(),
    }
}

/// Decode revert data into a structured failure.
///
/// Tries the ABI's error fragments (custom errors included) first, then the
/// standard `Error(string)` / `Panic(uint256)` reasons.
pub fn decode_revert(abi: &JsonAbi, data: &[u8]) -> CallFailure {
    let raw = Some(Bytes::copy_from_slice(data));

    if data.len() >= 4 {
        let (selector, payload) = data.split_at(4);

        for error in abi.errors() {
            if error.selector().as_slice() != selector {
                continue;
            }

            if let Ok(values) = error.abi_decode_input(payload) {
                let args: Vec<Value> = values.iter().map(sol_value_to_json).collect();
                let rendered = args
                    .iter()
                    .map(|arg| match arg {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                return CallFailure {
                    message: format!("{}({})", error.name, rendered),
                    error_name: Some(error.name.clone()),
                    args,
                    data: raw,
                };
            }
        }
    }

    if let Some(reason) = decode_revert_reason(data).filter(|r| !r.is_empty()) {
        return CallFailure {
            message: reason,
            error_name: None,
            args: Vec::new(),
            data: raw,
        };
    }

    CallFailure {
        message: if data.is_empty() {
            "execution reverted".to_string()
        } else {
            format!("execution reverted with data {}", hex_encode(data))
        },
        error_name: None,
        args: Vec::new(),
        data: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abis::CUSTOM_ERRORS_ABI;
    use crate::multicall::encoder::encode_request;
    use crate::multicall::testing::{call, contract, encode_output, READER, TOKEN};
    use crate::multicall::CallRequest;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::{Revert, SolError};
    use serde_json::json;

    fn reader_request(calls: Vec<(&str, &str, Vec<Value>)>) -> EncodedRequest {
        let calls = calls
            .into_iter()
            .map(|(key, method, params)| (key, Some(call(method, params))))
            .collect();
        encode_request(&CallRequest::from([(
            "reader".to_string(),
            Some(contract(READER, calls)),
        )]))
    }

    fn uint(value: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(value), 256)
    }

    fn token() -> Address {
        TOKEN.parse().unwrap()
    }

    #[test]
    fn test_scalar_return_is_wrapped() {
        let encoded = reader_request(vec![("balance", "balanceOf", vec![json!(TOKEN)])]);
        let data = encode_output(&encoded.calls[0], &[uint(5)]);

        let result = reconcile(&encoded, vec![CallResponse::Success(data)]);

        assert!(result.success);
        let outcome = result.outcome("reader", "balance").unwrap();
        assert_eq!(outcome.return_values, vec![json!("5")]);
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_multiple_returns_used_as_is() {
        let encoded = reader_request(vec![("reserves", "getReserves", vec![])]);
        let data = encode_output(
            &encoded.calls[0],
            &[
                DynSolValue::Uint(U256::from(1), 112),
                DynSolValue::Uint(U256::from(2), 112),
                DynSolValue::Uint(U256::from(3), 32),
            ],
        );

        let result = reconcile(&encoded, vec![CallResponse::Success(data)]);

        assert_eq!(
            result.outcome("reader", "reserves").unwrap().return_values,
            vec![json!("1"), json!("2"), json!("3")]
        );
    }

    #[test]
    fn test_struct_return_used_as_composite() {
        let encoded = reader_request(vec![(
            "market",
            "getMarket",
            vec![json!(format!("0x{}", "11".repeat(32)))],
        )]);
        let data = encode_output(
            &encoded.calls[0],
            &[DynSolValue::Tuple(vec![DynSolValue::Address(token()), uint(10)])],
        );

        let result = reconcile(&encoded, vec![CallResponse::Success(data)]);

        assert_eq!(
            result.outcome("reader", "market").unwrap().return_values,
            vec![json!(token().to_checksum(None)), json!("10")]
        );
    }

    #[test]
    fn test_single_array_return_is_spread_into_values() {
        let encoded = reader_request(vec![("markets", "getMarkets", vec![])]);
        let data = encode_output(
            &encoded.calls[0],
            &[DynSolValue::Array(vec![
                DynSolValue::Address(token()),
                DynSolValue::Address(Address::ZERO),
            ])],
        );

        let result = reconcile(&encoded, vec![CallResponse::Success(data)]);
        let values = &result.outcome("reader", "markets").unwrap().return_values;

        assert_eq!(
            values,
            &vec![
                json!(token().to_checksum(None)),
                json!(Address::ZERO.to_checksum(None)),
            ]
        );
    }

    #[test]
    fn test_custom_error_revert_is_structured() {
        let encoded = reader_request(vec![("balance", "balanceOf", vec![json!(TOKEN)])]);
        let unauthorized = &CUSTOM_ERRORS_ABI.error("Unauthorized").unwrap()[0];
        let revert = unauthorized
            .abi_encode_input(&[
                DynSolValue::Address(token()),
                DynSolValue::String("CONTROLLER".to_string()),
            ])
            .unwrap();

        let result = reconcile(&encoded, vec![CallResponse::Reverted(revert.into())]);

        assert!(!result.success);
        let failure = result.error("reader", "balance").unwrap();
        assert_eq!(failure.error_name.as_deref(), Some("Unauthorized"));
        assert_eq!(failure.args.len(), 2);
        assert_eq!(failure.args[1], json!("CONTROLLER"));
        assert!(failure.message.starts_with("Unauthorized("));

        let outcome = result.outcome("reader", "balance").unwrap();
        assert!(!outcome.success);
        assert!(outcome.return_values.is_empty());
        assert_eq!(outcome.error.as_ref(), Some(failure));
    }

    #[test]
    fn test_contract_declared_error_decodes() {
        let encoded = reader_request(vec![("balance", "balanceOf", vec![json!(TOKEN)])]);
        let paused = &encoded.calls[0].abi.error("Paused").unwrap()[0];
        let revert = paused.abi_encode_input(&[]).unwrap();

        let failure = decode_revert(&encoded.calls[0].abi, &revert);

        assert_eq!(failure.error_name.as_deref(), Some("Paused"));
        assert_eq!(failure.message, "Paused()");
    }

    #[test]
    fn test_string_revert_reason() {
        let revert = Revert {
            reason: "market disabled".to_string(),
        }
        .abi_encode();

        let failure = decode_revert(&JsonAbi::default(), &revert);

        assert!(failure.message.contains("market disabled"));
        assert!(failure.error_name.is_none());
        assert_eq!(failure.data, Some(Bytes::from(revert)));
    }

    #[test]
    fn test_unknown_revert_data() {
        assert_eq!(decode_revert(&JsonAbi::default(), &[]).message, "execution reverted");
        assert_eq!(
            decode_revert(&JsonAbi::default(), &[0xde, 0xad, 0xbe, 0xef, 0x01]).message,
            "execution reverted with data 0xdeadbeef01"
        );
    }

    #[test]
    fn test_zero_calls_trivially_succeed() {
        let result = reconcile(&EncodedRequest::default(), Vec::new());

        assert!(result.success);
        assert!(result.data.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_mixed_outcomes() {
        let encoded = reader_request(vec![
            ("a", "balanceOf", vec![json!(TOKEN)]),
            ("b", "balanceOf", vec![json!(READER)]),
            ("c", "getMarkets", vec![]),
        ]);
        let responses = vec![
            CallResponse::Success(encode_output(&encoded.calls[0], &[uint(1)])),
            CallResponse::Reverted(Bytes::new()),
            CallResponse::Success(encode_output(
                &encoded.calls[2],
                &[DynSolValue::Array(vec![])],
            )),
        ];

        let result = reconcile(&encoded, responses);

        assert!(!result.success);
        assert_eq!(result.outcome_count(), 3);
        assert_eq!(result.error_count(), 1);
        assert!(result.error("reader", "b").is_some());
        assert!(result.outcome("reader", "a").unwrap().success);
        assert!(result.outcome("reader", "c").unwrap().success);
    }

    #[test]
    fn test_malformed_entries_become_failures() {
        let encoded = reader_request(vec![
            ("a", "balanceOf", vec![json!(TOKEN)]),
            ("b", "balanceOf", vec![json!(TOKEN)]),
        ]);

        // Truncated return data for the first slot and no response at all for the second
        let result = reconcile(&encoded, vec![CallResponse::Success(Bytes::from_static(&[1, 2]))]);

        assert!(!result.success);
        assert!(result.error("reader", "a").unwrap().message.contains("decode"));
        assert!(result.error("reader", "b").unwrap().message.contains("missing"));
    }
}
