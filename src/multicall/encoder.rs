//! Flattens a nested [`CallRequest`] into positional call descriptors.
//!
//! Encoding is pure: it never touches the network and never fails as a whole.
//! A call that cannot be encoded keeps its slot with an encode failure, is left
//! out of the wire payload, and reconciles as a failed outcome.

use std::sync::Arc;

use alloy::dyn_abi::{JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::abis::{with_custom_errors, Call3, McResult};
use crate::multicall::reconciler::CallResponse;
use crate::multicall::{CallConfig, CallFailure, CallRequest, EncodeError, OriginalKey};
use crate::utils::{hash_param, json_to_sol_value};

/// Shape of a method's successful return, declared by its ABI outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// No outputs
    Empty,
    /// One output that is neither a struct nor an array
    Scalar,
    /// One struct output, returned as its components
    Composite,
    /// One array output, returned as its elements
    Sequence,
    /// Several outputs
    Multiple,
}

impl ReturnShape {
    pub fn of(function: &Function) -> Self {
        match function.outputs.as_slice() {
            [] => ReturnShape::Empty,
            [single] if single.ty == "tuple" => ReturnShape::Composite,
            [single] if single.ty.ends_with(']') => ReturnShape::Sequence,
            [_] => ReturnShape::Scalar,
            _ => ReturnShape::Multiple,
        }
    }
}

/// One flat call, positionally aligned with its [`OriginalKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCall {
    pub address: Address,
    pub method_name: String,
    /// Contract ABI merged with the shared custom errors
    pub abi: Arc<JsonAbi>,
    /// Overload the call was encoded against
    pub function: Option<Function>,
    pub calldata: Result<Bytes, CallFailure>,
    pub return_shape: ReturnShape,
}

/// Output of [`encode_request`].
///
/// `keys[i]` and `calls[i]` always describe the same logical call.
#[derive(Debug, Clone, Default)]
pub struct EncodedRequest {
    pub keys: Vec<OriginalKey>,
    pub calls: Vec<EncodedCall>,
    /// Merged ABIs, one per distinct contract address
    pub abis: FxHashMap<Address, Arc<JsonAbi>>,
}

impl EncodedRequest {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Wire payload: every call that encoded, in order.
    pub fn payload(&self) -> Vec<Call3> {
        self.calls
            .iter()
            .filter_map(|call| {
                call.calldata
                    .as_ref()
                    .ok()
                    .map(|data| Call3::tolerant(call.address, data.clone()))
            })
            .collect()
    }

    /// Spread the wire results back over every slot.
    ///
    /// Always yields exactly one response per slot. Slots that were never sent
    /// keep their encode failure; slots the transport did not answer become
    /// failures too. Surplus results are dropped with a warning.
    pub fn align(&self, results: Vec<McResult>) -> Vec<CallResponse> {
        let received = results.len();
        let mut results = results.into_iter();

        let responses = self
            .calls
            .iter()
            .map(|call| match &call.calldata {
                Err(failure) => CallResponse::Failed(failure.clone()),
                Ok(_) => match results.next() {
                    Some(result) if result.success => CallResponse::Success(result.returnData),
                    Some(result) => CallResponse::Reverted(result.returnData),
                    None => CallResponse::Failed(CallFailure::new("missing response for call")),
                },
            })
            .collect();

        let surplus = results.count();
        if surplus > 0 {
            warn!(
                "Dropping {} surplus multicall results ({} received for {} sent calls)",
                surplus,
                received,
                received - surplus
            );
        }

        responses
    }
}

/// Flatten `request` into positional calls.
pub fn encode_request(request: &CallRequest) -> EncodedRequest {
    let mut encoded = EncodedRequest::default();

    for (contract_key, contract) in request {
        let Some(contract) = contract else {
            continue;
        };

        for (call_key, call) in &contract.calls {
            let Some(call) = call else {
                continue;
            };

            let abi = encoded
                .abis
                .entry(contract.contract_address)
                .or_insert_with(|| Arc::new(with_custom_errors(&contract.abi)))
                .clone();

            let (function, calldata) = match encode_call(&abi, call) {
                Ok((function, data)) => (Some(function), Ok(data)),
                Err(e) => {
                    debug!(
                        "Failed to encode {}.{} ({}): {}",
                        contract_key, call_key, call.method_name, e
                    );
                    (None, Err(CallFailure::new(e.to_string())))
                },
            };

            encoded.keys.push(OriginalKey {
                contract_key: contract_key.clone(),
                call_key: call_key.clone(),
            });

            encoded.calls.push(EncodedCall {
                address: contract.contract_address,
                method_name: call.method_name.clone(),
                abi,
                return_shape: function
                    .as_ref()
                    .map(ReturnShape::of)
                    .unwrap_or(ReturnShape::Empty),
                function,
                calldata,
            });
        }
    }

    encoded
}

/// Resolve the overload and ABI-encode the call.
///
/// Overloads are tried in declaration order among those taking the given
/// number of arguments; the first one the arguments coerce to wins.
fn encode_call(abi: &JsonAbi, call: &CallConfig) -> Result<(Function, Bytes), EncodeError> {
    let overloads = abi
        .function(&call.method_name)
        .ok_or_else(|| EncodeError::MethodNotFound(call.method_name.clone()))?;

    let args = if call.should_hash_params {
        call.params
            .iter()
            .map(|param| hash_param(param).map(|hash| Value::String(format!("{hash:#x}"))))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        call.params.clone()
    };

    let mut last_error = None;

    for function in overloads.iter().filter(|f| f.inputs.len() == args.len()) {
        match encode_with(function, &args) {
            Ok(data) => return Ok((function.clone(), data)),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or(EncodeError::ArgumentCount {
        method: call.method_name.clone(),
        given: args.len(),
    }))
}

fn encode_with(function: &Function, args: &[Value]) -> Result<Bytes, EncodeError> {
    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| EncodeError::Abi(e.to_string()))?;
            json_to_sol_value(&ty, arg)
        })
        .collect::<Result<Vec<_>, _>>()?;

    function
        .abi_encode_input(&values)
        .map(Bytes::from)
        .map_err(|e| EncodeError::Abi(e.to_string()))
}
