use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Logical read request: `contractKey -> contract config`.
///
/// Absent (`null`) entries are skipped. Map order is the encoding order.
pub type CallRequest = BTreeMap<String, Option<ContractCallConfig>>;

/// Calls against one contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallConfig {
    pub contract_address: Address,
    pub abi: Arc<JsonAbi>,
    pub calls: BTreeMap<String, Option<CallConfig>>,
}

/// A single read call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConfig {
    pub method_name: String,
    #[serde(default)]
    pub params: Vec<Value>,
    /// Each param is a `[types, values]` pair to be replaced by
    /// `keccak256(abi.encode(values))` before encoding.
    #[serde(default)]
    pub should_hash_params: bool,
}

/// Logical identity of one encoded call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalKey {
    pub contract_key: String,
    pub call_key: String,
}

/// Structured per-call error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFailure {
    pub message: String,
    /// Name of the decoded custom error, when the revert matched one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    /// Raw revert data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl CallFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_name: None,
            args: Vec::new(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub contract_key: String,
    pub call_key: String,
    pub return_values: Vec<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallFailure>,
}

/// Reconciled result of one aggregation.
///
/// `success` is true iff every outcome in `data` succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticallResult {
    pub success: bool,
    pub errors: BTreeMap<String, BTreeMap<String, CallFailure>>,
    pub data: BTreeMap<String, BTreeMap<String, CallOutcome>>,
}

impl MulticallResult {
    pub fn new() -> Self {
        Self {
            success: true,
            errors: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn outcome(&self, contract_key: &str, call_key: &str) -> Option<&CallOutcome> {
        self.data.get(contract_key)?.get(call_key)
    }

    pub fn error(&self, contract_key: &str, call_key: &str) -> Option<&CallFailure> {
        self.errors.get(contract_key)?.get(call_key)
    }

    pub fn outcome_count(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(BTreeMap::len).sum()
    }
}

impl Default for MulticallResult {
    fn default() -> Self {
        Self::new()
    }
}
