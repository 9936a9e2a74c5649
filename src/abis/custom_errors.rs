//! Shared custom error fragments.
//!
//! Contracts queried through the aggregator revert with custom errors that are
//! often declared in libraries rather than in the contract's own interface.
//! Merging this fragment into every contract ABI lets reverts decode into a
//! named error with arguments instead of opaque bytes.

use alloy::json_abi::JsonAbi;
use log::warn;
use once_cell::sync::Lazy;

const CUSTOM_ERRORS: &[&str] = &[
    "error EmptyMarket()",
    "error EmptyPrimaryPrice(address token)",
    "error InsufficientPoolAmount(uint256 poolAmount, uint256 amount)",
    "error InsufficientReserve(uint256 reserve, uint256 amount)",
    "error InvalidFeedPrice(address token, int256 price)",
    "error InvalidPositionMarket(address market)",
    "error MaxOpenInterestExceeded(uint256 openInterest, uint256 maxOpenInterest)",
    "error OracleTimestampsAreSmallerThanRequired(uint256 minOracleTimestamp, uint256 expectedTimestamp)",
    "error PriceFeedNotUpdated(address token, uint256 timestamp, uint256 heartbeatDuration)",
    "error Unauthorized(address msgSender, string role)",
];

pub static CUSTOM_ERRORS_ABI: Lazy<JsonAbi> =
    Lazy::new(|| match JsonAbi::parse(CUSTOM_ERRORS.iter().copied()) {
        Ok(abi) => abi,
        Err(e) => {
            warn!("Failed to parse shared custom errors ABI: {}", e);
            JsonAbi::default()
        },
    });

/// Returns `abi` extended with the shared custom errors.
///
/// Errors already declared by the contract with the same selector are kept
/// as-is, so the merge never produces duplicate fragments.
pub fn with_custom_errors(abi: &JsonAbi) -> JsonAbi {
    let mut merged = abi.clone();

    for error in CUSTOM_ERRORS_ABI.errors() {
        let overloads = merged.errors.entry(error.name.clone()).or_default();
        if !overloads.iter().any(|e| e.selector() == error.selector()) {
            overloads.push(error.clone());
        }
    }

    merged
}
