use alloy::primitives::{Address, Bytes};
use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct McResult {
        bool success;
        bytes returnData;
    }

    #[sol(rpc)]
    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (McResult[] memory returnData);
    }
}

impl Call3 {
    /// A call that is allowed to revert without failing the whole aggregate.
    ///
    /// Every logical read goes out this way so one bad call only marks its own
    /// slot as failed.
    pub fn tolerant(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            allowFailure: true,
            callData: call_data,
        }
    }
}
