pub mod custom_errors;
pub mod multicall;

pub use custom_errors::{with_custom_errors, CUSTOM_ERRORS_ABI};
pub use multicall::{Call3, IMulticall3, McResult};
