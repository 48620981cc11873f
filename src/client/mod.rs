//! Client side of the gateway: typed calls and call statistics kept by the caller

pub mod gateway_client;
pub mod metrics;

pub use gateway_client::{ClientError, GatewayClient, GatewayResponse, ReceivedImage};
pub use metrics::{CallMetrics, CallRecord};
