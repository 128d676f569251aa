//! Open vSwitch bridge layer for the OVS agent.
//!
//! Wraps `ovs-vsctl` (bridge and port management) and `ovs-ofctl`
//! (OpenFlow flow management) behind the [`OvsBridge`] type. Every
//! bridge owns a default flow cookie and a [`CookieAllocator`] from
//! which callers can reserve additional bridge-unique cookies, so
//! flow-table ownership can be partitioned between the agent and its
//! extensions.
//!
//! Flow mutations are expressed as [`FlowSpec`] values and applied in
//! batches through stdin (`ovs-ofctl add-flows <bridge> -`), optionally
//! buffered and reordered by a [`DeferredBridge`].

mod bridge;
mod commands;
mod cookie;
mod deferred;
mod flow;
mod types;

pub use bridge::{FlowOps, OvsBridge, SharedBridge};
pub use commands::*;
pub use cookie::{generate_random_cookie, CookieAllocator};
pub use deferred::DeferredBridge;
pub use flow::{CookieSpec, FlowAction, FlowSpec};
pub use types::{BridgeKind, DatapathType, FailMode, TunnelType, INVALID_OFPORT, VXLAN_UDP_PORT};
