//! L2 agent extension framework for the OVS agent.
//!
//! Extensions extend the agent's core port handling with extra flow
//! logic (QoS, FDB population, service chaining, ...). Each extension
//! gets access to the agent's bridges through the
//! [`OvsAgentExtensionApi`], which hands out [`CookieBridge`] handles:
//! every flow mutation through a handle is stamped with a flow cookie
//! unique to that extension, so extensions cannot clobber each other's
//! flows or the agent's own.

mod api;
mod extension;
mod manager;

pub use api::{CookieBridge, OvsAgentExtensionApi};
pub use extension::{AgentExtension, L2AgentExtension, PortInfo, DRIVER_TYPE_OVS};
pub use manager::L2AgentExtensionsManager;
