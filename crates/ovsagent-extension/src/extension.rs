//! Agent extension traits.
//!
//! [`AgentExtension`] is the stable base interface every extension
//! implements; [`L2AgentExtension`] adds the port lifecycle hooks the
//! L2 agent dispatches on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ovsagent_common::OvsResult;

use crate::api::OvsAgentExtensionApi;

/// Driver type string the OVS agent passes to extensions, so an
/// extension shared with other agent backends can pick the right one.
pub const DRIVER_TYPE_OVS: &str = "ovs";

/// Port data handed to extensions on port events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port UUID as known to the control plane.
    pub port_id: String,
    /// Local interface name on the bridge.
    pub port_name: String,
    /// Attached MAC address.
    pub mac_address: String,
    /// OpenFlow port number, if assigned.
    pub ofport: Option<i32>,
}

/// Stable base interface for agent extensions.
#[async_trait]
pub trait AgentExtension: Send + Sync {
    /// Returns the extension name. Used for logging and as the
    /// identity under which bridge cookies are allocated.
    fn name(&self) -> &str;

    /// Hands the extension the agent API.
    ///
    /// Called before [`initialize`](AgentExtension::initialize); an
    /// extension that needs bridge access keeps the `Arc` and requests
    /// handles from it during initialization.
    fn consume_api(&mut self, _agent_api: Arc<OvsAgentExtensionApi>) {
        // Default: extension does not use the agent API.
    }

    /// Performs extension initialization.
    ///
    /// Called after all extensions have been registered and have
    /// consumed the API. No port handling happens before this returns.
    async fn initialize(&mut self, driver_type: &str) -> OvsResult<()>;
}

/// Interface for L2 agent extensions.
#[async_trait]
pub trait L2AgentExtension: AgentExtension {
    /// Handles a port create or update.
    ///
    /// Called on either event; the extension is responsible for
    /// checking what actually changed.
    async fn handle_port(&mut self, port: &PortInfo) -> OvsResult<()>;

    /// Handles a port deletion.
    async fn delete_port(&mut self, port: &PortInfo) -> OvsResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_info_serde() {
        let port = PortInfo {
            port_id: "3b9f9a26".to_string(),
            port_name: "tap3b9f9a26".to_string(),
            mac_address: "fa:16:3e:aa:bb:cc".to_string(),
            ofport: Some(7),
        };
        let json = serde_json::to_string(&port).unwrap();
        let back: PortInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, port);
    }

    #[test]
    fn test_port_info_missing_ofport() {
        let port: PortInfo = serde_json::from_str(
            r#"{"port_id":"p1","port_name":"tap1","mac_address":"fa:16:3e:00:00:01","ofport":null}"#,
        )
        .unwrap();
        assert_eq!(port.ofport, None);
    }
}
