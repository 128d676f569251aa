//! Agent configuration.
//!
//! Mirrors the OVS agent options that matter to the bridge and
//! extension layers: well-known bridge names, whether tunneling is
//! enabled, and the `ovs-vsctl`/`ovs-ofctl` timeout.

use serde::Deserialize;

/// Default integration bridge name.
pub const DEFAULT_INTEGRATION_BRIDGE: &str = "br-int";

/// Default tunnel bridge name.
pub const DEFAULT_TUNNEL_BRIDGE: &str = "br-tun";

/// Default timeout (seconds) for OVS control commands.
pub const DEFAULT_OFCTL_TIMEOUT_SECS: u64 = 10;

/// OVS agent configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OvsConfig {
    /// Name of the integration bridge (local VM traffic).
    pub integration_bridge: String,

    /// Name of the tunnel bridge (overlay traffic).
    pub tunnel_bridge: String,

    /// Whether overlay tunneling is enabled. When false, no tunnel
    /// bridge is managed and tunnel bridge requests return nothing.
    pub enable_tunneling: bool,

    /// Timeout in seconds for OVS control commands (also bounds
    /// ofport polling).
    pub ofctl_timeout_secs: u64,
}

impl Default for OvsConfig {
    fn default() -> Self {
        Self {
            integration_bridge: DEFAULT_INTEGRATION_BRIDGE.to_string(),
            tunnel_bridge: DEFAULT_TUNNEL_BRIDGE.to_string(),
            enable_tunneling: false,
            ofctl_timeout_secs: DEFAULT_OFCTL_TIMEOUT_SECS,
        }
    }
}

impl OvsConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), crate::OvsError> {
        if self.integration_bridge.is_empty() {
            return Err(crate::OvsError::invalid_config(
                "integration_bridge",
                "bridge name must not be empty",
            ));
        }
        if self.enable_tunneling && self.tunnel_bridge.is_empty() {
            return Err(crate::OvsError::invalid_config(
                "tunnel_bridge",
                "bridge name must not be empty when tunneling is enabled",
            ));
        }
        Ok(())
    }
}
