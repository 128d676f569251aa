//! Bridge access API for agent extensions.
//!
//! The agent owns two well-known bridges (integration and tunnel).
//! Extensions never touch them directly: they request a handle from
//! [`OvsAgentExtensionApi`] and get back a [`CookieBridge`] bound to a
//! flow cookie reserved for that extension on that bridge. Every flow
//! mutation through the handle carries that cookie, so extensions
//! cannot overwrite the agent's flows or each other's.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use ovsagent_bridge::{
    BridgeKind, CookieSpec, DeferredBridge, FlowAction, FlowOps, FlowSpec, OvsBridge,
    SharedBridge,
};
use ovsagent_common::{OvsConfig, OvsError, OvsResult};

/// A bridge handle with a bound flow cookie.
///
/// Passes flow mutations through to the underlying shared bridge after
/// stamping them with the bound cookie. The stamp is unconditional: a
/// cookie set on the [`FlowSpec`] by the caller is replaced, so a
/// handle can only ever touch its own flows. Modifications and
/// deletions carry a fully-masked cookie match for the same reason --
/// unlike the raw bridge, a cookie-scoped delete must not reach flows
/// owned by anyone else.
#[derive(Debug)]
pub struct CookieBridge {
    bridge: SharedBridge,
    kind: BridgeKind,
    cookie: u64,
}

impl CookieBridge {
    fn new(bridge: SharedBridge, kind: BridgeKind, cookie: u64) -> Self {
        Self {
            bridge,
            kind,
            cookie,
        }
    }

    /// Returns the bound flow cookie.
    pub fn cookie(&self) -> u64 {
        self.cookie
    }

    /// Returns which bridge this handle wraps.
    pub fn kind(&self) -> BridgeKind {
        self.kind
    }

    /// Returns the underlying bridge name.
    pub async fn bridge_name(&self) -> String {
        self.bridge.lock().await.name().to_string()
    }

    /// Dumps the flows owned by this handle's cookie.
    pub async fn dump_own_flows(&self) -> OvsResult<Vec<String>> {
        let filter = FlowSpec::new().cookie(CookieSpec::Exact(self.cookie));
        self.bridge.lock().await.dump_flows_for(&filter).await
    }

    /// Returns a deferred wrapper over this handle.
    ///
    /// Deferring wraps the handle itself, never the raw bridge, so the
    /// buffered batch is still cookie-stamped when applied.
    pub fn deferred(&mut self) -> DeferredBridge<'_, Self> {
        DeferredBridge::new(self)
    }
}

#[async_trait]
impl FlowOps for CookieBridge {
    fn bound_cookie(&self) -> u64 {
        self.cookie
    }

    async fn do_action_flows(
        &mut self,
        action: FlowAction,
        mut specs: Vec<FlowSpec>,
    ) -> OvsResult<()> {
        for spec in &mut specs {
            let cookie = CookieSpec::Exact(self.cookie);
            spec.cookie = Some(match action {
                FlowAction::Add => cookie,
                // Restrict mod/del to flows owned by this cookie.
                FlowAction::Mod | FlowAction::Del => cookie.with_full_mask(),
            });
        }
        self.bridge.lock().await.do_action_flows(action, specs).await
    }
}

/// Bridge access provider for OVS agent extensions.
///
/// Extensions gain access to an instance through their `consume_api`
/// hook and request per-extension bridge handles from it.
pub struct OvsAgentExtensionApi {
    br_int: SharedBridge,
    br_tun: Option<SharedBridge>,
    /// Cookie assigned to each (extension, bridge kind) pair, so
    /// repeated requests by one extension reuse its cookie.
    cookies: Mutex<HashMap<(String, BridgeKind), u64>>,
}

impl OvsAgentExtensionApi {
    /// Creates the API over the agent's bridges.
    ///
    /// `br_tun` is `None` when tunneling is disabled.
    pub fn new(br_int: SharedBridge, br_tun: Option<SharedBridge>) -> Self {
        Self {
            br_int,
            br_tun,
            cookies: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the API with bridges built from the agent configuration.
    pub fn from_config(config: &OvsConfig) -> OvsResult<Self> {
        config.validate()?;
        let br_int = OvsBridge::new(config.integration_bridge.as_str())
            .with_timeout(config.ofctl_timeout_secs)
            .shared();
        let br_tun = config.enable_tunneling.then(|| {
            OvsBridge::new(config.tunnel_bridge.as_str())
                .with_timeout(config.ofctl_timeout_secs)
                .shared()
        });
        Ok(Self::new(br_int, br_tun))
    }

    /// Returns the shared integration bridge (agent-side use).
    pub fn integration_bridge(&self) -> SharedBridge {
        self.br_int.clone()
    }

    /// Returns the shared tunnel bridge, if tunneling is enabled.
    pub fn tunnel_bridge(&self) -> Option<SharedBridge> {
        self.br_tun.clone()
    }

    /// Requests an integration bridge handle for extension-specific
    /// flows.
    ///
    /// The first request by an extension reserves a cookie unique on
    /// the integration bridge; later requests by the same extension
    /// reuse it.
    pub async fn request_int_br(&self, extension: &str) -> OvsResult<CookieBridge> {
        let cookie = self
            .request_cookie(extension, BridgeKind::Integration, &self.br_int)
            .await?;
        Ok(CookieBridge::new(
            self.br_int.clone(),
            BridgeKind::Integration,
            cookie,
        ))
    }

    /// Requests a tunnel bridge handle for extension-specific flows.
    ///
    /// Returns `None` when tunneling is disabled.
    pub async fn request_tun_br(&self, extension: &str) -> OvsResult<Option<CookieBridge>> {
        let br_tun = match &self.br_tun {
            Some(br) => br,
            None => {
                debug!(extension = %extension, "Tunnel bridge requested but tunneling is disabled");
                return Ok(None);
            }
        };
        let cookie = self
            .request_cookie(extension, BridgeKind::Tunnel, br_tun)
            .await?;
        Ok(Some(CookieBridge::new(
            br_tun.clone(),
            BridgeKind::Tunnel,
            cookie,
        )))
    }

    /// Looks up or reserves the cookie for an (extension, bridge) pair.
    async fn request_cookie(
        &self,
        extension: &str,
        kind: BridgeKind,
        bridge: &SharedBridge,
    ) -> OvsResult<u64> {
        if extension.is_empty() {
            return Err(OvsError::internal(
                "bridge handle requested with an empty extension name",
            ));
        }

        let mut cookies = self.cookies.lock().await;
        let key = (extension.to_string(), kind);
        if let Some(cookie) = cookies.get(&key) {
            return Ok(*cookie);
        }

        let cookie = bridge.lock().await.request_cookie();
        info!(
            extension = %extension,
            bridge = kind.as_str(),
            cookie = %format_args!("0x{:x}", cookie),
            "Reserved flow cookie for extension"
        );
        cookies.insert(key, cookie);
        Ok(cookie)
    }
}
