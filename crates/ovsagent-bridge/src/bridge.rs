//! OvsBridge - bridge and flow management for one OVS bridge.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use ovsagent_common::{shell, OvsError, OvsResult};

use crate::commands::{
    build_add_br_cmd, build_add_port_cmd, build_br_exists_cmd, build_del_all_flows_cmd,
    build_del_br_cmd, build_del_port_cmd, build_dump_flows_cmd, build_get_ofport_cmd,
    build_ofctl_flow_cmd, build_set_fail_mode_cmd, build_set_protocols_cmd, patch_port_attrs,
    tunnel_port_attrs,
};
use crate::cookie::{generate_random_cookie, CookieAllocator};
use crate::deferred::DeferredBridge;
use crate::flow::{CookieSpec, FlowAction, FlowSpec};
use crate::types::{DatapathType, FailMode, TunnelType, INVALID_OFPORT};

/// Default timeout (seconds) for OVS control commands.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum wait between ofport polls.
const OFPORT_POLL_MAX: Duration = Duration::from_millis(1000);

/// A bridge shared between the agent core and extension handles.
pub type SharedBridge = Arc<Mutex<OvsBridge>>;

/// Flow mutation seam shared by [`OvsBridge`] and cookie-scoped
/// handles.
///
/// Everything that can mutate flows goes through
/// [`do_action_flows`](FlowOps::do_action_flows), so wrappers only
/// need to intercept one method to enforce their cookie policy.
#[async_trait]
pub trait FlowOps: Send {
    /// Returns the cookie stamped on flows by default.
    fn bound_cookie(&self) -> u64;

    /// Applies a batch of flow mutations of one kind.
    async fn do_action_flows(
        &mut self,
        action: FlowAction,
        specs: Vec<FlowSpec>,
    ) -> OvsResult<()>;

    /// Adds a single flow.
    async fn add_flow(&mut self, spec: FlowSpec) -> OvsResult<()> {
        self.do_action_flows(FlowAction::Add, vec![spec]).await
    }

    /// Modifies matching flows.
    async fn mod_flow(&mut self, spec: FlowSpec) -> OvsResult<()> {
        self.do_action_flows(FlowAction::Mod, vec![spec]).await
    }

    /// Deletes matching flows.
    async fn delete_flows(&mut self, spec: FlowSpec) -> OvsResult<()> {
        self.do_action_flows(FlowAction::Del, vec![spec]).await
    }
}

/// Manages one OVS bridge: lifecycle and ports via `ovs-vsctl`, flows
/// via `ovs-ofctl`.
///
/// Every bridge carries a random default cookie stamped on its own
/// flows, plus a [`CookieAllocator`] from which extension handles
/// reserve their own bridge-unique cookies.
#[derive(Debug)]
pub struct OvsBridge {
    /// Bridge name (e.g. "br-int").
    name: String,

    /// OVS datapath type.
    datapath_type: DatapathType,

    /// Cookie stamped on flows that do not carry one.
    default_cookie: u64,

    /// Cookies reserved on this bridge (includes the default cookie).
    allocator: CookieAllocator,

    /// Timeout for OVS control commands.
    timeout_secs: u64,

    /// Mock mode: capture commands instead of executing them.
    mock_mode: bool,

    /// Captured commands in mock mode. Flow batches are recorded as
    /// `command << input`.
    captured_commands: Vec<String>,
}

impl OvsBridge {
    /// Creates a bridge wrapper with a fresh random default cookie.
    pub fn new(name: impl Into<String>) -> Self {
        let default_cookie = generate_random_cookie();
        let mut allocator = CookieAllocator::new();
        allocator.reserve(default_cookie);
        Self {
            name: name.into(),
            datapath_type: DatapathType::default(),
            default_cookie,
            allocator,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            mock_mode: false,
            captured_commands: Vec::new(),
        }
    }

    /// Sets the datapath type.
    pub fn with_datapath_type(mut self, datapath_type: DatapathType) -> Self {
        self.datapath_type = datapath_type;
        self
    }

    /// Sets the command timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enables mock mode: commands are captured, not executed.
    pub fn with_mock_mode(mut self) -> Self {
        self.mock_mode = true;
        self
    }

    /// Wraps the bridge for sharing between the agent and extensions.
    pub fn shared(self) -> SharedBridge {
        Arc::new(Mutex::new(self))
    }

    /// Returns the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default flow cookie.
    pub fn default_cookie(&self) -> u64 {
        self.default_cookie
    }

    /// Replaces the default cookie (e.g. with an agent-wide stamp).
    ///
    /// The previous default is released so it can be garbage collected
    /// from the flow table; the new one is reserved.
    pub fn set_default_cookie(&mut self, cookie: u64) {
        self.allocator.release(self.default_cookie);
        self.allocator.reserve(cookie);
        self.default_cookie = cookie;
    }

    /// Reserves a cookie unique on this bridge.
    ///
    /// Used by extension handles: the allocator already holds the
    /// bridge's own default cookie and every previously handed-out
    /// cookie, so the result never collides with either.
    pub fn request_cookie(&mut self) -> u64 {
        self.allocator.request()
    }

    /// Releases a cookie reserved with [`request_cookie`].
    ///
    /// [`request_cookie`]: OvsBridge::request_cookie
    pub fn release_cookie(&mut self, cookie: u64) -> bool {
        self.allocator.release(cookie)
    }

    /// Returns captured commands (mock mode).
    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }

    /// Executes a command, or captures it in mock mode.
    async fn run(&mut self, cmd: &str) -> OvsResult<String> {
        if self.mock_mode {
            debug!(command = %cmd, "Mock exec");
            self.captured_commands.push(cmd.to_string());
            return Ok(String::new());
        }
        shell::exec_or_throw(cmd).await
    }

    /// Executes a command with stdin input, or captures it in mock mode.
    async fn run_with_input(&mut self, cmd: &str, input: &str) -> OvsResult<String> {
        if self.mock_mode {
            debug!(command = %cmd, input = %input, "Mock exec with input");
            self.captured_commands.push(format!("{} << {}", cmd, input));
            return Ok(String::new());
        }
        shell::exec_with_input_or_throw(cmd, input).await
    }

    // --- Bridge lifecycle -------------------------------------------------

    /// Creates the bridge (idempotent), optionally in secure fail mode.
    #[instrument(skip(self), fields(bridge = %self.name))]
    pub async fn create(&mut self, secure_mode: bool) -> OvsResult<()> {
        let cmd = build_add_br_cmd(&self.name, self.datapath_type);
        self.run(&cmd).await?;
        if secure_mode {
            self.set_secure_mode().await?;
        }
        info!(bridge = %self.name, "Bridge created");
        Ok(())
    }

    /// Deletes the bridge.
    #[instrument(skip(self), fields(bridge = %self.name))]
    pub async fn destroy(&mut self) -> OvsResult<()> {
        let cmd = build_del_br_cmd(&self.name);
        self.run(&cmd).await?;
        info!(bridge = %self.name, "Bridge deleted");
        Ok(())
    }

    /// Returns true if the bridge exists in OVSDB.
    pub async fn bridge_exists(&mut self) -> OvsResult<bool> {
        let cmd = build_br_exists_cmd(&self.name);
        if self.mock_mode {
            self.captured_commands.push(cmd);
            return Ok(true);
        }
        let result = shell::exec(&cmd).await?;
        interpret_br_exists(&cmd, result)
    }

    /// Sets secure fail mode (drop traffic without a controller).
    pub async fn set_secure_mode(&mut self) -> OvsResult<()> {
        let cmd = build_set_fail_mode_cmd(&self.name, FailMode::Secure);
        self.run(&cmd).await?;
        Ok(())
    }

    /// Sets standalone fail mode.
    pub async fn set_standalone_mode(&mut self) -> OvsResult<()> {
        let cmd = build_set_fail_mode_cmd(&self.name, FailMode::Standalone);
        self.run(&cmd).await?;
        Ok(())
    }

    /// Sets the OpenFlow protocol versions spoken by the bridge.
    pub async fn set_protocols(&mut self, protocols: &[&str]) -> OvsResult<()> {
        let cmd = build_set_protocols_cmd(&self.name, protocols);
        self.run(&cmd).await?;
        Ok(())
    }

    // --- Ports ------------------------------------------------------------

    /// Adds a port with optional Interface attributes; returns its
    /// ofport.
    #[instrument(skip(self, iface_attrs), fields(bridge = %self.name))]
    pub async fn add_port(
        &mut self,
        port: &str,
        iface_attrs: &[(String, String)],
    ) -> OvsResult<i32> {
        let cmd = build_add_port_cmd(&self.name, port, iface_attrs);
        self.run(&cmd).await?;
        self.get_port_ofport(port).await
    }

    /// Deletes a port from the bridge.
    #[instrument(skip(self), fields(bridge = %self.name))]
    pub async fn delete_port(&mut self, port: &str) -> OvsResult<()> {
        let cmd = build_del_port_cmd(&self.name, port);
        self.run(&cmd).await?;
        Ok(())
    }

    /// Adds a patch port peered with `peer`; returns its ofport.
    pub async fn add_patch_port(&mut self, local: &str, peer: &str) -> OvsResult<i32> {
        self.add_port(local, &patch_port_attrs(peer)).await
    }

    /// Adds a flow-keyed tunnel port; returns its ofport.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_tunnel_port(
        &mut self,
        port: &str,
        tunnel_type: TunnelType,
        remote_ip: &str,
        local_ip: &str,
        vxlan_udp_port: u16,
        dont_fragment: bool,
        tunnel_csum: bool,
    ) -> OvsResult<i32> {
        let attrs = tunnel_port_attrs(
            tunnel_type,
            remote_ip,
            local_ip,
            vxlan_udp_port,
            dont_fragment,
            tunnel_csum,
        );
        self.add_port(port, &attrs).await
    }

    /// Gets the port's assigned ofport, polling until OVS assigns one.
    ///
    /// OVS returns `[]` while the assignment is pending; polling backs
    /// off exponentially (10 ms doubling, capped at 1 s) within the
    /// bridge timeout. On timeout [`INVALID_OFPORT`] is returned with
    /// a warning, matching what callers expect from a failed port.
    pub async fn get_port_ofport(&mut self, port: &str) -> OvsResult<i32> {
        let cmd = build_get_ofport_cmd(port);
        if self.mock_mode {
            self.captured_commands.push(cmd);
            return Ok(1);
        }

        let deadline = Instant::now() + Duration::from_secs(self.timeout_secs);
        let mut wait = Duration::from_millis(10);
        loop {
            let result = shell::exec(&cmd).await?;
            if result.success() {
                if let Ok(ofport) = result.stdout.parse::<i32>() {
                    return Ok(ofport);
                }
            }
            if Instant::now() + wait > deadline {
                warn!(port = %port, "Timed out retrieving ofport");
                return Ok(INVALID_OFPORT);
            }
            sleep(wait).await;
            wait = std::cmp::min(wait * 2, OFPORT_POLL_MAX);
        }
    }

    // --- Flows ------------------------------------------------------------

    /// Dumps flows matching the filter, stripping status banner lines.
    ///
    /// An exact cookie in the filter is widened to a full-mask match.
    pub async fn dump_flows_for(&mut self, filter: &FlowSpec) -> OvsResult<Vec<String>> {
        let cmd = build_dump_flows_cmd(&self.name, &filter.build_dump_filter());
        let output = self.run(&cmd).await?;
        Ok(output
            .lines()
            .filter(|line| !line.contains("NXST") && !line.contains("OFPST"))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Dumps all flows on the bridge.
    pub async fn dump_all_flows(&mut self) -> OvsResult<Vec<String>> {
        self.dump_flows_for(&FlowSpec::new()).await
    }

    /// Deletes every flow on the bridge, regardless of cookie.
    pub async fn remove_all_flows(&mut self) -> OvsResult<()> {
        let cmd = build_del_all_flows_cmd(&self.name);
        self.run(&cmd).await?;
        Ok(())
    }

    /// Returns a deferred wrapper that batches flow mutations until
    /// applied.
    pub fn deferred(&mut self) -> DeferredBridge<'_, Self> {
        DeferredBridge::new(self)
    }
}

/// Interprets the `ovs-vsctl br-exists` exit code.
///
/// Exit code 2 means the bridge is absent; any other failure (e.g.
/// ovsdb-server unreachable) is a real error, not a missing bridge.
fn interpret_br_exists(cmd: &str, result: shell::ExecResult) -> OvsResult<bool> {
    match result.exit_code {
        0 => Ok(true),
        2 => Ok(false),
        _ => Err(OvsError::CommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        }),
    }
}

#[async_trait]
impl FlowOps for OvsBridge {
    fn bound_cookie(&self) -> u64 {
        self.default_cookie
    }

    /// Applies a batch of flow mutations.
    ///
    /// Add and Mod specs without a cookie are stamped with the default
    /// cookie. Del is left unstamped so the agent can clear flows it
    /// does not own; cookie-scoped deletion is the handle layer's job.
    async fn do_action_flows(
        &mut self,
        action: FlowAction,
        mut specs: Vec<FlowSpec>,
    ) -> OvsResult<()> {
        if specs.is_empty() {
            return Ok(());
        }
        if action != FlowAction::Del {
            for spec in &mut specs {
                if spec.cookie.is_none() {
                    spec.cookie = Some(CookieSpec::Exact(self.default_cookie));
                }
            }
        }

        let exprs = specs
            .iter()
            .map(|spec| spec.build_expr(action))
            .collect::<OvsResult<Vec<_>>>()?;
        let cmd = build_ofctl_flow_cmd(action.ofctl_command(), &self.name);
        self.run_with_input(&cmd, &exprs.join("\n")).await?;
        debug!(
            bridge = %self.name,
            action = action.as_str(),
            count = exprs.len(),
            "Applied flow batch"
        );
        Ok(())
    }
}
