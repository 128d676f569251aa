//! Flow specifications and the `ovs-ofctl` flow expression builder.
//!
//! A [`FlowSpec`] describes one flow-table entry (match fields, cookie,
//! actions); [`FlowSpec::build_expr`] renders it into the text form
//! consumed by `ovs-ofctl {add,mod,del}-flows`.

use std::fmt;

use ovsagent_common::{OvsError, OvsResult};

/// Flow mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowAction {
    Add,
    Mod,
    Del,
}

impl FlowAction {
    /// Returns the `ovs-ofctl` subcommand for a batched mutation.
    pub fn ofctl_command(&self) -> &'static str {
        match self {
            FlowAction::Add => "add-flows",
            FlowAction::Mod => "mod-flows",
            FlowAction::Del => "del-flows",
        }
    }

    /// Returns a short name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowAction::Add => "add",
            FlowAction::Mod => "mod",
            FlowAction::Del => "del",
        }
    }
}

/// A flow cookie match, exact or masked.
///
/// `ovs-ofctl` treats a bare cookie as a value to stamp on add, and a
/// `cookie/mask` pair as a match filter on mod/del/dump. A full mask
/// (`/-1`) restricts a mutation to flows owned by exactly that cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSpec {
    /// Exact cookie value.
    Exact(u64),
    /// Cookie value with a match mask.
    Masked(u64, u64),
}

impl CookieSpec {
    /// Returns the cookie value, ignoring any mask.
    pub fn value(&self) -> u64 {
        match self {
            CookieSpec::Exact(c) => *c,
            CookieSpec::Masked(c, _) => *c,
        }
    }

    /// Converts an exact cookie into a fully-masked match
    /// (`cookie/-1`). Already-masked cookies are left untouched.
    pub fn with_full_mask(self) -> Self {
        match self {
            CookieSpec::Exact(c) => CookieSpec::Masked(c, u64::MAX),
            masked => masked,
        }
    }
}

impl fmt::Display for CookieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieSpec::Exact(c) => write!(f, "0x{:x}", c),
            CookieSpec::Masked(c, m) => write!(f, "0x{:x}/0x{:x}", c, m),
        }
    }
}

/// Specification of one flow-table entry.
///
/// Built up with chained setters:
///
/// ```
/// use ovsagent_bridge::{FlowAction, FlowSpec};
///
/// let expr = FlowSpec::new()
///     .table(0)
///     .priority(10)
///     .match_field("in_port", "1")
///     .actions("normal")
///     .build_expr(FlowAction::Add)
///     .unwrap();
/// assert!(expr.contains("priority=10"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSpec {
    /// Flow cookie; stamped by the owning bridge when absent.
    pub cookie: Option<CookieSpec>,
    /// OpenFlow table id.
    pub table: Option<u32>,
    /// Flow priority. Only valid on add.
    pub priority: Option<u16>,
    /// Hard timeout in seconds (add only, defaults to 0).
    pub hard_timeout: Option<u32>,
    /// Idle timeout in seconds (add only, defaults to 0).
    pub idle_timeout: Option<u32>,
    /// Bare protocol keyword (e.g. "ip", "arp", "udp").
    pub proto: Option<String>,
    /// Remaining match fields, rendered in insertion order.
    pub matches: Vec<(String, String)>,
    /// Flow actions. Required on add and mod.
    pub actions: Option<String>,
}

impl FlowSpec {
    /// Creates an empty flow specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flow cookie.
    pub fn cookie(mut self, cookie: CookieSpec) -> Self {
        self.cookie = Some(cookie);
        self
    }

    /// Sets the OpenFlow table.
    pub fn table(mut self, table: u32) -> Self {
        self.table = Some(table);
        self
    }

    /// Sets the flow priority.
    pub fn priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the hard timeout.
    pub fn hard_timeout(mut self, secs: u32) -> Self {
        self.hard_timeout = Some(secs);
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, secs: u32) -> Self {
        self.idle_timeout = Some(secs);
        self
    }

    /// Sets the bare protocol keyword.
    pub fn proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }

    /// Appends a match field.
    pub fn match_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matches.push((key.into(), value.into()));
        self
    }

    /// Sets the flow actions.
    pub fn actions(mut self, actions: impl Into<String>) -> Self {
        self.actions = Some(actions.into());
        self
    }

    /// Renders the flow expression for the given action.
    ///
    /// Field ordering and validation follow `ovs-ofctl` conventions:
    /// timeouts and priority lead on add (with defaults 0/0/1), a
    /// priority on mod/del is rejected, actions are required on add
    /// and mod and rendered last.
    pub fn build_expr(&self, action: FlowAction) -> OvsResult<String> {
        let mut parts: Vec<String> = Vec::new();

        if action == FlowAction::Add {
            parts.push(format!("hard_timeout={}", self.hard_timeout.unwrap_or(0)));
            parts.push(format!("idle_timeout={}", self.idle_timeout.unwrap_or(0)));
            parts.push(format!("priority={}", self.priority.unwrap_or(1)));
        } else if self.priority.is_some() {
            return Err(OvsError::invalid_flow(
                "cannot match priority on flow deletion or modification",
            ));
        }

        if action != FlowAction::Del && self.actions.is_none() {
            return Err(OvsError::invalid_flow(
                "must specify one or more actions on flow addition or modification",
            ));
        }

        if let Some(cookie) = &self.cookie {
            parts.push(format!("cookie={}", cookie));
        }
        if let Some(table) = self.table {
            parts.push(format!("table={}", table));
        }
        if let Some(proto) = &self.proto {
            parts.push(proto.clone());
        }
        for (key, value) in &self.matches {
            parts.push(format!("{}={}", key, value));
        }
        if let Some(actions) = &self.actions {
            parts.push(format!("actions={}", actions));
        }

        Ok(parts.join(","))
    }

    /// Renders a flow filter expression for `dump-flows`.
    ///
    /// An exact cookie is widened to a full-mask match, since a bare
    /// cookie is not a valid dump filter.
    pub fn build_dump_filter(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(cookie) = self.cookie {
            parts.push(format!("cookie={}", cookie.with_full_mask()));
        }
        if let Some(table) = self.table {
            parts.push(format!("table={}", table));
        }
        if let Some(proto) = &self.proto {
            parts.push(proto.clone());
        }
        for (key, value) in &self.matches {
            parts.push(format!("{}={}", key, value));
        }

        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flow_action_commands() {
        assert_eq!(FlowAction::Add.ofctl_command(), "add-flows");
        assert_eq!(FlowAction::Mod.ofctl_command(), "mod-flows");
        assert_eq!(FlowAction::Del.ofctl_command(), "del-flows");
    }

    #[test]
    fn test_cookie_display() {
        assert_eq!(CookieSpec::Exact(0x1234).to_string(), "0x1234");
        assert_eq!(
            CookieSpec::Masked(0x1234, u64::MAX).to_string(),
            "0x1234/0xffffffffffffffff"
        );
    }

    #[test]
    fn test_cookie_full_mask() {
        let masked = CookieSpec::Exact(7).with_full_mask();
        assert_eq!(masked, CookieSpec::Masked(7, u64::MAX));

        // Already-masked cookies keep their mask.
        let partial = CookieSpec::Masked(7, 0xff).with_full_mask();
        assert_eq!(partial, CookieSpec::Masked(7, 0xff));
    }

    #[test]
    fn test_build_add_defaults() {
        let expr = FlowSpec::new()
            .actions("normal")
            .build_expr(FlowAction::Add)
            .unwrap();
        assert_eq!(expr, "hard_timeout=0,idle_timeout=0,priority=1,actions=normal");
    }

    #[test]
    fn test_build_add_full() {
        let expr = FlowSpec::new()
            .cookie(CookieSpec::Exact(0xabc))
            .table(21)
            .priority(20)
            .proto("arp")
            .match_field("dl_vlan", "100")
            .match_field("nw_dst", "192.168.0.0/24")
            .actions("resubmit(,22)")
            .build_expr(FlowAction::Add)
            .unwrap();
        assert_eq!(
            expr,
            "hard_timeout=0,idle_timeout=0,priority=20,cookie=0xabc,table=21,\
             arp,dl_vlan=100,nw_dst=192.168.0.0/24,actions=resubmit(,22)"
        );
    }

    #[test]
    fn test_build_mod_no_priority_prefix() {
        let expr = FlowSpec::new()
            .table(0)
            .match_field("in_port", "3")
            .actions("drop")
            .build_expr(FlowAction::Mod)
            .unwrap();
        assert_eq!(expr, "table=0,in_port=3,actions=drop");
    }

    #[test]
    fn test_priority_rejected_on_mod_and_del() {
        for action in [FlowAction::Mod, FlowAction::Del] {
            let err = FlowSpec::new()
                .priority(10)
                .actions("drop")
                .build_expr(action)
                .unwrap_err();
            assert!(matches!(err, OvsError::InvalidFlow { .. }));
        }
    }

    #[test]
    fn test_actions_required_on_add_and_mod() {
        assert!(FlowSpec::new().build_expr(FlowAction::Add).is_err());
        assert!(FlowSpec::new().build_expr(FlowAction::Mod).is_err());
        // Deletion needs no actions.
        assert!(FlowSpec::new().build_expr(FlowAction::Del).is_ok());
    }

    #[test]
    fn test_del_with_cookie_mask() {
        let expr = FlowSpec::new()
            .cookie(CookieSpec::Exact(0x42).with_full_mask())
            .table(2)
            .build_expr(FlowAction::Del)
            .unwrap();
        assert_eq!(expr, "cookie=0x42/0xffffffffffffffff,table=2");
    }

    #[test]
    fn test_build_dump_filter() {
        let filter = FlowSpec::new()
            .cookie(CookieSpec::Exact(0x42))
            .table(2)
            .build_dump_filter();
        assert_eq!(filter, "cookie=0x42/0xffffffffffffffff,table=2");
    }

    #[test]
    fn test_build_dump_filter_empty() {
        assert_eq!(FlowSpec::new().build_dump_filter(), "");
    }
}
