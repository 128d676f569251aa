//! Deferred flow application.
//!
//! [`DeferredBridge`] buffers flow mutations and applies them in bulk,
//! so a burst of per-port changes becomes a handful of batched
//! `ovs-ofctl` calls instead of one process spawn per flow.

use tracing::debug;

use ovsagent_common::OvsResult;

use crate::bridge::FlowOps;
use crate::flow::{FlowAction, FlowSpec};

/// Default application order: additions first, deletions last, so a
/// replaced flow is never absent from the table in between.
const DEFAULT_ORDER: [FlowAction; 3] = [FlowAction::Add, FlowAction::Mod, FlowAction::Del];

/// Buffers flow mutations against any [`FlowOps`] implementor.
///
/// Wrapping the `FlowOps` seam (rather than a concrete bridge) means
/// deferring through a cookie-scoped handle keeps the handle's cookie
/// policy: the buffered batch is replayed through the handle's own
/// `do_action_flows`.
///
/// Not thread-safe; create one per burst of changes.
pub struct DeferredBridge<'a, B: FlowOps> {
    br: &'a mut B,
    full_ordered: bool,
    order: [FlowAction; 3],
    pending: Vec<(FlowAction, FlowSpec)>,
}

impl<'a, B: FlowOps> DeferredBridge<'a, B> {
    /// Creates a deferred wrapper with the default action order.
    pub fn new(br: &'a mut B) -> Self {
        Self {
            br,
            full_ordered: false,
            order: DEFAULT_ORDER,
            pending: Vec::new(),
        }
    }

    /// Disables reordering: mutations are applied exactly as queued.
    pub fn full_ordered(mut self) -> Self {
        self.full_ordered = true;
        self
    }

    /// Overrides the action application order.
    pub fn with_order(mut self, order: [FlowAction; 3]) -> Self {
        self.order = order;
        self
    }

    /// Queues a flow addition.
    pub fn add_flow(&mut self, spec: FlowSpec) {
        self.pending.push((FlowAction::Add, spec));
    }

    /// Queues a flow modification.
    pub fn mod_flow(&mut self, spec: FlowSpec) {
        self.pending.push((FlowAction::Mod, spec));
    }

    /// Queues a flow deletion.
    pub fn delete_flows(&mut self, spec: FlowSpec) {
        self.pending.push((FlowAction::Del, spec));
    }

    /// Returns the number of queued mutations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Applies all queued mutations, grouped into one batch per run of
    /// equal actions.
    ///
    /// Unless `full_ordered` is set, mutations are first stably sorted
    /// by the configured action order.
    pub async fn apply_flows(&mut self) -> OvsResult<()> {
        let mut pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        if !self.full_ordered {
            let order = self.order;
            pending.sort_by_key(|(action, _)| {
                order.iter().position(|o| o == action).unwrap_or(order.len())
            });
        }

        let mut batch_action = pending[0].0;
        let mut batch: Vec<FlowSpec> = Vec::new();
        for (action, spec) in pending {
            if action != batch_action {
                debug!(action = batch_action.as_str(), count = batch.len(), "Applying deferred flows");
                self.br
                    .do_action_flows(batch_action, std::mem::take(&mut batch))
                    .await?;
                batch_action = action;
            }
            batch.push(spec);
        }
        debug!(action = batch_action.as_str(), count = batch.len(), "Applying deferred flows");
        self.br.do_action_flows(batch_action, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::OvsBridge;

    fn specs_in_command(cmd: &str) -> bool {
        cmd.contains("<<")
    }

    #[tokio::test]
    async fn test_apply_empty_is_noop() {
        let mut br = OvsBridge::new("br-int").with_mock_mode();
        let mut deferred = DeferredBridge::new(&mut br);
        deferred.apply_flows().await.unwrap();
        assert!(br.captured_commands().is_empty());
    }

    #[tokio::test]
    async fn test_default_order_adds_before_dels() {
        let mut br = OvsBridge::new("br-int").with_mock_mode();
        let mut deferred = br.deferred();

        deferred.delete_flows(FlowSpec::new().table(1));
        deferred.add_flow(FlowSpec::new().table(0).actions("normal"));
        assert_eq!(deferred.pending_count(), 2);
        deferred.apply_flows().await.unwrap();

        let cmds = br.captured_commands();
        assert_eq!(cmds.len(), 2);
        assert!(cmds[0].contains("add-flows"));
        assert!(cmds[1].contains("del-flows"));
    }

    #[tokio::test]
    async fn test_full_ordered_preserves_queue_order() {
        let mut br = OvsBridge::new("br-int").with_mock_mode();
        let mut deferred = DeferredBridge::new(&mut br).full_ordered();

        deferred.delete_flows(FlowSpec::new().table(1));
        deferred.add_flow(FlowSpec::new().table(0).actions("normal"));
        deferred.apply_flows().await.unwrap();

        let cmds = br.captured_commands();
        assert_eq!(cmds.len(), 2);
        assert!(cmds[0].contains("del-flows"));
        assert!(cmds[1].contains("add-flows"));
    }

    #[tokio::test]
    async fn test_equal_actions_batched_together() {
        let mut br = OvsBridge::new("br-int").with_mock_mode();
        let mut deferred = br.deferred();

        deferred.add_flow(FlowSpec::new().table(0).actions("normal"));
        deferred.add_flow(FlowSpec::new().table(1).actions("drop"));
        deferred.delete_flows(FlowSpec::new().table(2));
        deferred.apply_flows().await.unwrap();

        // Two batches: one add (both specs), one del.
        let cmds = br.captured_commands();
        assert_eq!(cmds.len(), 2);
        assert!(specs_in_command(&cmds[0]));
        assert!(cmds[0].contains("table=0") && cmds[0].contains("table=1"));
    }

    #[tokio::test]
    async fn test_pending_cleared_after_apply() {
        let mut br = OvsBridge::new("br-int").with_mock_mode();
        let mut deferred = br.deferred();

        deferred.add_flow(FlowSpec::new().actions("normal"));
        deferred.apply_flows().await.unwrap();
        assert_eq!(deferred.pending_count(), 0);

        // A second apply issues nothing.
        deferred.apply_flows().await.unwrap();
        assert_eq!(br.captured_commands().len(), 1);
    }
}
