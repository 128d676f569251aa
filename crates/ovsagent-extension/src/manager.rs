//! L2 agent extensions manager.
//!
//! Owns the registered extensions and fans agent events out to them.
//! Extensions are registered programmatically by the agent at startup.

use std::sync::Arc;

use tracing::{error, info};

use ovsagent_common::OvsResult;

use crate::api::OvsAgentExtensionApi;
use crate::extension::{L2AgentExtension, PortInfo};

/// Manages L2 agent extensions.
///
/// Dispatch is isolating: a failure in one extension is logged and
/// does not prevent delivery of the event to the others.
#[derive(Default)]
pub struct L2AgentExtensionsManager {
    extensions: Vec<Box<dyn L2AgentExtension>>,
}

impl L2AgentExtensionsManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension.
    pub fn register(&mut self, extension: Box<dyn L2AgentExtension>) {
        info!(extension = extension.name(), "Loaded agent extension");
        self.extensions.push(extension);
    }

    /// Returns the names of all registered extensions.
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    /// Returns the number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if no extensions are registered.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Initializes all registered extensions.
    ///
    /// Each extension consumes the agent API before its `initialize`
    /// runs, since initialization typically requests bridge handles.
    /// The first initialization failure aborts agent startup.
    pub async fn initialize(
        &mut self,
        agent_api: Arc<OvsAgentExtensionApi>,
        driver_type: &str,
    ) -> OvsResult<()> {
        for extension in &mut self.extensions {
            info!(extension = extension.name(), "Initializing agent extension");
            extension.consume_api(agent_api.clone());
            extension.initialize(driver_type).await?;
        }
        Ok(())
    }

    /// Notifies all extensions of a port create or update.
    pub async fn handle_port(&mut self, port: &PortInfo) {
        for extension in &mut self.extensions {
            if let Err(e) = extension.handle_port(port).await {
                error!(
                    extension = extension.name(),
                    port_id = %port.port_id,
                    error = %e,
                    "Agent extension failed to handle port"
                );
            }
        }
    }

    /// Notifies all extensions of a port deletion.
    pub async fn delete_port(&mut self, port: &PortInfo) {
        for extension in &mut self.extensions {
            if let Err(e) = extension.delete_port(port).await {
                error!(
                    extension = extension.name(),
                    port_id = %port.port_id,
                    error = %e,
                    "Agent extension failed to delete port"
                );
            }
        }
    }
}
