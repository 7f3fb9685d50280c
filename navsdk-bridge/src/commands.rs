//! Symbolic view-command resolution and fire-and-forget dispatch.
//!
//! View commands are named symbolically ("moveCamera", "setCompassEnabled",
//! ...) but the native side dispatches on runtime-assigned numeric ids that
//! differ across platforms and app runs. The resolver memoizes the
//! name-to-id table per view-manager name; the dispatcher turns a symbolic
//! call into a numeric one and forwards it without waiting for a result.

use crate::error::{BridgeError, BridgeResult};
use crate::transport::{CommandId, ViewCommandHost};
use crate::types::ViewHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Well-known name of the navigation view manager.
pub const NAV_VIEW_MANAGER: &str = "NavViewManager";

/// An immutable symbolic-name → numeric-id mapping for one view manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    commands: HashMap<String, CommandId>,
}

impl CommandTable {
    pub fn new(commands: HashMap<String, CommandId>) -> Self {
        Self { commands }
    }

    /// Numeric id for a symbolic command name.
    ///
    /// A missing name means the caller references a command the native view
    /// manager never registered; dispatching an undefined id would silently
    /// no-op or crash the platform, so this fails loudly instead.
    pub fn lookup(&self, name: &str) -> BridgeResult<CommandId> {
        self.commands
            .get(name)
            .copied()
            .ok_or_else(|| BridgeError::Configuration(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Memoizing resolver for view-manager command tables.
pub struct CommandResolver {
    host: Arc<dyn ViewCommandHost>,
    cache: Mutex<HashMap<String, Arc<CommandTable>>>,
}

impl CommandResolver {
    pub fn new(host: Arc<dyn ViewCommandHost>) -> Self {
        Self {
            host,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the command table for `view_manager`.
    ///
    /// The first non-empty answer from the host is cached and returned from
    /// then on without re-querying. An empty or absent table is never cached;
    /// native view managers may register asynchronously after the bridge
    /// loads, so every call retries until commands appear.
    pub fn resolve(&self, view_manager: &str) -> Option<Arc<CommandTable>> {
        let mut cache = self.cache.lock().unwrap();
        if let Some(table) = cache.get(view_manager) {
            return Some(table.clone());
        }
        match self.host.view_manager_config(view_manager) {
            Some(commands) if !commands.is_empty() => {
                let table = Arc::new(CommandTable::new(commands));
                log::debug!(
                    "resolved {} commands for view manager `{}`",
                    table.len(),
                    view_manager
                );
                cache.insert(view_manager.to_string(), table.clone());
                Some(table)
            }
            _ => {
                log::debug!("command table for `{}` not available yet", view_manager);
                None
            }
        }
    }
}

/// Forwards symbolic view commands to the native transport.
///
/// Dispatch is fire-and-forget: it returns no result and no future, and
/// transport failures are logged and absorbed. Only integration misuse (a
/// missing view handle or an unregistered command) comes back as an error,
/// raised before any native call is made.
pub struct CommandDispatcher {
    resolver: CommandResolver,
    host: Arc<dyn ViewCommandHost>,
    view_manager: String,
}

impl CommandDispatcher {
    pub fn new(host: Arc<dyn ViewCommandHost>, view_manager: impl Into<String>) -> Self {
        Self {
            resolver: CommandResolver::new(host.clone()),
            host,
            view_manager: view_manager.into(),
        }
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    pub fn dispatch(
        &self,
        view: Option<ViewHandle>,
        command: &str,
        args: Vec<Value>,
    ) -> BridgeResult<()> {
        let view = view.ok_or(BridgeError::InvalidTarget)?;
        let table = self
            .resolver
            .resolve(&self.view_manager)
            .ok_or_else(|| BridgeError::Configuration(command.to_string()))?;
        let id = table.lookup(command)?;
        log::debug!("dispatching `{}` (id {}) to view {}", command, id, view);
        if let Err(err) = self.host.dispatch_command(view, id, &args) {
            log::error!("view command `{}` failed: {}", command, err);
        }
        Ok(())
    }
}
