//! The `FaucetModule` trait: the extension point for admission modules.
//!
//! A module is an independent type that, when started, registers its hooks
//! with the [`HookRegistry`] it was handed. It never looks anything up
//! globally: every collaborator it needs arrives through the
//! [`ModuleContext`] (or its own constructor).

use std::sync::Arc;

use async_trait::async_trait;
use tapgate_session::SharedSessions;

use crate::{HookError, HookRegistry};

/// Dependencies injected into every module at start.
#[derive(Clone)]
pub struct ModuleContext {
    /// Where the module registers its hooks.
    pub hooks: Arc<HookRegistry>,
    /// Read access to the other active sessions.
    pub sessions: SharedSessions,
}

/// The capability contract every admission module implements.
///
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tapgate_hooks::{FaucetModule, HookError, ModuleContext};
///
/// /// A module that registers nothing.
/// struct NoopModule;
///
/// #[async_trait]
/// impl FaucetModule for NoopModule {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     async fn start(&self, _ctx: &ModuleContext) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait FaucetModule: Send + Sync + 'static {
    /// Unique module name. Used as the hook owner, as the client-config key,
    /// and in skip lists.
    fn name(&self) -> &str;

    /// Whether the module should be started at all. A disabled module is
    /// skipped by [`ModuleManager::load`] and registers nothing.
    /// Default: enabled.
    fn enabled(&self) -> bool {
        true
    }

    /// Prepares the module and registers its hooks.
    async fn start(&self, ctx: &ModuleContext) -> Result<(), HookError>;

    /// Releases module resources. Hooks are unregistered by the manager
    /// after this returns. Default: no-op.
    async fn stop(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Owns the loaded modules and drives their start/stop lifecycle.
pub struct ModuleManager {
    modules: Vec<Arc<dyn FaucetModule>>,
    context: ModuleContext,
}

impl ModuleManager {
    /// Creates a manager whose modules will receive `context`.
    pub fn new(context: ModuleContext) -> Self {
        Self {
            modules: Vec::new(),
            context,
        }
    }

    /// The context handed to modules.
    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Starts `module` and keeps it loaded. A disabled module is skipped.
    ///
    /// # Errors
    /// [`HookError::DuplicateModule`] if a module with the same name is
    /// already loaded, or whatever the module's `start` returns. A module
    /// whose start fails is not kept and its partial registrations are
    /// removed.
    pub async fn load(&mut self, module: Arc<dyn FaucetModule>) -> Result<(), HookError> {
        let name = module.name().to_string();
        if self.is_loaded(&name) {
            return Err(HookError::DuplicateModule(name));
        }
        if !module.enabled() {
            tracing::info!(module = %name, "module disabled, not started");
            return Ok(());
        }

        if let Err(err) = module.start(&self.context).await {
            tracing::error!(module = %name, error = %err, "module failed to start");
            self.context.hooks.unregister_module(&name).await;
            return Err(err);
        }

        tracing::info!(module = %name, "module started");
        self.modules.push(module);
        Ok(())
    }

    /// Stops every module in reverse load order and removes its hooks.
    ///
    /// Keeps going when a module fails to stop; the first error is returned
    /// once everything has been attempted.
    pub async fn stop_all(&mut self) -> Result<(), HookError> {
        let mut first_err = None;
        while let Some(module) = self.modules.pop() {
            let name = module.name().to_string();
            if let Err(err) = module.stop().await {
                tracing::warn!(module = %name, error = %err, "module failed to stop");
                first_err.get_or_insert(err);
            }
            self.context.hooks.unregister_module(&name).await;
            tracing::info!(module = %name, "module stopped");
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns `true` if a module named `name` is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    /// Names of the loaded modules, in load order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }
}
