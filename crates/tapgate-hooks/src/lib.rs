//! Module hook pipeline for Tapgate.
//!
//! Validation modules never call each other and the session lifecycle never
//! calls a module directly. Instead, modules register callbacks against
//! named lifecycle actions and the controller dispatches those actions at
//! well-defined points.
//!
//! # Key types
//!
//! - [`FaucetModule`]: the capability contract every module implements
//! - [`ModuleManager`]: starts/stops modules, injects their dependencies
//! - [`HookRegistry`]: ordered callbacks per [`HookAction`]
//! - [`HookCallback`] / [`HookPayload`]: what a callback receives
//! - [`HookError`]: why dispatch stopped

mod action;
mod error;
mod module;
mod registry;

pub use action::HookAction;
pub use error::HookError;
pub use module::{FaucetModule, ModuleContext, ModuleManager};
pub use registry::{HookCallback, HookInfo, HookPayload, HookRegistry, ModuleHook};
