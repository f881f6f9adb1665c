//! Typed session keys.
//!
//! Session data is an open-ended bag: any module can store anything under
//! its own names. Instead of passing raw strings around, every entry is
//! described by a zero-sized marker type implementing [`SessionKey`]:
//!
//! ```rust
//! use tapgate_session::SessionKey;
//!
//! struct CaptchaScore;
//!
//! impl SessionKey for CaptchaScore {
//!     const NAME: &'static str = "captcha.score";
//!     type Value = f64;
//! }
//! ```
//!
//! The name and the value type are declared together, so a typo or a type
//! mismatch is a compile error instead of a silent `None` at runtime.
//! Modules define their keys in their own crate, prefixed with their module
//! name, which keeps the namespace open and per-module.

use serde::{de::DeserializeOwned, Serialize};

/// Describes one entry in the session data bag.
pub trait SessionKey {
    /// The string key the value is stored under. Part of the persisted
    /// representation, so don't rename it casually.
    const NAME: &'static str;

    /// The value type. Must round-trip through JSON.
    type Value: Serialize + DeserializeOwned;
}

/// Modules that should not run their `SessionStart` checks for this session.
///
/// Granted as a perk by other modules; each module checks it first and
/// returns early when its own name is listed. Always a de-duplicated union.
pub struct SkipModules;

impl SessionKey for SkipModules {
    const NAME: &'static str = "skip.modules";
    type Value = Vec<String>;
}

/// The payout address submitted with the session-start input.
pub struct TargetAddress;

impl SessionKey for TargetAddress {
    const NAME: &'static str = "target.addr";
    type Value = String;
}

/// The final drop amount in base units, as a decimal string.
///
/// Set by the lifecycle controller right before `SessionComplete` fires.
/// A string rather than a number because token amounts overflow `u64`.
pub struct DropAmount;

impl SessionKey for DropAmount {
    const NAME: &'static str = "drop.amount";
    type Value = String;
}
