//! Lifecycle action names.

use std::fmt;
use std::str::FromStr;

/// A named lifecycle extension point.
///
/// The string names are a contract: other modules and the frontend refer to
/// them, so [`as_str`](Self::as_str) must stay stable.
///
/// | Action | Payload |
/// |---|---|
/// | `ClientConfig` | mutable client-config object |
/// | `SessionStart` | mutable session + raw user input |
/// | `SessionComplete` | session |
/// | `SessionRewardFactor` | session + mutable reward-factor list |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    ClientConfig,
    SessionStart,
    SessionComplete,
    SessionRewardFactor,
}

impl HookAction {
    /// Every action, in lifecycle order.
    pub const ALL: [HookAction; 4] = [
        Self::ClientConfig,
        Self::SessionStart,
        Self::SessionComplete,
        Self::SessionRewardFactor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientConfig => "ClientConfig",
            Self::SessionStart => "SessionStart",
            Self::SessionComplete => "SessionComplete",
            Self::SessionRewardFactor => "SessionRewardFactor",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown hook action: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_are_stable() {
        assert_eq!(HookAction::ClientConfig.to_string(), "ClientConfig");
        assert_eq!(HookAction::SessionStart.to_string(), "SessionStart");
        assert_eq!(HookAction::SessionComplete.to_string(), "SessionComplete");
        assert_eq!(HookAction::SessionRewardFactor.to_string(), "SessionRewardFactor");
    }

    #[test]
    fn test_from_str_round_trips_every_action() {
        for action in HookAction::ALL {
            assert_eq!(action.as_str().parse::<HookAction>(), Ok(action));
        }
        assert!("SessionEnd".parse::<HookAction>().is_err());
    }
}
