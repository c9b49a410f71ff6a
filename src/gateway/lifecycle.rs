use serde::Deserialize;

/// Install/activate progression of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, shell not yet installed.
    Parsed,
    Installing,
    /// Installed and waiting to take over.
    Installed,
    /// Controlling clients; requests are intercepted.
    Active,
    /// Install failed; the gateway only passes requests through.
    Redundant,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }
}

/// Messages a controlling page may post to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate now instead of waiting for clients to reload.
    SkipWaiting,
    /// Delete every cache partition.
    ClearCache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Activated { deleted: Vec<String> },
    AlreadyActive,
    Cleared { deleted: Vec<String> },
}
