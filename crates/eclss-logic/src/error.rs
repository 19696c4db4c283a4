//! Errors reported back to whoever submitted a player action.

use thiserror::Error;

/// Why an action submission could not be judged.
///
/// These are ordinary game outcomes, not faults; the request layer renders
/// them as `status: "error"` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("No active anomaly to execute an action against.")]
    NoActiveAnomaly,

    #[error("Unknown action ID.")]
    UnknownActionId(i64),

    /// Raised by the request layer before the engine is reached.
    #[error("No action_id provided.")]
    MissingInput,

    /// Raised by the request layer for a non-integral `action_id`.
    #[error("action_id must be an integer.")]
    InvalidActionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ActionError::NoActiveAnomaly.to_string(),
            "No active anomaly to execute an action against."
        );
        assert_eq!(ActionError::UnknownActionId(42).to_string(), "Unknown action ID.");
        assert_eq!(ActionError::MissingInput.to_string(), "No action_id provided.");
        assert_eq!(
            ActionError::InvalidActionId.to_string(),
            "action_id must be an integer."
        );
    }
}
